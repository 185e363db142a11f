pub mod app_api;
pub mod http_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncResult;

/// A named paginated source of remote items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingKind {
    /// The authenticated user's bookmarks, newest bookmark first.
    Bookmarks,
    /// New works from followed authors, newest first.
    Following,
    /// All works of one author.
    UserGallery(i64),
    /// Works matching a tag search.
    TagSearch(String),
}

impl ListingKind {
    /// Whether the remote guarantees a stable recency sort for this listing.
    /// Only sort-stable listings may use the early-stop heuristic; tag search
    /// results and galleries can be reordered by the server between runs.
    pub fn sort_stable(&self) -> bool {
        matches!(self, ListingKind::Bookmarks | ListingKind::Following)
    }

    pub fn label(&self) -> String {
        match self {
            ListingKind::Bookmarks => "bookmarks".to_string(),
            ListingKind::Following => "following".to_string(),
            ListingKind::UserGallery(id) => format!("user:{}", id),
            ListingKind::TagSearch(tag) => format!("tag:{}", tag),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteTag {
    pub name: String,
    pub translated_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteAuthor {
    pub id: i64,
    pub name: String,
    pub account_name: Option<String>,
}

/// One illustration as returned by a listing endpoint. Listing responses
/// usually carry the full record including page URLs; `page_urls` may be
/// empty for partial summaries, in which case the materializer re-fetches
/// the item by id.
#[derive(Debug, Clone)]
pub struct IllustSummary {
    pub id: i64,
    pub title: String,
    pub caption: Option<String>,
    pub author: RemoteAuthor,
    pub uploaded_at: DateTime<Utc>,
    pub views: i64,
    pub bookmarks: i64,
    pub page_count: i64,
    pub lewd_level: i64,
    pub r18: bool,
    pub is_bookmarked: bool,
    pub visible: bool,
    pub tags: Vec<RemoteTag>,
    pub page_urls: Vec<String>,
}

/// One fetched page of a listing. `raw_len` counts the records the remote
/// returned before boundary validation; pagination advances by it, not by the
/// validated count, so quarantined records cannot shift later page boundaries
/// or fake an exhausted listing.
#[derive(Debug)]
pub struct ListingPage {
    pub items: Vec<IllustSummary>,
    pub raw_len: usize,
}

impl ListingPage {
    pub fn quarantined(&self) -> usize {
        self.raw_len - self.items.len()
    }
}

/// The remote listing/fetch collaborator. Authentication and session handling
/// are entirely its concern; the sync engine only sees these operations.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fixed page size the remote protocol uses for listings.
    fn page_size(&self) -> u32;

    /// Fetches one page of a listing starting at the given item offset.
    /// A page with `raw_len == 0` means the listing is exhausted.
    async fn fetch_listing_page(
        &self,
        kind: &ListingKind,
        offset: u32,
    ) -> SyncResult<ListingPage>;

    /// Fetches the full record for a single illustration.
    async fn fetch_illust(&self, illust_id: i64) -> SyncResult<IllustSummary>;

    /// Fetches the binary payload of a page image.
    async fn fetch_image(&self, url: &str) -> SyncResult<Vec<u8>>;
}
