use crate::config::RetryConfig;
use crate::error::SyncResult;
use crate::remote::{ListingKind, ListingPage, RemoteSource};
use crate::sync::retry::fetch_with_retry;

/// Lazily walks one paginated remote listing. The walker is restartable: pass
/// the offset of a previous run to resume at that page boundary without
/// replaying earlier pages.
pub struct ListingWalker<'a> {
    source: &'a dyn RemoteSource,
    kind: &'a ListingKind,
    retry: &'a RetryConfig,
    offset: u32,
    pages_fetched: u32,
    max_pages: Option<u32>,
    exhausted: bool,
}

impl<'a> ListingWalker<'a> {
    pub fn new(
        source: &'a dyn RemoteSource,
        kind: &'a ListingKind,
        retry: &'a RetryConfig,
        start_offset: u32,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            source,
            kind,
            retry,
            offset: start_offset,
            pages_fetched: 0,
            max_pages,
            exhausted: false,
        }
    }

    /// The offset of the next unfetched page; persist this to resume later.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetches the next page, retrying transient failures with backoff.
    /// Returns `Ok(None)` once the listing is exhausted or the page budget is
    /// spent; an error means retries were exhausted and the walk is over.
    ///
    /// Exhaustion and offset advancement go by the page's `raw_len`: a page
    /// whose records were all quarantined at the boundary is still a page the
    /// remote served, not the end of the listing.
    pub async fn next_page(&mut self) -> SyncResult<Option<ListingPage>> {
        if self.exhausted {
            return Ok(None);
        }

        if let Some(max) = self.max_pages {
            if self.pages_fetched >= max {
                tracing::debug!(listing = %self.kind.label(), "Page budget reached");
                return Ok(None);
            }
        }

        let offset = self.offset;
        let page = fetch_with_retry(self.retry, || {
            self.source.fetch_listing_page(self.kind, offset)
        })
        .await?;

        if page.raw_len == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        self.pages_fetched += 1;
        self.offset += page.raw_len as u32;

        Ok(Some(page))
    }
}
