use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::remote::http_client::create_client;
use crate::remote::{IllustSummary, ListingKind, ListingPage, RemoteAuthor, RemoteSource, RemoteTag};

const PAGE_SIZE: u32 = 30;

/// RemoteSource backed by the art-hosting service's JSON app API.
///
/// Listing items are validated into [`IllustSummary`] at this boundary;
/// malformed records are logged and dropped rather than propagated.
pub struct AppApiClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiListing {
    illusts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiIllustEnvelope {
    illust: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiIllust {
    id: i64,
    title: String,
    caption: Option<String>,
    create_date: String,
    user: ApiUser,
    #[serde(default)]
    total_view: i64,
    #[serde(default)]
    total_bookmarks: i64,
    page_count: i64,
    #[serde(default = "default_lewd_level")]
    sanity_level: i64,
    #[serde(default)]
    x_restrict: i64,
    #[serde(default)]
    is_bookmarked: bool,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    tags: Vec<ApiTag>,
    meta_single_page: Option<ApiSinglePage>,
    #[serde(default)]
    meta_pages: Vec<ApiMetaPage>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    name: String,
    account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    name: String,
    translated_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSinglePage {
    original_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMetaPage {
    image_urls: ApiImageUrls,
}

#[derive(Debug, Deserialize)]
struct ApiImageUrls {
    original: String,
}

fn default_lewd_level() -> i64 {
    2
}

fn default_visible() -> bool {
    true
}

impl AppApiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: create_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Reads `ILLUST_SYNC_API_URL` and `ILLUST_SYNC_TOKEN` from the
    /// environment. Token acquisition itself is outside this tool.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("ILLUST_SYNC_API_URL")
            .unwrap_or_else(|_| "https://app-api.pixiv.net".to_string());
        let token = std::env::var("ILLUST_SYNC_TOKEN")
            .map_err(|_| anyhow::anyhow!("ILLUST_SYNC_TOKEN is not set"))?;
        Ok(Self::new(&base_url, &token))
    }

    /// Query parameters are encoded by reqwest, so search terms may carry
    /// spaces and non-ASCII freely.
    fn listing_request(&self, kind: &ListingKind, offset: u32) -> reqwest::RequestBuilder {
        let offset = offset.to_string();
        match kind {
            ListingKind::Bookmarks => self
                .client
                .get(format!("{}/v1/user/bookmarks/illust", self.base_url))
                .query(&[("restrict", "public"), ("offset", offset.as_str())]),
            ListingKind::Following => self
                .client
                .get(format!("{}/v2/illust/follow", self.base_url))
                .query(&[("restrict", "public"), ("offset", offset.as_str())]),
            ListingKind::UserGallery(user_id) => {
                let user_id = user_id.to_string();
                self.client
                    .get(format!("{}/v1/user/illusts", self.base_url))
                    .query(&[("user_id", user_id.as_str()), ("offset", offset.as_str())])
            }
            ListingKind::TagSearch(tag) => self
                .client
                .get(format!("{}/v1/search/illust", self.base_url))
                .query(&[("word", tag.as_str()), ("offset", offset.as_str())]),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> SyncResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(SyncError::from_reqwest)?
            .error_for_status()
            .map_err(SyncError::from_reqwest)?;

        response.json::<T>().await.map_err(SyncError::from_reqwest)
    }
}

/// Validates a page of raw listing records. Malformed records are logged and
/// quarantined, but still counted in `raw_len` so the caller's pagination
/// stays on the remote's page boundaries.
fn validate_listing(raws: Vec<serde_json::Value>) -> ListingPage {
    let raw_len = raws.len();
    let mut items = Vec::with_capacity(raw_len);
    for raw in raws {
        match validate_illust(raw) {
            Ok(item) => items.push(item),
            Err(e) => {
                // quarantine: a bad record must not sink the page
                tracing::warn!("Dropping malformed listing record: {}", e);
            }
        }
    }
    ListingPage { items, raw_len }
}

/// Validates one raw listing record into an IllustSummary.
fn validate_illust(raw: serde_json::Value) -> SyncResult<IllustSummary> {
    let id = raw.get("id").and_then(|v| v.as_i64()).unwrap_or(0);

    let api: ApiIllust = serde_json::from_value(raw).map_err(|e| SyncError::MalformedRecord {
        id,
        reason: e.to_string(),
    })?;

    let uploaded_at: DateTime<Utc> = api
        .create_date
        .parse()
        .map_err(|_| SyncError::MalformedRecord {
            id: api.id,
            reason: format!("unparseable create_date `{}`", api.create_date),
        })?;

    if api.page_count < 1 {
        return Err(SyncError::MalformedRecord {
            id: api.id,
            reason: format!("page_count {} out of range", api.page_count),
        });
    }

    let page_urls: Vec<String> = if api.page_count == 1 {
        api.meta_single_page
            .and_then(|p| p.original_image_url)
            .into_iter()
            .collect()
    } else {
        api.meta_pages
            .into_iter()
            .map(|p| p.image_urls.original)
            .collect()
    };

    Ok(IllustSummary {
        id: api.id,
        title: api.title,
        caption: api.caption,
        author: RemoteAuthor {
            id: api.user.id,
            name: api.user.name,
            account_name: api.user.account,
        },
        uploaded_at,
        views: api.total_view,
        bookmarks: api.total_bookmarks,
        page_count: api.page_count,
        lewd_level: api.sanity_level,
        r18: api.x_restrict != 0,
        is_bookmarked: api.is_bookmarked,
        visible: api.visible,
        tags: api
            .tags
            .into_iter()
            .map(|t| RemoteTag {
                name: t.name,
                translated_name: t.translated_name,
            })
            .collect(),
        page_urls,
    })
}

#[async_trait]
impl RemoteSource for AppApiClient {
    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    async fn fetch_listing_page(
        &self,
        kind: &ListingKind,
        offset: u32,
    ) -> SyncResult<ListingPage> {
        let request = self.listing_request(kind, offset);
        let listing: ApiListing = self.get_json(request).await?;
        Ok(validate_listing(listing.illusts))
    }

    async fn fetch_illust(&self, illust_id: i64) -> SyncResult<IllustSummary> {
        let request = self
            .client
            .get(format!("{}/v1/illust/detail", self.base_url))
            .query(&[("illust_id", illust_id)]);
        let envelope: ApiIllustEnvelope = self.get_json(request).await?;
        validate_illust(envelope.illust)
    }

    async fn fetch_image(&self, url: &str) -> SyncResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, &self.base_url)
            .send()
            .await
            .map_err(SyncError::from_reqwest)?
            .error_for_status()
            .map_err(SyncError::from_reqwest)?;

        let bytes = response.bytes().await.map_err(SyncError::from_reqwest)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> serde_json::Value {
        json!({
            "id": 101,
            "title": "Harbour at dusk",
            "caption": "oil study",
            "create_date": "2024-05-01T12:00:00+00:00",
            "user": {"id": 9, "name": "mariko", "account": "mariko_p"},
            "total_view": 1200,
            "total_bookmarks": 56,
            "page_count": 1,
            "sanity_level": 2,
            "x_restrict": 0,
            "is_bookmarked": true,
            "tags": [
                {"name": "Landscape", "translated_name": null},
                {"name": "海", "translated_name": "sea"}
            ],
            "meta_single_page": {"original_image_url": "https://img.example/101_p0.png"},
            "meta_pages": []
        })
    }

    #[test]
    fn validates_a_single_page_record() {
        let summary = validate_illust(sample_record()).unwrap();
        assert_eq!(summary.id, 101);
        assert_eq!(summary.page_count, 1);
        assert_eq!(summary.page_urls, vec!["https://img.example/101_p0.png"]);
        assert!(!summary.r18);
        assert_eq!(summary.author.id, 9);
        assert_eq!(summary.tags.len(), 2);
    }

    #[test]
    fn multi_page_records_collect_all_originals() {
        let mut record = sample_record();
        record["page_count"] = json!(2);
        record["meta_single_page"] = json!(null);
        record["meta_pages"] = json!([
            {"image_urls": {"original": "https://img.example/101_p0.png"}},
            {"image_urls": {"original": "https://img.example/101_p1.png"}}
        ]);

        let summary = validate_illust(record).unwrap();
        assert_eq!(summary.page_urls.len(), 2);
    }

    #[test]
    fn rejects_records_missing_required_fields() {
        let mut record = sample_record();
        record.as_object_mut().unwrap().remove("title");

        let err = validate_illust(record).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRecord { id: 101, .. }));
    }

    #[test]
    fn rejects_unparseable_upload_date() {
        let mut record = sample_record();
        record["create_date"] = json!("yesterday-ish");

        let err = validate_illust(record).unwrap_err();
        assert!(matches!(err, SyncError::MalformedRecord { .. }));
    }

    #[test]
    fn rejects_nonpositive_page_count() {
        let mut record = sample_record();
        record["page_count"] = json!(0);

        assert!(validate_illust(record).is_err());
    }

    #[test]
    fn quarantined_records_still_count_toward_the_raw_page_length() {
        let mut broken = sample_record();
        broken["create_date"] = json!("not-a-date");

        let page = validate_listing(vec![sample_record(), broken, sample_record()]);
        assert_eq!(page.raw_len, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.quarantined(), 1);
    }

    #[test]
    fn a_fully_malformed_page_is_not_empty() {
        let mut broken = sample_record();
        broken["page_count"] = json!(0);

        let page = validate_listing(vec![broken.clone(), broken]);
        assert_eq!(page.raw_len, 2);
        assert!(page.items.is_empty());
        assert_eq!(page.quarantined(), 2);
    }

    #[test]
    fn search_terms_are_encoded_as_query_parameters() {
        let client = AppApiClient::new("https://api.example", "token");
        let request = client
            .listing_request(&ListingKind::TagSearch("blue sky/夜".into()), 30)
            .build()
            .unwrap();

        let url = request.url();
        assert_eq!(url.path(), "/v1/search/illust");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("word".into(), "blue sky/夜".into())));
        assert!(pairs.contains(&("offset".into(), "30".into())));
        assert!(!url.query().unwrap().contains(' '), "raw query must be encoded");
    }
}
