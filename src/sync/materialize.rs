use std::path::{Path, PathBuf};

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{IllustSummary, RemoteSource};
use crate::sync::retry::fetch_with_retry;

/// One page image written to disk.
#[derive(Debug, Clone)]
pub struct PageFile {
    pub page_index: i64,
    pub file_path: PathBuf,
}

/// The full entity graph of one illustration, ready for persistence.
#[derive(Debug)]
pub struct MaterializedIllust {
    pub illust: IllustSummary,
    pub pages: Vec<PageFile>,
}

/// Deterministic on-disk location for one page image:
/// `<root>/raw/<illust_id>/p<index>.<ext>`.
pub fn page_path(output_root: &Path, illust_id: i64, page_index: i64, url: &str) -> PathBuf {
    let ext = url.rsplit('.').next().filter(|e| e.len() <= 5).unwrap_or("bin");
    output_root
        .join("raw")
        .join(illust_id.to_string())
        .join(format!("p{}.{}", page_index, ext))
}

/// Fetches an item's full metadata and every page image, writing images to
/// their deterministic paths. All-or-nothing per item: any page failure
/// aborts the whole item and partially written files are cleaned up. Never
/// touches the database.
pub struct Materializer<'a> {
    source: &'a dyn RemoteSource,
    output_root: &'a Path,
    retry: &'a RetryConfig,
}

impl<'a> Materializer<'a> {
    pub fn new(source: &'a dyn RemoteSource, output_root: &'a Path, retry: &'a RetryConfig) -> Self {
        Self {
            source,
            output_root,
            retry,
        }
    }

    pub async fn materialize(&self, summary: IllustSummary) -> SyncResult<MaterializedIllust> {
        // partial summaries carry no page URLs; re-fetch the full record
        let illust = if summary.page_urls.is_empty() {
            self.source.fetch_illust(summary.id).await?
        } else {
            summary
        };

        if illust.page_urls.len() as i64 != illust.page_count {
            return Err(SyncError::Materialization(format!(
                "illust {} reports {} pages but carries {} page URLs",
                illust.id,
                illust.page_count,
                illust.page_urls.len()
            )));
        }

        match self.fetch_pages(&illust).await {
            Ok(pages) => Ok(MaterializedIllust { illust, pages }),
            Err(e) => {
                self.cleanup(illust.id).await;
                Err(e)
            }
        }
    }

    async fn fetch_pages(&self, illust: &IllustSummary) -> SyncResult<Vec<PageFile>> {
        let mut pages = Vec::with_capacity(illust.page_urls.len());

        for (index, url) in illust.page_urls.iter().enumerate() {
            let page_index = index as i64;
            let path = page_path(self.output_root, illust.id, page_index, url);

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let bytes = fetch_with_retry(self.retry, || self.source.fetch_image(url)).await?;
            tokio::fs::write(&path, &bytes).await?;

            tracing::debug!(illust = illust.id, page = page_index, "Wrote page image");
            pages.push(PageFile {
                page_index,
                file_path: path,
            });
        }

        Ok(pages)
    }

    /// Best-effort removal of a half-written item directory.
    async fn cleanup(&self, illust_id: i64) {
        let dir = self.output_root.join("raw").join(illust_id.to_string());
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(illust = illust_id, "Failed to clean up partial download: {}", e);
            }
        }
    }
}
