use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::SyncError;
use crate::remote::{ListingKind, RemoteSource};
use crate::sync::filter::FilterConfig;
use crate::sync::index::DownloadIndex;
use crate::sync::materialize::{MaterializedIllust, Materializer};
use crate::sync::walker::ListingWalker;

/// One listing to walk, with its own resume point. Offsets are per listing
/// because they index into that listing's pagination, not the run.
#[derive(Debug, Clone)]
pub struct SyncListing {
    pub kind: ListingKind,
    pub start_offset: u32,
}

impl SyncListing {
    pub fn new(kind: ListingKind) -> Self {
        Self {
            kind,
            start_offset: 0,
        }
    }
}

/// One sync invocation: which listings to walk, where images land, and the
/// filter to apply.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub listings: Vec<SyncListing>,
    pub filter: FilterConfig,
    pub output_root: PathBuf,
    pub max_pages: Option<u32>,
}

/// Per-listing outcome counters.
#[derive(Debug)]
pub struct ListingReport {
    pub listing: String,
    pub pages: u32,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub filtered: usize,
    pub failed: usize,
    /// Records the remote served that failed boundary validation.
    pub quarantined: usize,
    /// Offset to resume from if the run was aborted or cancelled.
    pub next_offset: u32,
    pub aborted: Option<String>,
    pub cancelled: bool,
}

impl ListingReport {
    fn new(kind: &ListingKind, start_offset: u32) -> Self {
        Self {
            listing: kind.label(),
            pages: 0,
            downloaded: 0,
            skipped_existing: 0,
            filtered: 0,
            failed: 0,
            quarantined: 0,
            next_offset: start_offset,
            aborted: None,
            cancelled: false,
        }
    }

    pub fn ok(&self) -> bool {
        self.aborted.is_none()
    }
}

pub struct SyncService {
    pool: SqlitePool,
    source: Arc<dyn RemoteSource>,
    index: DownloadIndex,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl SyncService {
    pub fn new(pool: SqlitePool, source: Arc<dyn RemoteSource>, retry: RetryConfig) -> Self {
        Self {
            index: DownloadIndex::new(pool.clone()),
            pool,
            source,
            retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed between items; cancelling it stops the run at the next
    /// item boundary, leaving everything already persisted valid.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Processes the requested listings one after another. A hard failure in
    /// one listing never blocks the next.
    pub async fn sync_all(&self, request: &SyncRequest) -> Vec<ListingReport> {
        let mut reports = Vec::with_capacity(request.listings.len());

        for listing in &request.listings {
            tracing::info!(listing = %listing.kind.label(), "Starting listing sync");
            let report = self.sync_listing(listing, request).await;
            tracing::info!(
                listing = %report.listing,
                downloaded = report.downloaded,
                skipped = report.skipped_existing,
                filtered = report.filtered,
                failed = report.failed,
                quarantined = report.quarantined,
                "Listing sync finished"
            );
            reports.push(report);

            if self.cancel.is_cancelled() {
                break;
            }
        }

        reports
    }

    async fn sync_listing(&self, listing: &SyncListing, request: &SyncRequest) -> ListingReport {
        let kind = &listing.kind;
        let mut report = ListingReport::new(kind, listing.start_offset);
        let mut walker = ListingWalker::new(
            self.source.as_ref(),
            kind,
            &self.retry,
            listing.start_offset,
            request.max_pages,
        );
        let materializer =
            Materializer::new(self.source.as_ref(), &request.output_root, &self.retry);

        loop {
            let page = match walker.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(listing = %report.listing, "Listing walk aborted: {}", e);
                    report.aborted = Some(e.to_string());
                    break;
                }
            };

            let page_start = walker.offset() - page.raw_len as u32;
            let quarantined = page.quarantined();
            report.quarantined += quarantined;
            let mut any_new = false;
            let mut page_filtered = 0;
            let mut page_failed = 0;

            for item in page.items {
                if self.cancel.is_cancelled() {
                    tracing::info!(listing = %report.listing, "Sync cancelled");
                    report.cancelled = true;
                    report.next_offset = page_start;
                    return report;
                }

                let id = item.id;
                let title = item.title.clone();

                match self.index.has(id).await {
                    Ok(true) => {
                        tracing::debug!(illust = id, "Already downloaded, skipping");
                        report.skipped_existing += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // data integrity over completing the run
                        report.aborted = Some(format!("dedup lookup failed: {}", e));
                        report.next_offset = page_start;
                        return report;
                    }
                }

                if let Some(reason) = request.filter.evaluate(&item) {
                    tracing::info!(illust = id, title = %title, "Filtered: {}", reason);
                    report.filtered += 1;
                    page_filtered += 1;
                    continue;
                }

                any_new = true;

                let materialized = match materializer.materialize(item).await {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(illust = id, title = %title, "Materialization failed: {}", e);
                        report.failed += 1;
                        page_failed += 1;
                        continue;
                    }
                };

                match self.persist(&materialized, kind).await {
                    Ok(()) => {
                        self.index.confirm(id).await;
                        tracing::info!(
                            illust = id,
                            title = %title,
                            pages = materialized.pages.len(),
                            "Downloaded"
                        );
                        report.downloaded += 1;
                    }
                    Err(e) => {
                        tracing::error!(listing = %report.listing, "Persistence failed: {}", e);
                        report.aborted = Some(format!("persistence failed: {}", e));
                        report.next_offset = page_start;
                        return report;
                    }
                }
            }

            report.pages = walker.pages_fetched();
            report.next_offset = walker.offset();
            tracing::info!(
                listing = %report.listing,
                pages = report.pages,
                offset = report.next_offset,
                "Page complete"
            );

            // Early stop: a whole page of known items on a recency-sorted
            // listing means the rest has been seen in a previous run. Judged
            // per page; a quarantined, filtered, or failed item on this page
            // means it was not fully known.
            if kind.sort_stable() && !any_new && quarantined == 0 && page_filtered == 0 && page_failed == 0
            {
                tracing::info!(listing = %report.listing, "Page contained no new items, stopping early");
                break;
            }
        }

        report
    }

    /// Persists the whole entity graph and the completion record in one
    /// transaction, so a download row can never exist for a half-persisted
    /// item.
    async fn persist(
        &self,
        materialized: &MaterializedIllust,
        kind: &ListingKind,
    ) -> Result<(), SyncError> {
        let illust = &materialized.illust;
        let mut tx = self.pool.begin().await.map_err(SyncError::Persistence)?;

        sqlx::query(
            "INSERT INTO author (id, name, account_name) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
             name = excluded.name, account_name = excluded.account_name",
        )
        .bind(illust.author.id)
        .bind(&illust.author.name)
        .bind(&illust.author.account_name)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT OR IGNORE INTO illust
             (id, title, caption, author_id, uploaded_at, views, bookmarks,
              page_count, lewd_level, r18, is_bookmarked)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(illust.id)
        .bind(&illust.title)
        .bind(&illust.caption)
        .bind(illust.author.id)
        .bind(illust.uploaded_at.naive_utc())
        .bind(illust.views)
        .bind(illust.bookmarks)
        .bind(illust.page_count)
        .bind(illust.lewd_level)
        .bind(illust.r18)
        .bind(illust.is_bookmarked)
        .execute(&mut *tx)
        .await?;

        // remote records sometimes repeat a tag
        let mut seen = std::collections::HashSet::new();
        for tag in &illust.tags {
            let name = tag.name.to_lowercase();
            if !seen.insert(name.clone()) {
                continue;
            }

            sqlx::query(
                "INSERT INTO tag (name, translated_name) VALUES (?, ?)
                 ON CONFLICT(name) DO UPDATE SET
                 translated_name = COALESCE(excluded.translated_name, tag.translated_name)",
            )
            .bind(&name)
            .bind(&tag.translated_name)
            .execute(&mut *tx)
            .await?;

            let tag_id = sqlx::query_scalar::<_, i64>("SELECT id FROM tag WHERE name = ?")
                .bind(&name)
                .fetch_one(&mut *tx)
                .await?;

            sqlx::query("INSERT OR IGNORE INTO illust_tag (illust_id, tag_id) VALUES (?, ?)")
                .bind(illust.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        for page in &materialized.pages {
            sqlx::query(
                "INSERT OR IGNORE INTO page (illust_id, page_index, file_path) VALUES (?, ?, ?)",
            )
            .bind(illust.id)
            .bind(page.page_index)
            .bind(page.file_path.to_string_lossy().as_ref())
            .execute(&mut *tx)
            .await?;
        }

        self.index.mark_complete(&mut tx, illust.id, kind).await?;

        tx.commit().await.map_err(SyncError::Persistence)?;
        Ok(())
    }
}
