use moka::future::Cache;
use sqlx::{SqliteConnection, SqlitePool};

use crate::remote::ListingKind;

/// Persisted record of which remote items are fully materialized, with an
/// in-memory positive cache in front. The `download` table is the source of
/// truth, so a cache miss falls through to it and a negative answer is never
/// cached; that rules out both stale misses and false positives.
pub struct DownloadIndex {
    pool: SqlitePool,
    cache: Cache<i64, ()>,
}

impl DownloadIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cache: Cache::new(100_000),
        }
    }

    pub async fn has(&self, illust_id: i64) -> Result<bool, sqlx::Error> {
        if self.cache.get(&illust_id).await.is_some() {
            return Ok(true);
        }

        let row = sqlx::query_scalar::<_, i64>("SELECT 1 FROM download WHERE illust_id = ?")
            .bind(illust_id)
            .fetch_optional(&self.pool)
            .await?;

        if row.is_some() {
            self.cache.insert(illust_id, ()).await;
            return Ok(true);
        }

        Ok(false)
    }

    /// Writes the completion row on the caller's transaction. The cache is
    /// only warmed by [`confirm`](Self::confirm) after the transaction
    /// commits, so a rollback can never leave a phantom completion behind.
    pub async fn mark_complete(
        &self,
        conn: &mut SqliteConnection,
        illust_id: i64,
        kind: &ListingKind,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO download (illust_id, listing_kind) VALUES (?, ?)")
            .bind(illust_id)
            .bind(kind.label())
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn confirm(&self, illust_id: i64) {
        self.cache.insert(illust_id, ()).await;
    }
}
