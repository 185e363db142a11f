use thiserror::Error;

/// Failure taxonomy for the sync engine. The retry layer only ever retries
/// `TransientFetch`; everything else surfaces immediately.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transient fetch error: {0}")]
    TransientFetch(String),

    #[error("Permanent fetch error: {0}")]
    PermanentFetch(String),

    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: i64, reason: String },

    #[error("Materialization failed: {0}")]
    Materialization(String),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientFetch(_))
    }

    /// Classifies an HTTP client error. Timeouts and connection failures are
    /// worth retrying; a 4xx status means the request itself is wrong.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return SyncError::TransientFetch(e.to_string());
        }
        if let Some(status) = e.status() {
            if status.is_client_error() {
                return SyncError::PermanentFetch(e.to_string());
            }
        }
        SyncError::TransientFetch(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
