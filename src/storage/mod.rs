pub mod sqlite;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid timestamp {value:?} in stored sample: {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("history window of {0} is out of range")]
    WindowOutOfRange(chrono::Duration),
    #[error("database worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
