//! Store error types.

use thiserror::Error;

/// Errors that can occur during sheet operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored cells could not be decoded.
    #[error("corrupt row in {sheet}: {source}")]
    Corrupt {
        sheet: String,
        #[source]
        source: serde_json::Error,
    },

    /// The A1 range string could not be parsed or is unusable for the operation.
    #[error("invalid range {range:?}: {reason}")]
    InvalidRange { range: String, reason: String },

    /// The backing store refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
