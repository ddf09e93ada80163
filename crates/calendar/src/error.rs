//! Error types for calendar access.

use thiserror::Error;

/// Errors that can occur when talking to a calendar service.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// No credential is available for the account.
    #[error("no access token for account {0}")]
    MissingToken(String),

    /// The response could not be interpreted.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The calendar refused or could not serve the request.
    #[error("calendar unavailable: {0}")]
    Unavailable(String),
}

/// Result type for calendar operations.
pub type Result<T> = std::result::Result<T, CalendarError>;
