//! Error types for voice-gateway.

use thiserror::Error;

/// Errors that can occur when talking to the messaging/voice gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the gateway API.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The request was rejected before sending.
    #[error("Send failed: {0}")]
    SendFailed(String),
}
