//! Error types for brain operations.

use thiserror::Error;

/// Errors that can occur while asking a brain for a completion.
#[derive(Debug, Error)]
pub enum BrainError {
    /// The brain is temporarily unavailable.
    #[error("brain unavailable: {0}")]
    Unavailable(String),

    /// The request reached the service but could not be completed.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// Transport-level failure talking to the service.
    #[error("network error: {0}")]
    Network(String),

    /// The brain is misconfigured (missing key, bad URL, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A timeout occurred during processing.
    #[error("processing timed out")]
    Timeout,
}
