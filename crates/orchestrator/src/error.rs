//! Error types for orchestrator operations.

use thiserror::Error;

/// Errors surfaced by the engine's configuration and outbound delivery.
///
/// Brain, store and calendar failures never get here; handlers log them and
/// degrade.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Message or call delivery failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = OrchestratorError::SendFailed("gateway returned 503".to_string());
        assert_eq!(err.to_string(), "send failed: gateway returned 503");
    }
}
