//! The Brain trait definition.

use async_trait::async_trait;

use crate::error::BrainError;
use crate::message::ChatMessage;

/// A text-completion service.
///
/// Implementations take a system prompt plus an ordered list of turns and
/// return the assistant's next message. No streaming, no tool calls.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Produce the next assistant message.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, BrainError>;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Whether the brain is ready to take requests.
    async fn is_ready(&self) -> bool {
        true
    }
}
