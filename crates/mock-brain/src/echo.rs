//! Echo brain implementation - echoes the last user turn back.

use brain_core::{async_trait, Brain, BrainError, ChatMessage, Role};

/// A brain that answers with the most recent user message.
#[derive(Debug, Clone, Default)]
pub struct EchoBrain {
    prefix: Option<String>,
}

impl EchoBrain {
    /// Create a new EchoBrain with no prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an EchoBrain that prepends `prefix` to every reply.
    ///
    /// ```rust
    /// use mock_brain::EchoBrain;
    ///
    /// let brain = EchoBrain::with_prefix("Echo: ");
    /// ```
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl Brain for EchoBrain {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, BrainError> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, last),
            None => last.to_string(),
        })
    }

    fn name(&self) -> &str {
        "EchoBrain"
    }
}
