//! Brains with canned behavior and call recording.

use std::collections::VecDeque;

use brain_core::{async_trait, Brain, BrainError, ChatMessage};
use tokio::sync::Mutex;

/// One recorded request to a [`ScriptedBrain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainCall {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
}

/// A brain that answers from a queue of canned replies.
///
/// Once the queue is empty it keeps returning the fallback reply.
#[derive(Debug)]
pub struct ScriptedBrain {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    calls: Mutex<Vec<BrainCall>>,
}

impl ScriptedBrain {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: "ok".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A brain that always answers `reply`.
    pub fn constant(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, oldest first.
    pub async fn calls(&self) -> Vec<BrainCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl Brain for ScriptedBrain {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, BrainError> {
        self.calls.lock().await.push(BrainCall {
            system_prompt: system_prompt.to_string(),
            messages: messages.to_vec(),
        });

        let next = self.replies.lock().await.pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "ScriptedBrain"
    }
}

/// A brain whose every request fails.
#[derive(Debug, Clone, Default)]
pub struct FailingBrain;

#[async_trait]
impl Brain for FailingBrain {
    async fn complete(
        &self,
        _system_prompt: &str,
        _messages: &[ChatMessage],
    ) -> Result<String, BrainError> {
        Err(BrainError::Unavailable("scripted failure".to_string()))
    }

    fn name(&self) -> &str {
        "FailingBrain"
    }

    async fn is_ready(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_then_fallback() {
        let brain = ScriptedBrain::new(["one", "two"]);
        let turn = [ChatMessage::user("hi")];

        assert_eq!(brain.complete("sys", &turn).await.unwrap(), "one");
        assert_eq!(brain.complete("sys", &turn).await.unwrap(), "two");
        assert_eq!(brain.complete("sys", &turn).await.unwrap(), "ok");

        let calls = brain.calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].system_prompt, "sys");
        assert_eq!(calls[0].messages, turn.to_vec());
    }

    #[tokio::test]
    async fn test_constant_brain() {
        let brain = ScriptedBrain::constant("same");
        assert_eq!(brain.complete("", &[]).await.unwrap(), "same");
        assert_eq!(brain.complete("", &[]).await.unwrap(), "same");
        assert_eq!(brain.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_failing_brain() {
        let brain = FailingBrain;
        assert!(matches!(
            brain.complete("", &[]).await,
            Err(BrainError::Unavailable(_))
        ));
        assert!(!brain.is_ready().await);
    }
}
