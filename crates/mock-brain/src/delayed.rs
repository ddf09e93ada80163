//! Delayed brain implementation - wraps another brain with artificial delay.

use std::time::Duration;

use brain_core::{async_trait, Brain, BrainError, ChatMessage};
use tokio::time::sleep;

/// A brain that sleeps before delegating to an inner brain.
///
/// Useful for exercising interleavings around a slow completion call.
pub struct DelayedBrain<B: Brain> {
    inner: B,
    delay: Duration,
}

impl<B: Brain> DelayedBrain<B> {
    pub fn new(inner: B, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn with_millis(inner: B, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl<B: Brain> Brain for DelayedBrain<B> {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, BrainError> {
        sleep(self.delay).await;
        self.inner.complete(system_prompt, messages).await
    }

    fn name(&self) -> &str {
        "DelayedBrain"
    }

    async fn is_ready(&self) -> bool {
        self.inner.is_ready().await
    }
}
