//! Message sender trait and implementations.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::OrchestratorError;

/// Trait for sending text messages and placing voice calls.
///
/// Abstracted to support different transports (SMS gateway, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message.
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), OrchestratorError>;

    /// Place an automated call that plays `markup` when answered.
    ///
    /// # Arguments
    /// * `recipient` - Number to call
    /// * `from` - Caller id; empty means the transport default
    /// * `markup` - Voice markup, see [`say_markup`]
    async fn place_call(
        &self,
        recipient: &str,
        from: &str,
        markup: &str,
    ) -> Result<(), OrchestratorError>;
}

/// Remove characters that are significant in voice markup and collapse whitespace.
pub fn sanitize_for_speech(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\''))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap text in a minimal spoken-announcement document.
pub fn say_markup(text: &str) -> String {
    format!(
        "<Response><Say>{}</Say></Response>",
        sanitize_for_speech(text)
    )
}

/// A no-op message sender for testing that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send_message(&self, _recipient: &str, _text: &str) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn place_call(
        &self,
        _recipient: &str,
        _from: &str,
        _markup: &str,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }
}

/// A logging message sender for local runs without a gateway.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), OrchestratorError> {
        tracing::info!("Sending message to {}: {}", recipient, text);
        Ok(())
    }

    async fn place_call(
        &self,
        recipient: &str,
        from: &str,
        markup: &str,
    ) -> Result<(), OrchestratorError> {
        tracing::info!("Calling {} (from {:?}): {}", recipient, from, markup);
        Ok(())
    }
}

/// Something a [`RecordingSender`] was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message { to: String, text: String },
    Call { to: String, from: String, markup: String },
}

/// Sender that keeps every delivery in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingSender {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Text messages as `(to, text)`.
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter_map(|d| match d {
                Delivery::Message { to, text } => Some((to.clone(), text.clone())),
                Delivery::Call { .. } => None,
            })
            .collect()
    }

    /// Calls as `(to, markup)`.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter_map(|d| match d {
                Delivery::Call { to, markup, .. } => Some((to.clone(), markup.clone())),
                Delivery::Message { .. } => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), OrchestratorError> {
        self.deliveries.lock().await.push(Delivery::Message {
            to: recipient.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn place_call(
        &self,
        recipient: &str,
        from: &str,
        markup: &str,
    ) -> Result<(), OrchestratorError> {
        self.deliveries.lock().await.push(Delivery::Call {
            to: recipient.to_string(),
            from: from.to_string(),
            markup: markup.to_string(),
        });
        Ok(())
    }
}
