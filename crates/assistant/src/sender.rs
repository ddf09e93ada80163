//! Gateway-backed message sender.

use async_trait::async_trait;
use orchestrator::{MessageSender, OrchestratorError};
use tracing::debug;
use voice_gateway::GatewayClient;

/// Delivers messages and calls through the SMS/voice gateway.
pub struct GatewaySender {
    client: GatewayClient,
}

impl GatewaySender {
    pub fn new(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSender for GatewaySender {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), OrchestratorError> {
        let sent = self
            .client
            .send_sms(recipient, text)
            .await
            .map_err(|e| OrchestratorError::SendFailed(e.to_string()))?;
        debug!("Message {} to {}: {:?}", sent.sid, recipient, sent.status);
        Ok(())
    }

    async fn place_call(
        &self,
        recipient: &str,
        from: &str,
        markup: &str,
    ) -> Result<(), OrchestratorError> {
        let call = self
            .client
            .place_call(recipient, from, markup)
            .await
            .map_err(|e| OrchestratorError::SendFailed(e.to_string()))?;
        debug!("Call {} to {}: {:?}", call.sid, recipient, call.status);
        Ok(())
    }
}
