//! Gateway HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Resource returned for a created message or call.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Client for sending text messages and placing voice calls.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GatewayError::Http)?;

        info!("Gateway client ready for {}", config.api_url);
        Ok(Self { http, config })
    }

    /// Send a text message from the configured number.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<Resource, GatewayError> {
        if to.trim().is_empty() {
            return Err(GatewayError::SendFailed("empty recipient".to_string()));
        }
        let form = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];
        self.post_form(&self.config.messages_url(), &form).await
    }

    /// Place a call that plays `markup` once answered.
    ///
    /// An empty `from` falls back to the configured number.
    pub async fn place_call(
        &self,
        to: &str,
        from: &str,
        markup: &str,
    ) -> Result<Resource, GatewayError> {
        if to.trim().is_empty() {
            return Err(GatewayError::SendFailed("empty recipient".to_string()));
        }
        let from = if from.trim().is_empty() {
            self.config.from_number.as_str()
        } else {
            from
        };
        let form = [("To", to), ("From", from), ("Twiml", markup)];
        self.post_form(&self.config.calls_url(), &form).await
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Resource, GatewayError> {
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(GatewayError::Http)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayConfig::new("AC1", "tok", "+15550001111")).unwrap()
    }

    #[tokio::test]
    async fn test_empty_recipient_rejected_before_sending() {
        let client = client();
        assert!(matches!(
            client.send_sms(" ", "hi").await,
            Err(GatewayError::SendFailed(_))
        ));
        assert!(matches!(
            client.place_call("", "", "<Response/>").await,
            Err(GatewayError::SendFailed(_))
        ));
    }

    #[test]
    fn test_resource_parse() {
        let resource: Resource =
            serde_json::from_str(r#"{"sid":"SM1","status":"queued","extra":1}"#).unwrap();
        assert_eq!(resource.sid, "SM1");
        assert_eq!(resource.status.as_deref(), Some("queued"));
    }
}
