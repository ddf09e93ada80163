//! Configuration types for voice-gateway.

use std::env;

use crate::error::GatewayError;

const DEFAULT_API_URL: &str = "https://api.twilio.com";

/// Configuration for connecting to the gateway REST API.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the API (e.g., "https://api.twilio.com").
    pub api_url: String,
    /// Account identifier, used in paths and as the basic-auth user.
    pub account_sid: String,
    /// Basic-auth secret.
    pub auth_token: String,
    /// Number messages and calls are sent from.
    pub from_number: String,
}

impl GatewayConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
        }
    }

    /// Override the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create configuration from environment variables.
    ///
    /// Required: `GATEWAY_ACCOUNT_SID`, `GATEWAY_AUTH_TOKEN`, `GATEWAY_FROM_NUMBER`.
    /// Optional: `GATEWAY_API_URL` (default: https://api.twilio.com).
    pub fn from_env() -> Result<Self, GatewayError> {
        let required = |key: &str| {
            env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::Config(format!("{key} not set")))
        };

        let config = Self::new(
            required("GATEWAY_ACCOUNT_SID")?,
            required("GATEWAY_AUTH_TOKEN")?,
            required("GATEWAY_FROM_NUMBER")?,
        );

        Ok(match env::var("GATEWAY_API_URL") {
            Ok(url) => config.with_api_url(url),
            Err(_) => config,
        })
    }

    fn account_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}",
            self.api_url,
            urlencoding::encode(&self.account_sid)
        )
    }

    /// Endpoint for outbound text messages.
    pub fn messages_url(&self) -> String {
        format!("{}/Messages.json", self.account_url())
    }

    /// Endpoint for outbound calls.
    pub fn calls_url(&self) -> String {
        format!("{}/Calls.json", self.account_url())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = GatewayConfig::new("AC123", "secret", "+15550001111")
            .with_api_url("http://localhost:9000/");
        assert_eq!(
            config.messages_url(),
            "http://localhost:9000/2010-04-01/Accounts/AC123/Messages.json"
        );
        assert!(config.calls_url().ends_with("/Calls.json"));
        assert!(!format!("{config:?}").contains("secret"));
    }

    // Env vars are process-global; keep every scenario in one test.
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear() {
            for key in [
                "GATEWAY_ACCOUNT_SID",
                "GATEWAY_AUTH_TOKEN",
                "GATEWAY_FROM_NUMBER",
                "GATEWAY_API_URL",
            ] {
                std::env::remove_var(key);
            }
        }

        clear();
        match GatewayConfig::from_env() {
            Err(GatewayError::Config(msg)) => assert!(msg.contains("GATEWAY_ACCOUNT_SID")),
            other => panic!("expected config error, got {:?}", other),
        }

        std::env::set_var("GATEWAY_ACCOUNT_SID", "AC1");
        std::env::set_var("GATEWAY_AUTH_TOKEN", "tok");
        std::env::set_var("GATEWAY_FROM_NUMBER", "+15550001111");
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://api.twilio.com");

        std::env::set_var("GATEWAY_API_URL", "http://gw.local/");
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.api_url, "http://gw.local");

        clear();
    }
}
