//! Configuration for ChatBrain.

use brain_core::BrainError;
use std::env;
use std::path::Path;

/// Default system prompt file name.
pub const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

const DEFAULT_API_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for ChatBrain.
#[derive(Debug, Clone)]
pub struct ChatBrainConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    pub api_url: String,

    /// Bearer token.
    pub api_key: String,

    pub model: String,

    /// Prompt prepended when the caller passes an empty system prompt.
    pub default_system_prompt: Option<String>,

    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,
}

impl Default for ChatBrainConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            default_system_prompt: None,
            max_tokens: Some(800),
            temperature: Some(0.7),
        }
    }
}

impl ChatBrainConfig {
    /// Create configuration from environment variables.
    ///
    /// Required:
    /// - `LLM_API_KEY`
    ///
    /// Optional:
    /// - `LLM_API_URL` (default: https://api.openai.com)
    /// - `LLM_MODEL` (default: gpt-4o-mini)
    /// - `LLM_SYSTEM_PROMPT` - overrides the prompt file
    /// - `LLM_PROMPT_FILE` (default: SYSTEM_PROMPT.md)
    /// - `LLM_MAX_TOKENS` (default: 800)
    /// - `LLM_TEMPERATURE` (default: 0.7)
    pub fn from_env() -> Result<Self, BrainError> {
        let api_key = env::var("LLM_API_KEY")
            .map_err(|_| BrainError::Configuration("LLM_API_KEY not set".to_string()))?;

        let api_url = env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let default_system_prompt = match env::var("LLM_SYSTEM_PROMPT") {
            Ok(prompt) => Some(prompt),
            Err(_) => {
                let prompt_file = env::var("LLM_PROMPT_FILE")
                    .unwrap_or_else(|_| DEFAULT_PROMPT_FILE.to_string());
                load_prompt_file(&prompt_file)
            }
        };

        let max_tokens = env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(800));

        let temperature = env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.7));

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            default_system_prompt,
            max_tokens,
            temperature,
        })
    }

    pub fn builder() -> ChatBrainConfigBuilder {
        ChatBrainConfigBuilder::default()
    }

    /// Full chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.api_url)
    }
}

/// Builder for ChatBrainConfig.
#[derive(Debug, Default)]
pub struct ChatBrainConfigBuilder {
    config: ChatBrainConfig,
}

impl ChatBrainConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn default_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.default_system_prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn build(self) -> ChatBrainConfig {
        self.config
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let content = std::fs::read_to_string(path.as_ref()).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
