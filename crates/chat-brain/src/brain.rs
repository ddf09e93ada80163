//! ChatBrain implementation.

use brain_core::{async_trait, hash_prompt, Brain, BrainError, ChatMessage};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse};
use crate::config::ChatBrainConfig;

/// A brain backed by an OpenAI-compatible chat-completions endpoint.
///
/// Stateless: the caller owns conversation history and passes it in.
pub struct ChatBrain {
    client: Client,
    config: ChatBrainConfig,
}

impl ChatBrain {
    pub fn new(config: ChatBrainConfig) -> Result<Self, BrainError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        if let Some(ref prompt) = config.default_system_prompt {
            info!("ChatBrain default prompt fingerprint: {}", hash_prompt(prompt));
        }
        info!("ChatBrain initialized with model: {}", config.model);

        Ok(Self { client, config })
    }

    /// See [`ChatBrainConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, BrainError> {
        Self::new(ChatBrainConfig::from_env()?)
    }

    pub fn config(&self) -> &ChatBrainConfig {
        &self.config
    }

    fn effective_system_prompt<'a>(&'a self, system_prompt: &'a str) -> Option<&'a str> {
        if !system_prompt.trim().is_empty() {
            return Some(system_prompt);
        }
        self.config.default_system_prompt.as_deref()
    }

    async fn chat_completion(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletionResponse, BrainError> {
        let system = self.effective_system_prompt(system_prompt).map(ChatMessage::system);
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: system.iter().chain(messages.iter()).collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending {} messages to {}", request.messages.len(), self.config.model);

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BrainError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&error_text)
                .map(|api_error| api_error.error.message)
                .unwrap_or(error_text);

            return Err(BrainError::ProcessingFailed(format!(
                "API error ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BrainError::ProcessingFailed(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Brain for ChatBrain {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, BrainError> {
        let completion = self.chat_completion(system_prompt, messages).await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Token usage - prompt: {}, completion: {}, total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BrainError::ProcessingFailed("no choices in response".to_string()))?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => {
                warn!("Empty completion (finish_reason: {:?})", choice.finish_reason);
                Err(BrainError::ProcessingFailed("empty completion".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "ChatBrain"
    }

    async fn is_ready(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}
