//! OpenAI-compatible chat-completions brain.
//!
//! Sends the engine's system prompt and ordered turns to any
//! `/v1/chat/completions` endpoint and returns the first choice's text.
//!
//! ```rust,no_run
//! use chat_brain::{Brain, ChatBrain, ChatMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let brain = ChatBrain::from_env()?;
//!     let reply = brain
//!         .complete("You are terse.", &[ChatMessage::user("Hi")])
//!         .await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

mod api_types;
mod brain;
mod config;

pub use brain::ChatBrain;
pub use config::{ChatBrainConfig, ChatBrainConfigBuilder, DEFAULT_PROMPT_FILE};

pub use brain_core::{async_trait, Brain, BrainError, ChatMessage};
