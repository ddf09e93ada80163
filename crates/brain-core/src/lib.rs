//! Core trait and types for LLM-backed brains.
//!
//! This crate provides the shared interface between the assistant engine and
//! whatever text-completion service backs it. It defines:
//!
//! - [`Brain`] - single request/response text completion
//! - [`ChatMessage`] - ordered conversation turns sent to the brain
//! - [`InboundMessage`] / [`OutboundMessage`] - what the engine receives and replies with
//! - [`ConversationHistory`] - per-identity rolling history with LRU eviction
//! - [`BrainError`] - error types for brain operations
//!
//! # Example
//!
//! ```rust
//! use brain_core::{async_trait, Brain, BrainError, ChatMessage};
//!
//! struct MyBrain;
//!
//! #[async_trait]
//! impl Brain for MyBrain {
//!     async fn complete(
//!         &self,
//!         _system_prompt: &str,
//!         _messages: &[ChatMessage],
//!     ) -> Result<String, BrainError> {
//!         Ok("Hello!".to_string())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "MyBrain"
//!     }
//! }
//! ```

mod error;
mod history;
mod message;
mod prompt;
mod trait_def;

pub use error::BrainError;
pub use history::{ConversationHistory, DEFAULT_MAX_IDENTITIES};
pub use message::{ChatMessage, InboundMessage, OutboundMessage, Role};
pub use prompt::{compose_system_prompt, hash_prompt};
pub use trait_def::Brain;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
