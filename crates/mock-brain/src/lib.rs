//! Mock brain implementations for exercising the assistant engine.
//!
//! - `EchoBrain` - replies with the last user turn
//! - `ScriptedBrain` - replies from a queue and records every request
//! - `FailingBrain` - always errors
//! - `DelayedBrain` - wraps another brain with artificial latency
//!
//! For a real model, use the `chat-brain` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_brain::{Brain, ChatMessage, EchoBrain};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_brain::BrainError> {
//!     let brain = EchoBrain::new();
//!     let reply = brain.complete("", &[ChatMessage::user("Hello!")]).await?;
//!     assert_eq!(reply, "Hello!");
//!     Ok(())
//! }
//! ```

mod delayed;
mod echo;
mod scripted;

pub use brain_core::{async_trait, Brain, BrainError, ChatMessage};

pub use delayed::DelayedBrain;
pub use echo::EchoBrain;
pub use scripted::{BrainCall, FailingBrain, ScriptedBrain};
