//! Rust client for a Twilio-style messaging and voice gateway.
//!
//! # Example
//!
//! ```no_run
//! use voice_gateway::{GatewayClient, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GatewayClient::new(GatewayConfig::from_env()?)?;
//!     client.send_sms("+15551234567", "Hello").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{GatewayClient, Resource};
pub use config::GatewayConfig;
pub use error::GatewayError;
