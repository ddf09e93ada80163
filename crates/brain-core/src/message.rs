//! Message types exchanged with the engine and with brains.

use serde::{Deserialize, Serialize};

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in an ordered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// A raw message received from some channel (SMS, call transcript, web chat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Opaque identity key: phone number, call id or browser session id.
    pub identity: String,
    /// Raw message text, untrimmed.
    pub text: String,
    /// Receive time in milliseconds since the epoch (0 when unknown).
    pub timestamp: u64,
}

impl InboundMessage {
    pub fn new(identity: impl Into<String>, text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            identity: identity.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// A reply produced for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: String,
    pub text: String,
}

impl OutboundMessage {
    /// Build a reply addressed to the sender of `message`.
    pub fn reply_to(message: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            recipient: message.identity.clone(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_to_targets_sender() {
        let inbound = InboundMessage::new("+15551234567", "hi", 1);
        let reply = OutboundMessage::reply_to(&inbound, "hello");
        assert_eq!(reply.recipient, "+15551234567");
        assert_eq!(reply.text, "hello");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(ChatMessage::user("x").role, Role::User);
    }
}
