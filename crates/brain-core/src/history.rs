//! Per-identity conversation history.
//!
//! Each identity keeps a bounded number of recent turns. The number of
//! tracked identities is also bounded; the least recently used identity is
//! evicted first.

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::message::ChatMessage;

/// Default maximum number of identities to track before LRU eviction.
pub const DEFAULT_MAX_IDENTITIES: usize = 10_000;

/// Rolling conversation history keyed by identity.
///
/// # Example
///
/// ```rust
/// use brain_core::ConversationHistory;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let history = ConversationHistory::new(5);
///
///     history.add_exchange("+1234", "Hello", "Hi there!").await;
///     history.add_exchange("+1234", "How are you?", "Doing well!").await;
///
///     let messages = history.get("+1234").await;
///     assert_eq!(messages.len(), 4);
/// }
/// ```
#[derive(Debug)]
pub struct ConversationHistory {
    /// Insertion order doubles as recency order.
    histories: RwLock<IndexMap<String, Vec<ChatMessage>>>,
    max_turns: usize,
    max_identities: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ConversationHistory {
    /// Create a history keeping `max_turns` user/assistant pairs per identity.
    pub fn new(max_turns: usize) -> Self {
        Self::with_limits(max_turns, DEFAULT_MAX_IDENTITIES)
    }

    /// Create a history with custom per-identity and global limits.
    pub fn with_limits(max_turns: usize, max_identities: usize) -> Self {
        Self {
            histories: RwLock::new(IndexMap::new()),
            max_turns,
            max_identities,
        }
    }

    /// Get the history for an identity, marking it recently used.
    pub async fn get(&self, identity: &str) -> Vec<ChatMessage> {
        let mut histories = self.histories.write().await;

        match histories.shift_remove(identity) {
            Some(entry) => {
                let result = entry.clone();
                histories.insert(identity.to_string(), entry);
                result
            }
            None => Vec::new(),
        }
    }

    /// Get the history followed by a new user turn, ready to send to a brain.
    pub async fn with_user_turn(&self, identity: &str, user_text: &str) -> Vec<ChatMessage> {
        let mut messages = self.get(identity).await;
        messages.push(ChatMessage::user(user_text));
        messages
    }

    /// Record a completed user/assistant exchange.
    pub async fn add_exchange(&self, identity: &str, user_text: &str, assistant_text: &str) {
        let mut histories = self.histories.write().await;

        let mut history = histories.shift_remove(identity).unwrap_or_default();
        history.push(ChatMessage::user(user_text));
        history.push(ChatMessage::assistant(assistant_text));

        let max_messages = self.max_turns * 2;
        if history.len() > max_messages {
            let excess = history.len() - max_messages;
            history.drain(0..excess);
        }

        histories.insert(identity.to_string(), history);

        while histories.len() > self.max_identities {
            histories.shift_remove_index(0);
        }
    }

    /// Forget one identity's history.
    pub async fn clear(&self, identity: &str) {
        self.histories.write().await.shift_remove(identity);
    }

    /// Forget every history.
    pub async fn clear_all(&self) {
        self.histories.write().await.clear();
    }

    /// Number of tracked identities.
    pub async fn identity_count(&self) -> usize {
        self.histories.read().await.len()
    }
}
