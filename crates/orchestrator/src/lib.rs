//! Session and escalation engine for a personal assistant.
//!
//! This crate provides the [`Orchestrator`] type, which handles inbound
//! messages, plus the timer-driven pieces that run beside it.
//!
//! # Components
//!
//! - [`ContextCache`] - TTL-bounded aggregate of personal data for prompts
//! - [`KeywordRouter`] - first-match keyword lookup of supplemental rows
//! - [`DialogSessionStore`] - one guided dialog per identity, one step per message
//! - [`ReminderScheduler`] - reminders with a nudge and a call escalation
//! - [`CalendarWatcher`] - at-most-once alerts shortly before calendar events
//!
//! # Architecture
//!
//! ```text
//! Inbound message (SMS, call transcript, web chat)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Wait for the identity's lane (arrival order)            │
//! │         ↓                                                   │
//! │  2. Active dialog? → store answer, next prompt / complete   │
//! │         ↓                                                   │
//! │  3. Command? → help, start dialog, remind, done, list       │
//! │         ↓                                                   │
//! │  4. Chat: context cache + keyword data + history → brain    │
//! └─────────────────────────────────────────────────────────────┘
//!
//! Timers: calendar watcher poll, dedup compaction, per-reminder
//! nudge and escalation tasks.
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use database::MemorySheetStore;
//! use mock_brain::EchoBrain;
//! use orchestrator::{LoggingSender, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::builder(
//!         Arc::new(EchoBrain::new()),
//!         Arc::new(MemorySheetStore::new()),
//!         Arc::new(LoggingSender),
//!     )
//!     .build();
//!
//!     let reply = orchestrator.handle_inbound("+15550100", "gym").await;
//!     println!("{reply}");
//! }
//! ```

mod calendar_watcher;
mod clock;
mod commands;
mod config;
mod context_cache;
mod dialog;
mod error;
mod keyword_router;
mod orchestrator;
mod records;
mod reminders;
mod sender;

// Public exports
pub use calendar_watcher::{CalendarWatcher, WatchPolicy};
pub use clock::{AwakeWindow, Clock, SystemClock, TokioClock};
pub use commands::Command;
pub use config::{EngineConfig, DEFAULT_SYSTEM_PROMPT};
pub use context_cache::{CalendarDigest, ContextCache, ContextSource};
pub use dialog::{normalize, Advance, CompletedDialog, DialogKind, DialogSession, DialogSessionStore, Step};
pub use error::OrchestratorError;
pub use keyword_router::{KeywordRoute, KeywordRouter};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, FALLBACK_REPLY, HELP_TEXT};
pub use records::{
    event_from_dialog, parse_date, parse_duration_minutes, parse_summary, parse_time, RecordWriter, WINS_COLUMNS,
    WINS_SHEET,
};
pub use reminders::{
    Reminder, ReminderPolicy, ReminderScheduler, REMINDERS_COLUMNS, REMINDERS_SHEET, REMINDER_LOG_COLUMNS,
    REMINDER_LOG_SHEET,
};
pub use sender::{say_markup, sanitize_for_speech, Delivery, LoggingSender, MessageSender, NoOpSender, RecordingSender};

// Re-export commonly used types from dependencies
pub use brain_core::{InboundMessage, OutboundMessage};
