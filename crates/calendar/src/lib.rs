//! Calendar read/write access for the assistant.
//!
//! [`CalendarService`] is the narrow interface the engine uses. [`GoogleCalendar`]
//! talks to Google Calendar v3 with bearer tokens from a [`TokenProvider`];
//! [`MemoryCalendar`] is a test double.

pub mod error;
pub mod event;
pub mod google;
pub mod memory;
pub mod token;

pub use error::{CalendarError, Result};
pub use event::{CalendarEvent, EventStart, NewEvent};
pub use google::GoogleCalendar;
pub use memory::MemoryCalendar;
pub use token::{StaticTokenProvider, TokenProvider};

use async_trait::async_trait;

/// List and create events on a linked calendar account.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Events starting within the next `days_ahead` days.
    async fn list_upcoming(&self, account: &str, days_ahead: u32) -> Result<Vec<CalendarEvent>>;

    /// Create a timed event, returning its id.
    async fn create_event(&self, account: &str, event: &NewEvent) -> Result<String>;
}
