//! Calendar event types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// When an event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStart {
    /// A concrete instant.
    At(DateTime<Utc>),
    /// An all-day event on a date, with no actionable start time.
    AllDay(NaiveDate),
}

impl EventStart {
    /// The concrete start instant, if the event has one.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            EventStart::At(at) => Some(*at),
            EventStart::AllDay(_) => None,
        }
    }
}

/// An upcoming calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub start: EventStart,
    pub summary: String,
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Create a timed event.
    pub fn timed(id: impl Into<String>, start: DateTime<Utc>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: EventStart::At(start),
            summary: summary.into(),
            location: None,
        }
    }

    /// Create an all-day event.
    pub fn all_day(id: impl Into<String>, date: NaiveDate, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: EventStart::AllDay(date),
            summary: summary.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventStart::AllDay(_))
    }
}

/// A request to create a timed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
}
