//! In-memory calendar for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CalendarError, Result};
use crate::event::{CalendarEvent, EventStart, NewEvent};
use crate::CalendarService;

/// Calendar whose events are set directly by the caller.
///
/// `list_upcoming` returns every stored event for the account regardless of
/// `days_ahead`; callers filter by their own clock.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: RwLock<HashMap<String, Vec<CalendarEvent>>>,
    failing: RwLock<HashSet<String>>,
    next_id: AtomicUsize,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an account's events.
    pub async fn set_events(&self, account: &str, events: Vec<CalendarEvent>) {
        self.events.write().await.insert(account.to_string(), events);
    }

    /// Make calls for `account` fail.
    pub async fn fail_account(&self, account: &str) {
        self.failing.write().await.insert(account.to_string());
    }

    pub async fn events(&self, account: &str) -> Vec<CalendarEvent> {
        self.events
            .read()
            .await
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    async fn check(&self, account: &str) -> Result<()> {
        if self.failing.read().await.contains(account) {
            return Err(CalendarError::Unavailable(format!("account {account} is failing")));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarService for MemoryCalendar {
    async fn list_upcoming(&self, account: &str, _days_ahead: u32) -> Result<Vec<CalendarEvent>> {
        self.check(account).await?;
        Ok(self.events(account).await)
    }

    async fn create_event(&self, account: &str, event: &NewEvent) -> Result<String> {
        self.check(account).await?;
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        let stored = CalendarEvent {
            id: id.clone(),
            start: EventStart::At(event.start),
            summary: event.summary.clone(),
            location: event.location.clone(),
        };
        self.events
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }
}
