//! Time-bounded cache of the personal-data context block.
//!
//! A miss reads every source in parallel. Sources that fail are left out of
//! the block; the caller always gets a string back.

use std::sync::Arc;
use std::time::Duration;

use calendar::{CalendarService, EventStart};
use chrono::Duration as ChronoDuration;
use chrono_tz::Tz;
use database::SheetStore;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::clock::Clock;

/// One sheet range that feeds the context block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSource {
    pub label: String,
    pub sheet: String,
    pub range: String,
    /// Keep only the most recent rows.
    pub last_rows: Option<usize>,
}

impl ContextSource {
    pub fn new(label: &str, sheet: &str, range: &str, last_rows: Option<usize>) -> Self {
        Self {
            label: label.to_string(),
            sheet: sheet.to_string(),
            range: range.to_string(),
            last_rows,
        }
    }

    /// Goals, recent habits, wins, reminders and check-ins.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("GOALS", "Goals", "A:C", None),
            Self::new("RECENT HABITS", "Habits", "A:I", Some(7)),
            Self::new("RECENT WINS", "Wins", "A:D", Some(10)),
            Self::new("REMINDERS", "Reminders", "A:F", Some(10)),
            Self::new("RECENT CHECK-INS", "Checkins", "A:G", Some(3)),
        ]
    }
}

/// Calendars summarized at the end of the context block.
#[derive(Clone)]
pub struct CalendarDigest {
    pub calendar: Arc<dyn CalendarService>,
    pub accounts: Vec<String>,
    pub clock: Arc<dyn Clock>,
    pub timezone: Tz,
}

impl CalendarDigest {
    /// Next-24-hour events for every account, one line each.
    ///
    /// Accounts that fail are skipped.
    pub async fn summarize(&self) -> String {
        let now = self.clock.now();
        let horizon = now + ChronoDuration::hours(24);
        let mut lines = Vec::new();

        for account in &self.accounts {
            let events = match self.calendar.list_upcoming(account, 1).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Calendar summary skipped for {}: {}", account, e);
                    continue;
                }
            };

            for event in events {
                let line = match event.start {
                    EventStart::At(at) if at >= now && at <= horizon => {
                        format!("- {} {}", at.with_timezone(&self.timezone).format("%a %H:%M"), event.summary)
                    }
                    EventStart::At(_) => continue,
                    EventStart::AllDay(date) => format!("- {} (all day) {}", date.format("%a"), event.summary),
                };
                match &event.location {
                    Some(location) => lines.push(format!("{line} @ {location}")),
                    None => lines.push(line),
                }
            }
        }

        if lines.is_empty() {
            String::new()
        } else {
            format!("[UPCOMING EVENTS]\n{}", lines.join("\n"))
        }
    }
}

/// Single-slot TTL cache over the context sources.
pub struct ContextCache {
    store: Arc<dyn SheetStore>,
    sources: Vec<ContextSource>,
    digest: Option<CalendarDigest>,
    ttl: Duration,
    slot: RwLock<Option<(String, Instant)>>,
}

impl ContextCache {
    pub fn new(store: Arc<dyn SheetStore>, ttl: Duration) -> Self {
        Self {
            store,
            sources: ContextSource::defaults(),
            digest: None,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn with_sources(mut self, sources: Vec<ContextSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_calendar(mut self, digest: CalendarDigest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// The context block, rebuilt when older than the TTL.
    ///
    /// Concurrent callers that miss at the same time each rebuild; the last
    /// write wins.
    pub async fn get_context(&self) -> String {
        if let Some((payload, built)) = self.slot.read().await.as_ref() {
            if built.elapsed() < self.ttl {
                return payload.clone();
            }
        }

        let payload = self.build().await;
        *self.slot.write().await = Some((payload.clone(), Instant::now()));
        payload
    }

    /// Drop the cached block so the next call rebuilds.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    async fn build(&self) -> String {
        let reads = self.sources.iter().map(|source| async move {
            match self.store.read_range(&source.sheet, &source.range).await {
                Ok(rows) => Some(render_section(source, rows)),
                Err(e) => {
                    warn!("Context source {} unavailable: {}", source.label, e);
                    None
                }
            }
        });

        let mut sections: Vec<String> = join_all(reads)
            .await
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(digest) = &self.digest {
            let summary = digest.summarize().await;
            if !summary.is_empty() {
                sections.push(summary);
            }
        }

        debug!("Rebuilt context block ({} sections)", sections.len());
        sections.join("\n\n")
    }
}

fn render_section(source: &ContextSource, rows: Vec<Vec<String>>) -> String {
    let rows: Vec<&Vec<String>> = rows.iter().filter(|r| !r.is_empty()).collect();
    let skip = source
        .last_rows
        .map_or(0, |n| rows.len().saturating_sub(n));

    let body: Vec<String> = rows[skip..].iter().map(|r| r.join(" | ")).collect();
    if body.is_empty() {
        return String::new();
    }
    format!("[{}]\n{}", source.label, body.join("\n"))
}
