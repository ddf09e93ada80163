//! Periodic calendar poll that alerts once per upcoming event.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use calendar::{CalendarEvent, CalendarService};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::sender::{say_markup, MessageSender};

/// Alert key: the same event at a new start time is a new key.
type AlertKey = (String, DateTime<Utc>);

/// Lead-time band and dedup bounds for the watcher.
#[derive(Debug, Clone)]
pub struct WatchPolicy {
    pub alert_min_minutes: i64,
    pub alert_max_minutes: i64,
    /// The dedup set is cleared once it grows past this.
    pub dedup_max_entries: usize,
    pub caller_id: String,
}

impl From<&EngineConfig> for WatchPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            alert_min_minutes: config.alert_min_minutes,
            alert_max_minutes: config.alert_max_minutes,
            dedup_max_entries: config.dedup_max_entries,
            caller_id: config.caller_id.clone(),
        }
    }
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Polls linked calendars and sends a message plus a call shortly before each event.
pub struct CalendarWatcher {
    calendar: Arc<dyn CalendarService>,
    accounts: Vec<String>,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
    recipient: String,
    policy: WatchPolicy,
    alerted: Mutex<HashSet<AlertKey>>,
}

impl CalendarWatcher {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        accounts: Vec<String>,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
        recipient: impl Into<String>,
        policy: WatchPolicy,
    ) -> Self {
        Self {
            calendar,
            accounts,
            sender,
            clock,
            recipient: recipient.into(),
            policy,
            alerted: Mutex::new(HashSet::new()),
        }
    }

    /// One poll over every account. Returns the number of alerts raised.
    pub async fn tick(&self) -> usize {
        let mut raised = 0;
        for account in &self.accounts {
            let events = match self.calendar.list_upcoming(account, 1).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Calendar poll failed for {}: {}", account, e);
                    continue;
                }
            };

            for event in events {
                if let Some(minutes) = self.claim(&event).await {
                    self.alert(&event, minutes).await;
                    raised += 1;
                }
            }
        }
        raised
    }

    /// Record the event as alerted if it is due and not seen before.
    async fn claim(&self, event: &CalendarEvent) -> Option<i64> {
        let start = event.start.instant()?;
        let minutes = (start - self.clock.now()).num_seconds() as f64 / 60.0;
        let band = self.policy.alert_min_minutes as f64..=self.policy.alert_max_minutes as f64;
        if !band.contains(&minutes) {
            return None;
        }

        let inserted = self
            .alerted
            .lock()
            .await
            .insert((event.id.clone(), start));
        inserted.then(|| minutes.round() as i64)
    }

    async fn alert(&self, event: &CalendarEvent, minutes: i64) {
        let place = event
            .location
            .as_deref()
            .map(|l| format!(" at {l}"))
            .unwrap_or_default();

        info!("Alerting for {} ({} min)", event.summary, minutes);

        let text = format!("Heads up: {} starts in {} minutes{}.", event.summary, minutes, place);
        if let Err(e) = self.sender.send_message(&self.recipient, &text).await {
            warn!("Failed to send event alert: {}", e);
        }

        let markup = say_markup(&format!(
            "Heads up. {} starts in about {} minutes{}.",
            event.summary, minutes, place
        ));
        if let Err(e) = self
            .sender
            .place_call(&self.recipient, &self.policy.caller_id, &markup)
            .await
        {
            warn!("Failed to place event alert call: {}", e);
        }
    }

    /// Clear the dedup set if it has outgrown its bound.
    pub async fn compact(&self) -> bool {
        let mut alerted = self.alerted.lock().await;
        if alerted.len() > self.policy.dedup_max_entries {
            debug!("Clearing {} alert keys", alerted.len());
            alerted.clear();
            true
        } else {
            false
        }
    }

    pub async fn alerted_count(&self) -> usize {
        self.alerted.lock().await.len()
    }

    /// Run the poll and compaction timers until `shutdown` is cancelled.
    pub fn spawn(
        self: Arc<Self>,
        poll_every: Duration,
        compact_every: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut poll = tokio::time::interval(poll_every);
            let mut compact = tokio::time::interval(compact_every);
            poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            compact.tick().await;

            info!(
                "Calendar watcher running ({} accounts, every {:?})",
                self.accounts.len(),
                poll_every
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Calendar watcher stopped");
                        break;
                    }
                    _ = poll.tick() => {
                        let raised = self.tick().await;
                        if raised > 0 {
                            debug!("Raised {} calendar alerts", raised);
                        }
                    }
                    _ = compact.tick() => {
                        self.compact().await;
                    }
                }
            }
        })
    }
}
