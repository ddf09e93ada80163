//! Reminder scheduling with timed nudges and call escalation.
//!
//! Every reminder gets two deferred actions at creation: a nudge and an
//! escalation. Both are cancelled when the reminder is marked done, and both
//! re-check `done` when they fire. The escalation sends a warning, waits a
//! grace period, checks again, then places a call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use database::SheetStore;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{AwakeWindow, Clock};
use crate::config::EngineConfig;
use crate::records::{append_logged, win_row, WINS_COLUMNS, WINS_SHEET};
use crate::sender::{say_markup, MessageSender};

pub const REMINDERS_SHEET: &str = "Reminders";
pub const REMINDERS_COLUMNS: &str = "A:F";
pub const REMINDER_LOG_SHEET: &str = "ReminderLog";
pub const REMINDER_LOG_COLUMNS: &str = "A:D";

/// A pending or completed reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub id: String,
    /// Who asked; nudges and calls go here.
    pub identity: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Only ever goes from false to true.
    pub done: bool,
    pub nudge_count: u32,
}

/// When and how reminders escalate.
#[derive(Debug, Clone)]
pub struct ReminderPolicy {
    pub nudge_after: Duration,
    pub escalate_after: Duration,
    pub grace: Duration,
    pub awake: AwakeWindow,
    pub caller_id: String,
}

impl From<&EngineConfig> for ReminderPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            nudge_after: config.nudge_after,
            escalate_after: config.escalate_after,
            grace: config.escalation_grace,
            awake: config.awake,
            caller_id: config.caller_id.clone(),
        }
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Nudge,
    Escalate,
}

struct Entry {
    reminder: Reminder,
    cancel: CancellationToken,
}

struct Shared {
    /// Insertion order is creation order.
    reminders: RwLock<IndexMap<String, Entry>>,
    store: Arc<dyn SheetStore>,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
    root: CancellationToken,
    sequence: AtomicU64,
    /// Completion signal of the most recently queued store write.
    write_tail: Mutex<Option<oneshot::Receiver<()>>>,
}

/// Creates reminders and drives their nudges and escalations.
#[derive(Clone)]
pub struct ReminderScheduler {
    shared: Arc<Shared>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn SheetStore>,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
        policy: ReminderPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                reminders: RwLock::new(IndexMap::new()),
                store,
                sender,
                clock,
                policy,
                root: CancellationToken::new(),
                sequence: AtomicU64::new(0),
                write_tail: Mutex::new(None),
            }),
        }
    }

    /// Create a reminder and schedule its nudge and escalation.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn create(&self, identity: &str, text: &str) -> String {
        let shared = &self.shared;
        let now = shared.clock.now();
        let sequence = shared.sequence.fetch_add(1, Ordering::SeqCst);
        let id = format!("r{}-{}", now.timestamp_millis(), sequence);
        let cancel = shared.root.child_token();
        let started = Instant::now();

        let reminder = Reminder {
            id: id.clone(),
            identity: identity.to_string(),
            text: text.to_string(),
            created_at: now,
            done: false,
            nudge_count: 0,
        };
        // Queued before the reminder is visible, so any completion queues after it.
        let row = vec![
            id.clone(),
            identity.to_string(),
            text.to_string(),
            now.to_rfc3339(),
            "pending".to_string(),
            "0".to_string(),
        ];
        let persist = shared.clone();
        shared
            .queue_write(async move {
                append_logged(persist.store.as_ref(), REMINDERS_SHEET, REMINDERS_COLUMNS, row).await;
            })
            .await;

        shared.reminders.write().await.insert(
            id.clone(),
            Entry {
                reminder,
                cancel: cancel.clone(),
            },
        );
        info!(reminder_id = %id, identity, "Reminder created: {}", text);

        self.schedule(&id, started + shared.policy.nudge_after, cancel.clone(), Stage::Nudge);
        self.schedule(&id, started + shared.policy.escalate_after, cancel, Stage::Escalate);
        id
    }

    fn schedule(&self, id: &str, at: Instant, cancel: CancellationToken, stage: Stage) {
        let shared = self.shared.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(reminder_id = %id, "{:?} cancelled", stage);
                }
                _ = tokio::time::sleep_until(at) => match stage {
                    Stage::Nudge => shared.nudge(&id).await,
                    Stage::Escalate => shared.escalate(&id, &cancel).await,
                },
            }
        });
    }

    /// Mark every pending reminder whose text contains `match_text` as done.
    ///
    /// Matching is case-insensitive and spans all identities. Returns how many
    /// reminders this call completed; already-done reminders never count.
    pub async fn mark_done(&self, identity: &str, match_text: &str) -> usize {
        let needle = match_text.trim().to_lowercase();
        if needle.is_empty() {
            return 0;
        }

        let cleared: Vec<Reminder> = {
            let mut reminders = self.shared.reminders.write().await;
            reminders
                .values_mut()
                .filter(|e| !e.reminder.done && e.reminder.text.to_lowercase().contains(&needle))
                .map(|e| {
                    e.reminder.done = true;
                    e.cancel.cancel();
                    e.reminder.clone()
                })
                .collect()
        };

        let count = cleared.len();
        info!(identity, cleared = count, "Marked reminders done for {:?}", needle);

        if count > 0 {
            let shared = self.shared.clone();
            self.shared
                .queue_write(async move {
                    for reminder in cleared {
                        shared.record_completion(&reminder).await;
                    }
                })
                .await;
        }
        count
    }

    /// An identity's pending reminders, oldest first.
    pub async fn pending_for(&self, identity: &str) -> Vec<Reminder> {
        self.shared
            .reminders
            .read()
            .await
            .values()
            .filter(|e| !e.reminder.done && e.reminder.identity == identity)
            .map(|e| e.reminder.clone())
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Reminder> {
        self.shared
            .reminders
            .read()
            .await
            .get(id)
            .map(|e| e.reminder.clone())
    }

    pub async fn pending_count(&self) -> usize {
        self.shared
            .reminders
            .read()
            .await
            .values()
            .filter(|e| !e.reminder.done)
            .count()
    }

    /// Cancel every outstanding nudge and escalation.
    pub fn shutdown(&self) {
        info!("Cancelling scheduled reminder actions");
        self.shared.root.cancel();
    }
}

impl Shared {
    /// Run a store write in the background after every previously queued one.
    ///
    /// A completion can then never overtake the append of its pending row.
    async fn queue_write<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.write_tail.lock().await.replace(done_rx);
        tokio::spawn(async move {
            if let Some(previous) = previous {
                // An error only means the earlier write's task went away.
                let _ = previous.await;
            }
            write.await;
            let _ = done_tx.send(());
        });
    }

    /// Clone of the reminder if it is still pending.
    async fn pending(&self, id: &str) -> Option<Reminder> {
        self.reminders
            .read()
            .await
            .get(id)
            .filter(|e| !e.reminder.done)
            .map(|e| e.reminder.clone())
    }

    fn awake_now(&self, id: &str, stage: Stage) -> bool {
        let now = self.clock.now();
        let awake = self.policy.awake.contains(now);
        if !awake {
            debug!(reminder_id = %id, "{:?} skipped during quiet hours ({})", stage, now);
        }
        awake
    }

    async fn nudge(&self, id: &str) {
        let reminder = {
            let mut reminders = self.reminders.write().await;
            let Some(entry) = reminders.get_mut(id) else {
                return;
            };
            if entry.reminder.done || !self.awake_now(id, Stage::Nudge) {
                return;
            }
            entry.reminder.nudge_count += 1;
            entry.reminder.clone()
        };

        let text = format!(
            "Reminder: {}. Reply \"done {}\" when it's finished.",
            reminder.text, reminder.text
        );
        self.deliver(&reminder, &text).await;
    }

    async fn escalate(&self, id: &str, cancel: &CancellationToken) {
        let Some(reminder) = self.pending(id).await else {
            return;
        };
        if !self.awake_now(id, Stage::Escalate) {
            return;
        }

        let warning = format!(
            "Still not done after {} hours: {}. I'll call you in a minute unless you reply \"done {}\".",
            self.policy.escalate_after.as_secs() / 3600,
            reminder.text,
            reminder.text
        );
        self.deliver(&reminder, &warning).await;

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(reminder_id = %id, "Call cancelled during grace period");
                return;
            }
            _ = tokio::time::sleep(self.policy.grace) => {}
        }

        let Some(reminder) = self.pending(id).await else {
            return;
        };
        let markup = say_markup(&format!(
            "Hi, this is your assistant. You still need to {}. Text me done when it is finished.",
            reminder.text
        ));

        info!(reminder_id = %id, "Escalating reminder to a call");
        if let Err(e) = self
            .sender
            .place_call(&reminder.identity, &self.policy.caller_id, &markup)
            .await
        {
            warn!(reminder_id = %id, "Failed to place reminder call: {}", e);
        }
    }

    async fn deliver(&self, reminder: &Reminder, text: &str) {
        if let Err(e) = self.sender.send_message(&reminder.identity, text).await {
            warn!(reminder_id = %reminder.id, "Failed to send reminder message: {}", e);
        }
    }

    /// Log completion, add a win and flip the stored row to done.
    async fn record_completion(&self, reminder: &Reminder) {
        let now = self.clock.now();
        let date = now
            .with_timezone(&self.policy.awake.timezone)
            .format("%Y-%m-%d")
            .to_string();

        let log_row = vec![
            reminder.id.clone(),
            reminder.text.clone(),
            now.to_rfc3339(),
            "done".to_string(),
        ];
        append_logged(self.store.as_ref(), REMINDER_LOG_SHEET, REMINDER_LOG_COLUMNS, log_row).await;

        let win = win_row(&date, &reminder.identity, "reminder", &reminder.text);
        append_logged(self.store.as_ref(), WINS_SHEET, WINS_COLUMNS, win).await;

        if let Err(e) = self.update_stored_status(reminder).await {
            warn!(reminder_id = %reminder.id, "Failed to update reminder row: {}", e);
        }
    }

    async fn update_stored_status(&self, reminder: &Reminder) -> database::Result<()> {
        let ids = self.store.read_range(REMINDERS_SHEET, "A:A").await?;
        let Some(index) = ids
            .iter()
            .position(|row| row.first().map(String::as_str) == Some(reminder.id.as_str()))
        else {
            debug!(reminder_id = %reminder.id, "No stored row to update");
            return Ok(());
        };

        let row = index + 1;
        self.store
            .update_range(
                REMINDERS_SHEET,
                &format!("E{row}:F{row}"),
                vec![vec!["done".to_string(), reminder.nudge_count.to_string()]],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use crate::sender::RecordingSender;
    use chrono::TimeZone;
    use database::MemorySheetStore;

    const HOUR: Duration = Duration::from_secs(3600);

    struct Harness {
        scheduler: ReminderScheduler,
        sender: Arc<RecordingSender>,
        store: Arc<MemorySheetStore>,
    }

    fn harness(start_hour: u32) -> Harness {
        let store = Arc::new(MemorySheetStore::new());
        let sender = Arc::new(RecordingSender::new());
        let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 5, start_hour, 0, 0).unwrap());
        let policy = ReminderPolicy {
            awake: AwakeWindow::new(7, 23, chrono_tz::UTC),
            ..ReminderPolicy::default()
        };
        let scheduler = ReminderScheduler::new(store.clone(), sender.clone(), Arc::new(clock), policy);
        Harness {
            scheduler,
            sender,
            store,
        }
    }

    /// Let spawned tasks run without moving the clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_persists_pending_row() {
        let h = harness(9);
        let id = h.scheduler.create("+1555", "call dentist").await;
        settle().await;

        let rows = h.store.rows(REMINDERS_SHEET).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], id);
        assert_eq!(&rows[0][1..3], ["+1555", "call dentist"]);
        assert_eq!(&rows[0][4..], ["pending", "0"]);
        assert_eq!(h.scheduler.pending_for("+1555").await.len(), 1);
        assert!(h.scheduler.pending_for("+1999").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nudge_only_after_delay() {
        let h = harness(9);
        let id = h.scheduler.create("+1555", "call dentist").await;

        tokio::time::advance(HOUR * 4).await;
        settle().await;
        assert!(h.sender.messages().await.is_empty());

        tokio::time::advance(HOUR).await;
        settle().await;
        let messages = h.sender.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "+1555");
        assert!(messages[0].1.contains("call dentist"));
        assert_eq!(h.scheduler.get(&id).await.unwrap().nudge_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_before_fire_suppresses_everything() {
        let h = harness(9);
        let id = h.scheduler.create("+1555", "Call Dentist").await;

        tokio::time::advance(HOUR).await;
        assert_eq!(h.scheduler.mark_done("+1555", "dentist").await, 1);

        tokio::time::advance(HOUR * 11).await;
        settle().await;
        assert!(h.sender.deliveries().await.is_empty());
        assert!(h.scheduler.get(&id).await.unwrap().done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_during_grace_cancels_call() {
        let h = harness(9);
        h.scheduler.create("+1555", "file taxes").await;

        tokio::time::advance(HOUR * 10).await;
        settle().await;
        assert_eq!(h.sender.messages().await.len(), 2);

        tokio::time::advance(Duration::from_secs(30)).await;
        h.scheduler.mark_done("+1555", "taxes").await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert!(h.sender.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_done_is_monotonic_and_global() {
        let h = harness(9);
        h.scheduler.create("+1555", "buy milk").await;
        h.scheduler.create("+1999", "buy MILK and eggs").await;
        h.scheduler.create("+1555", "walk dog").await;

        assert_eq!(h.scheduler.mark_done("+1555", "milk").await, 2);
        assert_eq!(h.scheduler.mark_done("+1555", "milk").await, 0);
        assert_eq!(h.scheduler.mark_done("+1555", "   ").await, 0);
        assert_eq!(h.scheduler.pending_count().await, 1);
        assert!(h.scheduler.pending_for("+1999").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_is_persisted() {
        let h = harness(9);
        let id = h.scheduler.create("+1555", "call dentist").await;
        settle().await;

        h.scheduler.mark_done("+1555", "dentist").await;
        settle().await;

        let log = h.store.rows(REMINDER_LOG_SHEET).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0][0], id);
        assert_eq!(log[0][3], "done");

        let wins = h.store.rows(WINS_SHEET).await;
        assert_eq!(wins[0], vec!["2026-01-05", "+1555", "reminder", "call dentist"]);

        let stored = h.store.rows(REMINDERS_SHEET).await;
        assert_eq!(&stored[0][4..], ["done", "0"]);
    }

    /// Store whose `Reminders` appends take a while to land.
    struct SlowReminderAppends {
        inner: MemorySheetStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl SheetStore for SlowReminderAppends {
        async fn read_range(&self, sheet: &str, range: &str) -> database::Result<Vec<Vec<String>>> {
            self.inner.read_range(sheet, range).await
        }

        async fn append_row(&self, sheet: &str, columns: &str, row: Vec<String>) -> database::Result<()> {
            if sheet == REMINDERS_SHEET {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.append_row(sheet, columns, row).await
        }

        async fn update_range(&self, sheet: &str, range: &str, rows: Vec<Vec<String>>) -> database::Result<()> {
            self.inner.update_range(sheet, range, rows).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_before_pending_row_lands_still_marks_it_done() {
        let store = Arc::new(SlowReminderAppends {
            inner: MemorySheetStore::new(),
            delay: Duration::from_secs(5),
        });
        let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap());
        let scheduler = ReminderScheduler::new(
            store.clone(),
            Arc::new(RecordingSender::new()),
            Arc::new(clock),
            ReminderPolicy::default(),
        );

        let id = scheduler.create("+1555", "call dentist").await;
        assert_eq!(scheduler.mark_done("+1555", "dentist").await, 1);
        settle().await;
        assert!(store.inner.rows(REMINDERS_SHEET).await.is_empty());

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;

        let stored = store.inner.rows(REMINDERS_SHEET).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0][0], id);
        assert_eq!(&stored[0][4..], ["done", "0"]);
        assert_eq!(store.inner.rows(REMINDER_LOG_SHEET).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_hours_skip_without_deferral() {
        let h = harness(20);
        h.scheduler.create("+1555", "call dentist").await;

        // 01:00 and 06:00 are both outside 07-23.
        tokio::time::advance(HOUR * 10).await;
        settle().await;
        tokio::time::advance(HOUR * 12).await;
        settle().await;

        assert!(h.sender.deliveries().await.is_empty());
        assert_eq!(h.scheduler.pending_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_actions() {
        let h = harness(9);
        h.scheduler.create("+1555", "call dentist").await;
        h.scheduler.shutdown();

        tokio::time::advance(HOUR * 11).await;
        settle().await;
        assert!(h.sender.deliveries().await.is_empty());
    }
}
