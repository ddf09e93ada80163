//! End-to-end behavior of the engine with in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use calendar::{CalendarEvent, MemoryCalendar};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use database::{MemorySheetStore, SheetStore, SqliteSheetStore};
use futures::future::join_all;
use mock_brain::{DelayedBrain, EchoBrain, ScriptedBrain};
use orchestrator::{
    CalendarWatcher, Clock, DialogKind, EngineConfig, Orchestrator, RecordingSender, TokioClock, WatchPolicy,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const HOUR: Duration = Duration::from_secs(3600);
const OWNER: &str = "+15550100";

struct Setup {
    orchestrator: Arc<Orchestrator>,
    store: Arc<MemorySheetStore>,
    sender: Arc<RecordingSender>,
}

/// Engine with the default New York awake window, starting at `start` UTC.
fn setup(brain: Arc<dyn mock_brain::Brain>, start: DateTime<Utc>) -> Setup {
    let store = Arc::new(MemorySheetStore::new());
    let sender = Arc::new(RecordingSender::new());
    let orchestrator = Orchestrator::builder(brain, store.clone(), sender.clone())
        .clock(Arc::new(TokioClock::starting_at(start)))
        .config(EngineConfig::default())
        .build();
    Setup {
        orchestrator: Arc::new(orchestrator),
        store,
        sender,
    }
}

/// 09:00 in New York on 2026-01-05.
fn nine_am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap()
}

/// Let spawned tasks run without moving the clock.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn gym_dialog_end_to_end() {
    let brain = Arc::new(ScriptedBrain::constant("Hello there"));
    let s = setup(brain.clone(), nine_am());
    let orch = &s.orchestrator;

    assert!(orch.handle_inbound(OWNER, "gym").await.contains("What muscles did you train?"));
    assert_eq!(orch.handle_inbound(OWNER, "chest").await, "How long was the session, in minutes?");
    assert_eq!(orch.handle_inbound(OWNER, "45").await, "Energy level, 1-10?");
    assert!(orch.handle_inbound(OWNER, "8").await.contains("gym log is saved"));
    settle().await;

    assert_eq!(
        s.store.rows("Gym").await,
        vec![vec!["2026-01-05", OWNER, "chest", "45", "8"]]
    );
    assert_eq!(
        s.store.rows("Wins").await,
        vec![vec!["2026-01-05", OWNER, "gym log", "Workout: chest (45 min)"]]
    );

    // The next message is ordinary conversation, not a fourth step.
    assert_eq!(orch.handle_inbound(OWNER, "thanks").await, "Hello there");
    assert_eq!(brain.call_count().await, 1);
    assert_eq!(orch.sessions().active_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_leave_the_second_kind_active() {
    let s = setup(Arc::new(EchoBrain::new()), nine_am());
    let orch = &s.orchestrator;

    let replies = join_all([orch.handle_inbound(OWNER, "gym"), orch.handle_inbound(OWNER, "dating")]).await;
    assert!(replies[1].contains("Who did you go out with?"));

    let session = orch.sessions().session(OWNER).await.unwrap();
    assert_eq!(session.kind, DialogKind::DatingLog);
    assert_eq!(session.step_index, 0);
    assert_eq!(orch.sessions().active_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn burst_for_one_identity_is_handled_in_arrival_order() {
    let brain = Arc::new(DelayedBrain::with_millis(EchoBrain::new(), 500));
    let s = setup(brain, nine_am());
    let orch = &s.orchestrator;
    let started = Instant::now();

    let timed = |identity: &'static str, text: &'static str| async move {
        let reply = orch.handle_inbound(identity, text).await;
        (reply, started.elapsed())
    };

    // The slow chat reply holds the lane while the rest queue behind it.
    let results = join_all([
        timed(OWNER, "hello"),
        timed(OWNER, "gym"),
        timed(OWNER, "shoulders"),
        timed(OWNER, "30"),
        timed(OWNER, "7"),
        timed("+15550199", "help"),
    ])
    .await;

    assert_eq!(results[0].0, "hello");
    assert!(results[4].0.contains("saved"));
    // Another identity is not held up by the slow reply.
    assert!(results[5].1 < Duration::from_millis(500));
    assert!(results[0].1 >= Duration::from_millis(500));

    settle().await;
    assert_eq!(
        s.store.rows("Gym").await,
        vec![vec!["2026-01-05", OWNER, "shoulders", "30", "7"]]
    );
}

#[tokio::test(start_paused = true)]
async fn reminder_nudges_then_escalates_to_a_call() {
    let s = setup(Arc::new(EchoBrain::new()), nine_am());
    let orch = &s.orchestrator;

    orch.handle_inbound(OWNER, "remind me to call dentist").await;

    // 14:00: one nudge.
    tokio::time::advance(HOUR * 5).await;
    settle().await;
    let messages = s.sender.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("call dentist"));

    // 19:00: warning, then a call after the grace period.
    tokio::time::advance(HOUR * 5).await;
    settle().await;
    assert_eq!(s.sender.messages().await.len(), 2);
    assert!(s.sender.calls().await.is_empty());

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    let calls = s.sender.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, OWNER);
    assert!(calls[0].1.contains("call dentist"));
    assert!(calls[0].1.starts_with("<Response><Say>"));
}

#[tokio::test(start_paused = true)]
async fn reminder_created_late_is_not_nudged_overnight() {
    // 20:00 in New York.
    let s = setup(Arc::new(EchoBrain::new()), Utc.with_ymd_and_hms(2026, 1, 6, 1, 0, 0).unwrap());
    let orch = &s.orchestrator;

    orch.handle_inbound(OWNER, "remind me to call dentist").await;

    // 01:00 and 06:00 local: both quiet.
    tokio::time::advance(HOUR * 5).await;
    settle().await;
    tokio::time::advance(HOUR * 5 + Duration::from_secs(120)).await;
    settle().await;

    assert!(s.sender.deliveries().await.is_empty());
    assert_eq!(orch.reminders().pending_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn done_before_fire_time_suppresses_all_sends() {
    let s = setup(Arc::new(EchoBrain::new()), nine_am());
    let orch = &s.orchestrator;

    orch.handle_inbound(OWNER, "remind me to pay rent").await;
    tokio::time::advance(HOUR * 4).await;

    assert_eq!(orch.handle_inbound(OWNER, "done rent").await, "Nice work! Marked 1 reminder done.");
    assert_eq!(orch.handle_inbound(OWNER, "did rent").await, "Nothing matched \"rent\".");

    tokio::time::advance(HOUR * 7).await;
    settle().await;
    assert!(s.sender.deliveries().await.is_empty());

    let log = s.store.rows("ReminderLog").await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0][1], "pay rent");
}

#[tokio::test(start_paused = true)]
async fn context_is_reused_within_ttl_and_rebuilt_after() {
    let s = setup(Arc::new(EchoBrain::new()), nine_am());
    let context = s.orchestrator.context();
    s.store
        .seed("Goals", vec![vec!["Read 20 books".into(), "growth".into(), "2026".into()]])
        .await;

    let first = context.get_context().await;
    let reads = s.store.read_count();
    assert!(first.contains("Read 20 books"));

    tokio::time::advance(Duration::from_secs(9 * 60)).await;
    s.store
        .seed("Goals", vec![vec!["Run a marathon".into(), "fitness".into(), "2026".into()]])
        .await;
    assert_eq!(context.get_context().await, first);
    assert_eq!(s.store.read_count(), reads);

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    let rebuilt = context.get_context().await;
    assert!(rebuilt.contains("Run a marathon"));
    assert_eq!(s.store.read_count(), reads * 2);
}

#[tokio::test(start_paused = true)]
async fn calendar_watcher_alerts_once_and_again_after_reschedule() {
    let clock = Arc::new(TokioClock::starting_at(nine_am()));
    let calendar = Arc::new(MemoryCalendar::new());
    let sender = Arc::new(RecordingSender::new());
    let watcher = Arc::new(CalendarWatcher::new(
        calendar.clone(),
        vec!["personal".to_string()],
        sender.clone(),
        clock.clone(),
        OWNER,
        WatchPolicy::default(),
    ));

    let start = clock.now() + ChronoDuration::minutes(25);
    calendar
        .set_events(
            "personal",
            vec![CalendarEvent::timed("evt-1", start, "Dentist").with_location("Main St")],
        )
        .await;

    let shutdown = CancellationToken::new();
    let handle = watcher
        .clone()
        .spawn(Duration::from_secs(120), HOUR, shutdown.clone());

    // Polls at every 2 minutes straddle the 8-12 minute band more than once.
    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(sender.messages().await.len(), 1);
    assert_eq!(sender.calls().await.len(), 1);
    assert!(sender.messages().await[0].1.contains("Dentist"));

    // Moved to later: a new key, so a second alert.
    let moved = clock.now() + ChronoDuration::minutes(20);
    calendar
        .set_events("personal", vec![CalendarEvent::timed("evt-1", moved, "Dentist")])
        .await;
    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(sender.messages().await.len(), 2);
    assert_eq!(sender.calls().await.len(), 2);

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_completions_are_all_stored_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("sheets.db").display());
    let store = Arc::new(SqliteSheetStore::connect(&url).await.unwrap());
    store.migrate().await.unwrap();

    let orch = Arc::new(
        Orchestrator::builder(Arc::new(EchoBrain::new()), store.clone(), Arc::new(RecordingSender::new())).build(),
    );
    let identities: Vec<String> = (0..8).map(|i| format!("+1555010{i}")).collect();

    for step in ["gym", "legs", "50"] {
        join_all(identities.iter().map(|id| orch.handle_inbound(id, step))).await;
    }
    let handles: Vec<_> = identities
        .iter()
        .map(|id| {
            let orch = orch.clone();
            let id = id.clone();
            tokio::spawn(async move { orch.handle_inbound(&id, "9").await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().contains("saved"));
    }

    // Persistence runs in the background; wait for it to land.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let gym = store.read_range("Gym", "A:E").await.unwrap().len();
        let wins = store.read_range("Wins", "A:D").await.unwrap().len();
        if gym == 8 && wins == 8 {
            break;
        }
        assert!(Instant::now() < deadline, "stored {gym} gym rows and {wins} wins of 8");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
