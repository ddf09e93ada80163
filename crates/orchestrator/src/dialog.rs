//! Guided dialogs: per-identity scripted data collection.
//!
//! Each identity has at most one active session. A session walks a fixed
//! script, storing each inbound message verbatim as the current step's value.
//! After the last step the collected fields are handed back as a
//! [`CompletedDialog`] and the session is gone.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// One scripted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Field name the answer is stored under.
    pub field: &'static str,
    /// Question shown before the answer is collected.
    pub prompt: &'static str,
}

const fn step(field: &'static str, prompt: &'static str) -> Step {
    Step { field, prompt }
}

const EVENT_SCRIPT: &[Step] = &[
    step("name", "What's the event called?"),
    step("date", "What date? (YYYY-MM-DD or MM/DD)"),
    step("time", "What time does it start? (e.g. 14:30 or 2:30pm)"),
    step("duration", "How long, in minutes?"),
    step("location", "Where is it?"),
];

const GYM_SCRIPT: &[Step] = &[
    step("muscles", "What muscles did you train?"),
    step("duration", "How long was the session, in minutes?"),
    step("energy", "Energy level, 1-10?"),
];

const HABIT_SCRIPT: &[Step] = &[
    step("sleep", "How many hours did you sleep?"),
    step("water", "Glasses of water?"),
    step("meditation", "Minutes of meditation?"),
    step("reading", "Pages or minutes read?"),
    step("exercise", "Any exercise? What and how long?"),
    step("mood", "Overall mood, 1-10?"),
];

const CHECKIN_SCRIPT: &[Step] = &[
    step("mood", "How's your mood right now, 1-10?"),
    step("energy", "Energy, 1-10?"),
    step("focus", "What's your focus today?"),
    step("gratitude", "One thing you're grateful for?"),
    step("intention", "Your intention for the rest of the day?"),
];

const DATING_SCRIPT: &[Step] = &[
    step("name", "Who did you go out with?"),
    step("venue", "Where did you go?"),
    step("vibe", "Vibe, 1-10?"),
    step("highlights", "Highlights?"),
    step("red_flags", "Any red flags?"),
    step("next_step", "Next step?"),
    step("notes", "Anything else worth remembering?"),
];

const DAILY_QUESTIONS_SCRIPT: &[Step] = &[
    step("wins", "What were your wins today?"),
    step("challenges", "What challenged you?"),
    step("lessons", "What did you learn?"),
    step("gratitude", "What are you grateful for?"),
    step("proud", "What are you proud of?"),
    step("improve", "What would you do differently?"),
    step("tomorrow", "Top priority for tomorrow?"),
    step("energy", "Energy today, 1-10?"),
    step("mood", "Mood today, 1-10?"),
];

/// The kinds of guided dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogKind {
    EventBuilder,
    GymLog,
    HabitLog,
    DailyCheckin,
    DatingLog,
    DailyQuestions,
}

impl DialogKind {
    pub const ALL: [DialogKind; 6] = [
        DialogKind::EventBuilder,
        DialogKind::GymLog,
        DialogKind::HabitLog,
        DialogKind::DailyCheckin,
        DialogKind::DatingLog,
        DialogKind::DailyQuestions,
    ];

    /// Normalized phrases that start this dialog.
    pub fn triggers(self) -> &'static [&'static str] {
        match self {
            DialogKind::EventBuilder => &["create event", "new event", "add event", "schedule event"],
            DialogKind::GymLog => &["gym", "workout", "log gym"],
            DialogKind::HabitLog => &["habits", "log habits", "habit log"],
            DialogKind::DailyCheckin => &["check in", "checkin", "check-in"],
            DialogKind::DatingLog => &["dating", "date log", "log date"],
            DialogKind::DailyQuestions => &["daily questions", "journal", "daily review"],
        }
    }

    pub fn script(self) -> &'static [Step] {
        match self {
            DialogKind::EventBuilder => EVENT_SCRIPT,
            DialogKind::GymLog => GYM_SCRIPT,
            DialogKind::HabitLog => HABIT_SCRIPT,
            DialogKind::DailyCheckin => CHECKIN_SCRIPT,
            DialogKind::DatingLog => DATING_SCRIPT,
            DialogKind::DailyQuestions => DAILY_QUESTIONS_SCRIPT,
        }
    }

    /// Sheet the completed record is appended to.
    pub fn sheet(self) -> &'static str {
        match self {
            DialogKind::EventBuilder => "Events",
            DialogKind::GymLog => "Gym",
            DialogKind::HabitLog => "Habits",
            DialogKind::DailyCheckin => "Checkins",
            DialogKind::DatingLog => "Dating",
            DialogKind::DailyQuestions => "DailyQuestions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DialogKind::EventBuilder => "event",
            DialogKind::GymLog => "gym log",
            DialogKind::HabitLog => "habit log",
            DialogKind::DailyCheckin => "check-in",
            DialogKind::DatingLog => "dating log",
            DialogKind::DailyQuestions => "daily questions",
        }
    }

    fn intro(self) -> &'static str {
        match self {
            DialogKind::EventBuilder => "Let's create an event.",
            DialogKind::GymLog => "Logging a workout.",
            DialogKind::HabitLog => "Habit log time.",
            DialogKind::DailyCheckin => "Quick check-in.",
            DialogKind::DatingLog => "Logging a date.",
            DialogKind::DailyQuestions => "Daily questions. Nine quick ones.",
        }
    }

    /// The kind whose trigger matches `text` exactly after normalization.
    pub fn from_trigger(text: &str) -> Option<Self> {
        let normalized = normalize(text);
        Self::ALL
            .into_iter()
            .find(|kind| kind.triggers().contains(&normalized.as_str()))
    }
}

/// Lowercase, trim and drop trailing punctuation.
pub fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .trim()
        .to_lowercase()
}

/// An in-progress dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSession {
    pub kind: DialogKind,
    pub step_index: usize,
    /// Answers so far, in script order.
    pub fields: IndexMap<String, String>,
}

impl DialogSession {
    fn new(kind: DialogKind) -> Self {
        Self {
            kind,
            step_index: 0,
            fields: IndexMap::new(),
        }
    }
}

/// A finished dialog, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDialog {
    pub identity: String,
    pub kind: DialogKind,
    pub fields: IndexMap<String, String>,
}

impl CompletedDialog {
    /// Value of a field, empty when missing.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Field values in script order.
    pub fn values(&self) -> Vec<String> {
        self.fields.values().cloned().collect()
    }
}

/// Result of feeding one message into an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Answer stored; ask the next question.
    Next { prompt: &'static str },
    /// Last answer stored; the session has ended.
    Complete(CompletedDialog),
}

/// All active sessions, keyed by identity.
#[derive(Debug, Default)]
pub struct DialogSessionStore {
    sessions: RwLock<HashMap<String, DialogSession>>,
}

impl DialogSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a session, returning the opening prompt.
    ///
    /// Any existing session for the identity is discarded.
    pub async fn start(&self, identity: &str, kind: DialogKind) -> String {
        let previous = self
            .sessions
            .write()
            .await
            .insert(identity.to_string(), DialogSession::new(kind));

        if let Some(previous) = previous {
            debug!(
                "Discarding {:?} session at step {} for {}",
                previous.kind, previous.step_index, identity
            );
        }

        let first = kind.script()[0].prompt;
        format!("{} {}", kind.intro(), first)
    }

    pub async fn active_kind(&self, identity: &str) -> Option<DialogKind> {
        self.sessions.read().await.get(identity).map(|s| s.kind)
    }

    pub async fn session(&self, identity: &str) -> Option<DialogSession> {
        self.sessions.read().await.get(identity).cloned()
    }

    /// Store `text` as the current step's answer.
    ///
    /// Returns `None` when the identity has no session.
    pub async fn advance(&self, identity: &str, text: &str) -> Option<Advance> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(identity)?;

        let script = session.kind.script();
        let Some(step) = script.get(session.step_index) else {
            sessions.remove(identity);
            return None;
        };
        session.fields.insert(step.field.to_string(), text.to_string());
        session.step_index += 1;

        if let Some(next) = script.get(session.step_index) {
            return Some(Advance::Next { prompt: next.prompt });
        }

        let finished = sessions.remove(identity)?;
        Some(Advance::Complete(CompletedDialog {
            identity: identity.to_string(),
            kind: finished.kind,
            fields: finished.fields,
        }))
    }

    /// Drop an identity's session, if any.
    pub async fn abandon(&self, identity: &str) -> bool {
        self.sessions.write().await.remove(identity).is_some()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
