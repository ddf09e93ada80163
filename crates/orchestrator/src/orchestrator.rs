//! Main orchestrator that coordinates inbound message handling.

use std::collections::HashMap;
use std::sync::Arc;

use brain_core::{compose_system_prompt, Brain, ConversationHistory, InboundMessage, OutboundMessage};
use calendar::CalendarService;
use database::SheetStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::commands::Command;
use crate::config::EngineConfig;
use crate::context_cache::{CalendarDigest, ContextCache};
use crate::dialog::{Advance, CompletedDialog, DialogKind, DialogSessionStore};
use crate::keyword_router::KeywordRouter;
use crate::records::RecordWriter;
use crate::reminders::{ReminderPolicy, ReminderScheduler};
use crate::sender::MessageSender;

/// Help text shown when the user asks for help.
pub const HELP_TEXT: &str = "Here's what I can do:

Logs: \"gym\", \"habits\", \"check in\", \"dating\", \"daily questions\", \"create event\"
Reminders: \"remind me to <thing>\", \"done <thing>\", \"reminders\"

Anything else, just ask. I can see your goals, habits, wins and calendar.";

/// Reply used when the brain fails.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble thinking right now. Try again in a moment.";

/// Per-identity FIFO locks so one identity's messages are handled in arrival order.
#[derive(Default)]
struct IdentityLanes {
    lanes: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLanes {
    async fn lane(&self, identity: &str) -> Arc<Mutex<()>> {
        self.lanes
            .lock()
            .await
            .entry(identity.to_string())
            .or_default()
            .clone()
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    brain: Arc<dyn Brain>,
    store: Arc<dyn SheetStore>,
    sender: Arc<dyn MessageSender>,
    calendar: Option<Arc<dyn CalendarService>>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Link a calendar service. Accounts come from the config.
    pub fn calendar(mut self, calendar: Arc<dyn CalendarService>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn build(self) -> Orchestrator {
        let config = self.config;
        let timezone = config.awake.timezone;

        let mut records = RecordWriter::new(
            self.store.clone(),
            self.brain.clone(),
            self.clock.clone(),
            timezone,
        );
        let mut context = ContextCache::new(self.store.clone(), config.context_ttl);

        if let Some(calendar) = &self.calendar {
            if let Some(account) = config.calendar_accounts.first() {
                records = records.with_calendar(calendar.clone(), account.clone());
            }
            if !config.calendar_accounts.is_empty() {
                context = context.with_calendar(CalendarDigest {
                    calendar: calendar.clone(),
                    accounts: config.calendar_accounts.clone(),
                    clock: self.clock.clone(),
                    timezone,
                });
            }
        }

        let reminders = ReminderScheduler::new(
            self.store.clone(),
            self.sender.clone(),
            self.clock.clone(),
            ReminderPolicy::from(&config),
        );

        Orchestrator {
            brain: self.brain,
            sender: self.sender,
            sessions: DialogSessionStore::new(),
            reminders,
            context,
            keywords: KeywordRouter::with_defaults(self.store),
            history: ConversationHistory::new(config.history_turns),
            records: Arc::new(records),
            lanes: IdentityLanes::default(),
            config,
        }
    }
}

/// Routes each inbound message to a dialog step, a command or general chat.
///
/// Precedence: an active dialog first, then commands, then conversation with
/// the cached personal context and keyword-matched data in the prompt.
pub struct Orchestrator {
    brain: Arc<dyn Brain>,
    sender: Arc<dyn MessageSender>,
    sessions: DialogSessionStore,
    reminders: ReminderScheduler,
    context: ContextCache,
    keywords: KeywordRouter,
    history: ConversationHistory,
    records: Arc<RecordWriter>,
    lanes: IdentityLanes,
    config: EngineConfig,
}

impl Orchestrator {
    /// Start building an orchestrator with default config and the system clock.
    pub fn builder(
        brain: Arc<dyn Brain>,
        store: Arc<dyn SheetStore>,
        sender: Arc<dyn MessageSender>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            brain,
            store,
            sender,
            calendar: None,
            clock: Arc::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    /// Process an incoming message end-to-end.
    pub async fn process(&self, message: InboundMessage) -> OutboundMessage {
        let reply = self.handle_inbound(&message.identity, &message.text).await;
        OutboundMessage::reply_to(&message, reply)
    }

    /// Handle one message and return the reply text.
    ///
    /// Messages for the same identity are handled one at a time, in the
    /// order they arrive here.
    pub async fn handle_inbound(&self, identity: &str, text: &str) -> String {
        let lane = self.lanes.lane(identity).await;
        let _turn = lane.lock().await;

        debug!(identity, "Handling inbound message");

        if let Some(reply) = self.continue_dialog(identity, text).await {
            return reply;
        }

        match Command::parse(text) {
            Command::Help => HELP_TEXT.to_string(),
            Command::StartDialog(kind) => {
                info!(identity, "Starting {}", kind.label());
                self.sessions.start(identity, kind).await
            }
            Command::Remind(task) => self.remind(identity, &task).await,
            Command::Done(task) => self.mark_done(identity, &task).await,
            Command::ListReminders => self.list_reminders(identity).await,
            Command::Chat => self.chat(identity, text).await,
        }
    }

    /// Feed the message to an active dialog, if there is one.
    async fn continue_dialog(&self, identity: &str, text: &str) -> Option<String> {
        let active = self.sessions.active_kind(identity).await?;

        if let Some(kind) = DialogKind::from_trigger(text).filter(|kind| *kind != active) {
            info!(identity, "Switching from {} to {}", active.label(), kind.label());
            return Some(self.sessions.start(identity, kind).await);
        }

        match self.sessions.advance(identity, text).await {
            Some(Advance::Next { prompt }) => Some(prompt.to_string()),
            Some(Advance::Complete(completed)) => Some(self.complete_dialog(completed)),
            None => {
                debug!(identity, "Session vanished mid-message; treating as chat");
                None
            }
        }
    }

    /// Acknowledge a finished dialog and persist it in the background.
    fn complete_dialog(&self, completed: CompletedDialog) -> String {
        let label = completed.kind.label();
        info!(identity = %completed.identity, "Completed {}", label);

        let records = self.records.clone();
        tokio::spawn(async move {
            records.persist(&completed).await;
        });

        format!("Done! Your {label} is saved.")
    }

    async fn remind(&self, identity: &str, task: &str) -> String {
        self.reminders.create(identity, task).await;
        let hours = self.config.nudge_after.as_secs() / 3600;
        format!("Got it. I'll remind you to {task}. I'll check in after {hours} hours if it's not done.")
    }

    async fn mark_done(&self, identity: &str, task: &str) -> String {
        match self.reminders.mark_done(identity, task).await {
            0 => format!("Nothing matched \"{task}\"."),
            1 => "Nice work! Marked 1 reminder done.".to_string(),
            n => format!("Nice work! Marked {n} reminders done."),
        }
    }

    async fn list_reminders(&self, identity: &str) -> String {
        let pending = self.reminders.pending_for(identity).await;
        if pending.is_empty() {
            return "No pending reminders.".to_string();
        }

        let lines: Vec<String> = pending
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r.text))
            .collect();
        format!("Pending reminders:\n{}", lines.join("\n"))
    }

    /// General conversation with personal context.
    async fn chat(&self, identity: &str, text: &str) -> String {
        let (context, data) = tokio::join!(self.context.get_context(), self.keywords.route(text));
        let system_prompt = compose_system_prompt(
            &self.config.system_prompt,
            &[("CONTEXT", &context), ("RELEVANT DATA", &data)],
        );
        let messages = self.history.with_user_turn(identity, text).await;

        match self.brain.complete(&system_prompt, &messages).await {
            Ok(reply) => {
                self.history.add_exchange(identity, text, &reply).await;
                reply
            }
            Err(e) => {
                warn!(identity, "Brain failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Send a reply for a message received out-of-band (SMS webhook).
    pub async fn reply_via_sender(&self, message: InboundMessage) {
        let outbound = self.process(message).await;
        if let Err(e) = self.sender.send_message(&outbound.recipient, &outbound.text).await {
            warn!("Failed to send reply to {}: {}", outbound.recipient, e);
        }
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn sessions(&self) -> &DialogSessionStore {
        &self.sessions
    }

    pub fn context(&self) -> &ContextCache {
        &self.context
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SYSTEM_PROMPT;
    use crate::sender::RecordingSender;
    use database::MemorySheetStore;
    use mock_brain::{FailingBrain, ScriptedBrain};

    fn orchestrator(brain: Arc<dyn Brain>) -> (Orchestrator, Arc<MemorySheetStore>, Arc<RecordingSender>) {
        let store = Arc::new(MemorySheetStore::new());
        let sender = Arc::new(RecordingSender::new());
        let orchestrator = Orchestrator::builder(brain, store.clone(), sender.clone()).build();
        (orchestrator, store, sender)
    }

    #[tokio::test]
    async fn test_help() {
        let (orch, _, _) = orchestrator(Arc::new(ScriptedBrain::constant("hi")));
        assert_eq!(orch.handle_inbound("+1", "help").await, HELP_TEXT);
    }

    #[tokio::test]
    async fn test_chat_prompt_includes_context_and_keyword_data() {
        let brain = Arc::new(ScriptedBrain::constant("Keep it up"));
        let (orch, store, _) = orchestrator(brain.clone());
        store
            .seed("Goals", vec![vec!["Run a marathon".into(), "2026".into(), "active".into()]])
            .await;
        store
            .seed("Gym", vec![vec!["2026-01-04".into(), "+1".into(), "legs".into()]])
            .await;

        let reply = orch.handle_inbound("+1", "How is my workout streak?").await;
        assert_eq!(reply, "Keep it up");

        let calls = brain.calls().await;
        assert_eq!(calls.len(), 1);
        assert!(calls[0].system_prompt.starts_with(DEFAULT_SYSTEM_PROMPT));
        assert!(calls[0].system_prompt.contains("[CONTEXT]\n[GOALS]\nRun a marathon | 2026 | active"));
        assert!(calls[0].system_prompt.contains("[RELEVANT DATA]\n2026-01-04 | +1 | legs"));
        assert_eq!(calls[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_chat_history_accumulates() {
        let brain = Arc::new(ScriptedBrain::new(["first", "second"]));
        let (orch, _, _) = orchestrator(brain.clone());

        orch.handle_inbound("+1", "hello").await;
        orch.handle_inbound("+1", "again").await;

        let calls = brain.calls().await;
        assert_eq!(calls[1].messages.len(), 3);
        assert_eq!(calls[1].messages[1].content, "first");
    }

    #[tokio::test]
    async fn test_brain_failure_falls_back() {
        let (orch, _, _) = orchestrator(Arc::new(FailingBrain));
        assert_eq!(orch.handle_inbound("+1", "hello").await, FALLBACK_REPLY);
        assert!(orch.history().get("+1").await.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_for_other_kind_restarts_dialog() {
        let (orch, _, _) = orchestrator(Arc::new(ScriptedBrain::constant("chat")));

        orch.handle_inbound("+1", "gym").await;
        orch.handle_inbound("+1", "back").await;
        let reply = orch.handle_inbound("+1", "dating").await;
        assert!(reply.contains("Who did you go out with?"));
        assert_eq!(orch.sessions().active_kind("+1").await, Some(DialogKind::DatingLog));

        // The same kind's trigger is captured as an answer.
        orch.handle_inbound("+1", "dating").await;
        let session = orch.sessions().session("+1").await.unwrap();
        assert_eq!(session.step_index, 1);
        assert_eq!(session.fields["name"], "dating");
    }

    #[tokio::test]
    async fn test_reminder_commands() {
        let (orch, _, _) = orchestrator(Arc::new(ScriptedBrain::constant("chat")));

        let reply = orch.handle_inbound("+1", "remind me to call dentist").await;
        assert!(reply.contains("call dentist"));
        orch.handle_inbound("+1", "remind me to buy milk").await;

        let listed = orch.handle_inbound("+1", "reminders").await;
        assert_eq!(listed, "Pending reminders:\n1. call dentist\n2. buy milk");

        assert_eq!(
            orch.handle_inbound("+1", "done DENTIST").await,
            "Nice work! Marked 1 reminder done."
        );
        assert_eq!(orch.handle_inbound("+1", "done dentist").await, "Nothing matched \"dentist\".");
        assert_eq!(orch.handle_inbound("+1", "reminders").await, "Pending reminders:\n1. buy milk");

        orch.reminders().shutdown();
    }

    #[tokio::test]
    async fn test_process_addresses_reply_to_sender() {
        let (orch, _, sender) = orchestrator(Arc::new(ScriptedBrain::constant("pong")));
        let out = orch.process(InboundMessage::new("+1", "ping", 0)).await;
        assert_eq!(out.recipient, "+1");
        assert_eq!(out.text, "pong");

        orch.reply_via_sender(InboundMessage::new("+2", "ping", 0)).await;
        assert_eq!(sender.messages().await, vec![("+2".to_string(), "pong".to_string())]);
    }
}
