//! Engine configuration.

use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::clock::AwakeWindow;
use crate::error::OrchestratorError;

/// Base prompt for general conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise, upbeat personal assistant. \
Use the personal data below when it is relevant. Keep replies short enough to read on a phone.";

/// Timing, window and routing settings for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number that receives calendar alerts.
    pub owner_number: Option<String>,

    /// Caller id for outbound calls. Empty means the gateway default.
    pub caller_id: String,

    pub awake: AwakeWindow,

    pub nudge_after: Duration,
    pub escalate_after: Duration,

    /// Delay between the escalation warning and the call.
    pub escalation_grace: Duration,

    pub context_ttl: Duration,

    /// Linked calendar accounts, in poll order.
    pub calendar_accounts: Vec<String>,
    pub calendar_poll: Duration,

    /// Inclusive lead-time band, in minutes, that triggers an event alert.
    pub alert_min_minutes: i64,
    pub alert_max_minutes: i64,

    pub dedup_max_entries: usize,
    pub dedup_compact: Duration,

    pub system_prompt: String,

    /// User/assistant pairs of history kept per identity.
    pub history_turns: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner_number: None,
            caller_id: String::new(),
            awake: AwakeWindow::default(),
            nudge_after: Duration::from_secs(5 * 3600),
            escalate_after: Duration::from_secs(10 * 3600),
            escalation_grace: Duration::from_secs(60),
            context_ttl: Duration::from_secs(600),
            calendar_accounts: Vec::new(),
            calendar_poll: Duration::from_secs(120),
            alert_min_minutes: 8,
            alert_max_minutes: 12,
            dedup_max_entries: 100,
            dedup_compact: Duration::from_secs(3600),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_turns: 10,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `ASSISTANT_OWNER_NUMBER`
    /// - `ASSISTANT_CALLER_ID`
    /// - `ASSISTANT_TIMEZONE` (default: America/New_York)
    /// - `ASSISTANT_AWAKE_START_HOUR` (default: 7), `ASSISTANT_AWAKE_END_HOUR` (default: 23)
    /// - `ASSISTANT_NUDGE_AFTER_HOURS` (default: 5), `ASSISTANT_ESCALATE_AFTER_HOURS` (default: 10)
    /// - `ASSISTANT_ESCALATION_GRACE_SECS` (default: 60)
    /// - `ASSISTANT_CONTEXT_TTL_SECS` (default: 600)
    /// - `ASSISTANT_CALENDAR_ACCOUNTS` (comma-separated)
    /// - `ASSISTANT_CALENDAR_POLL_SECS` (default: 120)
    /// - `ASSISTANT_ALERT_MIN_MINUTES` (default: 8), `ASSISTANT_ALERT_MAX_MINUTES` (default: 12)
    /// - `ASSISTANT_DEDUP_MAX_ENTRIES` (default: 100)
    /// - `ASSISTANT_DEDUP_COMPACT_SECS` (default: 3600)
    /// - `ASSISTANT_SYSTEM_PROMPT`
    /// - `ASSISTANT_HISTORY_TURNS` (default: 10)
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let defaults = Self::default();

        let timezone = match env::var("ASSISTANT_TIMEZONE") {
            Ok(name) => name.parse::<Tz>().map_err(|e| {
                OrchestratorError::Config(format!("ASSISTANT_TIMEZONE {name:?}: {e}"))
            })?,
            Err(_) => defaults.awake.timezone,
        };

        let start_hour = parse_var("ASSISTANT_AWAKE_START_HOUR", defaults.awake.start_hour)?;
        let end_hour = parse_var("ASSISTANT_AWAKE_END_HOUR", defaults.awake.end_hour)?;
        if start_hour > 23 || end_hour > 24 {
            return Err(OrchestratorError::Config(format!(
                "awake window {start_hour}-{end_hour} is out of range"
            )));
        }

        let hours = |key: &str, default: Duration| -> Result<Duration, OrchestratorError> {
            let hours: u64 = parse_var(key, default.as_secs() / 3600)?;
            if hours > MAX_DELAY_HOURS {
                return Err(OrchestratorError::Config(format!(
                    "{key} must be at most {MAX_DELAY_HOURS} hours"
                )));
            }
            hours
                .checked_mul(3600)
                .map(Duration::from_secs)
                .ok_or_else(|| OrchestratorError::Config(format!("{key} is too large")))
        };
        let secs = |key, default: Duration| -> Result<Duration, OrchestratorError> {
            Ok(Duration::from_secs(parse_var(key, default.as_secs())?))
        };

        let calendar_accounts = env::var("ASSISTANT_CALENDAR_ACCOUNTS")
            .map(|v| {
                v.split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            owner_number: env::var("ASSISTANT_OWNER_NUMBER")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            caller_id: env::var("ASSISTANT_CALLER_ID").unwrap_or_default(),
            awake: AwakeWindow::new(start_hour, end_hour, timezone),
            nudge_after: hours("ASSISTANT_NUDGE_AFTER_HOURS", defaults.nudge_after)?,
            escalate_after: hours("ASSISTANT_ESCALATE_AFTER_HOURS", defaults.escalate_after)?,
            escalation_grace: secs("ASSISTANT_ESCALATION_GRACE_SECS", defaults.escalation_grace)?,
            context_ttl: secs("ASSISTANT_CONTEXT_TTL_SECS", defaults.context_ttl)?,
            calendar_accounts,
            calendar_poll: secs("ASSISTANT_CALENDAR_POLL_SECS", defaults.calendar_poll)?,
            alert_min_minutes: parse_var("ASSISTANT_ALERT_MIN_MINUTES", defaults.alert_min_minutes)?,
            alert_max_minutes: parse_var("ASSISTANT_ALERT_MAX_MINUTES", defaults.alert_max_minutes)?,
            dedup_max_entries: parse_var("ASSISTANT_DEDUP_MAX_ENTRIES", defaults.dedup_max_entries)?,
            dedup_compact: secs("ASSISTANT_DEDUP_COMPACT_SECS", defaults.dedup_compact)?,
            system_prompt: env::var("ASSISTANT_SYSTEM_PROMPT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.system_prompt),
            history_turns: parse_var("ASSISTANT_HISTORY_TURNS", defaults.history_turns)?,
        };

        if config.alert_min_minutes > config.alert_max_minutes {
            return Err(OrchestratorError::Config(
                "ASSISTANT_ALERT_MIN_MINUTES exceeds ASSISTANT_ALERT_MAX_MINUTES".to_string(),
            ));
        }
        if config.escalate_after < config.nudge_after {
            return Err(OrchestratorError::Config(
                "escalation must not come before the nudge".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Upper bound on reminder delays, so deadlines stay representable.
const MAX_DELAY_HOURS: u64 = 24 * 365;

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, OrchestratorError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| OrchestratorError::Config(format!("{key} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}
