//! Record shapes and best-effort persistence for completed dialogs.
//!
//! Every write here is fire-and-forget from the caller's point of view:
//! failures are logged and dropped.

use std::sync::Arc;

use brain_core::{Brain, ChatMessage};
use calendar::{CalendarService, NewEvent};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use database::{column_name, SheetStore};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dialog::{CompletedDialog, DialogKind};

pub const WINS_SHEET: &str = "Wins";
pub const WINS_COLUMNS: &str = "A:D";

const DEFAULT_EVENT_MINUTES: i64 = 60;

const SUMMARY_PROMPT: &str = "You review a person's end-of-day reflection. \
Reply with exactly three lines and nothing else:\n\
SUMMARY: one sentence summarizing the day\n\
INSIGHT: one pattern or insight\n\
ACTION: one concrete action for tomorrow";

/// Column range covering `width` columns from `A`.
pub fn columns_for(width: usize) -> String {
    format!("A:{}", column_name(width.max(1) - 1))
}

/// `[date, identity, ...fields]` for a completed dialog.
pub fn record_row(date: &str, completed: &CompletedDialog) -> Vec<String> {
    let mut row = vec![date.to_string(), completed.identity.clone()];
    row.extend(completed.values());
    row
}

/// `[date, identity, source, description]`.
pub fn win_row(date: &str, identity: &str, source: &str, description: &str) -> Vec<String> {
    vec![
        date.to_string(),
        identity.to_string(),
        source.to_string(),
        description.to_string(),
    ]
}

/// Win text derived from a completed dialog, for the kinds that produce one.
pub fn win_description(completed: &CompletedDialog) -> Option<String> {
    match completed.kind {
        DialogKind::GymLog => Some(format!(
            "Workout: {} ({} min)",
            completed.field("muscles"),
            completed.field("duration")
        )),
        DialogKind::DailyQuestions => {
            let wins = completed.field("wins").trim();
            Some(if wins.is_empty() {
                "Completed daily questions".to_string()
            } else {
                wins.to_string()
            })
        }
        _ => None,
    }
}

/// Pull `SUMMARY:`, `INSIGHT:` and `ACTION:` lines out of a reply.
///
/// Missing lines come back empty.
pub fn parse_summary(reply: &str) -> [String; 3] {
    let mut out: [String; 3] = Default::default();
    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        for (slot, label) in ["summary:", "insight:", "action:"].iter().enumerate() {
            let matches = line
                .get(..label.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(label));
            if matches && out[slot].is_empty() {
                out[slot] = line[label.len()..].trim().to_string();
            }
        }
    }
    out
}

/// Parse `YYYY-MM-DD`, `MM/DD/YYYY` or `MM/DD` relative to `today`.
///
/// A yearless date already behind `today` rolls into next year.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Some(date);
    }

    let (month, day) = text.split_once('/')?;
    let (month, day): (u32, u32) = (month.trim().parse().ok()?, day.trim().parse().ok()?);
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(this_year)
    }
}

/// Parse `HH:MM`, `H:MMam`, `H:MM pm` or `Ham`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let (clock, meridiem) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None if meridiem.is_some() => (clock.parse::<u32>().ok()?, 0),
        None => return None,
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Leading digits of `text` as minutes, defaulting to an hour.
pub fn parse_duration_minutes(text: &str) -> i64 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_EVENT_MINUTES)
}

/// Build the calendar event for a completed EventBuilder dialog.
pub fn event_from_dialog(completed: &CompletedDialog, timezone: Tz, today: NaiveDate) -> Option<NewEvent> {
    let date = parse_date(completed.field("date"), today)?;
    let time = parse_time(completed.field("time"))?;
    let start = timezone
        .from_local_datetime(&date.and_time(time))
        .earliest()?
        .with_timezone(&chrono::Utc);
    let end = start + ChronoDuration::minutes(parse_duration_minutes(completed.field("duration")));

    let location = completed.field("location").trim();
    Some(NewEvent {
        summary: completed.field("name").trim().to_string(),
        start,
        end,
        location: (!location.is_empty()).then(|| location.to_string()),
    })
}

/// Append a row, logging instead of failing.
pub async fn append_logged(store: &dyn SheetStore, sheet: &str, columns: &str, row: Vec<String>) -> bool {
    match store.append_row(sheet, columns, row).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to append to {}: {}", sheet, e);
            false
        }
    }
}

/// Writes completed dialogs to the sheet store and their side records.
pub struct RecordWriter {
    store: Arc<dyn SheetStore>,
    brain: Arc<dyn Brain>,
    calendar: Option<(Arc<dyn CalendarService>, String)>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn SheetStore>, brain: Arc<dyn Brain>, clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self {
            store,
            brain,
            calendar: None,
            clock,
            timezone,
        }
    }

    /// Create EventBuilder events on `account`.
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarService>, account: impl Into<String>) -> Self {
        self.calendar = Some((calendar, account.into()));
        self
    }

    /// Today's date in the configured zone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.timezone).date_naive()
    }

    pub fn local_date(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }

    /// Persist a completed dialog and everything derived from it.
    pub async fn persist(&self, completed: &CompletedDialog) {
        let date = self.local_date();
        let mut row = record_row(&date, completed);
        if completed.kind == DialogKind::DailyQuestions {
            row.extend(self.summarize_daily_questions(completed).await);
        }

        let columns = columns_for(row.len());
        if append_logged(self.store.as_ref(), completed.kind.sheet(), &columns, row).await {
            info!("Stored {} for {}", completed.kind.label(), completed.identity);
        }

        if let Some(description) = win_description(completed) {
            self.append_win(&completed.identity, completed.kind.label(), &description)
                .await;
        }

        if completed.kind == DialogKind::EventBuilder {
            self.create_calendar_event(completed).await;
        }
    }

    pub async fn append_win(&self, identity: &str, source: &str, description: &str) {
        let row = win_row(&self.local_date(), identity, source, description);
        append_logged(self.store.as_ref(), WINS_SHEET, WINS_COLUMNS, row).await;
    }

    async fn summarize_daily_questions(&self, completed: &CompletedDialog) -> [String; 3] {
        let answers = completed
            .fields
            .iter()
            .map(|(field, value)| format!("{field}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");

        match self
            .brain
            .complete(SUMMARY_PROMPT, &[ChatMessage::user(answers)])
            .await
        {
            Ok(reply) => parse_summary(&reply),
            Err(e) => {
                warn!("Daily questions summary failed: {}", e);
                Default::default()
            }
        }
    }

    async fn create_calendar_event(&self, completed: &CompletedDialog) {
        let Some((calendar, account)) = &self.calendar else {
            debug!("No calendar linked; event kept in sheet only");
            return;
        };
        let Some(event) = event_from_dialog(completed, self.timezone, self.today()) else {
            warn!(
                "Could not parse event date/time {:?} {:?}; skipping calendar write",
                completed.field("date"),
                completed.field("time")
            );
            return;
        };

        match calendar.create_event(account, &event).await {
            Ok(id) => info!("Created calendar event {} on {}", id, account),
            Err(e) => warn!("Calendar write failed for {}: {}", account, e),
        }
    }
}
