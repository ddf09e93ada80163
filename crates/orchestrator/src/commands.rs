//! Inbound command recognition.
//!
//! Only consulted when the identity has no active dialog.

use crate::dialog::{normalize, DialogKind};

/// What an inbound message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    StartDialog(DialogKind),
    /// Create a reminder with this text.
    Remind(String),
    /// Mark reminders containing this text done.
    Done(String),
    ListReminders,
    /// Anything else goes to general conversation.
    Chat,
}

const REMIND_PREFIXES: &[&str] = &["remind me to ", "remind me "];
const DONE_PREFIXES: &[&str] = &["done ", "did ", "finished "];

impl Command {
    pub fn parse(text: &str) -> Self {
        let normalized = normalize(text);

        if matches!(normalized.as_str(), "help" | "commands") {
            return Command::Help;
        }

        if let Some(kind) = DialogKind::from_trigger(text) {
            return Command::StartDialog(kind);
        }

        let trimmed = text.trim();
        if let Some(rest) = strip_prefix_ci(trimmed, REMIND_PREFIXES) {
            return Command::Remind(rest.to_string());
        }
        if let Some(rest) = strip_prefix_ci(trimmed, DONE_PREFIXES) {
            return Command::Done(rest.to_string());
        }

        if matches!(normalized.as_str(), "reminders" | "list reminders") {
            return Command::ListReminders;
        }

        Command::Chat
    }
}

/// Strip the first matching prefix, ignoring ASCII case.
///
/// Returns `None` when nothing but whitespace follows the prefix.
fn strip_prefix_ci<'a>(text: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let head = text.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let rest = text[prefix.len()..].trim();
        (!rest.is_empty()).then_some(rest)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_and_triggers() {
        assert_eq!(Command::parse("Help"), Command::Help);
        assert_eq!(Command::parse("commands?"), Command::Help);
        assert_eq!(Command::parse("gym"), Command::StartDialog(DialogKind::GymLog));
        assert_eq!(
            Command::parse("Daily Questions"),
            Command::StartDialog(DialogKind::DailyQuestions)
        );
    }

    #[test]
    fn test_remind_prefixes() {
        assert_eq!(
            Command::parse("Remind me to call dentist"),
            Command::Remind("call dentist".to_string())
        );
        assert_eq!(
            Command::parse("remind me buy milk "),
            Command::Remind("buy milk".to_string())
        );
        assert_eq!(Command::parse("remind me "), Command::Chat);
    }

    #[test]
    fn test_done_prefixes() {
        assert_eq!(Command::parse("done dentist"), Command::Done("dentist".to_string()));
        assert_eq!(Command::parse("DID the laundry"), Command::Done("the laundry".to_string()));
        assert_eq!(Command::parse("finished taxes"), Command::Done("taxes".to_string()));
        assert_eq!(Command::parse("done"), Command::Chat);
    }

    #[test]
    fn test_list_and_fallthrough() {
        assert_eq!(Command::parse("reminders"), Command::ListReminders);
        assert_eq!(Command::parse("List reminders."), Command::ListReminders);
        assert_eq!(Command::parse("how was my week?"), Command::Chat);
        assert_eq!(Command::parse("gym was great"), Command::Chat);
    }

    #[test]
    fn test_multibyte_text_does_not_split_chars() {
        assert_eq!(Command::parse("día"), Command::Chat);
        assert_eq!(Command::parse("ñ"), Command::Chat);
    }
}
