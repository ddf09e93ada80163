//! Keyword lookup of supplemental data for a free-form message.

use std::sync::Arc;

use database::SheetStore;
use tracing::{debug, warn};

/// A keyword and the sheet range it pulls in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRoute {
    /// Lowercase phrase matched as a substring.
    pub keyword: String,
    pub sheet: String,
    pub range: String,
}

impl KeywordRoute {
    pub fn new(keyword: &str, sheet: &str, range: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            sheet: sheet.to_string(),
            range: range.to_string(),
        }
    }
}

/// Ordered keyword table. The first registered keyword found in the text wins.
pub struct KeywordRouter {
    store: Arc<dyn SheetStore>,
    routes: Vec<KeywordRoute>,
}

impl KeywordRouter {
    pub fn new(store: Arc<dyn SheetStore>, routes: Vec<KeywordRoute>) -> Self {
        Self { store, routes }
    }

    /// Router with the standard personal-data keywords.
    pub fn with_defaults(store: Arc<dyn SheetStore>) -> Self {
        let routes = vec![
            KeywordRoute::new("workout", "Gym", "A:E"),
            KeywordRoute::new("gym", "Gym", "A:E"),
            KeywordRoute::new("habit", "Habits", "A:H"),
            KeywordRoute::new("sleep", "Habits", "A:H"),
            KeywordRoute::new("goal", "Goals", "A:C"),
            KeywordRoute::new("dating", "Dating", "A:I"),
            KeywordRoute::new("date with", "Dating", "A:I"),
            KeywordRoute::new("check in", "Checkins", "A:G"),
            KeywordRoute::new("mood", "Checkins", "A:G"),
            KeywordRoute::new("journal", "DailyQuestions", "A:N"),
            KeywordRoute::new("reflect", "DailyQuestions", "A:N"),
            KeywordRoute::new("remind", "Reminders", "A:F"),
            KeywordRoute::new("event", "Events", "A:G"),
            KeywordRoute::new("win", "Wins", "A:D"),
        ];
        Self::new(store, routes)
    }

    pub fn routes(&self) -> &[KeywordRoute] {
        &self.routes
    }

    /// The first route whose keyword appears in `text`, if any.
    pub fn match_route(&self, text: &str) -> Option<&KeywordRoute> {
        let lower = text.to_lowercase();
        self.routes.iter().find(|r| lower.contains(&r.keyword))
    }

    /// Supplemental data for `text`, or an empty string.
    ///
    /// Only the first matching keyword is consulted. A failed read yields an
    /// empty string.
    pub async fn route(&self, text: &str) -> String {
        let Some(route) = self.match_route(text) else {
            return String::new();
        };
        debug!("Keyword {:?} matched, reading {}!{}", route.keyword, route.sheet, route.range);

        match self.store.read_range(&route.sheet, &route.range).await {
            Ok(rows) => rows
                .iter()
                .filter(|r| !r.is_empty())
                .map(|r| r.join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                warn!("Keyword lookup {}!{} failed: {}", route.sheet, route.range, e);
                String::new()
            }
        }
    }
}
