//! Google Calendar v3 REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CalendarError, Result};
use crate::event::{CalendarEvent, EventStart, NewEvent};
use crate::token::TokenProvider;
use crate::CalendarService;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: ApiTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTime {
    #[serde(default)]
    date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
struct InsertEvent<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    start: InsertTime,
    end: InsertTime,
}

#[derive(Debug, Deserialize)]
struct Inserted {
    id: String,
}

impl ApiEvent {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = match (self.start.date_time, self.start.date) {
            (Some(at), _) => EventStart::At(at.with_timezone(&Utc)),
            (None, Some(date)) => EventStart::AllDay(date),
            (None, None) => return None,
        };
        Some(CalendarEvent {
            id: self.id,
            start,
            summary: self.summary.unwrap_or_else(|| "(untitled)".to_string()),
            location: self.location.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// Calendar client for the primary calendar of each account.
#[derive(Clone)]
pub struct GoogleCalendar {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GoogleCalendar {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, tokens)
    }

    /// Point the client at a different API root (useful for test servers).
    pub fn with_base_url(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CalendarError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list_upcoming(&self, account: &str, days_ahead: u32) -> Result<Vec<CalendarEvent>> {
        let token = self.tokens.access_token(account).await?;
        let now = Utc::now();
        let until = now + chrono::Duration::days(i64::from(days_ahead));

        debug!("Listing events for {} ({} days)", account, days_ahead);

        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(token)
            .query(&[
                ("timeMin", now.to_rfc3339()),
                ("timeMax", until.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;

        let list: EventList = check(response).await?.json().await?;
        Ok(list.items.into_iter().filter_map(ApiEvent::into_event).collect())
    }

    async fn create_event(&self, account: &str, event: &NewEvent) -> Result<String> {
        if event.end <= event.start {
            return Err(CalendarError::InvalidResponse(
                "event must end after it starts".to_string(),
            ));
        }
        let token = self.tokens.access_token(account).await?;

        let body = InsertEvent {
            summary: &event.summary,
            location: event.location.as_deref(),
            start: InsertTime {
                date_time: event.start.to_rfc3339(),
            },
            end: InsertTime {
                date_time: event.end.to_rfc3339(),
            },
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let inserted: Inserted = check(response).await?.json().await?;
        debug!("Created event {} for {}", inserted.id, account);
        Ok(inserted.id)
    }
}

impl std::fmt::Debug for GoogleCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendar")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_event_list() {
        let json = r#"{
            "items": [
                {"id": "a", "summary": "Dentist", "location": "Main St",
                 "start": {"dateTime": "2026-03-01T10:00:00-05:00"}},
                {"id": "b", "summary": "Holiday", "start": {"date": "2026-03-02"}},
                {"id": "c", "start": {}}
            ]
        }"#;
        let list: EventList = serde_json::from_str(json).unwrap();
        let events: Vec<CalendarEvent> =
            list.items.into_iter().filter_map(ApiEvent::into_event).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].start,
            EventStart::At(Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap())
        );
        assert_eq!(events[0].location.as_deref(), Some("Main St"));
        assert!(events[1].is_all_day());
    }

    #[test]
    fn test_insert_body_shape() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
        let body = InsertEvent {
            summary: "Lunch",
            location: None,
            start: InsertTime {
                date_time: start.to_rfc3339(),
            },
            end: InsertTime {
                date_time: (start + chrono::Duration::hours(1)).to_rfc3339(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["start"]["dateTime"], "2026-03-01T15:00:00+00:00");
        assert!(json.get("location").is_none());
    }
}
