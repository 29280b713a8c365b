//! Google Calendar API client for listing, editing and watching events

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Non-success response from the Calendar API. The body is kept
/// verbatim so it can be surfaced to callers.
#[derive(Debug, thiserror::Error)]
#[error("Google Calendar request failed: {status} ({body})")]
pub struct GoogleApiError {
    pub status: StatusCode,
    pub body: String,
}

impl GoogleApiError {
    /// The event no longer exists on the provider side.
    pub fn is_gone(&self) -> bool {
        self.status == StatusCode::NOT_FOUND || self.status == StatusCode::GONE
    }
}

/// Calendar event as returned by (and sent to) the Google API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// RRULE, EXRULE, RDATE and EXDATE lines for a recurring series
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
}

/// Either `date_time` (timed) or `date` (all-day) is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

/// One page of an events listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

/// Push notification channel returned by `events.watch`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub resource_id: String,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Milliseconds since the unix epoch, encoded as a string
    #[serde(default)]
    pub expiration: Option<String>,
}

impl Channel {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchRequest<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    address: &'a str,
    token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest<'a> {
    id: &'a str,
    resource_id: &'a str,
}

#[derive(Clone, Debug)]
pub struct GoogleCalendar {
    client: Client,
    base_url: String,
}

impl GoogleCalendar {
    /// `api_url` is the googleapis host, e.g. `https://www.googleapis.com`
    pub fn new(api_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/calendar/v3", api_url.trim_end_matches('/')),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GoogleApiError { status, body: text }.into());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Upcoming events from now, recurring series expanded into
    /// instances and ordered by start time.
    pub async fn list_upcoming(
        &self,
        access_token: &str,
        calendar_id: &str,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>> {
        let req = self
            .client
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", Utc::now().to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);
        let page: EventPage = self.send_json(req).await?;
        Ok(page.items)
    }

    /// One page of events between `time_min` and `time_max`.
    pub async fn list_page(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        let mut query = vec![
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("maxResults", max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        let req = self
            .client
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&query);
        self.send_json(req).await
    }

    pub async fn get_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<CalendarEvent> {
        let req = self
            .client
            .get(self.event_url(calendar_id, event_id))
            .bearer_auth(access_token);
        self.send_json(req).await
    }

    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<CalendarEvent> {
        let req = self
            .client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(event);
        self.send_json(req).await
    }

    pub async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &CalendarEvent,
    ) -> Result<CalendarEvent> {
        let req = self
            .client
            .put(self.event_url(calendar_id, event_id))
            .bearer_auth(access_token)
            .json(event);
        self.send_json(req).await
    }

    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()> {
        let res = self
            .client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GoogleApiError { status, body }.into());
        }
        Ok(())
    }

    /// Register a push notification channel delivering to `address`.
    pub async fn watch(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        channel_token: &str,
        address: &str,
    ) -> Result<Channel> {
        let req = self
            .client
            .post(format!("{}/watch", self.events_url(calendar_id)))
            .bearer_auth(access_token)
            .json(&WatchRequest {
                id: channel_id,
                kind: "web_hook",
                address,
                token: channel_token,
            });
        self.send_json(req).await
    }

    pub async fn stop_channel(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<()> {
        let res = self
            .client
            .post(format!("{}/channels/stop", self.base_url))
            .bearer_auth(access_token)
            .json(&StopRequest {
                id: channel_id,
                resource_id,
            })
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GoogleApiError { status, body }.into());
        }
        Ok(())
    }
}
