//! Public types for the events API
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::google::gcal::CalendarEvent;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub calendar_id: Option<String>,
    pub max_results: Option<u32>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Required for updates
    pub event_id: Option<String>,
    pub calendar_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub from_time: String,
    pub to_time: String,
    /// IANA name or one of the backend's zone aliases
    pub time_zone: Option<String>,
    #[serde(default)]
    pub external_participants: Vec<String>,
    #[serde(default)]
    pub notify_time_in_minutes: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventRequest {
    pub event_id: Option<String>,
    pub calendar_id: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWriteResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_calendar: Option<CalendarEvent>,
    /// Acknowledgement from the scheduler backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_api: Option<Value>,
}
