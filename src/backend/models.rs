//! Wire types for the scheduler backend
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

impl Visibility {
    /// Absent or unrecognised values map to `Private`.
    pub fn from_google(value: Option<&str>) -> Self {
        match value {
            Some("default") => Visibility::Default,
            Some("public") => Visibility::Public,
            Some("private") | None => Visibility::Private,
            Some("confidential") => Visibility::Confidential,
            Some(other) => {
                tracing::warn!("Unknown visibility {}, using private", other);
                Visibility::Private
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Absent or unrecognised values map to `Confirmed`.
    pub fn from_google(value: Option<&str>) -> Self {
        match value {
            Some("confirmed") | None => EventStatus::Confirmed,
            Some("tentative") => EventStatus::Tentative,
            Some("cancelled") => EventStatus::Cancelled,
            Some(other) => {
                tracing::warn!("Unknown event status {}, using confirmed", other);
                EventStatus::Confirmed
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallType {
    #[default]
    Video,
    Audio,
    InPerson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub role_id: String,
}

/// Recurrence descriptor. Serialises to `{}` for one-off events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
}

/// Event in the backend's schema. `reccurance` and `permissons` are the
/// backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEvent {
    pub user_id: String,
    pub organizer: String,
    pub title: String,
    pub event_type: String,
    pub tenant_name: String,
    pub tenant_id: String,
    pub event_date: String,
    pub from_time: String,
    pub to_date: String,
    pub to_time: String,
    /// Derived from the start and end instants, never authoritative
    pub duration: i64,
    pub time_zone: String,
    pub repeat_type: String,
    #[serde(rename = "reccurance")]
    pub recurrence: Recurrence,
    pub notify: Vec<String>,
    pub tenant_participants: Vec<Participant>,
    pub external_participants: Vec<String>,
    pub is_exclude_me_from_event: bool,
    pub visibility: Visibility,
    pub status: EventStatus,
    pub call_type: CallType,
    pub others: String,
    pub description: String,
    #[serde(rename = "permissons")]
    pub permissions: Vec<String>,
    pub organizer_role_id: String,
    pub notify_time_in_minutes: Vec<i64>,
}

/// Extra fields sent along with the event on delete
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMetadata {
    pub parent_id: Option<String>,
    pub updated_by: Option<String>,
    pub event: BackendEvent,
}

/// Sync configuration record relayed to the backend after onboarding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub calendar_id: String,
    pub email: String,
    pub provider: String,
    pub is_sync_enabled: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
}
