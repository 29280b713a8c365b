//! Google Calendar push notifications
//!
//! Google delivers notifications as an empty POST with the details in
//! `x-goog-*` headers. The channel id embeds the sync config id so the
//! receiver can find the config, and the channel token is compared with
//! the one stored when the channel was registered.

use std::fmt;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::Utc;
use http::{HeaderMap, StatusCode};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::db::find_sync_config;
use super::mapper::{SyncDefaults, to_backend_event};
use super::models::SyncConfig;
use super::open_config_session;
use crate::backend::{BackendEvent, DeleteMetadata, SchedulerBackend};
use crate::core::AppConfig;
use crate::google::gcal::{CalendarEvent, GoogleApiError, GoogleCalendar};

pub const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
pub const CHANNEL_TOKEN_HEADER: &str = "x-goog-channel-token";
pub const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
pub const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";
pub const EVENT_ID_HEADER: &str = "x-goog-event-id";

static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)_([A-Za-z0-9]+)$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing header {0}")]
    MissingHeader(&'static str),
    #[error("Malformed channel id {0:?}")]
    MalformedChannel(String),
    #[error("No sync config for channel {0}")]
    UnknownChannel(String),
    #[error("Channel {0} is not current or its token is invalid")]
    TokenMismatch(String),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeader(_) | WebhookError::MalformedChannel(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::UnknownChannel(_) => StatusCode::NOT_FOUND,
            WebhookError::TokenMismatch(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// Channel id in the form `<sync config id>_<nonce>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId {
    pub config_id: i64,
    pub nonce: String,
}

impl ChannelId {
    pub fn new(config_id: i64) -> Self {
        Self {
            config_id,
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, WebhookError> {
        let malformed = || WebhookError::MalformedChannel(raw.to_string());
        let caps = CHANNEL_ID_RE.captures(raw).ok_or_else(malformed)?;
        let config_id = caps[1].parse().map_err(|_| malformed())?;
        Ok(Self {
            config_id,
            nonce: caps[2].to_string(),
        })
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.config_id, self.nonce)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Handshake sent once when a channel is created
    Sync,
    Exists,
    NotExists,
    Deleted,
    Other(String),
}

impl ResourceState {
    pub fn parse(value: &str) -> Self {
        match value {
            "sync" => ResourceState::Sync,
            "exists" => ResourceState::Exists,
            "not_exists" => ResourceState::NotExists,
            "deleted" => ResourceState::Deleted,
            other => ResourceState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookNotification {
    pub channel: ChannelId,
    pub channel_token: Option<String>,
    pub resource_id: Option<String>,
    pub resource_state: Option<ResourceState>,
    pub event_id: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl WebhookNotification {
    /// Parse the notification headers. No I/O happens here so a malformed
    /// channel is rejected before any network call.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let raw_channel =
            header(headers, CHANNEL_ID_HEADER).ok_or(WebhookError::MissingHeader(CHANNEL_ID_HEADER))?;
        Ok(Self {
            channel: ChannelId::parse(&raw_channel)?,
            channel_token: header(headers, CHANNEL_TOKEN_HEADER),
            resource_id: header(headers, RESOURCE_ID_HEADER),
            resource_state: header(headers, RESOURCE_STATE_HEADER).map(|s| ResourceState::parse(&s)),
            event_id: header(headers, EVENT_ID_HEADER),
        })
    }

    /// The channel id and token must match the config's current channel.
    /// Notifications from a superseded channel are rejected.
    pub fn authorize(&self, config: &SyncConfig) -> Result<(), WebhookError> {
        let channel_id = self.channel.to_string();
        match (config.channel.as_ref(), self.channel_token.as_deref()) {
            (Some(stored), Some(provided))
                if stored.channel_id == channel_id && stored.channel_token == provided =>
            {
                Ok(())
            }
            _ => Err(WebhookError::TokenMismatch(channel_id)),
        }
    }
}

/// Backend operation for one notification
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    Create(BackendEvent),
    Update {
        event_id: String,
        event: BackendEvent,
    },
    Delete {
        event_id: String,
        metadata: DeleteMetadata,
    },
}

impl SyncCommand {
    /// `deleted` deletes and `exists` updates. Any other or missing state
    /// creates the event.
    pub fn from_state(
        state: Option<&ResourceState>,
        event_id: &str,
        event: BackendEvent,
        parent_id: Option<String>,
    ) -> Self {
        match state {
            Some(ResourceState::Deleted) => SyncCommand::Delete {
                event_id: event_id.to_string(),
                metadata: DeleteMetadata {
                    parent_id,
                    updated_by: Some(event.user_id.clone()),
                    event,
                },
            },
            Some(ResourceState::Exists) => SyncCommand::Update {
                event_id: event_id.to_string(),
                event,
            },
            other => {
                tracing::warn!(
                    "Resource state {:?} for event {} is neither exists nor deleted, creating",
                    other,
                    event_id
                );
                SyncCommand::Create(event)
            }
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            SyncCommand::Create(_) => "create",
            SyncCommand::Update { .. } => "update",
            SyncCommand::Delete { .. } => "delete",
        }
    }

    pub async fn dispatch(&self, backend: &dyn SchedulerBackend) -> Result<Value> {
        match self {
            SyncCommand::Create(event) => backend.create_event(event).await,
            SyncCommand::Update { event_id, event } => backend.update_event(event_id, event).await,
            SyncCommand::Delete { event_id, metadata } => {
                backend.delete_event(event_id, metadata).await
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Sync is disabled for the config
    Ignored,
    /// Channel handshake, nothing to dispatch
    Acknowledged,
    Dispatched { action: String, ack: Value },
}

/// Fetch the event a notification refers to. A deleted event that the
/// provider no longer returns is reduced to its id.
async fn fetch_notified_event(
    calendar: &GoogleCalendar,
    access_token: &str,
    calendar_id: &str,
    event_id: &str,
    state: Option<&ResourceState>,
) -> Result<CalendarEvent> {
    match calendar.get_event(access_token, calendar_id, event_id).await {
        Ok(event) => Ok(event),
        Err(err)
            if state == Some(&ResourceState::Deleted)
                && err
                    .downcast_ref::<GoogleApiError>()
                    .is_some_and(GoogleApiError::is_gone) =>
        {
            tracing::warn!("Deleted event {} is gone upstream, sending id only", event_id);
            Ok(CalendarEvent {
                id: Some(event_id.to_string()),
                status: Some(String::from("cancelled")),
                ..Default::default()
            })
        }
        Err(err) => Err(err),
    }
}

/// Validate a notification against its sync config and mirror the event
/// to the backend.
pub async fn process_notification(
    config: &AppConfig,
    db: &Connection,
    calendar: &GoogleCalendar,
    backend: &dyn SchedulerBackend,
    notification: &WebhookNotification,
) -> Result<WebhookOutcome> {
    let channel = notification.channel.to_string();
    let sync_config = find_sync_config(db, notification.channel.config_id)
        .await?
        .ok_or_else(|| WebhookError::UnknownChannel(channel.clone()))?;
    notification.authorize(&sync_config)?;

    if !sync_config.is_sync_enabled {
        tracing::info!("Sync disabled for config {}, ignoring notification", sync_config.id);
        return Ok(WebhookOutcome::Ignored);
    }
    let state = notification.resource_state.as_ref();
    if state == Some(&ResourceState::Sync) {
        tracing::info!("Channel {} handshake received", channel);
        return Ok(WebhookOutcome::Acknowledged);
    }
    let event_id = notification
        .event_id
        .as_deref()
        .ok_or(WebhookError::MissingHeader(EVENT_ID_HEADER))?;

    let session = open_config_session(config, db, &sync_config).await?;
    let event = fetch_notified_event(
        calendar,
        session.access_token(),
        &sync_config.calendar_id,
        event_id,
        state,
    )
    .await?;

    let defaults = SyncDefaults::new(&sync_config.email, config);
    let mapped = to_backend_event(&event, &defaults, Utc::now());
    let parent_id = event.recurring_event_id.clone();
    let command = SyncCommand::from_state(state, event_id, mapped, parent_id);
    let ack = command.dispatch(backend).await?;
    tracing::info!("Dispatched {} for event {}", command.action(), event_id);

    Ok(WebhookOutcome::Dispatched {
        action: command.action().to_string(),
        ack,
    })
}
