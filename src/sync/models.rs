use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::SyncSettings;
use crate::google::oauth::StoredToken;

pub const GOOGLE_PROVIDER: &str = "google";

/// Push channel currently registered for a sync config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRegistration {
    pub channel_id: String,
    pub channel_token: String,
    pub resource_id: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl ChannelRegistration {
    /// Channels without a known expiration are never renewed.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.expiration
            .map(|expiration| expiration - now <= window)
            .unwrap_or(false)
    }
}

/// Link between one calendar and the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncConfig {
    pub id: i64,
    pub calendar_id: String,
    pub email: String,
    pub provider: String,
    #[serde(skip_serializing)]
    pub token: StoredToken,
    pub is_sync_enabled: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub channel: Option<ChannelRegistration>,
}

impl SyncConfig {
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            calendar_id: self.calendar_id.clone(),
            email: self.email.clone(),
            provider: self.provider.clone(),
            is_sync_enabled: self.is_sync_enabled,
            last_sync_time: self.last_sync_time,
        }
    }
}

/// Fields for creating or replacing a sync config
#[derive(Debug, Clone)]
pub struct NewSyncConfig {
    pub calendar_id: String,
    pub email: String,
    pub provider: String,
    pub token: StoredToken,
    pub is_sync_enabled: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
}
