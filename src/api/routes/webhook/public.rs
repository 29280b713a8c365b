//! Public types for the webhook API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::sync::webhook::WebhookOutcome;

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchResponse {
    pub channel_id: String,
    pub resource_id: String,
    pub expiration: Option<DateTime<Utc>>,
}
