//! HTTP client for the scheduler backend
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::models::{BackendEvent, DeleteMetadata, SyncSettings};
use crate::core::AppConfig;

/// Non-success response from the backend, body kept verbatim
#[derive(Debug, thiserror::Error)]
#[error("Backend request failed: {status} ({body})")]
pub struct BackendError {
    pub status: StatusCode,
    pub body: String,
}

/// Operations the sync core needs from the scheduler backend. Each call
/// is a single request with no retry. The returned value is the
/// backend's acknowledgement body.
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    async fn create_event(&self, event: &BackendEvent) -> Result<Value>;
    async fn update_event(&self, event_id: &str, event: &BackendEvent) -> Result<Value>;
    async fn delete_event(&self, event_id: &str, metadata: &DeleteMetadata) -> Result<Value>;
    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<Value>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    event_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_by: Option<&'a str>,
    #[serde(flatten)]
    event: &'a BackendEvent,
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.backend_api_url, &config.backend_api_token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/scheduler/event/{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let res = req.bearer_auth(&self.api_token).send().await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BackendError { status, body: text }.into());
        }
        // Some endpoints acknowledge with plain text
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[async_trait]
impl SchedulerBackend for BackendClient {
    async fn create_event(&self, event: &BackendEvent) -> Result<Value> {
        self.send(self.client.post(self.url("createEvent")).json(event))
            .await
    }

    async fn update_event(&self, event_id: &str, event: &BackendEvent) -> Result<Value> {
        let body = EventBody {
            event_id,
            parent_id: None,
            updated_by: None,
            event,
        };
        self.send(self.client.put(self.url("updateEvent")).json(&body))
            .await
    }

    async fn delete_event(&self, event_id: &str, metadata: &DeleteMetadata) -> Result<Value> {
        let body = EventBody {
            event_id,
            parent_id: metadata.parent_id.as_deref(),
            updated_by: metadata.updated_by.as_deref(),
            event: &metadata.event,
        };
        self.send(self.client.post(self.url("deleteEvent")).json(&body))
            .await
    }

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<Value> {
        self.send(self.client.post(self.url("syncSettings")).json(settings))
            .await
    }
}
