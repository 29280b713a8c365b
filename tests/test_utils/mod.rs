//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};
use chrono::{Duration, Utc};
use tempfile::TempDir;
use tokio_rusqlite::Connection;

use calsync::api::AppState;
use calsync::api::app;
use calsync::core::AppConfig;
use calsync::core::db::open_initialized_db;
use calsync::google::oauth::StoredToken;
use calsync::google::session::{save_token, save_user_email};
use calsync::sync::db::{update_sync_channel, upsert_sync_config};
use calsync::sync::models::{ChannelRegistration, GOOGLE_PROVIDER, NewSyncConfig, SyncConfig};

pub const TEST_EMAIL: &str = "someone@example.com";
pub const CHANNEL_TOKEN: &str = "channel-secret";

pub struct TestApp {
    pub app: Router,
    pub db: Connection,
    pub config: AppConfig,
    // Dropping the dir removes the storage path
    _dir: TempDir,
}

/// Creates a test application with storage in a temporary directory
/// and every upstream service pointed at `server_url`.
///
/// Tests share the mockito server pool so add a `#[serial]` to the
/// test function or run `cargo test -- --test-threads=1`.
pub async fn test_app(server_url: &str) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage_path = dir.path().to_str().unwrap().to_string();

    let config = AppConfig::with_storage(
        &storage_path,
        AppConfig {
            storage_path: storage_path.clone(),
            db_path: String::new(),
            token_path: String::new(),
            email_path: String::new(),
            google_client_id: String::from("test_client_id"),
            google_client_secret: String::from("test_client_secret"),
            google_redirect_uri: String::from("http://localhost:8080/api/auth/callback"),
            google_api_url: server_url.to_string(),
            google_oauth_url: server_url.to_string(),
            backend_api_url: server_url.to_string(),
            backend_api_token: String::from("test_backend_token"),
            webhook_url: String::from("https://calsync.example.com/api/webhook"),
            tenant_id: String::from("amura"),
            tenant_name: String::from("amura"),
            sync_page_delay_ms: 0,
        },
    );

    let db = open_initialized_db(&config.db_path)
        .await
        .expect("Failed to initialize db");
    let app_state = AppState::new(db.clone(), config.clone());

    TestApp {
        app: app(Arc::new(RwLock::new(app_state))),
        db,
        config,
        _dir: dir,
    }
}

/// Token that stays valid for the duration of a test
pub fn valid_token() -> StoredToken {
    StoredToken {
        access_token: String::from("test_access_token"),
        refresh_token: Some(String::from("test_refresh_token")),
        expiry_date: Some((Utc::now() + Duration::hours(1)).timestamp_millis()),
        scope: None,
        token_type: Some(String::from("Bearer")),
    }
}

/// Insert a sync config for the primary calendar with a registered
/// channel `<id>_abc` using [`CHANNEL_TOKEN`].
pub async fn seed_sync_config(db: &Connection, is_sync_enabled: bool) -> SyncConfig {
    let mut saved = upsert_sync_config(
        db,
        NewSyncConfig {
            calendar_id: String::from("primary"),
            email: String::from(TEST_EMAIL),
            provider: String::from(GOOGLE_PROVIDER),
            token: valid_token(),
            is_sync_enabled,
            last_sync_time: None,
        },
    )
    .await
    .expect("Failed to seed sync config");

    let channel = ChannelRegistration {
        channel_id: format!("{}_abc", saved.id),
        channel_token: String::from(CHANNEL_TOKEN),
        resource_id: String::from("test_resource"),
        expiration: Some(Utc::now() + Duration::days(7)),
    };
    update_sync_channel(db, saved.id, &channel)
        .await
        .expect("Failed to seed channel");
    saved.channel = Some(channel);
    saved
}

/// Write the token and email files of an authenticated user
pub async fn seed_session(config: &AppConfig) {
    save_token(&config.token_path, &valid_token())
        .await
        .expect("Failed to write token");
    save_user_email(&config.email_path, TEST_EMAIL)
        .await
        .expect("Failed to write email");
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
