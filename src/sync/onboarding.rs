//! Finish the OAuth consent flow and enable sync for the user
use anyhow::Result;
use chrono::Utc;
use tokio_rusqlite::Connection;

use super::db::upsert_sync_config;
use super::models::{GOOGLE_PROVIDER, NewSyncConfig, SyncConfig};
use crate::backend::SchedulerBackend;
use crate::core::AppConfig;
use crate::google::oauth::OAuthClient;
use crate::google::session::{save_token, save_user_email};

pub const PRIMARY_CALENDAR: &str = "primary";

/// Exchange the authorization code, persist the token and the user's
/// email, enable sync for their primary calendar and tell the backend.
pub async fn complete_authorization(
    config: &AppConfig,
    db: &Connection,
    backend: &dyn SchedulerBackend,
    code: &str,
) -> Result<SyncConfig> {
    let oauth = OAuthClient::from_config(config);
    let token = oauth.exchange_code(code).await?;
    save_token(&config.token_path, &token).await?;

    let email = oauth.fetch_user_email(&token.access_token).await?;
    save_user_email(&config.email_path, &email).await?;
    tracing::info!("Authorized {}", email);

    let sync_config = upsert_sync_config(
        db,
        NewSyncConfig {
            calendar_id: String::from(PRIMARY_CALENDAR),
            email,
            provider: String::from(GOOGLE_PROVIDER),
            token,
            is_sync_enabled: true,
            last_sync_time: Some(Utc::now()),
        },
    )
    .await?;

    backend.save_sync_settings(&sync_config.settings()).await?;
    Ok(sync_config)
}
