pub mod channel;
pub mod db;
pub mod history;
pub mod mapper;
pub mod models;
pub mod onboarding;
pub mod webhook;

use anyhow::Result;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::google::oauth::OAuthClient;
use crate::google::session::OAuthSession;
use models::SyncConfig;

/// Open a session from the token stored on a sync config. A refreshed
/// token is written back to the config.
pub async fn open_config_session(
    config: &AppConfig,
    db: &Connection,
    sync_config: &SyncConfig,
) -> Result<OAuthSession> {
    let mut session = OAuthSession::new(OAuthClient::from_config(config), sync_config.token.clone());
    if session.ensure_fresh().await? {
        db::update_sync_config_token(db, sync_config.id, session.token()).await?;
        tracing::debug!("Stored refreshed token for sync config {}", sync_config.id);
    }
    Ok(session)
}
