use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_rusqlite::Connection;

use super::PeriodicJob;
use crate::core::AppConfig;
use crate::google::oauth::OAuthClient;
use crate::google::session::{OAuthSession, load_token, save_token};

/// Keeps the token file of the authenticated user from going stale
#[derive(Debug)]
pub struct RefreshToken;

#[async_trait]
impl PeriodicJob for RefreshToken {
    fn interval(&self) -> Duration {
        // Run every 30 minutes
        Duration::from_secs(60 * 30)
    }

    async fn run_job(&self, config: &AppConfig, _db: &Connection) {
        if !Path::new(&config.token_path).exists() {
            tracing::debug!("No token at {}, skipping refresh", config.token_path);
            return;
        }

        let token = match load_token(&config.token_path).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Failed to load token: {}", e);
                return;
            }
        };

        let mut session = OAuthSession::new(OAuthClient::from_config(config), token);
        match session.ensure_fresh().await {
            Ok(true) => {
                if let Err(e) = save_token(&config.token_path, session.token()).await {
                    tracing::error!("Failed to save refreshed token: {}", e);
                }
            }
            Ok(false) => tracing::debug!("Token still valid"),
            Err(e) => tracing::error!("Error refreshing token via scheduler: {}", e),
        }
    }
}
