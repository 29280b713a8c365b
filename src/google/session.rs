//! OAuth session passed explicitly into each calendar call

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Utc};

use super::oauth::{OAuthClient, StoredToken};
use crate::core::AppConfig;

/// Refresh when the access token expires within this window
const REFRESH_MARGIN_SECS: i64 = 60;

pub struct OAuthSession {
    oauth: OAuthClient,
    token: StoredToken,
}

impl OAuthSession {
    pub fn new(oauth: OAuthClient, token: StoredToken) -> Self {
        Self { oauth, token }
    }

    /// Refresh the token if it is about to expire. Returns `true` when the
    /// token changed and the owner needs to persist it.
    pub async fn ensure_fresh(&mut self) -> Result<bool> {
        let now_ms = Utc::now().timestamp_millis();
        if !self
            .token
            .expires_within(now_ms, Duration::seconds(REFRESH_MARGIN_SECS))
        {
            return Ok(false);
        }

        let refresh_token = self.token.refresh_token.clone().ok_or(anyhow!(
            "Access token expired and no refresh token is stored. Please authenticate via /api/auth"
        ))?;
        self.token = self.oauth.refresh(&refresh_token).await?;
        tracing::info!("Access token refreshed");
        Ok(true)
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    pub fn token(&self) -> &StoredToken {
        &self.token
    }
}

pub async fn load_token(path: &str) -> Result<StoredToken> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Token not found at {}. Please authenticate via /api/auth", path))?;
    let token = serde_json::from_str(&content)?;
    Ok(token)
}

pub async fn save_token(path: &str, token: &StoredToken) -> Result<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, serde_json::to_string_pretty(token)?).await?;
    Ok(())
}

pub async fn load_user_email(path: &str) -> Result<String> {
    let email = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("No authenticated user email at {}", path))?;
    Ok(email.trim().to_string())
}

pub async fn save_user_email(path: &str, email: &str) -> Result<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, email).await?;
    Ok(())
}

async fn ensure_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Open a session from the token file, writing the token back if it was
/// refreshed. Returns the session and the authenticated user's email.
pub async fn open_file_session(config: &AppConfig) -> Result<(OAuthSession, String)> {
    let token = load_token(&config.token_path).await?;
    let email = load_user_email(&config.email_path).await?;
    let mut session = OAuthSession::new(OAuthClient::from_config(config), token);
    if session.ensure_fresh().await? {
        save_token(&config.token_path, session.token()).await?;
    }
    Ok((session, email))
}
