//! Google OAuth 2.0 client for the authorization code flow

use anyhow::{Result, bail};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const CALENDAR_SCOPE: &str =
    "https://www.googleapis.com/auth/calendar https://www.googleapis.com/auth/userinfo.email";

/// Token blob persisted to `token.json` and to each sync config.
///
/// Field names match the token file written by Google's Node client so
/// existing files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Milliseconds since the unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl StoredToken {
    /// A token without an expiry is treated as already expired.
    pub fn expires_within(&self, now_ms: i64, margin: Duration) -> bool {
        match self.expiry_date {
            Some(expiry) => now_ms + margin.num_milliseconds() >= expiry,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh_token: Option<&str>) -> StoredToken {
        let expiry_date = self
            .expires_in
            .map(|secs| (Utc::now() + Duration::seconds(secs)).timestamp_millis());
        StoredToken {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous_refresh_token.map(str::to_string)),
            expiry_date,
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OAuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    oauth_url: String,
    api_url: String,
}

impl OAuthClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        oauth_url: &str,
        api_url: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &crate::core::AppConfig) -> Self {
        Self::new(
            &config.google_client_id,
            &config.google_client_secret,
            &config.google_redirect_uri,
            &config.google_oauth_url,
            &config.google_api_url,
        )
    }

    /// Consent screen URL requesting offline access to the calendar.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE)
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let res = self
            .client
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Token exchange failed: {} ({})", status, text);
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(token.into_stored(None))
    }

    /// Use the refresh token to fetch a new access token. Google usually
    /// omits the refresh token on refresh so the previous one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredToken> {
        let res = self
            .client
            .post(format!("{}/token", self.oauth_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Token refresh failed: {} ({})", status, text);
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(token.into_stored(Some(refresh_token)))
    }

    /// Email address of the account that granted `access_token`.
    pub async fn fetch_user_email(&self, access_token: &str) -> Result<String> {
        let res = self
            .client
            .get(format!("{}/oauth2/v2/userinfo", self.api_url))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("User info fetch failed: {} ({})", status, text);
        }
        let info: UserInfo = serde_json::from_str(&text)?;
        match info.email {
            Some(email) if !email.is_empty() => Ok(email),
            _ => bail!("User info response did not include an email"),
        }
    }
}
