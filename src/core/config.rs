use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub db_path: String,
    pub token_path: String,
    pub email_path: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub google_api_url: String,
    pub google_oauth_url: String,
    pub backend_api_url: String,
    pub backend_api_token: String,
    pub webhook_url: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub sync_page_delay_ms: u64,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("Missing env var {}", name))
}

impl AppConfig {
    /// Build the config from `CALSYNC_*` environment variables.
    ///
    /// Credentials have no defaults and must always be supplied by the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let storage_path = env::var("CALSYNC_STORAGE_PATH").unwrap_or("./".to_string());
        let google_client_id = required("CALSYNC_GOOGLE_CLIENT_ID")?;
        let google_client_secret = required("CALSYNC_GOOGLE_CLIENT_SECRET")?;
        let google_redirect_uri = env::var("CALSYNC_GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/api/auth/callback".to_string());
        let google_api_url = env::var("CALSYNC_GOOGLE_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com".to_string());
        let google_oauth_url = env::var("CALSYNC_GOOGLE_OAUTH_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com".to_string());
        let backend_api_url = required("CALSYNC_BACKEND_URL")?;
        let backend_api_token = required("CALSYNC_BACKEND_TOKEN")?;
        let webhook_url = env::var("CALSYNC_WEBHOOK_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api/webhook".to_string());
        let tenant_id = env::var("CALSYNC_TENANT_ID").unwrap_or_else(|_| "amura".to_string());
        let tenant_name = env::var("CALSYNC_TENANT_NAME").unwrap_or_else(|_| "amura".to_string());
        let sync_page_delay_ms = match env::var("CALSYNC_SYNC_PAGE_DELAY_MS") {
            Ok(val) => val
                .parse()
                .with_context(|| format!("Invalid CALSYNC_SYNC_PAGE_DELAY_MS {}", val))?,
            Err(_) => 1000,
        };

        Ok(Self::with_storage(
            &storage_path,
            Self {
                storage_path: storage_path.clone(),
                db_path: String::new(),
                token_path: String::new(),
                email_path: String::new(),
                google_client_id,
                google_client_secret,
                google_redirect_uri,
                google_api_url,
                google_oauth_url,
                backend_api_url,
                backend_api_token,
                webhook_url,
                tenant_id,
                tenant_name,
                sync_page_delay_ms,
            },
        ))
    }

    /// Point every derived path at `storage_path`.
    pub fn with_storage(storage_path: &str, config: Self) -> Self {
        let storage_path = storage_path.trim_end_matches('/');
        Self {
            storage_path: storage_path.to_string(),
            db_path: format!("{}/db", storage_path),
            token_path: format!("{}/token.json", storage_path),
            email_path: format!("{}/user_email.txt", storage_path),
            ..config
        }
    }

    pub fn sync_page_delay(&self) -> Duration {
        Duration::from_millis(self.sync_page_delay_ms)
    }
}
