//! Public types for the auth API
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub email: String,
    pub sync_config_id: i64,
}
