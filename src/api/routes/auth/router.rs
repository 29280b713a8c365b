//! Router for the OAuth consent flow

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    response::{Json, Redirect},
};
use axum_extra::extract::Query;

use super::public;
use crate::api::public::{ApiError, RequestError};
use crate::api::state::AppState;
use crate::google::oauth::OAuthClient;
use crate::sync::onboarding::complete_authorization;

type SharedState = Arc<RwLock<AppState>>;

/// Send the user to the Google consent screen
async fn authorize(State(state): State<SharedState>) -> Redirect {
    let url = {
        let shared_state = state.read().expect("Unable to read share state");
        OAuthClient::from_config(&shared_state.config).authorize_url()
    };
    Redirect::to(&url)
}

async fn callback(
    State(state): State<SharedState>,
    Query(params): Query<public::AuthCallbackQuery>,
) -> Result<Json<public::AuthResponse>, ApiError> {
    let code = params.code.ok_or(RequestError::MissingField("code"))?;
    let (db, config, backend) = {
        let shared_state = state.read().expect("Unable to read share state");
        (
            shared_state.db.clone(),
            shared_state.config.clone(),
            shared_state.backend(),
        )
    };

    let sync_config = complete_authorization(&config, &db, &backend, &code).await?;

    Ok(Json(public::AuthResponse {
        message: String::from("Authentication successful! You can close this window."),
        email: sync_config.email,
        sync_config_id: sync_config.id,
    }))
}

/// Create the auth router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", axum::routing::get(authorize))
        .route("/callback", axum::routing::get(callback))
}
