//! Router for the historical sync API

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json};

use super::public;
use crate::api::public::{ApiError, RequestError};
use crate::api::state::AppState;
use crate::google::session::open_file_session;
use crate::sync::db::find_sync_config_by_email;
use crate::sync::history::sync_history;
use crate::sync::onboarding::PRIMARY_CALENDAR;

type SharedState = Arc<RwLock<AppState>>;

/// Copy every past event of the authenticated user's primary calendar
/// into the backend
async fn sync_handler(
    State(state): State<SharedState>,
) -> Result<Json<public::SyncReport>, ApiError> {
    let (db, config, calendar, backend) = {
        let shared_state = state.read().expect("Unable to read share state");
        (
            shared_state.db.clone(),
            shared_state.config.clone(),
            shared_state.calendar(),
            shared_state.backend(),
        )
    };

    let (mut session, email) = open_file_session(&config).await?;
    let sync_config = find_sync_config_by_email(&db, &email, PRIMARY_CALENDAR)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("No sync config for {}", email)))?;

    let report = sync_history(&config, &db, &calendar, &backend, &mut session, &sync_config).await?;
    Ok(Json(report))
}

/// Create the sync router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::get(sync_handler))
}
