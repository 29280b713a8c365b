//! Router for the webhook API

use std::sync::{Arc, RwLock};

use axum::{Json, Router, extract::State};
use http::HeaderMap;

use super::public;
use crate::api::public::{ApiError, RequestError};
use crate::api::state::AppState;
use crate::google::session::open_file_session;
use crate::sync::channel::register_channel;
use crate::sync::db::find_sync_config_by_email;
use crate::sync::onboarding::PRIMARY_CALENDAR;
use crate::sync::webhook::{WebhookNotification, process_notification};

type SharedState = Arc<RwLock<AppState>>;

/// Handle a push notification from Google Calendar
async fn notification_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<public::WebhookOutcome>, ApiError> {
    // Reject malformed channels before touching the db or the network
    let notification = WebhookNotification::from_headers(&headers)?;
    tracing::debug!("Received notification: {:?}", notification);

    let (db, config, calendar, backend) = {
        let shared_state = state.read().expect("Unable to read share state");
        (
            shared_state.db.clone(),
            shared_state.config.clone(),
            shared_state.calendar(),
            shared_state.backend(),
        )
    };

    let outcome = process_notification(&config, &db, &calendar, &backend, &notification).await?;
    Ok(Json(outcome))
}

/// Register a push channel for the authenticated user's primary calendar
async fn watch_handler(
    State(state): State<SharedState>,
) -> Result<Json<public::WatchResponse>, ApiError> {
    let (db, config, calendar) = {
        let shared_state = state.read().expect("Unable to read share state");
        (
            shared_state.db.clone(),
            shared_state.config.clone(),
            shared_state.calendar(),
        )
    };

    let (session, email) = open_file_session(&config).await?;
    let sync_config = find_sync_config_by_email(&db, &email, PRIMARY_CALENDAR)
        .await?
        .ok_or_else(|| RequestError::NotFound(format!("No sync config for {}", email)))?;

    let registration = register_channel(&config, &db, &calendar, &session, &sync_config).await?;
    Ok(Json(public::WatchResponse {
        channel_id: registration.channel_id,
        resource_id: registration.resource_id,
        expiration: registration.expiration,
    }))
}

/// Create the webhook router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", axum::routing::post(notification_handler))
        .route("/watch", axum::routing::get(watch_handler))
}
