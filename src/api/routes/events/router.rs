//! Router for the events API
//!
//! Writes go to Google Calendar first. Updates and deletes are then
//! mirrored to the backend, creates reach it through the webhook.

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json};
use axum_extra::extract::Query;
use chrono::Utc;

use super::public;
use crate::api::public::{ApiError, RequestError};
use crate::api::state::AppState;
use crate::backend::{BackendClient, DeleteMetadata, SchedulerBackend};
use crate::core::AppConfig;
use crate::google::gcal::{CalendarEvent, GoogleApiError, GoogleCalendar};
use crate::google::session::open_file_session;
use crate::sync::mapper::{SyncDefaults, to_backend_event, to_calendar_event};
use crate::sync::onboarding::PRIMARY_CALENDAR;

type SharedState = Arc<RwLock<AppState>>;

const DEFAULT_MAX_RESULTS: u32 = 10;

fn clients(state: &SharedState) -> (AppConfig, GoogleCalendar, BackendClient) {
    let shared_state = state.read().expect("Unable to read share state");
    (
        shared_state.config.clone(),
        shared_state.calendar(),
        shared_state.backend(),
    )
}

async fn list_events(
    State(state): State<SharedState>,
    Query(params): Query<public::EventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let (config, calendar, _) = clients(&state);
    let (session, _) = open_file_session(&config).await?;
    let calendar_id = params
        .calendar_id
        .unwrap_or_else(|| PRIMARY_CALENDAR.to_string());
    let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);

    let events = calendar
        .list_upcoming(session.access_token(), &calendar_id, max_results)
        .await?;
    if events.is_empty() {
        tracing::info!("No upcoming events found in {}", calendar_id);
    }
    Ok(Json(events))
}

async fn create_event(
    State(state): State<SharedState>,
    Json(req): Json<public::EventRequest>,
) -> Result<Json<public::EventWriteResponse>, ApiError> {
    let (config, calendar, _) = clients(&state);
    let (session, _) = open_file_session(&config).await?;
    let calendar_id = req.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);

    let created = calendar
        .insert_event(session.access_token(), calendar_id, &to_calendar_event(&req))
        .await?;
    tracing::info!("Created event {:?} in {}", created.id, calendar_id);

    Ok(Json(public::EventWriteResponse {
        message: String::from("Event created successfully."),
        google_calendar: Some(created),
        custom_api: None,
    }))
}

async fn update_event(
    State(state): State<SharedState>,
    Json(req): Json<public::EventRequest>,
) -> Result<Json<public::EventWriteResponse>, ApiError> {
    let event_id = req
        .event_id
        .clone()
        .ok_or(RequestError::MissingField("eventId"))?;
    let (config, calendar, backend) = clients(&state);
    let (session, email) = open_file_session(&config).await?;
    let calendar_id = req.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);

    let updated = calendar
        .update_event(
            session.access_token(),
            calendar_id,
            &event_id,
            &to_calendar_event(&req),
        )
        .await?;

    let defaults = SyncDefaults::new(&email, &config);
    let mapped = to_backend_event(&updated, &defaults, Utc::now());
    let ack = backend.update_event(&event_id, &mapped).await?;

    Ok(Json(public::EventWriteResponse {
        message: String::from("Event updated successfully."),
        google_calendar: Some(updated),
        custom_api: Some(ack),
    }))
}

async fn delete_event(
    State(state): State<SharedState>,
    Json(req): Json<public::DeleteEventRequest>,
) -> Result<Json<public::EventWriteResponse>, ApiError> {
    let event_id = req
        .event_id
        .clone()
        .ok_or(RequestError::MissingField("eventId"))?;
    let (config, calendar, backend) = clients(&state);
    let (session, email) = open_file_session(&config).await?;
    let calendar_id = req.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);

    // Fetch before deleting so the backend receives the full event
    let event = match calendar
        .get_event(session.access_token(), calendar_id, &event_id)
        .await
    {
        Ok(event) => {
            calendar
                .delete_event(session.access_token(), calendar_id, &event_id)
                .await?;
            event
        }
        Err(err)
            if err
                .downcast_ref::<GoogleApiError>()
                .is_some_and(GoogleApiError::is_gone) =>
        {
            tracing::warn!("Event {} already gone from Google Calendar", event_id);
            CalendarEvent {
                id: Some(event_id.clone()),
                ..Default::default()
            }
        }
        Err(err) => return Err(err.into()),
    };

    let defaults = SyncDefaults::new(&email, &config);
    let metadata = DeleteMetadata {
        parent_id: req.parent_id.or_else(|| event.recurring_event_id.clone()),
        updated_by: Some(email.clone()),
        event: to_backend_event(&event, &defaults, Utc::now()),
    };
    let ack = backend.delete_event(&event_id, &metadata).await?;

    Ok(Json(public::EventWriteResponse {
        message: String::from("Event deleted successfully"),
        google_calendar: None,
        custom_api: Some(ack),
    }))
}

/// Create the events router
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/",
        axum::routing::get(list_events)
            .post(create_event)
            .put(update_event)
            .delete(delete_event),
    )
}
