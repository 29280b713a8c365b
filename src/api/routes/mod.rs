//! API routes module

pub mod auth;
pub mod events;
pub mod sync;
pub mod webhook;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // OAuth consent and callback
        .nest("/auth", auth::router())
        // Historical sync
        .nest("/sync", sync::router())
        // Push notifications from Google
        .nest("/webhook", webhook::router())
        // Event CRUD proxy
        .nest("/events", events::router())
}
