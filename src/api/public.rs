//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::sync::webhook::WebhookError;

// Errors

/// Client errors raised by the handlers themselves
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Missing required field {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    NotFound(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MissingField(_) => StatusCode::BAD_REQUEST,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<WebhookError>() {
            return err.status();
        }
        if let Some(err) = self.0.downcast_ref::<RequestError>() {
            return err.status();
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
            return (status, format!("Something went wrong: {}", self.0)).into_response();
        }

        tracing::warn!("Rejected request ({}): {}", status, self.0);
        (status, self.0.to_string()).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod auth {
    pub use crate::api::routes::auth::public::*;
}

pub mod events {
    pub use crate::api::routes::events::public::*;
}

pub mod sync {
    pub use crate::api::routes::sync::public::*;
}

pub mod webhook {
    pub use crate::api::routes::webhook::public::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_maps_errors_to_status() {
        let err = ApiError::from(RequestError::MissingField("event_id"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(WebhookError::UnknownChannel(String::from("1_abc")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn it_keeps_status_through_context() {
        let err: anyhow::Error = WebhookError::TokenMismatch(String::from("1_abc")).into();
        let err = ApiError::from(err.context("Handling notification"));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
