//! HTTP gateway. Each sibling module exports a subrouter; this module merges
//! them and owns the mapping from engine failures to status codes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use crate::engine::{EngineHandle, EngineUnavailable};

mod alerts;
mod devices;
mod geofences;
mod health;
mod scene;
mod telemetry;

// ---

pub fn router(engine: EngineHandle) -> Router {
    // ---
    Router::new()
        .merge(telemetry::router())
        .merge(devices::router())
        .merge(alerts::router())
        .merge(geofences::router())
        .merge(scene::router())
        .merge(health::router())
        .with_state(engine)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Failure of a request, rendered as `{"error": ...}`.
#[derive(Debug)]
pub(crate) enum ApiError {
    Unavailable,
    BadRequest(String),
    Conflict(String),
}

impl From<EngineUnavailable> for ApiError {
    fn from(_: EngineUnavailable) -> Self {
        ApiError::Unavailable
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, error) = match self {
            ApiError::Unavailable => {
                tracing::error!("live map engine is unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, EngineUnavailable.to_string())
            }
            ApiError::BadRequest(reason) => {
                tracing::warn!("Rejected request body: {}", reason);
                (StatusCode::BAD_REQUEST, reason)
            }
            ApiError::Conflict(reason) => (StatusCode::CONFLICT, reason),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;
