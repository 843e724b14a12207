// src/routes/health.rs
//! Liveness endpoint for the live map service.
//!
//! `/health` answers `ok` only when the engine task still takes commands, so
//! orchestrators restart the process if the event loop has died while the
//! HTTP listener keeps accepting connections.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::ApiResult;
use crate::engine::EngineHandle;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    clock_running: bool,
}

/// Handle `GET /health` with a clock status round trip through the engine.
async fn health(State(engine): State<EngineHandle>) -> ApiResult<HealthResponse> {
    let clock = engine.clock_status().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        clock_running: clock.running,
    }))
}

pub fn router() -> Router<EngineHandle> {
    Router::new().route("/health", get(health))
}
