//! Renderer-facing output: the published render plan and the clock that
//! animates it.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::{ApiError, ApiResult};
use crate::clock::ClockStatus;
use crate::engine::EngineHandle;
use crate::overlay::RenderPlan;

// ---

pub fn router() -> Router<EngineHandle> {
    // ---
    Router::new()
        .route("/scene", get(scene))
        .route("/clock", get(clock_status))
        .route("/clock/start", post(start_clock))
        .route("/clock/stop", post(stop_clock))
}

/// Latest plan published by the engine. Reads the watch channel directly
/// and never queues behind commands.
async fn scene(State(engine): State<EngineHandle>) -> Json<RenderPlan> {
    Json(engine.plan())
}

async fn clock_status(State(engine): State<EngineHandle>) -> ApiResult<ClockStatus> {
    Ok(Json(engine.clock_status().await?))
}

/// `409` when the clock is already running; the running ramp is untouched.
async fn start_clock(State(engine): State<EngineHandle>) -> ApiResult<ClockStatus> {
    match engine.start_clock().await? {
        Ok(status) => Ok(Json(status)),
        Err(e) => Err(ApiError::Conflict(e.to_string())),
    }
}

async fn stop_clock(State(engine): State<EngineHandle>) -> ApiResult<ClockStatus> {
    Ok(Json(engine.stop_clock().await?))
}
