use axum::{extract::State, routing::get, Json, Router};

use super::ApiResult;
use crate::alerts::Alert;
use crate::engine::EngineHandle;

// ---

pub fn router() -> Router<EngineHandle> {
    Router::new().route("/alerts", get(handler))
}

/// Emitted alerts, oldest first.
async fn handler(State(engine): State<EngineHandle>) -> ApiResult<Vec<Alert>> {
    Ok(Json(engine.alerts().await?))
}
