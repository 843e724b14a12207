use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::debug;

use super::ApiResult;
use crate::engine::{EngineHandle, GeofenceReply};
use crate::geofence::{EditorEvent, GeofenceShape};

// ---

pub fn router() -> Router<EngineHandle> {
    // ---
    Router::new()
        .route("/geofences", get(list))
        .route("/geofence/events", post(apply_event))
}

async fn list(State(engine): State<EngineHandle>) -> ApiResult<Vec<GeofenceShape>> {
    Ok(Json(engine.geofences().await?))
}

async fn apply_event(
    State(engine): State<EngineHandle>,
    body: Result<Json<EditorEvent>, JsonRejection>,
) -> ApiResult<GeofenceReply> {
    // ---
    let Json(event) = body?;
    debug!(?event, "POST /geofence/events");
    Ok(Json(engine.geofence(event).await?))
}
