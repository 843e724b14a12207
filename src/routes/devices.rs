use axum::{extract::rejection::JsonRejection, extract::State, routing::get, Json, Router};

use super::ApiResult;
use crate::engine::{DeviceView, EngineHandle};
use crate::models::{Device, DeviceRegistration};

// ---

pub fn router() -> Router<EngineHandle> {
    // ---
    Router::new().route("/devices", get(list).post(register))
}

async fn list(State(engine): State<EngineHandle>) -> ApiResult<Vec<DeviceView>> {
    Ok(Json(engine.devices().await?))
}

async fn register(
    State(engine): State<EngineHandle>,
    body: Result<Json<DeviceRegistration>, JsonRejection>,
) -> ApiResult<Device> {
    // ---
    let Json(registration) = body?;
    if registration.id.trim().is_empty() {
        return Err(super::ApiError::BadRequest("device id must not be empty".to_string()));
    }
    Ok(Json(engine.register(registration).await?))
}
