//! Handoff of geofence changes to the external persistence service.
//!
//! The engine never waits on this: it pushes [`ShapeChange`]s into a channel
//! and a separate task forwards them over HTTP.

use reqwest::Client;
use tokio::sync::mpsc;

use crate::geofence::{GeofenceShape, ShapeId};

// ---

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeChange {
    Committed(GeofenceShape),
    Updated(GeofenceShape),
    Deleted(ShapeId),
}

/// Forward shape changes until every sender is dropped.
///
/// With no `sink_url` the changes are only logged. Failed requests are logged
/// and dropped; retry and backoff belong to the persistence service.
pub async fn run(mut rx: mpsc::UnboundedReceiver<ShapeChange>, sink_url: Option<String>) {
    // ---
    let client = Client::new();
    while let Some(change) = rx.recv().await {
        let Some(base) = sink_url.as_deref() else {
            tracing::info!(?change, "geofence change (no sink configured)");
            continue;
        };
        if let Err(e) = forward(&client, base, &change).await {
            tracing::error!("Failed to persist geofence change {:?}: {}", change, e);
        }
    }
    tracing::debug!("geofence sink stopped");
}

async fn forward(client: &Client, base: &str, change: &ShapeChange) -> Result<(), reqwest::Error> {
    // ---
    let base = base.trim_end_matches('/');
    let request = match change {
        ShapeChange::Committed(shape) => client.post(base).json(shape),
        ShapeChange::Updated(shape) => client.put(format!("{}/{}", base, shape.id)).json(shape),
        ShapeChange::Deleted(id) => client.delete(format!("{}/{}", base, id)),
    };
    let response = request.send().await?.error_for_status()?;
    tracing::debug!(status = %response.status(), "geofence change persisted");
    Ok(())
}
