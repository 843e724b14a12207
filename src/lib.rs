//! Core of the live telemetry map.
//!
//! Device telemetry flows into an engine task that classifies water levels,
//! emits alerts on level transitions, runs the operator's geofence drawing
//! tools and the pulse animation clock, and publishes a layered render plan
//! for the map renderer. The HTTP surface in [`routes`] feeds the engine and
//! exposes its state.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): each module's
//! `mod.rs` (or file) is its gateway, and siblings only see what it re-exports.

use axum::Router;
use tokio::sync::mpsc;

pub mod alerts;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod geofence;
pub mod models;
pub mod overlay;
pub mod render_spec;
pub mod routes;
pub mod sink;

pub use config::Config;
pub use engine::{Engine, EngineHandle};
pub use error::CoreError;

// ---

/// Spawn the engine and the geofence persistence task on the current runtime.
///
/// The persistence task ends on its own once the engine has stopped.
pub fn spawn_engine(config: &Config) -> EngineHandle {
    // ---
    let (sink_tx, sink_rx) = mpsc::unbounded_channel();
    tokio::spawn(sink::run(sink_rx, config.geofence_sink_url.clone()));

    let (engine, handle) = Engine::new(config, Some(sink_tx));
    tokio::spawn(engine.run());
    handle
}

/// Build the full HTTP application backed by a freshly spawned engine.
pub fn app(config: &Config) -> Router {
    routes::router(spawn_engine(config))
}
