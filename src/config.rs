//! Configuration loader for the `codemetal-livemap` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Every value has a default, so an empty environment
//! yields a working configuration; a value that is present but unparsable is
//! an error.
use std::net::SocketAddr;

use anyhow::{anyhow, Result};

use crate::geofence::EditorSettings;
use crate::overlay::BoundingBox;

/// Parse an optional environment variable into `$ty`, falling back to a default.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional boolean flag (`1|true|yes` / `0|false|no`).
macro_rules! parse_env_bool {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        match $lookup($var_name).as_deref().map(str::trim) {
            None | Some("") => $default,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => return Err(anyhow!("Invalid {}: '{}' is not a boolean", $var_name, other)),
        }
    };
}

pub const DEFAULT_BASE_MAP_STYLE: &str = "https://basemaps.cartocdn.com/gl/dark-matter-gl-style/style.json";

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// HTTP bind address.
    pub listen_addr: SocketAddr,

    /// Animation frame interval in milliseconds.
    pub frame_interval_ms: u64,

    /// Bound of the engine command queue.
    pub command_queue_capacity: usize,

    /// Number of emitted alerts kept for `GET /alerts`.
    pub alert_log_capacity: usize,

    /// Start the animation clock at boot.
    pub pulse_autostart: bool,

    /// Keep the drawing tool selected after a shape is committed.
    pub keep_tool_active: bool,

    /// Drawing color until the operator picks another.
    pub default_draw_color: String,

    /// Hit-test tolerance for selecting shapes and handles, in meters.
    pub hit_tolerance_m: f64,

    /// Endpoint receiving committed geofences; changes are only logged when unset.
    pub geofence_sink_url: Option<String>,

    /// Style URL handed to the renderer for the base map layer.
    pub base_map_style: String,

    /// Only devices inside this box are rendered.
    pub viewport: Option<BoundingBox>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            frame_interval_ms: 16,
            command_queue_capacity: 1024,
            alert_log_capacity: 500,
            pulse_autostart: true,
            keep_tool_active: false,
            default_draw_color: "#3388ff".to_string(),
            hit_tolerance_m: 15.0,
            geofence_sink_url: None,
            base_map_style: DEFAULT_BASE_MAP_STYLE.to_string(),
            viewport: None,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `LISTEN_ADDR` – bind address (default: `0.0.0.0:8080`)
/// - `FRAME_INTERVAL_MS` – animation frame interval (default: 16)
/// - `COMMAND_QUEUE_CAPACITY` – engine queue bound (default: 1024)
/// - `ALERT_LOG_CAPACITY` – alerts kept in memory (default: 500)
/// - `PULSE_AUTOSTART` – start the clock at boot (default: true)
/// - `KEEP_TOOL_ACTIVE` – keep drawing tool after commit (default: false)
/// - `DEFAULT_DRAW_COLOR` – initial drawing color (default: `#3388ff`)
/// - `GEOFENCE_HIT_TOLERANCE_M` – selection tolerance in meters (default: 15)
/// - `GEOFENCE_SINK_URL` – persistence endpoint (default: unset)
/// - `BASE_MAP_STYLE` – base map style URL
/// - `VIEWPORT_BBOX` – `west,south,east,north` (default: unset)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| std::env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let defaults = Config::default();

    let listen_addr = parse_env!(lookup, "LISTEN_ADDR", SocketAddr, defaults.listen_addr);
    let frame_interval_ms = parse_env!(lookup, "FRAME_INTERVAL_MS", u64, defaults.frame_interval_ms);
    let command_queue_capacity =
        parse_env!(lookup, "COMMAND_QUEUE_CAPACITY", usize, defaults.command_queue_capacity);
    let alert_log_capacity = parse_env!(lookup, "ALERT_LOG_CAPACITY", usize, defaults.alert_log_capacity);
    let pulse_autostart = parse_env_bool!(lookup, "PULSE_AUTOSTART", defaults.pulse_autostart);
    let keep_tool_active = parse_env_bool!(lookup, "KEEP_TOOL_ACTIVE", defaults.keep_tool_active);
    let default_draw_color = lookup("DEFAULT_DRAW_COLOR").unwrap_or(defaults.default_draw_color);
    let hit_tolerance_m = parse_env!(lookup, "GEOFENCE_HIT_TOLERANCE_M", f64, defaults.hit_tolerance_m);
    let geofence_sink_url = lookup("GEOFENCE_SINK_URL").filter(|v| !v.trim().is_empty());
    let base_map_style = lookup("BASE_MAP_STYLE").unwrap_or(defaults.base_map_style);
    let viewport = lookup("VIEWPORT_BBOX")
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<BoundingBox>())
        .transpose()
        .map_err(|e| anyhow!("Invalid VIEWPORT_BBOX: {}", e))?;

    if frame_interval_ms == 0 {
        return Err(anyhow!("Invalid FRAME_INTERVAL_MS: must be positive"));
    }
    if command_queue_capacity == 0 {
        return Err(anyhow!("Invalid COMMAND_QUEUE_CAPACITY: must be positive"));
    }
    if !hit_tolerance_m.is_finite() || hit_tolerance_m < 0.0 {
        return Err(anyhow!("Invalid GEOFENCE_HIT_TOLERANCE_M: {}", hit_tolerance_m));
    }

    Ok(Config {
        listen_addr,
        frame_interval_ms,
        command_queue_capacity,
        alert_log_capacity,
        pulse_autostart,
        keep_tool_active,
        default_draw_color,
        hit_tolerance_m,
        geofence_sink_url,
        base_map_style,
        viewport,
    })
}

impl Config {
    /// Settings for the geofence editor.
    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            keep_tool_active: self.keep_tool_active,
            default_color: self.default_draw_color.clone(),
            hit_tolerance_m: self.hit_tolerance_m,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  LISTEN_ADDR              : {}", self.listen_addr);
        tracing::info!("  FRAME_INTERVAL_MS        : {}", self.frame_interval_ms);
        tracing::info!("  COMMAND_QUEUE_CAPACITY   : {}", self.command_queue_capacity);
        tracing::info!("  ALERT_LOG_CAPACITY       : {}", self.alert_log_capacity);
        tracing::info!("  PULSE_AUTOSTART          : {}", self.pulse_autostart);
        tracing::info!("  KEEP_TOOL_ACTIVE         : {}", self.keep_tool_active);
        tracing::info!("  DEFAULT_DRAW_COLOR       : {}", self.default_draw_color);
        tracing::info!("  GEOFENCE_HIT_TOLERANCE_M : {}", self.hit_tolerance_m);
        tracing::info!(
            "  GEOFENCE_SINK_URL        : {}",
            self.geofence_sink_url.as_deref().unwrap_or("(unset, log only)")
        );
        tracing::info!("  BASE_MAP_STYLE           : {}", self.base_map_style);
        tracing::info!("  VIEWPORT_BBOX            : {:?}", self.viewport);
    }
}
