//! Overlay composition: current state in, render plan out.
//!
//! [`compose`] is a pure projection. It reads devices, active alerts, the
//! committed geofences and the clock's elapsed time, and emits layers in a
//! fixed order: base map, geofences, markers, alert halos. Halos go last so a
//! critical alert is never covered by a marker or shape.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::alerts::{classify_meters, Alert, AlertLevel};
use crate::clock::{Pulse, PulseFrame};
use crate::geofence::{GeofenceShape, Geometry, ShapeId, Tool};
use crate::models::{Device, LngLat};
use crate::render_spec::{resolve, DeviceRenderSpec};

// ---

pub const UNCLASSIFIED_COLOR: &str = "#607d8b";

const ELEVATED_PULSE: Pulse = Pulse::new(2.0, 1.0, 2.5);
const CRITICAL_PULSE: Pulse = Pulse::new(1.0, 1.0, 3.0);

/// Geographic bounds `west,south,east,north` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    // ---
    pub fn contains(&self, p: LngLat) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        let parts: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid bounding box '{s}': {e}"))?;
        let &[west, south, east, north] = parts.as_slice() else {
            return Err(format!("bounding box '{s}' needs 4 values, got {}", parts.len()));
        };
        if parts.iter().any(|v| !v.is_finite()) {
            return Err(format!("bounding box '{s}' has a non-finite value"));
        }
        if west > east || south > north {
            return Err(format!("bounding box '{s}' is inverted"));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceFeature {
    pub id: ShapeId,
    pub tool: Tool,
    pub color: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    // ---
    pub device_id: String,
    pub device_model: String,
    pub position: LngLat,
    pub render: DeviceRenderSpec,
    pub level: Option<AlertLevel>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Halo {
    // ---
    pub device_id: String,
    pub level: AlertLevel,
    pub color: String,
    pub position: LngLat,
    pub message: String,
    #[serde(flatten)]
    pub pulse: PulseFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Layer {
    BaseMap { style: String },
    Geofences { features: Vec<GeofenceFeature> },
    Markers { markers: Vec<Marker> },
    AlertHalos { halos: Vec<Halo> },
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::BaseMap { .. } => "base_map",
            Layer::Geofences { .. } => "geofences",
            Layer::Markers { .. } => "markers",
            Layer::AlertHalos { .. } => "alert_halos",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub elapsed_secs: f64,
    pub layers: Vec<Layer>,
}

impl RenderPlan {
    /// Plan with an empty scene, published before the first composition.
    pub fn empty(base_map_style: &str) -> Self {
        compose(&SceneInputs {
            devices: &BTreeMap::new(),
            active_alerts: Vec::new(),
            shapes: &[],
            elapsed_secs: 0.0,
            base_map_style,
            viewport: None,
            editing: None,
        })
    }
}

/// Everything one render pass reads.
#[derive(Debug, Clone)]
pub struct SceneInputs<'a> {
    // ---
    pub devices: &'a BTreeMap<String, Device>,
    pub active_alerts: Vec<&'a Alert>,
    pub shapes: &'a [GeofenceShape],
    pub elapsed_secs: f64,
    pub base_map_style: &'a str,
    pub viewport: Option<BoundingBox>,
    /// Shape under a handle drag, drawn with its uncommitted geometry.
    pub editing: Option<(ShapeId, &'a Geometry)>,
}

fn pulse_for(level: AlertLevel) -> Pulse {
    if level == AlertLevel::Critical {
        CRITICAL_PULSE
    } else {
        ELEVATED_PULSE
    }
}

/// Build the render plan for the current state.
pub fn compose(inputs: &SceneInputs<'_>) -> RenderPlan {
    // ---
    let visible = |p: LngLat| inputs.viewport.map_or(true, |bbox| bbox.contains(p));

    let features = inputs
        .shapes
        .iter()
        .map(|shape| GeofenceFeature {
            id: shape.id,
            tool: shape.tool,
            color: shape.color.clone(),
            geometry: match inputs.editing {
                Some((id, preview)) if id == shape.id => preview.clone(),
                _ => shape.geometry.clone(),
            },
        })
        .collect();

    let markers = inputs
        .devices
        .values()
        .filter_map(|device| {
            let position = device.position.filter(|&p| visible(p))?;
            let level = device.water_level.map(classify_meters);
            Some(Marker {
                device_id: device.id.clone(),
                device_model: device.device_model.as_str().to_string(),
                position,
                render: resolve(&device.device_model),
                level,
                color: level.map_or(UNCLASSIFIED_COLOR, |l| l.color()).to_string(),
            })
        })
        .collect();

    let mut halos: Vec<Halo> = inputs
        .active_alerts
        .iter()
        .filter(|alert| alert.level.is_elevated())
        .filter_map(|alert| {
            let position = inputs
                .devices
                .get(&alert.device_id)
                .and_then(|d| d.position)
                .or(alert.location)
                .filter(|&p| visible(p))?;
            Some(Halo {
                device_id: alert.device_id.clone(),
                level: alert.level,
                color: alert.level.color().to_string(),
                position,
                message: alert.message.clone(),
                pulse: pulse_for(alert.level).sample(inputs.elapsed_secs),
            })
        })
        .collect();
    halos.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.device_id.cmp(&b.device_id)));

    RenderPlan {
        elapsed_secs: inputs.elapsed_secs,
        layers: vec![
            Layer::BaseMap {
                style: inputs.base_map_style.to_string(),
            },
            Layer::Geofences { features },
            Layer::Markers { markers },
            Layer::AlertHalos { halos },
        ],
    }
}
