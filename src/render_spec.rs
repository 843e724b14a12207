//! Device model to render parameters.
//!
//! The table is closed over [`DeviceModel`]; the `Unknown` arm is the default
//! so a device never goes unrendered because its model is new.

use serde::Serialize;

use crate::models::DeviceModel;

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

/// Orientation of the marker model in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRenderSpec {
    // ---
    pub size_scale: f64,
    pub rotation_axis: RotationAxis,
    pub orientation: Orientation,
}

pub const DEFAULT_RENDER_SPEC: DeviceRenderSpec = DeviceRenderSpec {
    size_scale: 1.0,
    rotation_axis: RotationAxis::Z,
    orientation: Orientation {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    },
};

/// Resolve the render spec for a device model. Total and side-effect free.
pub fn resolve(model: &DeviceModel) -> DeviceRenderSpec {
    // ---
    match model {
        DeviceModel::GpsTracker => DeviceRenderSpec {
            size_scale: 0.8,
            rotation_axis: RotationAxis::Z,
            orientation: Orientation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
        },
        DeviceModel::VehicleTracker => DeviceRenderSpec {
            size_scale: 1.4,
            rotation_axis: RotationAxis::Z,
            orientation: Orientation {
                pitch: 0.0,
                yaw: 90.0,
                roll: 0.0,
            },
        },
        DeviceModel::PersonalTracker => DeviceRenderSpec {
            size_scale: 0.6,
            rotation_axis: RotationAxis::Y,
            orientation: Orientation {
                pitch: 0.0,
                yaw: 0.0,
                roll: 0.0,
            },
        },
        DeviceModel::WaterLevelSensor => DeviceRenderSpec {
            size_scale: 1.0,
            rotation_axis: RotationAxis::X,
            orientation: Orientation {
                pitch: 90.0,
                yaw: 0.0,
                roll: 0.0,
            },
        },
        DeviceModel::FloodGauge => DeviceRenderSpec {
            size_scale: 1.2,
            rotation_axis: RotationAxis::X,
            orientation: Orientation {
                pitch: 90.0,
                yaw: 0.0,
                roll: 180.0,
            },
        },
        DeviceModel::Unknown(_) => DEFAULT_RENDER_SPEC,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_known_models_resolve() {
        // ---
        assert_eq!(resolve(&DeviceModel::VehicleTracker).size_scale, 1.4);
        assert_eq!(resolve(&DeviceModel::WaterLevelSensor).rotation_axis, RotationAxis::X);
        assert_eq!(resolve(&DeviceModel::FloodGauge).orientation.roll, 180.0);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        // ---
        for name in ["", "drone-x", "GPS tracker v2", "🚤"] {
            let spec = resolve(&DeviceModel::from(name));
            assert_eq!(spec, DEFAULT_RENDER_SPEC, "model {name:?}");
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        // ---
        for model in [
            DeviceModel::GpsTracker,
            DeviceModel::PersonalTracker,
            DeviceModel::Unknown("x".into()),
        ] {
            assert_eq!(resolve(&model), resolve(&model));
            assert!(resolve(&model).size_scale > 0.0);
        }
    }
}
