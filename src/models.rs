//! Data models for devices and the telemetry they push.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    // ---
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    // ---
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Hardware model reported by the platform for a device.
///
/// Unrecognized identifiers are kept verbatim in `Unknown` so that a model
/// added on the platform side still renders (with the default spec) before
/// this table learns about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceModel {
    GpsTracker,
    VehicleTracker,
    PersonalTracker,
    WaterLevelSensor,
    FloodGauge,
    Unknown(String),
}

impl DeviceModel {
    // ---
    pub fn as_str(&self) -> &str {
        match self {
            DeviceModel::GpsTracker => "gps-tracker",
            DeviceModel::VehicleTracker => "vehicle-tracker",
            DeviceModel::PersonalTracker => "personal-tracker",
            DeviceModel::WaterLevelSensor => "water-level-sensor",
            DeviceModel::FloodGauge => "flood-gauge",
            DeviceModel::Unknown(name) => name,
        }
    }
}

impl From<&str> for DeviceModel {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gps-tracker" => DeviceModel::GpsTracker,
            "vehicle-tracker" => DeviceModel::VehicleTracker,
            "personal-tracker" => DeviceModel::PersonalTracker,
            "water-level-sensor" => DeviceModel::WaterLevelSensor,
            "flood-gauge" => DeviceModel::FloodGauge,
            _ => DeviceModel::Unknown(value.to_string()),
        }
    }
}

impl From<String> for DeviceModel {
    fn from(value: String) -> Self {
        DeviceModel::from(value.as_str())
    }
}

impl From<DeviceModel> for String {
    fn from(value: DeviceModel) -> Self {
        value.as_str().to_string()
    }
}

/// A field device as currently known from the telemetry feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    // ---
    pub id: String,
    /// Platform entity identifier; alerts fall back to `id` when absent.
    pub entity_id: Option<String>,
    pub device_model: DeviceModel,
    pub position: Option<LngLat>,
    /// Latest water level in meters.
    pub water_level: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    // ---
    pub fn new(id: impl Into<String>, device_model: DeviceModel) -> Self {
        Self {
            id: id.into(),
            entity_id: None,
            device_model,
            position: None,
            water_level: None,
            last_seen: None,
        }
    }

    pub fn entity_id(&self) -> &str {
        self.entity_id.as_deref().unwrap_or(&self.id)
    }
}

/// Device registration as delivered by the platform collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRegistration {
    // ---
    pub id: String,
    pub device_model: DeviceModel,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Raw telemetry record from the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    // ---
    pub device_id: String,
    pub metric: String,
    pub value: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Validated measurement carried by a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Raw sensor units; divide by 100 for meters.
    WaterLevel(f64),
    Position(LngLat),
}

/// Telemetry record that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    // ---
    pub device_id: String,
    pub measurement: Measurement,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    // ---
    /// Parse one record of a push payload. A record that does not have the
    /// wire shape is a [`CoreError::MalformedReading`] like any bad value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        // ---
        let device_id = value
            .get("device_id")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        serde_json::from_value(value).map_err(|e| CoreError::malformed(device_id, e.to_string()))
    }

    /// Validate the record into a typed reading.
    ///
    /// Unsupported metrics, non-numeric values and out-of-range values all
    /// come back as [`CoreError::MalformedReading`].
    pub fn to_reading(&self) -> Result<SensorReading, CoreError> {
        // ---
        let measurement = match self.metric.as_str() {
            "water_level" => {
                let raw = self.value.as_f64().ok_or_else(|| {
                    CoreError::malformed(&self.device_id, format!("non-numeric water level {}", self.value))
                })?;
                if !raw.is_finite() || raw < 0.0 {
                    return Err(CoreError::malformed(
                        &self.device_id,
                        format!("water level {raw} out of range"),
                    ));
                }
                Measurement::WaterLevel(raw)
            }
            "position" => {
                let lat = self.value.get("latitude").and_then(|v| v.as_f64());
                let lng = self.value.get("longitude").and_then(|v| v.as_f64());
                let (Some(lat), Some(lng)) = (lat, lng) else {
                    return Err(CoreError::malformed(
                        &self.device_id,
                        format!("position needs numeric latitude and longitude, got {}", self.value),
                    ));
                };
                let point = LngLat::new(lng, lat);
                if !point.is_valid() {
                    return Err(CoreError::malformed(
                        &self.device_id,
                        format!("position ({lat}, {lng}) out of range"),
                    ));
                }
                Measurement::Position(point)
            }
            other => {
                return Err(CoreError::malformed(
                    &self.device_id,
                    format!("unsupported metric '{other}'"),
                ))
            }
        };

        Ok(SensorReading {
            device_id: self.device_id.clone(),
            measurement,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_record(metric: &str, value: serde_json::Value) -> TelemetryRecord {
        // ---
        TelemetryRecord {
            device_id: "D1".to_string(),
            metric: metric.to_string(),
            value,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_from_json() {
        // ---
        let record = TelemetryRecord::from_json(json!({
            "device_id": "D1",
            "metric": "water_level",
            "value": 45,
            "timestamp": "2025-03-26T18:45:00Z",
        }))
        .unwrap();
        assert_eq!(record.device_id, "D1");

        let err = TelemetryRecord::from_json(json!({
            "device_id": "D1",
            "metric": "water_level",
            "value": 70,
            "timestamp": "not-a-time",
        }))
        .unwrap_err();
        assert!(matches!(err, CoreError::MalformedReading { ref device_id, .. } if device_id == "D1"));

        let err = TelemetryRecord::from_json(json!({"device_id": 7})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedReading { ref device_id, .. } if device_id == "<unknown>"));
    }

    #[test]
    fn test_water_level_record() {
        // ---
        let reading = create_test_record("water_level", json!(45)).to_reading().unwrap();
        assert_eq!(reading.device_id, "D1");
        assert_eq!(reading.measurement, Measurement::WaterLevel(45.0));
    }

    #[test]
    fn test_position_record() {
        // ---
        let record = create_test_record("position", json!({"latitude": 45.81, "longitude": 15.97}));
        let reading = record.to_reading().unwrap();
        assert_eq!(reading.measurement, Measurement::Position(LngLat::new(15.97, 45.81)));
    }

    #[test]
    fn test_malformed_records() {
        // ---
        let cases = [
            create_test_record("water_level", json!("high")),
            create_test_record("water_level", json!(-1.0)),
            create_test_record("position", json!({"latitude": 91.0, "longitude": 0.0})),
            create_test_record("position", json!({"latitude": 10.0})),
            create_test_record("temperature", json!(20.0)),
        ];
        for record in cases {
            assert!(
                matches!(record.to_reading(), Err(CoreError::MalformedReading { .. })),
                "expected malformed: {:?}",
                record
            );
        }
    }

    #[test]
    fn test_device_model_parsing() {
        // ---
        assert_eq!(DeviceModel::from("gps-tracker"), DeviceModel::GpsTracker);
        assert_eq!(DeviceModel::from("Flood-Gauge"), DeviceModel::FloodGauge);
        assert_eq!(
            DeviceModel::from("drone-x"),
            DeviceModel::Unknown("drone-x".to_string())
        );

        let parsed: DeviceModel = serde_json::from_str("\"water-level-sensor\"").unwrap();
        assert_eq!(parsed, DeviceModel::WaterLevelSensor);
        assert_eq!(serde_json::to_string(&DeviceModel::VehicleTracker).unwrap(), "\"vehicle-tracker\"");
    }

    #[test]
    fn test_entity_id_fallback() {
        // ---
        let mut device = Device::new("D1", DeviceModel::FloodGauge);
        assert_eq!(device.entity_id(), "D1");
        device.entity_id = Some("ent-9".to_string());
        assert_eq!(device.entity_id(), "ent-9");
    }
}
