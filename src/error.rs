//! Error taxonomy for the live map core.
//!
//! None of these are fatal. Each one is recovered where it is raised: a
//! malformed reading is dropped, an unknown model falls back to the default
//! render spec, a degenerate drawing is discarded and a second clock start is
//! ignored. They exist as values so callers can log them and tests can match
//! on them.

use serde::{Serialize, Serializer};
use thiserror::Error;

// ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Sensor value was not a number, out of range, or for an unsupported metric.
    #[error("malformed reading from device '{device_id}': {reason}")]
    MalformedReading { device_id: String, reason: String },

    /// Device model has no entry in the render table.
    #[error("unknown device model '{0}', using default render spec")]
    UnknownDeviceModel(String),

    /// Drawing gesture produced geometry that cannot be committed.
    #[error("degenerate {tool} geometry: {reason}")]
    DegenerateGeometry { tool: String, reason: String },

    /// Animation clock was started while already running.
    #[error("animation clock is already running")]
    ClockMisuse,
}

impl CoreError {
    // ---
    pub fn malformed(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::MalformedReading {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }

    pub fn degenerate(tool: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        CoreError::DegenerateGeometry {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors reach clients as their message.
impl Serialize for CoreError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
