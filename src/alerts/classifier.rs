//! Water level classification.
//!
//! Raw sensor units are centimeters; levels are defined in meters over these
//! intervals:
//!
//! | level      | meters        |
//! |------------|---------------|
//! | `safe`     | `[0, 0.1)`    |
//! | `warning`  | `[0.1, 0.3)`  |
//! | `floating` | `[0.3, 0.6]`  |
//! | `critical` | `(0.6, ∞)`    |

use serde::{Deserialize, Serialize};

// ---

pub const WARNING_FROM_M: f64 = 0.1;
pub const FLOATING_FROM_M: f64 = 0.3;
pub const CRITICAL_ABOVE_M: f64 = 0.6;

/// Threshold pair attached to every emitted alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

pub const ALERT_THRESHOLDS: Thresholds = Thresholds {
    warning: FLOATING_FROM_M,
    critical: CRITICAL_ABOVE_M,
};

/// Severity of a water level reading, ordered `Safe < Warning < Floating < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Safe,
    Warning,
    Floating,
    Critical,
}

impl AlertLevel {
    // ---
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "safe",
            AlertLevel::Warning => "warning",
            AlertLevel::Floating => "floating",
            AlertLevel::Critical => "critical",
        }
    }

    /// Operator-facing message for an alert entering this level.
    pub fn message(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "Water level back within the safe range",
            AlertLevel::Warning => "Water level rising, monitor the area",
            AlertLevel::Floating => "Water level high enough to float vehicles",
            AlertLevel::Critical => "Critical water level, evacuate the area",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AlertLevel::Safe => "#2e7d32",
            AlertLevel::Warning => "#f9a825",
            AlertLevel::Floating => "#ef6c00",
            AlertLevel::Critical => "#c62828",
        }
    }

    pub fn is_elevated(&self) -> bool {
        *self > AlertLevel::Safe
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert raw sensor units to meters.
pub fn to_meters(raw: f64) -> f64 {
    raw / 100.0
}

/// Classify a raw water level reading.
///
/// Values below zero never reach this point from the feed (they are rejected
/// as malformed); if passed directly they classify as `Safe`.
pub fn classify(raw: f64) -> AlertLevel {
    classify_meters(to_meters(raw))
}

pub fn classify_meters(meters: f64) -> AlertLevel {
    // ---
    if meters > CRITICAL_ABOVE_M {
        AlertLevel::Critical
    } else if meters >= FLOATING_FROM_M {
        AlertLevel::Floating
    } else if meters >= WARNING_FROM_M {
        AlertLevel::Warning
    } else {
        AlertLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_boundaries_are_exact() {
        // ---
        assert_eq!(classify(0.0), AlertLevel::Safe);
        assert_eq!(classify(9.99), AlertLevel::Safe);
        assert_eq!(classify(10.0), AlertLevel::Warning);
        assert_eq!(classify(29.99), AlertLevel::Warning);
        assert_eq!(classify(30.0), AlertLevel::Floating);
        assert_eq!(classify(60.0), AlertLevel::Floating);
        assert_eq!(classify(60.01), AlertLevel::Critical);
        assert_eq!(classify(1_000.0), AlertLevel::Critical);
    }

    #[test]
    fn test_classify_is_monotonic() {
        // ---
        let mut previous = classify(0.0);
        let mut raw = 0.0;
        while raw <= 120.0 {
            let level = classify(raw);
            assert!(level >= previous, "severity dropped at raw {raw}");
            previous = level;
            raw += 0.25;
        }
        assert_eq!(previous, AlertLevel::Critical);
    }

    #[test]
    fn test_level_ordering() {
        // ---
        assert!(AlertLevel::Safe < AlertLevel::Warning);
        assert!(AlertLevel::Warning < AlertLevel::Floating);
        assert!(AlertLevel::Floating < AlertLevel::Critical);
        assert!(!AlertLevel::Safe.is_elevated());
        assert!(AlertLevel::Warning.is_elevated());
    }

    #[test]
    fn test_level_serializes_lowercase() {
        // ---
        assert_eq!(serde_json::to_string(&AlertLevel::Floating).unwrap(), "\"floating\"");
    }
}
