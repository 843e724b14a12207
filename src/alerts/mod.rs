//! Threshold classification and edge-triggered alert emission.

mod classifier;
mod emitter;

pub use classifier::{
    classify, classify_meters, to_meters, AlertLevel, Thresholds, ALERT_THRESHOLDS,
    CRITICAL_ABOVE_M, FLOATING_FROM_M, WARNING_FROM_M,
};
pub use emitter::{Alert, AlertEmitter};
