//! Edge-triggered alert emission.
//!
//! The emitter remembers the last level seen per device and produces an
//! [`Alert`] only when a new reading lands on a different level. A device with
//! no history is treated as `safe`, so a first reading at `safe` is silent and
//! a first reading above it alerts. De-escalations (including the return to
//! `safe`) are transitions and alert too.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::classifier::{classify, to_meters, AlertLevel, Thresholds, ALERT_THRESHOLDS};
use crate::models::{Device, LngLat};

// ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    // ---
    pub id: Uuid,
    pub device_id: String,
    pub entity_id: String,
    pub level: AlertLevel,
    pub previous: AlertLevel,
    pub message: String,
    pub threshold: Thresholds,
    pub water_level_m: f64,
    pub reported_at: DateTime<Utc>,
    pub location: Option<LngLat>,
}

#[derive(Debug)]
pub struct AlertEmitter {
    // ---
    last_level: HashMap<String, AlertLevel>,
    /// Latest alert per device, for the overlay.
    latest: HashMap<String, Alert>,
    log: VecDeque<Alert>,
    log_capacity: usize,
}

impl AlertEmitter {
    // ---
    pub fn new(log_capacity: usize) -> Self {
        Self {
            last_level: HashMap::new(),
            latest: HashMap::new(),
            log: VecDeque::new(),
            log_capacity,
        }
    }

    /// Record a raw water level for `device` and return the alert if the
    /// derived level differs from the one previously known.
    pub fn observe(&mut self, device: &Device, raw: f64, reported_at: DateTime<Utc>) -> Option<Alert> {
        // ---
        let level = classify(raw);
        let previous = self
            .last_level
            .insert(device.id.clone(), level)
            .unwrap_or(AlertLevel::Safe);

        if previous == level {
            return None;
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            device_id: device.id.clone(),
            entity_id: device.entity_id().to_string(),
            level,
            previous,
            message: level.message().to_string(),
            threshold: ALERT_THRESHOLDS,
            water_level_m: to_meters(raw),
            reported_at,
            location: device.position,
        };

        tracing::info!(
            device_id = %alert.device_id,
            from = %previous,
            to = %level,
            water_level_m = alert.water_level_m,
            "alert level transition"
        );

        self.latest.insert(device.id.clone(), alert.clone());
        if self.log_capacity > 0 {
            if self.log.len() == self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(alert.clone());
        }
        Some(alert)
    }

    pub fn level_of(&self, device_id: &str) -> Option<AlertLevel> {
        self.last_level.get(device_id).copied()
    }

    /// Latest alert of every device currently above `safe`.
    pub fn active_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.latest.values().filter(|a| a.level.is_elevated())
    }

    /// Emitted alerts, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.log.iter()
    }

    /// Keep the location of a device's active alert in step with its position.
    pub fn relocate(&mut self, device_id: &str, position: LngLat) {
        if let Some(alert) = self.latest.get_mut(device_id) {
            alert.location = Some(position);
        }
    }
}
