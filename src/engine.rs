//! The live map engine.
//!
//! [`LiveMap`] holds all core state: the device table, alert emitter,
//! geofence editor and animation clock. [`Engine`] runs it as a single task
//! that takes one [`Command`] at a time from a bounded queue and processes it
//! to completion, interleaved with animation frames from a fixed interval.
//! The task only suspends on the queue and the frame timer, never inside
//! classification, drawing or composition.
//!
//! After every state change and every frame the render plan is recomposed and
//! published on a `watch` channel for the renderer.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::alerts::{classify_meters, to_meters, Alert, AlertEmitter, AlertLevel};
use crate::clock::{AnimationClock, ClockStatus};
use crate::config::Config;
use crate::error::CoreError;
use crate::geofence::{EditorEvent, EditorOutcome, EditorState, GeofenceEditor, GeofenceShape, ShapeId, Tool};
use crate::models::{Device, DeviceModel, DeviceRegistration, LngLat, Measurement, TelemetryRecord};
use crate::overlay::{compose, BoundingBox, RenderPlan, SceneInputs};
use crate::sink::ShapeChange;

// ---

/// Model assigned to devices that report before they are registered.
pub const UNREGISTERED_MODEL: &str = "unregistered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("live map engine is not running")]
pub struct EngineUnavailable;

/// Device as listed by `GET /devices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub device: Device,
    pub level: Option<AlertLevel>,
}

/// Result of ingesting a batch of telemetry records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub alerts: Vec<Alert>,
    pub errors: Vec<String>,
}

impl IngestReport {
    /// Count a dropped record.
    pub fn reject(&mut self, err: &CoreError) {
        tracing::warn!("Dropping telemetry record: {}", err);
        self.rejected += 1;
        self.errors.push(err.to_string());
    }
}

/// Result of one geofence event, with the editor state it left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceReply {
    pub outcome: EditorOutcome,
    pub state: EditorState,
    pub tool: Option<Tool>,
    pub color: String,
    pub selection: Vec<ShapeId>,
}

#[derive(Debug)]
pub enum Command {
    Telemetry {
        records: Vec<TelemetryRecord>,
        reply: oneshot::Sender<IngestReport>,
    },
    RegisterDevice {
        registration: DeviceRegistration,
        reply: oneshot::Sender<Device>,
    },
    ListDevices {
        reply: oneshot::Sender<Vec<DeviceView>>,
    },
    Geofence {
        event: EditorEvent,
        reply: oneshot::Sender<GeofenceReply>,
    },
    ListGeofences {
        reply: oneshot::Sender<Vec<GeofenceShape>>,
    },
    ListAlerts {
        reply: oneshot::Sender<Vec<Alert>>,
    },
    StartClock {
        reply: oneshot::Sender<Result<ClockStatus, CoreError>>,
    },
    StopClock {
        reply: oneshot::Sender<ClockStatus>,
    },
    ClockStatus {
        reply: oneshot::Sender<ClockStatus>,
    },
}

/// All core state, mutated only by the engine task.
#[derive(Debug)]
pub struct LiveMap {
    // ---
    devices: BTreeMap<String, Device>,
    emitter: AlertEmitter,
    editor: GeofenceEditor,
    clock: AnimationClock,
    pulse_tx: Arc<watch::Sender<f64>>,
    unknown_models: HashSet<String>,
    sink: Option<mpsc::UnboundedSender<ShapeChange>>,
    base_map_style: String,
    viewport: Option<BoundingBox>,
}

impl LiveMap {
    // ---
    pub fn new(config: &Config, sink: Option<mpsc::UnboundedSender<ShapeChange>>) -> Self {
        let (pulse_tx, _) = watch::channel(0.0);
        Self {
            devices: BTreeMap::new(),
            emitter: AlertEmitter::new(config.alert_log_capacity),
            editor: GeofenceEditor::new(config.editor_settings()),
            clock: AnimationClock::new(),
            pulse_tx: Arc::new(pulse_tx),
            unknown_models: HashSet::new(),
            sink,
            base_map_style: config.base_map_style.clone(),
            viewport: config.viewport,
        }
    }

    /// Elapsed seconds published on every animation frame.
    pub fn subscribe_pulse(&self) -> watch::Receiver<f64> {
        self.pulse_tx.subscribe()
    }

    fn note_model(&mut self, model: &DeviceModel) {
        if let DeviceModel::Unknown(name) = model {
            if self.unknown_models.insert(name.clone()) {
                let err = CoreError::UnknownDeviceModel(name.clone());
                tracing::debug!("{}", err);
            }
        }
    }

    /// Register a device or update its model, entity id and position.
    pub fn register(&mut self, registration: DeviceRegistration) -> Device {
        // ---
        self.note_model(&registration.device_model);
        let device = self
            .devices
            .entry(registration.id.clone())
            .or_insert_with(|| Device::new(registration.id.clone(), registration.device_model.clone()));
        device.device_model = registration.device_model;
        if registration.entity_id.is_some() {
            device.entity_id = registration.entity_id;
        }
        if let (Some(lat), Some(lng)) = (registration.latitude, registration.longitude) {
            let position = LngLat::new(lng, lat);
            if position.is_valid() {
                device.position = Some(position);
            } else {
                tracing::warn!(device_id = %device.id, lat, lng, "ignoring invalid registration position");
            }
        }
        tracing::info!(device_id = %device.id, model = device.device_model.as_str(), "device registered");
        device.clone()
    }

    /// Apply one telemetry record. Returns the alert it triggered, if any.
    pub fn ingest(&mut self, record: &TelemetryRecord) -> Result<Option<Alert>, CoreError> {
        // ---
        let reading = record.to_reading()?;
        if !self.devices.contains_key(&reading.device_id) {
            let model = DeviceModel::from(UNREGISTERED_MODEL);
            self.note_model(&model);
            self.devices
                .insert(reading.device_id.clone(), Device::new(reading.device_id.clone(), model));
        }
        let Some(device) = self.devices.get_mut(&reading.device_id) else {
            return Ok(None);
        };
        device.last_seen = Some(reading.timestamp);

        match reading.measurement {
            Measurement::WaterLevel(raw) => {
                device.water_level = Some(to_meters(raw));
                Ok(self.emitter.observe(device, raw, reading.timestamp))
            }
            Measurement::Position(position) => {
                device.position = Some(position);
                self.emitter.relocate(&reading.device_id, position);
                Ok(None)
            }
        }
    }

    /// Ingest a batch, dropping and logging malformed records.
    pub fn ingest_batch(&mut self, records: &[TelemetryRecord]) -> IngestReport {
        // ---
        let mut report = IngestReport::default();
        for record in records {
            match self.ingest(record) {
                Ok(alert) => {
                    report.accepted += 1;
                    report.alerts.extend(alert);
                }
                Err(e) => report.reject(&e),
            }
        }
        report
    }

    pub fn devices(&self) -> Vec<DeviceView> {
        self.devices
            .values()
            .map(|device| DeviceView {
                device: device.clone(),
                level: device.water_level.map(classify_meters),
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.emitter.history().cloned().collect()
    }

    pub fn geofences(&self) -> &[GeofenceShape] {
        self.editor.shapes()
    }

    /// Feed one event to the geofence editor and hand any committed change
    /// to persistence.
    pub fn geofence_event(&mut self, event: EditorEvent) -> GeofenceReply {
        // ---
        let outcome = self.editor.handle(event);
        match &outcome {
            EditorOutcome::Committed(shape) => self.persist(ShapeChange::Committed(shape.clone())),
            EditorOutcome::Updated(shape) => self.persist(ShapeChange::Updated(shape.clone())),
            EditorOutcome::Deleted(ids) => {
                for id in ids {
                    self.persist(ShapeChange::Deleted(*id));
                }
            }
            EditorOutcome::None | EditorOutcome::Rejected(_) => {}
        }
        GeofenceReply {
            outcome,
            state: self.editor.state(),
            tool: self.editor.tool(),
            color: self.editor.color().to_string(),
            selection: self.editor.selection().to_vec(),
        }
    }

    fn persist(&self, change: ShapeChange) {
        if let Some(sink) = &self.sink {
            if sink.send(change).is_err() {
                tracing::error!("geofence sink is gone, change not persisted");
            }
        }
    }

    /// Start the shared clock. A second start is a no-op reported as
    /// [`CoreError::ClockMisuse`].
    pub fn start_clock(&mut self, now: Instant) -> Result<ClockStatus, CoreError> {
        // ---
        let pulse_tx = Arc::clone(&self.pulse_tx);
        let on_tick = Box::new(move |elapsed: f64| {
            pulse_tx.send_replace(elapsed);
        });
        match self.clock.start(now, on_tick) {
            Ok(()) => {
                self.pulse_tx.send_replace(0.0);
                Ok(self.clock.status())
            }
            Err(e) => {
                tracing::warn!("{}", e);
                Err(e)
            }
        }
    }

    pub fn stop_clock(&mut self) -> ClockStatus {
        self.clock.stop();
        self.pulse_tx.send_replace(0.0);
        self.clock.status()
    }

    pub fn clock_status(&self) -> ClockStatus {
        self.clock.status()
    }

    /// Advance the clock to the frame at `now`.
    pub fn frame(&mut self, now: Instant) -> Option<f64> {
        self.clock.tick(now)
    }

    pub fn render_plan(&self) -> RenderPlan {
        compose(&SceneInputs {
            devices: &self.devices,
            active_alerts: self.emitter.active_alerts().collect(),
            shapes: self.editor.shapes(),
            elapsed_secs: self.clock.elapsed_secs(),
            base_map_style: &self.base_map_style,
            viewport: self.viewport,
            editing: self.editor.editing_preview(),
        })
    }
}

/// Cloneable handle used by the HTTP layer to talk to the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    plan_rx: watch::Receiver<RenderPlan>,
    pulse_rx: watch::Receiver<f64>,
}

impl EngineHandle {
    // ---
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineUnavailable> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| EngineUnavailable)?;
        rx.await.map_err(|_| EngineUnavailable)
    }

    pub async fn ingest(&self, records: Vec<TelemetryRecord>) -> Result<IngestReport, EngineUnavailable> {
        self.request(|reply| Command::Telemetry { records, reply }).await
    }

    pub async fn register(&self, registration: DeviceRegistration) -> Result<Device, EngineUnavailable> {
        self.request(|reply| Command::RegisterDevice { registration, reply })
            .await
    }

    pub async fn devices(&self) -> Result<Vec<DeviceView>, EngineUnavailable> {
        self.request(|reply| Command::ListDevices { reply }).await
    }

    pub async fn geofence(&self, event: EditorEvent) -> Result<GeofenceReply, EngineUnavailable> {
        self.request(|reply| Command::Geofence { event, reply }).await
    }

    pub async fn geofences(&self) -> Result<Vec<GeofenceShape>, EngineUnavailable> {
        self.request(|reply| Command::ListGeofences { reply }).await
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>, EngineUnavailable> {
        self.request(|reply| Command::ListAlerts { reply }).await
    }

    pub async fn start_clock(&self) -> Result<Result<ClockStatus, CoreError>, EngineUnavailable> {
        self.request(|reply| Command::StartClock { reply }).await
    }

    pub async fn stop_clock(&self) -> Result<ClockStatus, EngineUnavailable> {
        self.request(|reply| Command::StopClock { reply }).await
    }

    pub async fn clock_status(&self) -> Result<ClockStatus, EngineUnavailable> {
        self.request(|reply| Command::ClockStatus { reply }).await
    }

    /// Latest published render plan.
    pub fn plan(&self) -> RenderPlan {
        self.plan_rx.borrow().clone()
    }

    pub fn subscribe_plan(&self) -> watch::Receiver<RenderPlan> {
        self.plan_rx.clone()
    }

    pub fn subscribe_pulse(&self) -> watch::Receiver<f64> {
        self.pulse_rx.clone()
    }
}

pub struct Engine {
    // ---
    map: LiveMap,
    rx: mpsc::Receiver<Command>,
    plan_tx: watch::Sender<RenderPlan>,
    frame_interval: Duration,
    autostart: bool,
}

impl Engine {
    // ---
    pub fn new(config: &Config, sink: Option<mpsc::UnboundedSender<ShapeChange>>) -> (Engine, EngineHandle) {
        let map = LiveMap::new(config, sink);
        let (tx, rx) = mpsc::channel(config.command_queue_capacity);
        let (plan_tx, plan_rx) = watch::channel(RenderPlan::empty(&config.base_map_style));
        let handle = EngineHandle {
            tx,
            plan_rx,
            pulse_rx: map.subscribe_pulse(),
        };
        let engine = Engine {
            map,
            rx,
            plan_tx,
            frame_interval: Duration::from_millis(config.frame_interval_ms),
            autostart: config.pulse_autostart,
        };
        (engine, handle)
    }

    /// Process commands and frames until every handle is dropped.
    pub async fn run(mut self) {
        // ---
        tracing::info!(frame_interval = ?self.frame_interval, "live map engine started");
        if self.autostart {
            let _ = self.map.start_clock(Instant::now());
        }

        let mut frames = tokio::time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => self.dispatch(command),
                    None => break,
                },
                _ = frames.tick() => {
                    if self.map.frame(Instant::now()).is_some() {
                        self.publish();
                    }
                }
            }
        }

        self.map.stop_clock();
        tracing::info!("live map engine stopped");
    }

    fn publish(&self) {
        self.plan_tx.send_replace(self.map.render_plan());
    }

    fn dispatch(&mut self, command: Command) {
        // ---
        match command {
            Command::Telemetry { records, reply } => {
                let report = self.map.ingest_batch(&records);
                self.publish();
                let _ = reply.send(report);
            }
            Command::RegisterDevice { registration, reply } => {
                let device = self.map.register(registration);
                self.publish();
                let _ = reply.send(device);
            }
            Command::ListDevices { reply } => {
                let _ = reply.send(self.map.devices());
            }
            Command::Geofence { event, reply } => {
                let result = self.map.geofence_event(event);
                self.publish();
                let _ = reply.send(result);
            }
            Command::ListGeofences { reply } => {
                let _ = reply.send(self.map.geofences().to_vec());
            }
            Command::ListAlerts { reply } => {
                let _ = reply.send(self.map.alerts());
            }
            Command::StartClock { reply } => {
                let result = self.map.start_clock(Instant::now());
                self.publish();
                let _ = reply.send(result);
            }
            Command::StopClock { reply } => {
                let status = self.map.stop_clock();
                self.publish();
                let _ = reply.send(status);
            }
            Command::ClockStatus { reply } => {
                let _ = reply.send(self.map.clock_status());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::geofence::geo::from_local_m;
    use crate::overlay::Layer;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    const ORIGIN: LngLat = LngLat { lng: 15.97, lat: 45.81 };

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, 18, minute, 0).unwrap()
    }

    fn water(device_id: &str, raw: serde_json::Value, minute: u32) -> TelemetryRecord {
        TelemetryRecord {
            device_id: device_id.to_string(),
            metric: "water_level".to_string(),
            value: raw,
            timestamp: at(minute),
        }
    }

    fn registration(id: &str, model: &str) -> DeviceRegistration {
        DeviceRegistration {
            id: id.to_string(),
            device_model: DeviceModel::from(model),
            entity_id: Some(format!("entity-{id}")),
            latitude: Some(ORIGIN.lat),
            longitude: Some(ORIGIN.lng),
        }
    }

    fn test_config() -> Config {
        Config {
            pulse_autostart: false,
            frame_interval_ms: 5,
            ..Config::default()
        }
    }

    #[test]
    fn test_end_to_end_alert_sequence() {
        // ---
        let mut map = LiveMap::new(&test_config(), None);
        map.register(registration("D1", "water-level-sensor"));

        let records: Vec<TelemetryRecord> = [5, 45, 45, 70]
            .into_iter()
            .enumerate()
            .map(|(i, raw)| water("D1", json!(raw), i as u32))
            .collect();
        let report = map.ingest_batch(&records);

        assert_eq!(report.accepted, 4);
        assert_eq!(report.rejected, 0);
        let transitions: Vec<(AlertLevel, AlertLevel)> =
            report.alerts.iter().map(|a| (a.previous, a.level)).collect();
        assert_eq!(
            transitions,
            vec![
                (AlertLevel::Safe, AlertLevel::Floating),
                (AlertLevel::Floating, AlertLevel::Critical)
            ]
        );
        assert_eq!(report.alerts[0].entity_id, "entity-D1");
        assert_eq!(report.alerts[0].location, Some(ORIGIN));
        assert_eq!(map.alerts().len(), 2);
    }

    #[test]
    fn test_malformed_readings_are_dropped() {
        // ---
        let mut map = LiveMap::new(&test_config(), None);
        let records = vec![
            water("D1", json!("deep"), 0),
            water("D1", json!(-4), 1),
            TelemetryRecord {
                metric: "humidity".to_string(),
                ..water("D1", json!(3), 2)
            },
        ];
        let report = map.ingest_batch(&records);
        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected, 3);
        assert!(report.alerts.is_empty());
        assert!(map.alerts().is_empty());
    }

    #[test]
    fn test_unregistered_device_gets_default_render() {
        // ---
        let mut map = LiveMap::new(&test_config(), None);
        let position = TelemetryRecord {
            device_id: "X9".to_string(),
            metric: "position".to_string(),
            value: json!({"latitude": 45.8, "longitude": 15.9}),
            timestamp: at(0),
        };
        assert_eq!(map.ingest(&position), Ok(None));

        let views = map.devices();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].device.device_model, DeviceModel::Unknown(UNREGISTERED_MODEL.into()));

        let plan = map.render_plan();
        let Layer::Markers { markers } = &plan.layers[2] else {
            panic!("markers layer expected");
        };
        assert_eq!(markers[0].render, crate::render_spec::DEFAULT_RENDER_SPEC);
    }

    #[test]
    fn test_position_update_moves_active_alert() {
        // ---
        let mut map = LiveMap::new(&test_config(), None);
        map.register(registration("D1", "flood-gauge"));
        map.ingest(&water("D1", json!(90), 0)).unwrap();
        let moved = TelemetryRecord {
            device_id: "D1".to_string(),
            metric: "position".to_string(),
            value: json!({"latitude": 46.0, "longitude": 16.0}),
            timestamp: at(1),
        };
        map.ingest(&moved).unwrap();

        let plan = map.render_plan();
        let Layer::AlertHalos { halos } = &plan.layers[3] else {
            panic!("halo layer expected");
        };
        assert_eq!(halos[0].position, LngLat::new(16.0, 46.0));
    }

    #[test]
    fn test_committed_shapes_reach_sink() {
        // ---
        let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
        let mut map = LiveMap::new(&test_config(), Some(sink_tx));

        map.geofence_event(EditorEvent::SelectTool { tool: Tool::Circle });
        map.geofence_event(EditorEvent::PointerDown { point: ORIGIN });
        let reply = map.geofence_event(EditorEvent::PointerUp {
            point: from_local_m(ORIGIN, (0.0, 80.0)),
        });
        let EditorOutcome::Committed(shape) = &reply.outcome else {
            panic!("circle should commit, got {:?}", reply.outcome);
        };
        assert_eq!(reply.state, EditorState::Idle);
        assert_eq!(sink_rx.try_recv().unwrap(), ShapeChange::Committed(shape.clone()));

        map.geofence_event(EditorEvent::SelectTool { tool: Tool::Delete });
        map.geofence_event(EditorEvent::Click {
            point: ORIGIN,
            additive: false,
        });
        assert_eq!(sink_rx.try_recv().unwrap(), ShapeChange::Deleted(shape.id));
        assert!(map.geofences().is_empty());
    }

    #[test]
    fn test_rejected_drawing_reaches_nothing() {
        // ---
        let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
        let mut map = LiveMap::new(&test_config(), Some(sink_tx));
        map.geofence_event(EditorEvent::SelectTool { tool: Tool::Circle });
        map.geofence_event(EditorEvent::PointerDown { point: ORIGIN });
        let reply = map.geofence_event(EditorEvent::PointerUp { point: ORIGIN });
        assert!(matches!(reply.outcome, EditorOutcome::Rejected(_)));
        assert_eq!(reply.state, EditorState::ToolSelected);
        assert!(sink_rx.try_recv().is_err());
    }

    #[test]
    fn test_edit_drag_shows_in_plan_only() {
        // ---
        let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
        let mut map = LiveMap::new(&test_config(), Some(sink_tx));
        map.geofence_event(EditorEvent::SelectTool { tool: Tool::Circle });
        map.geofence_event(EditorEvent::PointerDown { point: ORIGIN });
        map.geofence_event(EditorEvent::PointerUp {
            point: from_local_m(ORIGIN, (0.0, 80.0)),
        });
        let original = map.geofences()[0].clone();
        assert!(sink_rx.try_recv().is_ok());

        let handle = original.geometry.handles()[1];
        map.geofence_event(EditorEvent::SelectTool { tool: Tool::Select });
        map.geofence_event(EditorEvent::Click {
            point: ORIGIN,
            additive: false,
        });
        map.geofence_event(EditorEvent::PointerDown { point: handle });
        let reply = map.geofence_event(EditorEvent::PointerMove {
            point: from_local_m(ORIGIN, (150.0, 0.0)),
        });
        assert_eq!(reply.state, EditorState::Editing);

        assert_eq!(map.geofences()[0].geometry, original.geometry);
        let plan = map.render_plan();
        let Layer::Geofences { features } = &plan.layers[1] else {
            panic!("geofence layer expected");
        };
        assert_eq!(features[0].id, original.id);
        assert_ne!(features[0].geometry, original.geometry);
        assert!(sink_rx.try_recv().is_err());
    }

    #[test]
    fn test_clock_feeds_pulse_until_stopped() {
        // ---
        let mut map = LiveMap::new(&test_config(), None);
        let pulse = map.subscribe_pulse();
        let t0 = Instant::now();

        assert!(map.start_clock(t0).is_ok());
        assert_eq!(map.start_clock(t0), Err(CoreError::ClockMisuse));
        assert_eq!(map.frame(t0 + Duration::from_millis(1500)), Some(1.5));
        assert_eq!(*pulse.borrow(), 1.5);
        assert_eq!(map.render_plan().elapsed_secs, 1.5);

        let status = map.stop_clock();
        assert!(!status.running);
        assert_eq!(map.frame(t0 + Duration::from_secs(3)), None);
        assert_eq!(*pulse.borrow(), 0.0);
        assert_eq!(map.render_plan().elapsed_secs, 0.0);
    }

    #[tokio::test]
    async fn test_engine_round_trip() {
        // ---
        let config = test_config();
        let (engine, handle) = Engine::new(&config, None);
        assert_eq!(handle.plan(), RenderPlan::empty(&config.base_map_style));
        assert_eq!(handle.plan().layers.len(), 4);
        let task = tokio::spawn(engine.run());

        let device = tokio_test::assert_ok!(handle.register(registration("D1", "flood-gauge")).await);
        assert_eq!(device.device_model, DeviceModel::FloodGauge);

        let report = tokio_test::assert_ok!(
            handle
                .ingest(vec![water("D1", json!(5), 0), water("D1", json!(45), 1)])
                .await
        );
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(tokio_test::assert_ok!(handle.alerts().await).len(), 1);

        let plan = handle.plan();
        let Layer::Markers { markers } = &plan.layers[2] else {
            panic!("markers layer expected");
        };
        assert_eq!(markers[0].level, Some(AlertLevel::Floating));

        let started = tokio_test::assert_ok!(handle.start_clock().await);
        assert!(started.is_ok());
        let again = tokio_test::assert_ok!(handle.start_clock().await);
        assert_eq!(again, Err(CoreError::ClockMisuse));
        let stopped = tokio_test::assert_ok!(handle.stop_clock().await);
        assert!(!stopped.running);
        assert_eq!(stopped.elapsed_secs, 0.0);

        drop(handle);
        tokio_test::assert_ok!(task.await);
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_engine() {
        // ---
        let (engine, handle) = Engine::new(&test_config(), None);
        drop(engine);
        assert_eq!(handle.alerts().await, Err(EngineUnavailable));
    }
}
