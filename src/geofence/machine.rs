//! Geofence drawing and editing state machine.
//!
//! ```text
//! idle --select_tool(T)--> tool_selected --pointer_down--> drawing
//! drawing --completion--> (commit) --> idle | tool_selected (keep tool active)
//! drawing --degenerate completion--> tool_selected
//! idle (select) --click shape--> selecting --pointer_down handle--> editing
//! editing --pointer_up--> selecting
//! ```
//!
//! The editor owns the committed shape collection; only commit, edit and
//! delete transitions write to it. Aborting a drawing (escape or a tool
//! switch) drops the draft and leaves the collection untouched.

use serde::{Deserialize, Serialize};

use super::geo::haversine_m;
use super::shape::{Draft, GeofenceShape, Geometry, ShapeId, Tool};
use crate::error::CoreError;
use crate::models::LngLat;

// ---

/// Input delivered by the map UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    SelectTool {
        tool: Tool,
    },
    DeselectTool,
    SetColor {
        color: String,
    },
    Escape,
    PointerDown {
        point: LngLat,
    },
    PointerMove {
        point: LngLat,
    },
    PointerUp {
        point: LngLat,
    },
    Click {
        point: LngLat,
        #[serde(default)]
        additive: bool,
    },
    DoubleClick {
        point: LngLat,
    },
}

impl EditorEvent {
    /// Map position carried by pointer events.
    pub fn point(&self) -> Option<LngLat> {
        match self {
            EditorEvent::PointerDown { point }
            | EditorEvent::PointerMove { point }
            | EditorEvent::PointerUp { point }
            | EditorEvent::Click { point, .. }
            | EditorEvent::DoubleClick { point } => Some(*point),
            _ => None,
        }
    }
}

/// Observable state of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorState {
    Idle,
    ToolSelected,
    Drawing,
    Selecting,
    Editing,
}

/// What a single event did to the shape collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EditorOutcome {
    None,
    Committed(GeofenceShape),
    Updated(GeofenceShape),
    Deleted(Vec<ShapeId>),
    /// Carries the [`CoreError::DegenerateGeometry`] that discarded the work.
    Rejected(CoreError),
}

/// Handle drag in progress. The committed shape keeps `original` until the
/// drag ends; `preview` is what the renderer shows meanwhile.
#[derive(Debug, Clone)]
struct EditSession {
    shape_id: ShapeId,
    handle: usize,
    original: Geometry,
    preview: Geometry,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    ToolSelected,
    Drawing(Draft),
    Selecting,
    Editing(EditSession),
}

#[derive(Debug, Clone)]
pub struct EditorSettings {
    // ---
    pub keep_tool_active: bool,
    pub default_color: String,
    pub hit_tolerance_m: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            keep_tool_active: false,
            default_color: "#3388ff".to_string(),
            hit_tolerance_m: 15.0,
        }
    }
}

#[derive(Debug)]
pub struct GeofenceEditor {
    // ---
    tool: Option<Tool>,
    phase: Phase,
    shapes: Vec<GeofenceShape>,
    selection: Vec<ShapeId>,
    color: String,
    keep_tool_active: bool,
    tolerance_m: f64,
}

impl GeofenceEditor {
    // ---
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            tool: None,
            phase: Phase::Idle,
            shapes: Vec::new(),
            selection: Vec::new(),
            color: settings.default_color,
            keep_tool_active: settings.keep_tool_active,
            tolerance_m: settings.hit_tolerance_m,
        }
    }

    pub fn state(&self) -> EditorState {
        match self.phase {
            Phase::Idle => EditorState::Idle,
            Phase::ToolSelected => EditorState::ToolSelected,
            Phase::Drawing(_) => EditorState::Drawing,
            Phase::Selecting => EditorState::Selecting,
            Phase::Editing(_) => EditorState::Editing,
        }
    }

    pub fn tool(&self) -> Option<Tool> {
        self.tool
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn shapes(&self) -> &[GeofenceShape] {
        &self.shapes
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    /// Shape being dragged and its uncommitted geometry.
    pub fn editing_preview(&self) -> Option<(ShapeId, &Geometry)> {
        match &self.phase {
            Phase::Editing(session) => Some((session.shape_id, &session.preview)),
            _ => None,
        }
    }

    /// Apply one event and report its effect on the collection.
    pub fn handle(&mut self, event: EditorEvent) -> EditorOutcome {
        // ---
        if let Some(point) = event.point().filter(|p| !p.is_valid()) {
            tracing::debug!(lng = point.lng, lat = point.lat, "ignoring pointer event off the map");
            return EditorOutcome::None;
        }
        match event {
            EditorEvent::SelectTool { tool } => self.select_tool(tool),
            EditorEvent::DeselectTool => {
                self.abort();
                self.tool = None;
                self.selection.clear();
                self.phase = Phase::Idle;
                EditorOutcome::None
            }
            EditorEvent::SetColor { color } => {
                self.color = color;
                EditorOutcome::None
            }
            EditorEvent::Escape => self.escape(),
            EditorEvent::PointerDown { point } => self.pointer_down(point),
            EditorEvent::PointerMove { point } => self.pointer_move(point),
            EditorEvent::PointerUp { point } => self.pointer_up(point),
            EditorEvent::Click { point, additive } => self.click(point, additive),
            EditorEvent::DoubleClick { point } => self.double_click(point),
        }
    }

    fn select_tool(&mut self, tool: Tool) -> EditorOutcome {
        // ---
        self.abort();
        self.tool = Some(tool);
        match tool {
            Tool::Select => {
                self.phase = if self.selection.is_empty() {
                    Phase::Idle
                } else {
                    Phase::Selecting
                };
                EditorOutcome::None
            }
            Tool::Delete => {
                self.selection.clear();
                self.phase = Phase::Idle;
                EditorOutcome::None
            }
            Tool::DeleteSelection => {
                let removed = std::mem::take(&mut self.selection);
                self.shapes.retain(|s| !removed.contains(&s.id));
                self.tool = None;
                self.phase = Phase::Idle;
                if removed.is_empty() {
                    EditorOutcome::None
                } else {
                    tracing::info!(count = removed.len(), "deleted selected geofences");
                    EditorOutcome::Deleted(removed)
                }
            }
            _ => {
                self.selection.clear();
                self.phase = Phase::ToolSelected;
                EditorOutcome::None
            }
        }
    }

    /// Drop any draft or revert any edit in progress.
    fn abort(&mut self) {
        // ---
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Drawing(draft) => {
                tracing::debug!(tool = %draft.tool(), "drawing aborted");
            }
            Phase::Editing(session) => {
                tracing::debug!(shape_id = %session.shape_id, "edit reverted");
                self.phase = Phase::Selecting;
            }
            other => self.phase = other,
        }
    }

    fn escape(&mut self) -> EditorOutcome {
        // ---
        match self.state() {
            EditorState::Drawing => {
                self.abort();
                self.phase = Phase::ToolSelected;
            }
            EditorState::Editing => self.abort(),
            EditorState::Selecting => {
                self.selection.clear();
                self.phase = Phase::Idle;
            }
            EditorState::ToolSelected => {
                self.tool = None;
                self.phase = Phase::Idle;
            }
            EditorState::Idle => {}
        }
        EditorOutcome::None
    }

    fn pointer_down(&mut self, point: LngLat) -> EditorOutcome {
        // ---
        match self.state() {
            EditorState::ToolSelected => {
                if let Some(draft) = self.tool.and_then(|tool| Draft::begin(tool, point)) {
                    self.phase = Phase::Drawing(draft);
                }
            }
            EditorState::Selecting => {
                if let Some((shape_id, handle, original)) = self.handle_at(point) {
                    self.phase = Phase::Editing(EditSession {
                        shape_id,
                        handle,
                        preview: original.clone(),
                        original,
                    });
                }
            }
            _ => {}
        }
        EditorOutcome::None
    }

    fn pointer_move(&mut self, point: LngLat) -> EditorOutcome {
        // ---
        let tolerance = self.tolerance_m;
        match &mut self.phase {
            Phase::Drawing(draft) => draft.pointer_moved(point, tolerance),
            Phase::Editing(session) => {
                session.preview = session.original.move_handle(session.handle, point);
            }
            _ => {}
        }
        EditorOutcome::None
    }

    fn pointer_up(&mut self, point: LngLat) -> EditorOutcome {
        // ---
        let tolerance = self.tolerance_m;
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Drawing(mut draft) => match draft {
                Draft::Freehand { .. }
                | Draft::Box { .. }
                | Draft::Radial { .. }
                | Draft::Sector { .. } => {
                    draft.pointer_moved(point, tolerance);
                    self.complete(draft)
                }
                Draft::AngledBase {
                    start, end: None, ..
                } => {
                    if haversine_m(start, point) < super::shape::MIN_EXTENT_M {
                        return self.reject(draft.tool(), "zero-length base");
                    }
                    self.phase = Phase::Drawing(Draft::AngledBase {
                        start,
                        end: Some(point),
                        current: point,
                    });
                    EditorOutcome::None
                }
                other => {
                    self.phase = Phase::Drawing(other);
                    EditorOutcome::None
                }
            },
            Phase::Editing(session) => {
                let Some(index) = self.shapes.iter().position(|s| s.id == session.shape_id) else {
                    self.phase = Phase::Selecting;
                    return EditorOutcome::None;
                };
                let tool = self.shapes[index].tool;
                let edited = session.original.move_handle(session.handle, point);
                self.phase = Phase::Selecting;
                match edited.validate(tool) {
                    Ok(()) => {
                        self.shapes[index].geometry = edited;
                        tracing::debug!(shape_id = %session.shape_id, "geofence edited");
                        EditorOutcome::Updated(self.shapes[index].clone())
                    }
                    Err(err) => {
                        tracing::debug!(shape_id = %session.shape_id, error = %err, "edit reverted");
                        EditorOutcome::Rejected(err)
                    }
                }
            }
            other => {
                self.phase = other;
                EditorOutcome::None
            }
        }
    }

    fn click(&mut self, point: LngLat, additive: bool) -> EditorOutcome {
        // ---
        let tolerance = self.tolerance_m;
        if let Phase::Drawing(draft) = &mut self.phase {
            match draft {
                Draft::Vertices { tool, points } => {
                    let near_last = points.last().is_some_and(|&p| haversine_m(p, point) <= tolerance);
                    let near_first = points.first().is_some_and(|&p| haversine_m(p, point) <= tolerance);
                    if near_last && points.len() < 3 {
                        // Release click of the gesture that placed the vertex.
                        return EditorOutcome::None;
                    }
                    if *tool == Tool::Polygon && near_first && points.len() >= 2 {
                        return self.complete_current();
                    }
                    if !near_last {
                        points.push(point);
                    }
                }
                Draft::AngledBase {
                    end: Some(end), current, ..
                } => {
                    if haversine_m(*end, point) <= tolerance {
                        return EditorOutcome::None;
                    }
                    *current = point;
                    return self.complete_current();
                }
                _ => {}
            }
            return EditorOutcome::None;
        }

        match self.tool {
            Some(Tool::Select) if matches!(self.phase, Phase::Idle | Phase::Selecting) => {
                match self.shape_at(point) {
                    Some(id) => {
                        if additive {
                            if let Some(pos) = self.selection.iter().position(|s| *s == id) {
                                self.selection.remove(pos);
                            } else {
                                self.selection.push(id);
                            }
                        } else {
                            self.selection = vec![id];
                        }
                    }
                    None if !additive => self.selection.clear(),
                    None => {}
                }
                self.phase = if self.selection.is_empty() {
                    Phase::Idle
                } else {
                    Phase::Selecting
                };
                EditorOutcome::None
            }
            Some(Tool::Delete) => match self.shape_at(point) {
                Some(id) => {
                    self.shapes.retain(|s| s.id != id);
                    tracing::info!(shape_id = %id, "geofence deleted");
                    EditorOutcome::Deleted(vec![id])
                }
                None => EditorOutcome::None,
            },
            _ => EditorOutcome::None,
        }
    }

    fn double_click(&mut self, point: LngLat) -> EditorOutcome {
        // ---
        let tolerance = self.tolerance_m;
        if let Phase::Drawing(Draft::Vertices { points, .. }) = &mut self.phase {
            if points.last().map_or(true, |&p| haversine_m(p, point) > tolerance) {
                points.push(point);
            }
            return self.complete_current();
        }
        EditorOutcome::None
    }

    fn complete_current(&mut self) -> EditorOutcome {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Drawing(draft) => self.complete(draft),
            other => {
                self.phase = other;
                EditorOutcome::None
            }
        }
    }

    /// Commit a finished draft, or reject it back to `tool_selected`.
    fn complete(&mut self, draft: Draft) -> EditorOutcome {
        // ---
        let tool = draft.tool();
        match draft.finish() {
            Ok(geometry) => {
                let shape = GeofenceShape {
                    id: uuid::Uuid::new_v4(),
                    tool,
                    geometry,
                    color: self.color.clone(),
                };
                self.shapes.push(shape.clone());
                if self.keep_tool_active {
                    self.phase = Phase::ToolSelected;
                } else {
                    self.tool = None;
                    self.phase = Phase::Idle;
                }
                tracing::info!(shape_id = %shape.id, tool = %tool, "geofence committed");
                EditorOutcome::Committed(shape)
            }
            Err(err) => {
                self.phase = Phase::ToolSelected;
                tracing::debug!(error = %err, "drawing discarded");
                EditorOutcome::Rejected(err)
            }
        }
    }

    fn reject(&mut self, tool: Tool, reason: &str) -> EditorOutcome {
        let err = CoreError::degenerate(tool, reason);
        tracing::debug!(error = %err, "drawing discarded");
        self.phase = Phase::ToolSelected;
        EditorOutcome::Rejected(err)
    }

    /// Topmost shape under `point`.
    fn shape_at(&self, point: LngLat) -> Option<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.geometry.hit(point, self.tolerance_m))
            .map(|s| s.id)
    }

    /// Nearest handle of a selected shape within tolerance of `point`.
    fn handle_at(&self, point: LngLat) -> Option<(ShapeId, usize, Geometry)> {
        // ---
        self.shapes
            .iter()
            .rev()
            .filter(|s| self.selection.contains(&s.id))
            .flat_map(|s| {
                s.geometry
                    .handles()
                    .into_iter()
                    .enumerate()
                    .map(move |(i, h)| (s, i, haversine_m(h, point)))
            })
            .filter(|(_, _, d)| *d <= self.tolerance_m)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(s, i, _)| (s.id, i, s.geometry.clone()))
    }
}
