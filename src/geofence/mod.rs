//! Operator-drawn geofences: tools, geometry and the drawing state machine.

pub mod geo;
mod machine;
mod shape;

pub use machine::{EditorEvent, EditorOutcome, EditorSettings, EditorState, GeofenceEditor};
pub use shape::{
    close_ring, open_ring, rectangle_corners, GeofenceShape, Geometry, ShapeId, Tool,
    MIN_AREA_M2, MIN_EXTENT_M, MIN_SECTOR_SPAN_DEG, SENSOR_LABEL,
};
