//! Geofence tools, committed geometry and the validity rules shared by
//! drawing and editing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::{
    bearing_deg, bearing_delta, destination, from_local_m, haversine_m, ring_area_m2,
    ring_contains, segment_distance_m, to_local_m,
};
use crate::error::CoreError;
use crate::models::LngLat;

// ---

/// Smallest edge, radius or side length accepted, in meters.
pub const MIN_EXTENT_M: f64 = 0.01;
/// Smallest polygon area accepted, in square meters.
pub const MIN_AREA_M2: f64 = 0.001;
pub const MIN_SECTOR_SPAN_DEG: f64 = 1.0;

pub const SENSOR_LABEL: &str = "Sensor coverage";

pub type ShapeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    Linestring,
    Polygon,
    Rectangle,
    Circle,
    Freehand,
    AngledRectangle,
    Sensor,
    Sector,
    Select,
    Delete,
    DeleteSelection,
}

impl Tool {
    // ---
    pub fn is_drawing(&self) -> bool {
        !matches!(self, Tool::Select | Tool::Delete | Tool::DeleteSelection)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Linestring => "linestring",
            Tool::Polygon => "polygon",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Freehand => "freehand",
            Tool::AngledRectangle => "angled-rectangle",
            Tool::Sensor => "sensor",
            Tool::Sector => "sector",
            Tool::Select => "select",
            Tool::Delete => "delete",
            Tool::DeleteSelection => "delete-selection",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Committed geometry. Each variant carries only what its shape needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    LineString {
        points: Vec<LngLat>,
    },
    /// Closed ring: the first point is repeated at the end.
    Polygon {
        ring: Vec<LngLat>,
    },
    /// `corner` and `opposite` are diagonal corners; sides run along the
    /// heading `rotation_deg` (counter-clockwise from east) and its normal.
    Rectangle {
        corner: LngLat,
        opposite: LngLat,
        rotation_deg: f64,
    },
    Circle {
        center: LngLat,
        radius_m: f64,
    },
    Sensor {
        center: LngLat,
        radius_m: f64,
        label: String,
    },
    /// Annular sector starting at `start_bearing_deg` and sweeping clockwise.
    Sector {
        center: LngLat,
        inner_radius_m: f64,
        outer_radius_m: f64,
        start_bearing_deg: f64,
        span_deg: f64,
    },
}

/// Close an open ring by repeating its first point.
pub fn close_ring(mut points: Vec<LngLat>) -> Vec<LngLat> {
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if points.len() > 1 && first != last {
            points.push(first);
        } else if points.len() == 1 {
            points.push(first);
        }
    }
    points
}

/// Vertices of a closed ring without the closing duplicate.
pub fn open_ring(ring: &[LngLat]) -> &[LngLat] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Side lengths of a rectangle along its own axes.
fn rectangle_extent(corner: LngLat, opposite: LngLat, rotation_deg: f64) -> (f64, f64) {
    let (x, y) = to_local_m(corner, opposite);
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    (x * cos + y * sin, -x * sin + y * cos)
}

pub fn rectangle_corners(corner: LngLat, opposite: LngLat, rotation_deg: f64) -> [LngLat; 4] {
    // ---
    let (u, v) = rectangle_extent(corner, opposite, rotation_deg);
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    let along = (u * cos, u * sin);
    let across = (-v * sin, v * cos);
    [
        corner,
        from_local_m(corner, along),
        from_local_m(corner, (along.0 + across.0, along.1 + across.1)),
        from_local_m(corner, across),
    ]
}

fn sector_contains(
    center: LngLat,
    inner: f64,
    outer: f64,
    start: f64,
    span: f64,
    p: LngLat,
) -> bool {
    // ---
    let d = haversine_m(center, p);
    if d < inner || d > outer {
        return false;
    }
    if span >= 360.0 || d == 0.0 {
        return true;
    }
    (bearing_deg(center, p) - start).rem_euclid(360.0) <= span
}

impl Geometry {
    // ---
    /// Reject geometry that cannot be handed to persistence.
    pub fn validate(&self, tool: Tool) -> Result<(), CoreError> {
        // ---
        if let Some(p) = self.anchors().into_iter().find(|p| !p.is_valid()) {
            return Err(CoreError::degenerate(
                tool,
                format!("point ({}, {}) is off the map", p.lng, p.lat),
            ));
        }
        match self {
            Geometry::LineString { points } => {
                let Some(&first) = points.first() else {
                    return Err(CoreError::degenerate(tool, "no points"));
                };
                if points.len() < 2 || points.iter().all(|&p| haversine_m(first, p) < MIN_EXTENT_M) {
                    return Err(CoreError::degenerate(tool, "needs at least 2 distinct points"));
                }
                Ok(())
            }
            Geometry::Polygon { ring } => {
                let vertices = open_ring(ring);
                if vertices.len() < 3 {
                    return Err(CoreError::degenerate(
                        tool,
                        format!("needs at least 3 points, got {}", vertices.len()),
                    ));
                }
                if ring_area_m2(vertices) < MIN_AREA_M2 {
                    return Err(CoreError::degenerate(tool, "points are collinear"));
                }
                Ok(())
            }
            Geometry::Rectangle {
                corner,
                opposite,
                rotation_deg,
            } => {
                let (u, v) = rectangle_extent(*corner, *opposite, *rotation_deg);
                if u.abs() < MIN_EXTENT_M || v.abs() < MIN_EXTENT_M {
                    return Err(CoreError::degenerate(tool, "zero width or height"));
                }
                Ok(())
            }
            Geometry::Circle { radius_m, .. } | Geometry::Sensor { radius_m, .. } => {
                if !radius_m.is_finite() || *radius_m < MIN_EXTENT_M {
                    return Err(CoreError::degenerate(tool, "zero radius"));
                }
                Ok(())
            }
            Geometry::Sector {
                inner_radius_m,
                outer_radius_m,
                span_deg,
                ..
            } => {
                if !outer_radius_m.is_finite() || *outer_radius_m < MIN_EXTENT_M {
                    return Err(CoreError::degenerate(tool, "zero radius"));
                }
                if *inner_radius_m < 0.0 || inner_radius_m >= outer_radius_m {
                    return Err(CoreError::degenerate(tool, "inner radius not below outer radius"));
                }
                if !(MIN_SECTOR_SPAN_DEG..=360.0).contains(span_deg) {
                    return Err(CoreError::degenerate(tool, format!("span {span_deg:.2} degrees")));
                }
                Ok(())
            }
        }
    }

    /// Coordinates the geometry is defined by.
    fn anchors(&self) -> Vec<LngLat> {
        match self {
            Geometry::LineString { points } => points.clone(),
            Geometry::Polygon { ring } => ring.clone(),
            Geometry::Rectangle {
                corner,
                opposite,
                rotation_deg,
            } => rectangle_corners(*corner, *opposite, *rotation_deg).to_vec(),
            Geometry::Circle { center, .. }
            | Geometry::Sensor { center, .. }
            | Geometry::Sector { center, .. } => vec![*center],
        }
    }

    /// Whether `p` falls on the shape, with `tolerance_m` slack for lines.
    pub fn hit(&self, p: LngLat, tolerance_m: f64) -> bool {
        // ---
        match self {
            Geometry::LineString { points } => points
                .windows(2)
                .any(|w| segment_distance_m(p, w[0], w[1]) <= tolerance_m),
            Geometry::Polygon { ring } => ring_contains(open_ring(ring), p),
            Geometry::Rectangle {
                corner,
                opposite,
                rotation_deg,
            } => ring_contains(&rectangle_corners(*corner, *opposite, *rotation_deg), p),
            Geometry::Circle { center, radius_m } | Geometry::Sensor { center, radius_m, .. } => {
                haversine_m(*center, p) <= *radius_m
            }
            Geometry::Sector {
                center,
                inner_radius_m,
                outer_radius_m,
                start_bearing_deg,
                span_deg,
            } => sector_contains(
                *center,
                *inner_radius_m,
                *outer_radius_m,
                *start_bearing_deg,
                *span_deg,
                p,
            ),
        }
    }

    /// Edit handles, indexed as [`Geometry::move_handle`] expects.
    pub fn handles(&self) -> Vec<LngLat> {
        // ---
        match self {
            Geometry::LineString { points } => points.clone(),
            Geometry::Polygon { ring } => open_ring(ring).to_vec(),
            Geometry::Rectangle {
                corner, opposite, ..
            } => vec![*corner, *opposite],
            Geometry::Circle { center, radius_m } | Geometry::Sensor { center, radius_m, .. } => {
                vec![*center, destination(*center, 90.0, *radius_m)]
            }
            Geometry::Sector {
                center,
                outer_radius_m,
                start_bearing_deg,
                span_deg,
                ..
            } => vec![
                *center,
                destination(*center, start_bearing_deg + span_deg / 2.0, *outer_radius_m),
            ],
        }
    }

    /// Geometry with handle `index` dragged to `to`. Out-of-range indexes
    /// leave the geometry unchanged.
    pub fn move_handle(&self, index: usize, to: LngLat) -> Geometry {
        // ---
        let mut next = self.clone();
        match &mut next {
            Geometry::LineString { points } => {
                if let Some(p) = points.get_mut(index) {
                    *p = to;
                }
            }
            Geometry::Polygon { ring } => {
                let mut vertices = open_ring(ring).to_vec();
                if let Some(p) = vertices.get_mut(index) {
                    *p = to;
                }
                *ring = close_ring(vertices);
            }
            Geometry::Rectangle {
                corner, opposite, ..
            } => match index {
                0 => *corner = to,
                1 => *opposite = to,
                _ => {}
            },
            Geometry::Circle { center, radius_m } | Geometry::Sensor { center, radius_m, .. } => {
                match index {
                    0 => *center = to,
                    1 => *radius_m = haversine_m(*center, to),
                    _ => {}
                }
            }
            Geometry::Sector {
                center,
                inner_radius_m,
                outer_radius_m,
                start_bearing_deg,
                span_deg,
            } => match index {
                0 => *center = to,
                1 => {
                    let mid = bearing_deg(*center, to);
                    let outer = haversine_m(*center, to);
                    *inner_radius_m = inner_radius_m.min(outer);
                    *outer_radius_m = outer;
                    *start_bearing_deg = (mid - *span_deg / 2.0).rem_euclid(360.0);
                }
                _ => {}
            },
        }
        next
    }
}

/// A committed geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceShape {
    // ---
    pub id: ShapeId,
    pub tool: Tool,
    pub geometry: Geometry,
    pub color: String,
}

/// In-progress drawing. One variant per gesture family; finishing it is an
/// exhaustive match so every tool has a completion rule.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Draft {
    /// Polygon and linestring: one vertex per click.
    Vertices { tool: Tool, points: Vec<LngLat> },
    /// Points sampled while the pointer is held.
    Freehand { points: Vec<LngLat> },
    /// Axis-aligned rectangle dragged corner to corner.
    Box { start: LngLat, current: LngLat },
    /// Base edge dragged, then a click for the width.
    AngledBase {
        start: LngLat,
        end: Option<LngLat>,
        current: LngLat,
    },
    /// Circle and sensor: center then radius.
    Radial {
        tool: Tool,
        center: LngLat,
        current: LngLat,
    },
    Sector {
        center: LngLat,
        start_bearing: Option<f64>,
        last_bearing: f64,
        sweep: f64,
        current: LngLat,
    },
}

impl Draft {
    // ---
    pub(crate) fn begin(tool: Tool, at: LngLat) -> Option<Draft> {
        // ---
        let draft = match tool {
            Tool::Polygon | Tool::Linestring => Draft::Vertices {
                tool,
                points: vec![at],
            },
            Tool::Freehand => Draft::Freehand { points: vec![at] },
            Tool::Rectangle => Draft::Box {
                start: at,
                current: at,
            },
            Tool::AngledRectangle => Draft::AngledBase {
                start: at,
                end: None,
                current: at,
            },
            Tool::Circle | Tool::Sensor => Draft::Radial {
                tool,
                center: at,
                current: at,
            },
            Tool::Sector => Draft::Sector {
                center: at,
                start_bearing: None,
                last_bearing: 0.0,
                sweep: 0.0,
                current: at,
            },
            Tool::Select | Tool::Delete | Tool::DeleteSelection => return None,
        };
        Some(draft)
    }

    pub(crate) fn tool(&self) -> Tool {
        match self {
            Draft::Vertices { tool, .. } | Draft::Radial { tool, .. } => *tool,
            Draft::Freehand { .. } => Tool::Freehand,
            Draft::Box { .. } => Tool::Rectangle,
            Draft::AngledBase { .. } => Tool::AngledRectangle,
            Draft::Sector { .. } => Tool::Sector,
        }
    }

    /// Track the pointer while drawing. `tolerance_m` gates when a sector
    /// drag has moved far enough to fix its start bearing.
    pub(crate) fn pointer_moved(&mut self, to: LngLat, tolerance_m: f64) {
        // ---
        match self {
            Draft::Vertices { .. } => {}
            Draft::Freehand { points } => {
                if points.last().map_or(true, |&last| last != to) {
                    points.push(to);
                }
            }
            Draft::Box { current, .. }
            | Draft::AngledBase { current, .. }
            | Draft::Radial { current, .. } => *current = to,
            Draft::Sector {
                center,
                start_bearing,
                last_bearing,
                sweep,
                current,
            } => {
                *current = to;
                if haversine_m(*center, to) < tolerance_m {
                    return;
                }
                let bearing = bearing_deg(*center, to);
                if start_bearing.is_none() {
                    *start_bearing = Some(bearing);
                } else {
                    *sweep += bearing_delta(*last_bearing, bearing);
                }
                *last_bearing = bearing;
            }
        }
    }

    /// Turn the draft into committed geometry, validated.
    pub(crate) fn finish(&self) -> Result<Geometry, CoreError> {
        // ---
        let geometry = match self {
            Draft::Vertices {
                tool: Tool::Linestring,
                points,
            } => Geometry::LineString {
                points: points.clone(),
            },
            Draft::Vertices { points, .. } | Draft::Freehand { points } => Geometry::Polygon {
                ring: close_ring(points.clone()),
            },
            Draft::Box { start, current } => Geometry::Rectangle {
                corner: *start,
                opposite: *current,
                rotation_deg: 0.0,
            },
            Draft::AngledBase { start, end, current } => {
                let Some(end) = end else {
                    return Err(CoreError::degenerate(self.tool(), "base edge not set"));
                };
                let (bx, by) = to_local_m(*start, *end);
                let (cx, cy) = to_local_m(*start, *current);
                let base_len = (bx * bx + by * by).sqrt();
                if base_len < MIN_EXTENT_M {
                    return Err(CoreError::degenerate(self.tool(), "zero-length base"));
                }
                let (nx, ny) = (-by / base_len, bx / base_len);
                let width = cx * nx + cy * ny;
                Geometry::Rectangle {
                    corner: *start,
                    opposite: from_local_m(*start, (bx + nx * width, by + ny * width)),
                    rotation_deg: by.atan2(bx).to_degrees(),
                }
            }
            Draft::Radial {
                tool: Tool::Sensor,
                center,
                current,
            } => Geometry::Sensor {
                center: *center,
                radius_m: haversine_m(*center, *current),
                label: SENSOR_LABEL.to_string(),
            },
            Draft::Radial {
                center, current, ..
            } => Geometry::Circle {
                center: *center,
                radius_m: haversine_m(*center, *current),
            },
            Draft::Sector {
                center,
                start_bearing,
                sweep,
                current,
                ..
            } => {
                let start = start_bearing.unwrap_or_else(|| bearing_deg(*center, *current));
                let span = sweep.abs().min(360.0);
                let start = if *sweep < 0.0 {
                    (start - span).rem_euclid(360.0)
                } else {
                    start
                };
                Geometry::Sector {
                    center: *center,
                    inner_radius_m: 0.0,
                    outer_radius_m: haversine_m(*center, *current),
                    start_bearing_deg: start,
                    span_deg: span,
                }
            }
        };
        geometry.validate(self.tool())?;
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    const ORIGIN: LngLat = LngLat { lng: 15.97, lat: 45.81 };

    fn at(x: f64, y: f64) -> LngLat {
        from_local_m(ORIGIN, (x, y))
    }

    #[test]
    fn test_ring_closing() {
        // ---
        let ring = close_ring(vec![at(0.0, 0.0), at(10.0, 0.0), at(0.0, 10.0)]);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(open_ring(&ring).len(), 3);
        assert_eq!(close_ring(ring.clone()), ring);
    }

    #[test]
    fn test_polygon_validation() {
        // ---
        let tri = Geometry::Polygon {
            ring: close_ring(vec![at(0.0, 0.0), at(10.0, 0.0), at(0.0, 10.0)]),
        };
        assert!(tri.validate(Tool::Polygon).is_ok());

        let two = Geometry::Polygon {
            ring: close_ring(vec![at(0.0, 0.0), at(10.0, 0.0)]),
        };
        assert!(matches!(two.validate(Tool::Polygon), Err(CoreError::DegenerateGeometry { .. })));

        let flat = Geometry::Polygon {
            ring: close_ring(vec![at(0.0, 0.0), at(10.0, 0.0), at(20.0, 0.0)]),
        };
        assert!(flat.validate(Tool::Polygon).is_err());
    }

    #[test]
    fn test_off_map_geometry_is_degenerate() {
        // ---
        let circle = Geometry::Circle {
            center: LngLat::new(500.0, 300.0),
            radius_m: 100.0,
        };
        let err = circle.validate(Tool::Circle).unwrap_err();
        assert!(matches!(err, CoreError::DegenerateGeometry { .. }));

        let line = Geometry::LineString {
            points: vec![at(0.0, 0.0), LngLat::new(15.97, 95.0)],
        };
        assert!(line.validate(Tool::Linestring).is_err());

        let rect = Geometry::Rectangle {
            corner: LngLat::new(179.9999, 10.0),
            opposite: LngLat::new(181.0, 10.5),
            rotation_deg: 0.0,
        };
        assert!(rect.validate(Tool::Rectangle).is_err());
    }

    #[test]
    fn test_rotated_rectangle_corners() {
        // ---
        let geometry = Geometry::Rectangle {
            corner: at(0.0, 0.0),
            opposite: at(0.0, 20.0),
            rotation_deg: 45.0,
        };
        // Diagonal of a square with side sqrt(200) rotated by 45 degrees.
        let corners = rectangle_corners(at(0.0, 0.0), at(0.0, 20.0), 45.0);
        let (x, y) = to_local_m(ORIGIN, corners[1]);
        assert!((x - 10.0).abs() < 1e-6 && (y - 10.0).abs() < 1e-6);
        assert!(geometry.validate(Tool::AngledRectangle).is_ok());
        assert!(geometry.hit(at(0.0, 10.0), 0.0));
        assert!(!geometry.hit(at(12.0, 0.0), 0.0));
    }

    #[test]
    fn test_sector_hit() {
        // ---
        let sector = Geometry::Sector {
            center: ORIGIN,
            inner_radius_m: 0.0,
            outer_radius_m: 100.0,
            start_bearing_deg: 350.0,
            span_deg: 40.0,
        };
        assert!(sector.hit(at(0.0, 50.0), 0.0));
        assert!(sector.hit(at(-10.0, 80.0), 0.0));
        assert!(!sector.hit(at(50.0, 0.0), 0.0));
        assert!(!sector.hit(at(0.0, 150.0), 0.0));
    }

    #[test]
    fn test_linestring_hit_uses_tolerance() {
        // ---
        let line = Geometry::LineString {
            points: vec![at(0.0, 0.0), at(100.0, 0.0)],
        };
        assert!(line.hit(at(50.0, 10.0), 15.0));
        assert!(!line.hit(at(50.0, 20.0), 15.0));
    }

    #[test]
    fn test_move_circle_handles() {
        // ---
        let circle = Geometry::Circle {
            center: ORIGIN,
            radius_m: 50.0,
        };
        let handles = circle.handles();
        assert_eq!(handles.len(), 2);
        assert!((haversine_m(ORIGIN, handles[1]) - 50.0).abs() < 0.1);

        let Geometry::Circle { radius_m, .. } = circle.move_handle(1, at(80.0, 0.0)) else {
            panic!("circle stays a circle");
        };
        assert!((radius_m - 80.0).abs() < 0.1);
        assert!(circle.move_handle(1, ORIGIN).validate(Tool::Circle).is_err());
    }

    #[test]
    fn test_select_tools_have_no_draft() {
        // ---
        assert!(Draft::begin(Tool::Select, ORIGIN).is_none());
        assert!(Draft::begin(Tool::DeleteSelection, ORIGIN).is_none());
        assert_eq!(Draft::begin(Tool::Sensor, ORIGIN).unwrap().tool(), Tool::Sensor);
    }

    #[test]
    fn test_tool_serde_names() {
        // ---
        assert_eq!(serde_json::to_string(&Tool::AngledRectangle).unwrap(), "\"angled-rectangle\"");
        let tool: Tool = serde_json::from_str("\"delete-selection\"").unwrap();
        assert_eq!(tool, Tool::DeleteSelection);
        assert_eq!(serde_json::from_str::<Tool>("\"linestring\"").unwrap(), Tool::Linestring);
    }
}
