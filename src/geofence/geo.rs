//! Small geodesy helpers for drawing and hit-testing.
//!
//! Distances use the haversine formula. Angles, areas and containment work in
//! a local tangent plane (meters east/north of an origin), which is accurate
//! enough at geofence scale.

use std::f64::consts::PI;

use crate::models::LngLat;

// ---

pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * PI / 180.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    // ---
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

fn meters_per_degree_lng(origin: LngLat) -> f64 {
    (METERS_PER_DEGREE * origin.lat.to_radians().cos()).max(1e-9)
}

/// Project `p` into meters east/north of `origin`.
pub fn to_local_m(origin: LngLat, p: LngLat) -> (f64, f64) {
    (
        (p.lng - origin.lng) * meters_per_degree_lng(origin),
        (p.lat - origin.lat) * METERS_PER_DEGREE,
    )
}

pub fn from_local_m(origin: LngLat, (x, y): (f64, f64)) -> LngLat {
    LngLat::new(
        origin.lng + x / meters_per_degree_lng(origin),
        origin.lat + y / METERS_PER_DEGREE,
    )
}

/// Bearing from `from` to `to` in degrees clockwise from north, in `[0, 360)`.
pub fn bearing_deg(from: LngLat, to: LngLat) -> f64 {
    let (x, y) = to_local_m(from, to);
    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Point `distance_m` away from `origin` along `bearing`.
pub fn destination(origin: LngLat, bearing: f64, distance_m: f64) -> LngLat {
    let rad = bearing.to_radians();
    from_local_m(origin, (distance_m * rad.sin(), distance_m * rad.cos()))
}

/// Signed difference `to - from` folded into `(-180, 180]`.
pub fn bearing_delta(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Area of an open ring in square meters.
pub fn ring_area_m2(ring: &[LngLat]) -> f64 {
    // ---
    let Some(&origin) = ring.first() else {
        return 0.0;
    };
    let local: Vec<(f64, f64)> = ring.iter().map(|&p| to_local_m(origin, p)).collect();
    let twice: f64 = local
        .iter()
        .zip(local.iter().cycle().skip(1))
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum();
    twice.abs() / 2.0
}

/// Even-odd containment test for an open ring.
pub fn ring_contains(ring: &[LngLat], p: LngLat) -> bool {
    // ---
    if ring.len() < 3 {
        return false;
    }
    let local: Vec<(f64, f64)> = ring.iter().map(|&v| to_local_m(p, v)).collect();
    let mut inside = false;
    let mut j = local.len() - 1;
    for i in 0..local.len() {
        let (xi, yi) = local[i];
        let (xj, yj) = local[j];
        if (yi > 0.0) != (yj > 0.0) && 0.0 < (xj - xi) * (0.0 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance in meters from `p` to the segment `a`-`b`.
pub fn segment_distance_m(p: LngLat, a: LngLat, b: LngLat) -> f64 {
    // ---
    let (ax, ay) = to_local_m(p, a);
    let (bx, by) = to_local_m(p, b);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}
