//! Bearing and distance helpers for the 2D field.
//!
//! Bearings are compass degrees measured clockwise from "up" in screen
//! coordinates, where x grows to the right and y grows downwards. A bearing
//! of 0 points towards decreasing y, 90 towards increasing x.

use std::fmt;

use serde::Deserialize;

/// Keeps the x difference away from zero so vertical bearings stay finite.
///
/// It is subtracted rather than added so an exactly vertical target falls on
/// the same side of the quadrant test as a target a hair to the right.
const BEARING_EPSILON: f64 = 1e-9;

/// A position in the continuous field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Bearing in degrees from `from` towards `to`.
///
/// The result lies in [0, 360) for all inputs except the degenerate case of
/// identical points, which resolves to 90.
pub fn bearing(from: Point, to: Point) -> f64 {
    let a = ((from.y - to.y) / (from.x - to.x - BEARING_EPSILON))
        .atan()
        .to_degrees();
    if to.x >= from.x {
        90.0 + a
    } else {
        270.0 + a
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Distance and bearing from `from` towards `to`.
pub fn distance_and_bearing(from: Point, to: Point) -> (f64, f64) {
    (distance(from, to), bearing(from, to))
}

/// Resolve a bearing into its (cos, sin) components.
pub fn angle_to_vector(bearing_deg: f64) -> [f64; 2] {
    let rad = bearing_deg.to_radians();
    [rad.cos(), rad.sin()]
}

/// Point reached by travelling `length` from `from` along `bearing_deg`.
pub fn project(from: Point, length: f64, bearing_deg: f64) -> Point {
    let u = angle_to_vector(bearing_deg);
    Point {
        x: from.x + length * u[1],
        y: from.y - length * u[0],
    }
}

/// Normalize a heading into [0, 360).
///
/// Every heading change the navigation engine makes, including the turn
/// offsets derived from learned actions, goes through this function.
pub fn wrap_heading(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed angle in degrees, in (-180, 180], that turns `from` onto `to`.
pub fn relative_bearing(from: f64, to: f64) -> f64 {
    let diff = wrap_heading(to - from);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// True when a relative bearing, read as radians, lies inside `gate_rad`.
pub fn within_angular_gate(relative_deg: f64, gate_rad: f64) -> bool {
    relative_deg.to_radians().abs() <= gate_rad
}

/// Perpendicular distance of a target at `range` and `relative_deg` off a
/// line of sight.
pub fn lateral_offset(range: f64, relative_deg: f64) -> f64 {
    (range * relative_deg.to_radians().sin()).abs()
}
