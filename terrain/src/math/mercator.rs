//! Spherical Web Mercator.
//!
//! Profiles measure distance along a straight line in this plane,
//! which is accurate enough over the short paths we deal with.

use geo::geometry::Coord;
use std::f64::consts::FRAC_PI_4;

/// Sphere radius (meters) used by Web Mercator.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitudes beyond this are clamped, keeping the projection square.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// Projects geographic `(lon, lat)` degrees into planar meters.
pub fn to_planar(coord: Coord<f64>) -> Coord<f64> {
    debug_assert!(coord.x.is_finite() && coord.y.is_finite());
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: EARTH_RADIUS * coord.x.to_radians(),
        y: EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Inverse of [to_planar].
pub fn to_geographic(coord: Coord<f64>) -> Coord<f64> {
    debug_assert!(coord.x.is_finite() && coord.y.is_finite());
    Coord {
        x: (coord.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - 2.0 * FRAC_PI_4).to_degrees(),
    }
}

/// Straight planar segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord {
    start: Coord<f64>,

    /// Unit direction, zero for a degenerate chord.
    dir: Coord<f64>,

    length: f64,
}

impl Chord {
    pub fn new(start: Coord<f64>, end: Coord<f64>) -> Self {
        let delta = end - start;
        let length = delta.x.hypot(delta.y);
        let dir = if length > 0.0 {
            delta / length
        } else {
            Coord { x: 0.0, y: 0.0 }
        };
        Self { start, dir, length }
    }

    /// Length in meters.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn start(&self) -> Coord<f64> {
        self.start
    }

    /// Planar point `distance` meters from the start.
    pub fn point_at(&self, distance: f64) -> Coord<f64> {
        self.start + self.dir * distance
    }

    /// Distance from the start of the orthogonal projection of
    /// `planar` onto the chord, clamped to `[0, length]`.
    pub fn locate(&self, planar: Coord<f64>) -> f64 {
        let rel = planar - self.start;
        (rel.x * self.dir.x + rel.y * self.dir.y).clamp(0.0, self.length)
    }
}
