//! Isoline (contour band) datasets.
//!
//! An [Isoline] is a band boundary of constant elevation level. A
//! set of isolines is the only elevation source a terrain profile
//! has, so this crate also provides the envelope index used to find
//! candidate isolines near a point or along a line, and a synthetic
//! generator for areas without real data.
//!
//! All geometry is geographic (`x` = longitude, `y` = latitude, in
//! degrees).

mod error;
mod index;
mod isoline;
pub mod synth;

pub use crate::{
    error::ContourError,
    index::{LazyIndex, SpatialIndex},
    isoline::{Isoline, IsolineGeometry},
};

/// Base floating point type used for all coordinates.
pub type C = f64;
