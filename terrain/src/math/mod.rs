mod linspace;
pub mod mercator;

pub use {
    linspace::linspace,
    mercator::{to_geographic, to_planar, Chord},
};
