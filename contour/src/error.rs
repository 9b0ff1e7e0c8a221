use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContourError {
    #[error("at least 2 levels are required, got {0}")]
    Levels(usize),

    #[error("bounding box has no area")]
    EmptyBounds,

    #[error("no usable base geometry to derive isolines from")]
    NoCoverage,
}
