use crate::profile::Stage;
use contour::ContourError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    #[error("project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("singular normal matrix for window {window}, order {order}")]
    Singular { window: usize, order: usize },

    #[error("cancelled before {0:?}")]
    Cancelled(Stage),

    #[error("{0}")]
    Contour(#[from] ContourError),

    #[error("{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidArgument {
    #[error("non-finite coordinate")]
    NonFinite,

    #[error("start and end points are too close")]
    TooClose,

    #[error("path length {distance_m} m is shorter than step {step_m} m")]
    TooShort { distance_m: f64, step_m: f64 },

    #[error("step size must be positive")]
    NonPositiveStep,

    #[error("{0}")]
    Interpolation(&'static str),

    #[error("smoothing window must be odd, got {0}")]
    EvenWindow(usize),

    #[error("polynomial order {order} must be less than window {window}")]
    OrderTooHigh { window: usize, order: usize },

    #[error("a profile needs at least 2 output samples, got {0}")]
    OutputSamples(usize),

    #[error("{0} must be finite and non-negative")]
    Config(&'static str),

    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
}
