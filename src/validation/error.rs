use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type RangeResult<T> = Result<T, RangeError>;

/// Reasons a measurement could not be computed.
///
/// Every variant is recoverable: the engine aborts the single measurement
/// and hands the reason back to the caller, which owns user messaging.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RangeError {
    /// A required input (calibration, height, landmark group, origin...) was not supplied
    #[error("cannot compute: missing {what}")]
    MissingInput { what: String },

    /// The supplied points do not define a usable geometry
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry { reason: String },

    /// The target lies beyond the visible horizon for the platform height
    #[error("target is over the horizon: range {range_m:.1} m exceeds horizon distance {horizon_m:.1} m")]
    OutOfRange { range_m: f64, horizon_m: f64 },

    /// Tide samples are not strictly increasing in time
    #[error("invalid tide series at sample {index}: {reason}")]
    InvalidTideSeries { index: usize, reason: String },

    /// Degrees per pixel must be positive and finite
    #[error("invalid calibration: {value} degrees per pixel")]
    InvalidCalibration { value: f64 },

    /// Direction-based landmarks of one group were observed from different origins
    #[error("landmark group '{group}' has direction landmarks with different origins")]
    InconsistentLandmarkOrigin { group: String },

    /// Configuration snapshot could not be loaded or resolved
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RangeError {
    pub fn missing(what: impl Into<String>) -> Self {
        RangeError::MissingInput { what: what.into() }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        RangeError::DegenerateGeometry { reason: reason.into() }
    }

    /// Over-the-horizon results are a sentinel rather than a failure; callers
    /// may choose to warn and accept.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, RangeError::OutOfRange { .. })
    }
}
