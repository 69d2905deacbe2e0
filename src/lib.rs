//! Photogrammetric range finding
//!
//! Estimates the ground range, bearing and position of a target on the sea
//! surface from a single image taken at a known height. The image is oriented
//! by the visible horizon, a shore point of known range, surveyed landmarks or
//! an IMU attitude reading.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;

// Re-export commonly used types
pub use self::core::{Calibration, GeoPoint, HeightEntry, Landmark, LandmarkGroup, PixelPoint, EARTH_RADIUS_M};
pub use algorithms::{HorizonRangeModel, RangeModelKind, Refraction, RoundEarth};
pub use processing::{compute, Measurement, MeasurementRequest, Method, TideSeries};
pub use validation::{RangeError, RangeResult};
pub use utils::ConfigurationManager;
