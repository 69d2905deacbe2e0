//! Geometry of a single image: horizon ranging, landmark and IMU orientation

pub mod geodesy;
pub mod horizon_range;
pub mod horizon;
pub mod landmark;
pub mod imu;

pub use horizon_range::{HorizonRangeModel, RangeModelKind, Refraction, RoundEarth};
pub use horizon::{HorizonLine, HorizonMeasurer};
pub use landmark::{LandmarkOrientationSolver, OriginSource};
pub use imu::ImuOrientation;
