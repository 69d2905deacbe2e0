//! Physical constants and engine parameters

/// Earth radius used by every horizon and great-circle calculation (m)
pub const EARTH_RADIUS_M: f64 = 6_356_766.0;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.80665;

/// Specific gas constant for dry air (J/(kg·K))
pub const GAS_CONSTANT_DRY_AIR: f64 = 287.05;

/// Standard atmospheric refraction coefficient (ratio of earth radius to ray radius)
pub const STANDARD_REFRACTION_COEFFICIENT: f64 = 0.13;

/// Returned by [`HorizonRangeModel::angle`](crate::algorithms::HorizonRangeModel::angle)
/// when the requested range lies beyond the visible horizon.
pub const OVER_HORIZON: f64 = -1.0;

/// Minimum number of landmarks needed to recover an image orientation
pub const MIN_LANDMARKS: usize = 2;
