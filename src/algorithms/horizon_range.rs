//! Earth-geometry strategies converting angle below the horizon to ground range
//!
//! Both models solve the same triangle (earth centre, camera, surface point);
//! they differ only in the radius fed into it. The refraction model bends
//! rays by using an enlarged effective radius `R / (1 - k)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{
    EARTH_RADIUS_M, GAS_CONSTANT_DRY_AIR, GRAVITY, OVER_HORIZON, STANDARD_REFRACTION_COEFFICIENT,
};
use crate::validation::{RangeError, RangeResult};

/// Relative slack when comparing a range against the horizon distance
const HORIZON_TOLERANCE: f64 = 1e-9;

/// Pluggable conversion between angle below the horizon, ground range and height.
///
/// Heights are camera heights above the water surface in metres, angles are
/// radians, ranges are metres measured along the surface.
pub trait HorizonRangeModel: fmt::Debug + Send + Sync {
    /// Display name of the model
    fn name(&self) -> &'static str;

    /// Serialisable selector that rebuilds this model
    fn kind(&self) -> RangeModelKind;

    /// Radius of the sphere the rays are traced against
    fn effective_radius(&self) -> f64;

    /// Dip of the visible horizon below the true horizontal
    fn horizon_dip(&self, height: f64) -> f64 {
        let r = self.effective_radius();
        (r / (r + height)).acos()
    }

    /// Surface distance to the visible horizon
    fn horizon_distance(&self, height: f64) -> f64 {
        self.effective_radius() * self.horizon_dip(height)
    }

    /// Ground range of a point seen `angle` radians below the horizon.
    ///
    /// Returns `NaN` for rays that never meet the surface (angles above the horizon).
    fn range(&self, height: f64, angle: f64) -> f64 {
        let r = self.effective_radius();
        let a = r + height;
        let depression = self.horizon_dip(height) + angle;
        if depression <= 0.0 {
            return f64::NAN;
        }

        let (sin_d, cos_d) = depression.sin_cos();
        let discriminant = r * r - (a * cos_d).powi(2);
        if discriminant < -HORIZON_TOLERANCE * r * r {
            return f64::NAN;
        }
        let slant = a * sin_d - discriminant.max(0.0).sqrt();
        let central = (slant * cos_d).atan2(a - slant * sin_d);
        r * central
    }

    /// Angle below the horizon at which a point `range` metres away appears.
    ///
    /// Returns [`OVER_HORIZON`] if the point is beyond the horizon.
    fn angle(&self, height: f64, range: f64) -> f64 {
        let horizon = self.horizon_distance(height);
        if range > horizon * (1.0 + HORIZON_TOLERANCE) {
            return OVER_HORIZON;
        }
        let r = self.effective_radius();
        let a = r + height;
        let dip = self.horizon_dip(height);
        let central = (range / r).min(dip);

        let (sin_c, cos_c) = central.sin_cos();
        let depression = (a - r * cos_c).atan2(r * sin_c);
        (depression - dip).max(0.0)
    }

    /// Ground range for a camera pitched `pitch` radians relative to the true
    /// horizontal (negative looks down). `NaN` when the ray misses the surface.
    fn range_from_pitch(&self, height: f64, pitch: f64) -> f64 {
        self.range(height, -pitch - self.horizon_dip(height))
    }

    /// Pitch relative to the true horizontal of a surface point `range` metres away
    fn pitch_from_range(&self, height: f64, range: f64) -> Option<f64> {
        let angle = self.angle(height, range);
        if angle < 0.0 {
            return None;
        }
        Some(-(angle + self.horizon_dip(height)))
    }
}

/// Spherical earth without atmospheric refraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundEarth {
    radius: f64,
}

impl Default for RoundEarth {
    fn default() -> Self {
        Self { radius: EARTH_RADIUS_M }
    }
}

impl RoundEarth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HorizonRangeModel for RoundEarth {
    fn name(&self) -> &'static str {
        "Round Earth Method"
    }

    fn kind(&self) -> RangeModelKind {
        RangeModelKind::RoundEarth
    }

    fn effective_radius(&self) -> f64 {
        self.radius
    }
}

/// Spherical earth with rays curved by a constant refraction coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refraction {
    coefficient: f64,
    radius: f64,
}

impl Default for Refraction {
    fn default() -> Self {
        Self::from_coefficient(STANDARD_REFRACTION_COEFFICIENT)
    }
}

impl Refraction {
    /// Coefficient `k` must lie in `[0, 1)`
    pub fn new(coefficient: f64) -> RangeResult<Self> {
        if !(coefficient.is_finite() && (0.0..1.0).contains(&coefficient)) {
            return Err(RangeError::Config {
                message: format!("refraction coefficient {} outside [0, 1)", coefficient),
            });
        }
        Ok(Self::from_coefficient(coefficient))
    }

    /// Refraction coefficient of the lower atmosphere:
    /// `k = 503 · P / T² · (g / R_air + dT/dz)`
    pub fn from_atmosphere(pressure_hpa: f64, temperature_k: f64, lapse_rate_k_per_m: f64) -> RangeResult<Self> {
        if temperature_k <= 0.0 {
            return Err(RangeError::Config {
                message: format!("temperature {} K must be positive", temperature_k),
            });
        }
        let k = 503.0 * pressure_hpa / temperature_k.powi(2)
            * (GRAVITY / GAS_CONSTANT_DRY_AIR + lapse_rate_k_per_m);
        log::debug!(
            "refraction coefficient {:.4} for P={} hPa T={} K dT/dz={}",
            k, pressure_hpa, temperature_k, lapse_rate_k_per_m
        );
        Self::new(k)
    }

    fn from_coefficient(coefficient: f64) -> Self {
        Self { coefficient, radius: EARTH_RADIUS_M / (1.0 - coefficient) }
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }
}

impl HorizonRangeModel for Refraction {
    fn name(&self) -> &'static str {
        "Refraction Method"
    }

    fn kind(&self) -> RangeModelKind {
        RangeModelKind::Refraction { coefficient: self.coefficient }
    }

    fn effective_radius(&self) -> f64 {
        self.radius
    }
}

/// Serialisable choice of range model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RangeModelKind {
    #[default]
    RoundEarth,
    Refraction { coefficient: f64 },
}

impl RangeModelKind {
    pub fn build(&self) -> RangeResult<Box<dyn HorizonRangeModel>> {
        Ok(match *self {
            RangeModelKind::RoundEarth => Box::new(RoundEarth::new()),
            RangeModelKind::Refraction { coefficient } => Box::new(Refraction::new(coefficient)?),
        })
    }
}
