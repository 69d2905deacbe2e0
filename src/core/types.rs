//! Core data types for the range-finding engine

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::validation::{RangeError, RangeResult};

/// Geographic position: latitude/longitude in degrees, height in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self { latitude, longitude, height }
    }

    pub fn with_height(self, height: f64) -> Self {
        Self { height, ..self }
    }
}

/// Pixel in source-image space, y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x as f64, self.y as f64)
    }

    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        (other.to_vector() - self.to_vector()).norm()
    }
}

/// Linear pixel to angle mapping of one camera/lens/zoom combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    name: String,
    degrees_per_pixel: f64,
}

impl Calibration {
    pub fn new(name: impl Into<String>, degrees_per_pixel: f64) -> RangeResult<Self> {
        if !(degrees_per_pixel.is_finite() && degrees_per_pixel > 0.0) {
            return Err(RangeError::InvalidCalibration { value: degrees_per_pixel });
        }
        Ok(Self { name: name.into(), degrees_per_pixel })
    }

    /// Calibrate from two pixels whose true angular separation is known
    pub fn from_points(
        name: impl Into<String>,
        p1: PixelPoint,
        p2: PixelPoint,
        separation_deg: f64,
    ) -> RangeResult<Self> {
        let pixels = p1.distance_to(&p2);
        if pixels == 0.0 {
            return Err(RangeError::degenerate("calibration points coincide"));
        }
        Self::new(name, separation_deg.abs() / pixels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn degrees_per_pixel(&self) -> f64 {
        self.degrees_per_pixel
    }

    pub fn pixels_per_degree(&self) -> f64 {
        1.0 / self.degrees_per_pixel
    }

    pub fn pixels_to_degrees(&self, pixels: f64) -> f64 {
        pixels * self.degrees_per_pixel
    }

    pub fn degrees_to_pixels(&self, degrees: f64) -> f64 {
        degrees / self.degrees_per_pixel
    }

    pub fn pixels_to_radians(&self, pixels: f64) -> f64 {
        self.pixels_to_degrees(pixels).to_radians()
    }

    /// One calibration unit (a single pixel) expressed in radians
    pub fn unit_radians(&self) -> f64 {
        self.degrees_per_pixel.to_radians()
    }
}

/// Named camera height above the reference sea level, before tide correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightEntry {
    pub name: String,
    pub height_m: f64,
}

impl HeightEntry {
    pub fn new(name: impl Into<String>, height_m: f64) -> Self {
        Self { name: name.into(), height_m }
    }
}

/// How a landmark's direction is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LandmarkReference {
    /// Surveyed location, including height
    Position(GeoPoint),
    /// Bearing and pitch observed from a known vantage point (e.g. a theodolite station)
    Direction {
        bearing_deg: f64,
        pitch_deg: f64,
        origin: GeoPoint,
    },
}

/// Reference feature visible in the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub reference: LandmarkReference,
}

impl Landmark {
    pub fn at_position(name: impl Into<String>, position: GeoPoint) -> Self {
        Self { name: name.into(), reference: LandmarkReference::Position(position) }
    }

    pub fn at_direction(name: impl Into<String>, bearing_deg: f64, pitch_deg: f64, origin: GeoPoint) -> Self {
        Self {
            name: name.into(),
            reference: LandmarkReference::Direction { bearing_deg, pitch_deg, origin },
        }
    }

    /// Vantage point of a direction landmark
    pub fn origin(&self) -> Option<&GeoPoint> {
        match &self.reference {
            LandmarkReference::Direction { origin, .. } => Some(origin),
            LandmarkReference::Position(_) => None,
        }
    }
}

/// Ordered, named set of landmarks used together on one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkGroup {
    name: String,
    #[serde(default)]
    comment: Option<String>,
    landmarks: Vec<Landmark>,
}

impl LandmarkGroup {
    pub fn new(name: impl Into<String>, landmarks: Vec<Landmark>) -> RangeResult<Self> {
        let group = Self { name: name.into(), comment: None, landmarks };
        group.validate()?;
        Ok(group)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// All direction landmarks must share one vantage point
    pub fn validate(&self) -> RangeResult<()> {
        let mut origins = self.landmarks.iter().filter_map(Landmark::origin);
        if let Some(first) = origins.next() {
            if origins.any(|other| other != first) {
                return Err(RangeError::InconsistentLandmarkOrigin { group: self.name.clone() });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Shared vantage point if any landmark is direction based
    pub fn origin(&self) -> Option<&GeoPoint> {
        self.landmarks.iter().find_map(Landmark::origin)
    }

    /// Height at which the group's bearings were taken, if forced by the survey
    pub fn origin_height(&self) -> Option<f64> {
        self.origin().map(|origin| origin.height)
    }
}
