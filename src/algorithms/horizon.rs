//! Horizon-referenced range measurement
//!
//! A target's angle below the horizon is the perpendicular pixel distance
//! from the target to the horizon line, scaled by the calibration. The
//! horizon is either clicked directly or reconstructed from a shore point
//! whose range is known from a map.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::algorithms::horizon_range::HorizonRangeModel;
use crate::core::{Calibration, PixelPoint};
use crate::validation::{RangeError, RangeResult};

/// Observed horizon through two image points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HorizonPoints", into = "HorizonPoints")]
pub struct HorizonLine {
    p1: PixelPoint,
    p2: PixelPoint,
}

/// Unchecked wire form of a horizon line
#[derive(Serialize, Deserialize)]
struct HorizonPoints {
    p1: PixelPoint,
    p2: PixelPoint,
}

impl TryFrom<HorizonPoints> for HorizonLine {
    type Error = RangeError;

    fn try_from(points: HorizonPoints) -> Result<Self, Self::Error> {
        Self::new(points.p1, points.p2)
    }
}

impl From<HorizonLine> for HorizonPoints {
    fn from(line: HorizonLine) -> Self {
        Self { p1: line.p1, p2: line.p2 }
    }
}

impl HorizonLine {
    pub fn new(p1: PixelPoint, p2: PixelPoint) -> RangeResult<Self> {
        if p1 == p2 {
            return Err(RangeError::degenerate("horizon points coincide"));
        }
        Ok(Self { p1, p2 })
    }

    pub fn points(&self) -> (PixelPoint, PixelPoint) {
        (self.p1, self.p2)
    }

    fn left_right(&self) -> (PixelPoint, PixelPoint) {
        if self.p1.x <= self.p2.x {
            (self.p1, self.p2)
        } else {
            (self.p2, self.p1)
        }
    }

    /// Foot of the perpendicular dropped from `target` onto the line
    pub fn foot_of_perpendicular(&self, target: PixelPoint) -> Vector2<f64> {
        let t = target.to_vector();
        if self.p1.x == self.p2.x {
            // vertical
            Vector2::new(self.p1.x as f64, t.y)
        } else if self.p1.y == self.p2.y {
            // horizontal
            Vector2::new(t.x, self.p1.y as f64)
        } else {
            let a = self.p1.to_vector();
            let d = self.p2.to_vector() - a;
            a + d * ((t - a).dot(&d) / d.norm_squared())
        }
    }

    /// Perpendicular pixel distance from the line, positive below it
    pub fn signed_offset(&self, target: PixelPoint) -> f64 {
        let distance = (target.to_vector() - self.foot_of_perpendicular(target)).norm();
        let (l, r) = self.left_right();
        let d = r.to_vector() - l.to_vector();
        let rel = target.to_vector() - l.to_vector();
        let side = d.x * rel.y - d.y * rel.x;
        if side < 0.0 && self.p1.x != self.p2.x {
            -distance
        } else {
            distance
        }
    }

    /// Tilt of the horizon in degrees, counter-clockwise positive
    pub fn tilt_deg(&self) -> f64 {
        let (l, r) = self.left_right();
        let (l, r) = (l.to_vector(), r.to_vector());
        (-(r.y - l.y)).atan2(r.x - l.x).to_degrees()
    }

    /// y coordinate of the line at `x`, `None` for a vertical line
    pub fn y_at(&self, x: f64) -> Option<f64> {
        if self.p1.x == self.p2.x {
            return None;
        }
        let (p1, p2) = (self.p1.to_vector(), self.p2.to_vector());
        Some(p1.y + (p2.y - p1.y) / (p2.x - p1.x) * (x - p1.x))
    }
}

/// Raw result of one horizon measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonMeasurement {
    /// Foot of the perpendicular on the horizon (pixels)
    pub horizon_point: (f64, f64),
    /// Pixel distance from target to horizon
    pub distance_pixels: f64,
    /// Angle below the horizon (radians)
    pub angle_rad: f64,
    /// Ground range (m)
    pub range_m: f64,
    /// Range uncertainty from a single-pixel error (m)
    pub pixel_accuracy_m: f64,
}

/// Turns horizon and target clicks into a ground range
#[derive(Debug)]
pub struct HorizonMeasurer<'a> {
    calibration: &'a Calibration,
    model: &'a dyn HorizonRangeModel,
    height: f64,
}

impl<'a> HorizonMeasurer<'a> {
    /// `height` is the tide-corrected camera height
    pub fn new(calibration: &'a Calibration, model: &'a dyn HorizonRangeModel, height: f64) -> Self {
        Self { calibration, model, height }
    }

    pub fn measure(&self, horizon: &HorizonLine, target: PixelPoint) -> RangeResult<HorizonMeasurement> {
        let foot = horizon.foot_of_perpendicular(target);
        let offset = horizon.signed_offset(target);
        let horizon_m = self.model.horizon_distance(self.height);
        if offset < 0.0 {
            return Err(RangeError::OutOfRange { range_m: f64::INFINITY, horizon_m });
        }

        let angle = self.calibration.pixels_to_radians(offset);
        let range = self.model.range(self.height, angle);
        if !range.is_finite() {
            return Err(RangeError::OutOfRange { range_m: range, horizon_m });
        }

        let pixel_accuracy = self.pixel_accuracy(angle);
        log::debug!(
            "horizon offset {:.1} px -> {:.4} deg -> {:.1} m (±{:.1} m)",
            offset, angle.to_degrees(), range, pixel_accuracy
        );

        Ok(HorizonMeasurement {
            horizon_point: (foot.x, foot.y),
            distance_pixels: offset,
            angle_rad: angle,
            range_m: range,
            pixel_accuracy_m: pixel_accuracy,
        })
    }

    /// Half the range spread when the angle is perturbed by one calibration unit
    pub fn pixel_accuracy(&self, angle: f64) -> f64 {
        let unit = self.calibration.unit_radians();
        let near = self.model.range(self.height, angle + unit);
        // the horizon itself bounds the far side
        let far = self.model.range(self.height, (angle - unit).max(0.0));
        (near - far).abs() / 2.0
    }

    /// Rebuild the horizon from a shore point whose ground range is known.
    ///
    /// The line spans the full image width and is tilted by `tilt_deg`.
    pub fn horizon_from_shore(
        &self,
        shore_point: PixelPoint,
        shore_range_m: f64,
        image_width: i32,
        tilt_deg: f64,
    ) -> RangeResult<HorizonLine> {
        if image_width <= 0 {
            return Err(RangeError::missing("image width"));
        }
        let angle_to = self.model.angle(self.height, shore_range_m);
        if angle_to < 0.0 {
            return Err(RangeError::OutOfRange {
                range_m: shore_range_m,
                horizon_m: self.model.horizon_distance(self.height),
            });
        }

        let y = shore_point.y as f64 - self.calibration.degrees_to_pixels(angle_to.to_degrees());
        let slope = tilt_deg.to_radians().tan();
        let left = PixelPoint::new(0, (y + shore_point.x as f64 * slope).round() as i32);
        let right = PixelPoint::new(
            image_width,
            (y - (image_width as f64 - shore_point.x as f64) * slope).round() as i32,
        );
        HorizonLine::new(left, right)
    }
}

/// True bearing of an image column, given the bearing of the image centre
pub fn pixel_bearing_deg(image_heading_deg: f64, x: i32, image_width: i32, calibration: &Calibration) -> f64 {
    image_heading_deg + angle_correction_deg(x, image_width, calibration)
}

/// Horizontal angle between the image centre and column `x`
pub fn angle_correction_deg(x: i32, image_width: i32, calibration: &Calibration) -> f64 {
    calibration.pixels_to_degrees(x as f64 - image_width as f64 / 2.0)
}

/// Pick the shore range to use from map ranges sorted nearest first,
/// optionally skipping the nearest segment (the shore the camera stands on).
pub fn select_shore_range(sorted_ranges: &[f64], ignore_closest: bool) -> Option<f64> {
    let want = usize::from(ignore_closest);
    sorted_ranges.get(want).copied()
}
