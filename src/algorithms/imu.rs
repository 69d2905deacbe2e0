use serde::{Deserialize, Serialize};

use crate::algorithms::geodesy::{mean_bearing, wrap_two_pi};
use crate::algorithms::landmark::{decompose_offset, DirectionEstimate};
use crate::core::{Calibration, PixelPoint};
use crate::processing::stats::mean_and_std;
use crate::validation::{RangeError, RangeResult};

/// Minimum raw samples needed to average an attitude with a spread
const MIN_IMU_SAMPLES: usize = 2;

/// One raw attitude reading (radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    pub time_ms: i64,
    pub heading_rad: f64,
    pub pitch_rad: f64,
    pub tilt_rad: f64,
}

/// Fixed mounting offsets added to averaged IMU angles (radians)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuMounting {
    pub heading_rad: f64,
    pub pitch_rad: f64,
    pub tilt_rad: f64,
}

/// Camera attitude with per-axis uncertainty (radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuOrientation {
    /// True heading of the image centre, `[0, 2π)`
    pub heading_rad: f64,
    pub heading_error_rad: f64,
    /// Pitch of the image centre above the true horizontal
    pub pitch_rad: f64,
    pub pitch_error_rad: f64,
    pub tilt_rad: f64,
    pub tilt_error_rad: f64,
}

impl ImuOrientation {
    /// Attitude known without uncertainty
    pub fn new(heading_rad: f64, pitch_rad: f64, tilt_rad: f64) -> Self {
        Self {
            heading_rad: wrap_two_pi(heading_rad),
            heading_error_rad: 0.0,
            pitch_rad,
            pitch_error_rad: 0.0,
            tilt_rad,
            tilt_error_rad: 0.0,
        }
    }

    pub fn with_errors(mut self, heading: f64, pitch: f64, tilt: f64) -> Self {
        self.heading_error_rad = heading;
        self.pitch_error_rad = pitch;
        self.tilt_error_rad = tilt;
        self
    }

    /// Average the samples falling within `window_ms` centred on `time_ms`.
    ///
    /// Errors are the sample standard deviations; a window holding fewer than
    /// two samples cannot be trusted and is reported as missing input.
    pub fn from_samples(
        samples: &[ImuSample],
        time_ms: i64,
        window_ms: i64,
        mounting: &ImuMounting,
    ) -> RangeResult<Self> {
        let start = time_ms - window_ms / 2;
        let end = time_ms + window_ms / 2;
        let window: Vec<&ImuSample> = samples
            .iter()
            .filter(|s| s.time_ms >= start && s.time_ms <= end)
            .collect();
        if window.len() < MIN_IMU_SAMPLES {
            return Err(RangeError::missing(format!(
                "IMU samples: {} within {} ms of {}",
                window.len(),
                window_ms / 2,
                time_ms
            )));
        }

        let headings: Vec<f64> = window.iter().map(|s| s.heading_rad).collect();
        let pitches: Vec<f64> = window.iter().map(|s| s.pitch_rad).collect();
        let tilts: Vec<f64> = window.iter().map(|s| s.tilt_rad).collect();

        let missing = || RangeError::missing("IMU samples");
        let (heading, heading_error) = mean_bearing(&headings).ok_or_else(missing)?;
        let (pitch, pitch_error) = mean_and_std(&pitches).ok_or_else(missing)?;
        let (tilt, tilt_error) = mean_and_std(&tilts).ok_or_else(missing)?;

        log::debug!(
            "IMU attitude from {} samples: heading {:.2} pitch {:.2} tilt {:.2} deg",
            window.len(),
            heading.to_degrees(),
            pitch.to_degrees(),
            tilt.to_degrees()
        );

        Ok(Self {
            heading_rad: wrap_two_pi(heading + mounting.heading_rad),
            heading_error_rad: heading_error,
            pitch_rad: pitch + mounting.pitch_rad,
            pitch_error_rad: pitch_error,
            tilt_rad: tilt + mounting.tilt_rad,
            tilt_error_rad: tilt_error,
        })
    }

    /// Direction of `pixel` in an image of the given size. The attitude
    /// errors carry over unchanged to the target.
    pub fn locate(&self, pixel: PixelPoint, image_width: i32, image_height: i32, calibration: &Calibration) -> DirectionEstimate {
        let centre = PixelPoint::new(image_width / 2, image_height / 2);
        let (along, across) = decompose_offset(self.tilt_rad, centre, pixel);
        DirectionEstimate {
            bearing_rad: wrap_two_pi(self.heading_rad + calibration.pixels_to_radians(along)),
            bearing_error_rad: self.heading_error_rad,
            pitch_rad: self.pitch_rad - calibration.pixels_to_radians(across),
            pitch_error_rad: self.pitch_error_rad,
        }
    }
}
