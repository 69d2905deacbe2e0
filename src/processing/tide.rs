//! Tide level time series with linear interpolation

use serde::{Deserialize, Serialize};

use crate::core::GeoPoint;
use crate::validation::{RangeError, RangeResult};

/// One tide prediction or observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideSample {
    /// Milliseconds since the Unix epoch
    pub time_ms: i64,
    /// Water level above the reference sea level (m)
    pub level_m: f64,
    /// Current speed
    pub speed: f64,
    /// Current direction (radians)
    pub direction_rad: f64,
    /// Where the prediction applies
    pub location: Option<GeoPoint>,
}

impl TideSample {
    pub fn new(time_ms: i64, level_m: f64, speed: f64, direction_rad: f64) -> Self {
        Self { time_ms, level_m, speed, direction_rad, location: None }
    }

    pub fn at(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// Time-ordered tide samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TideSample>", into = "Vec<TideSample>")]
pub struct TideSeries {
    samples: Vec<TideSample>,
}

impl TryFrom<Vec<TideSample>> for TideSeries {
    type Error = RangeError;

    fn try_from(samples: Vec<TideSample>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<TideSeries> for Vec<TideSample> {
    fn from(series: TideSeries) -> Self {
        series.samples
    }
}

impl TideSeries {
    /// Wrap samples, checking timestamps strictly increase
    pub fn new(samples: Vec<TideSample>) -> RangeResult<Self> {
        Self::check_order(&samples)?;
        Ok(Self { samples })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn check_order(samples: &[TideSample]) -> RangeResult<()> {
        for (index, pair) in samples.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.time_ms == prev.time_ms {
                return Err(RangeError::InvalidTideSeries {
                    index: index + 1,
                    reason: format!("duplicate timestamp {}", next.time_ms),
                });
            }
            if next.time_ms < prev.time_ms {
                return Err(RangeError::InvalidTideSeries {
                    index: index + 1,
                    reason: format!("timestamp {} precedes {}", next.time_ms, prev.time_ms),
                });
            }
        }
        Ok(())
    }

    pub fn samples(&self) -> &[TideSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Last sample at or before `time_ms` and first sample after it
    fn bracket(&self, time_ms: i64) -> Option<(usize, &TideSample, &TideSample)> {
        let after = self.samples.partition_point(|s| s.time_ms <= time_ms);
        if after == 0 || after >= self.samples.len() {
            return None;
        }
        Some((after, &self.samples[after - 1], &self.samples[after]))
    }

    /// Linearly interpolated sample, `None` when `time_ms` is not bracketed
    pub fn interpolate(&self, time_ms: i64) -> RangeResult<Option<TideSample>> {
        let Some((index, s1, s2)) = self.bracket(time_ms) else {
            log::trace!("no tide samples bracket {}", time_ms);
            return Ok(None);
        };
        if s2.time_ms <= s1.time_ms {
            return Err(RangeError::InvalidTideSeries {
                index,
                reason: format!("timestamp {} does not follow {}", s2.time_ms, s1.time_ms),
            });
        }

        let fraction = (time_ms - s1.time_ms) as f64 / (s2.time_ms - s1.time_ms) as f64;
        let lerp = |a: f64, b: f64| a + fraction * (b - a);

        Ok(Some(TideSample {
            time_ms,
            level_m: lerp(s1.level_m, s2.level_m),
            speed: lerp(s1.speed, s2.speed),
            direction_rad: lerp(s1.direction_rad, s2.direction_rad),
            location: s1.location,
        }))
    }

    /// Tide level at `time_ms`, 0 when no correction is available
    pub fn offset(&self, time_ms: i64) -> RangeResult<f64> {
        Ok(self.interpolate(time_ms)?.map_or(0.0, |sample| sample.level_m))
    }
}

/// Tide correction for an image.
///
/// Images without a timestamp or without tide data are not corrected.
pub fn tide_offset(tide: Option<&TideSeries>, time_ms: Option<i64>) -> RangeResult<f64> {
    match (tide, time_ms) {
        (Some(series), Some(time)) => series.offset(time),
        _ => Ok(0.0),
    }
}
