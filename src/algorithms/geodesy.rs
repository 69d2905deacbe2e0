use std::f64::consts::{PI, TAU};

use crate::core::{GeoPoint, EARTH_RADIUS_M};
use crate::processing::stats::mean_and_std;
use crate::validation::{RangeError, RangeResult};

/// Great-circle (haversine) distance between two points, ignoring height
pub fn distance_m(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing in degrees, 0 = north, clockwise, in `[0, 360)`
pub fn bearing_deg(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    wrap_two_pi(y.atan2(x)).to_degrees()
}

/// Destination reached travelling `range_m` along a great circle from `origin`
/// with initial bearing `bearing_deg`. Height is carried over from the origin.
pub fn project(origin: &GeoPoint, bearing_deg: f64, range_m: f64) -> GeoPoint {
    if range_m == 0.0 {
        return *origin;
    }

    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = range_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint {
        latitude: lat2.to_degrees(),
        longitude: normalize_longitude(lon2.to_degrees()),
        height: origin.height,
    }
}

/// Longitude into `[-180, 180)`
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Difference `b2 - b1` (radians) along the shortest arc, in `[-π, π]`
pub fn bearing_difference(b1: f64, b2: f64) -> f64 {
    let diff = b2 - b1;
    if diff.abs() > PI {
        if diff < 0.0 {
            diff + TAU
        } else {
            diff - TAU
        }
    } else {
        diff
    }
}

/// Angle (radians) into `[0, 2π)`
pub fn wrap_two_pi(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Mean and sample spread of bearings (radians). Offsets are taken along
/// the shortest arc from the first bearing so that estimates either side of
/// north average correctly. `None` for an empty slice.
pub fn mean_bearing(bearings: &[f64]) -> Option<(f64, f64)> {
    let &reference = bearings.first()?;
    let offsets: Vec<f64> = bearings.iter().map(|&b| bearing_difference(reference, b)).collect();
    let (mean_offset, spread) = mean_and_std(&offsets)?;
    Some((wrap_two_pi(reference + mean_offset), spread))
}

/// Mean and sample spread of signed angles such as image tilts, in
/// `(-π, π]`. Averaged along the shortest arc like [`mean_bearing`].
pub fn mean_signed_angle(angles: &[f64]) -> Option<(f64, f64)> {
    let &reference = angles.first()?;
    let offsets: Vec<f64> = angles.iter().map(|&a| bearing_difference(reference, a)).collect();
    let (mean_offset, spread) = mean_and_std(&offsets)?;
    Some((constrain_angle(reference + mean_offset, PI), spread))
}

/// Angle (radians) into `(max - 2π, max]`
pub fn constrain_angle(angle: f64, max: f64) -> f64 {
    let mut angle = angle;
    while angle > max {
        angle -= TAU;
    }
    while angle <= max - TAU {
        angle += TAU;
    }
    angle
}

/// Reject geographic points outside the valid latitude/longitude domain
pub fn validate_geo_point(point: &GeoPoint) -> RangeResult<()> {
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(RangeError::degenerate(format!(
            "latitude {} outside [-90, 90]",
            point.latitude
        )));
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(RangeError::degenerate(format!(
            "longitude {} outside [-180, 180]",
            point.longitude
        )));
    }
    if !point.height.is_finite() {
        return Err(RangeError::degenerate("non-finite height"));
    }
    Ok(())
}
