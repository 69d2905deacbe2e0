//! Image orientation from landmarks of known direction
//!
//! Two landmarks fix four of the five unknowns needed to place a target on
//! the sea surface: image tilt, angular scale, and the bearing and pitch of
//! any pixel. Every unordered pair of landmarks yields one tilt and one
//! pixels-per-degree estimate; their mean defines the image, their sample
//! standard deviation its uncertainty.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::algorithms::geodesy::{self, bearing_difference, constrain_angle, mean_bearing, mean_signed_angle, wrap_two_pi};
use crate::core::{Calibration, GeoPoint, HeightEntry, Landmark, LandmarkGroup, LandmarkReference, PixelPoint, MIN_LANDMARKS};
use crate::processing::stats::mean_and_std;
use crate::validation::{RangeError, RangeResult};

/// A landmark clicked on the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMark {
    pub landmark: Landmark,
    pub pixel: PixelPoint,
}

impl LandmarkMark {
    pub fn new(landmark: Landmark, pixel: PixelPoint) -> Self {
        Self { landmark, pixel }
    }
}

/// Where the image origin came from, for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginSource {
    /// Vantage point shared by the landmark group's direction landmarks
    LandmarkGroup,
    GpsTag,
    Manual,
    Imu,
}

/// Camera position and height used for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOrigin {
    /// Camera position; `height` is the tide-corrected camera height
    pub position: GeoPoint,
    pub source: OriginSource,
    /// Height record actually used (forced group height or selected entry, tide applied)
    pub height: HeightEntry,
}

/// Resolve the image origin and camera height for a landmark measurement.
///
/// Direction landmarks are meaningless away from the point they were observed
/// from, so a group containing any forces its own origin over `external`. The
/// group's survey height likewise overrides `height_entry`. The tide offset is
/// added exactly once whichever height wins.
pub fn resolve_origin(
    group: &LandmarkGroup,
    external: Option<(GeoPoint, OriginSource)>,
    height_entry: Option<&HeightEntry>,
    tide_offset_m: f64,
) -> RangeResult<ImageOrigin> {
    let height = match (group.origin_height(), height_entry) {
        (Some(forced), _) => HeightEntry::new("forced landmark height", forced + tide_offset_m),
        (None, Some(entry)) => HeightEntry::new(entry.name.clone(), entry.height_m + tide_offset_m),
        (None, None) => return Err(RangeError::missing("height")),
    };

    let (position, source) = match group.origin() {
        Some(origin) => (*origin, OriginSource::LandmarkGroup),
        None => external.ok_or_else(|| RangeError::missing("image origin"))?,
    };
    geodesy::validate_geo_point(&position)?;

    Ok(ImageOrigin { position: position.with_height(height.height_m), source, height })
}

/// True bearing (radians, clockwise from north) of a landmark seen from `origin`
pub fn landmark_bearing(landmark: &Landmark, origin: &GeoPoint) -> f64 {
    match &landmark.reference {
        LandmarkReference::Position(position) => geodesy::bearing_deg(origin, position).to_radians(),
        LandmarkReference::Direction { bearing_deg, .. } => bearing_deg.to_radians(),
    }
}

/// True pitch (radians, up positive) of a landmark seen from `origin`
pub fn landmark_pitch(landmark: &Landmark, origin: &GeoPoint) -> RangeResult<f64> {
    match &landmark.reference {
        LandmarkReference::Position(position) => {
            let distance = geodesy::distance_m(origin, position);
            if distance == 0.0 {
                return Err(RangeError::degenerate(format!(
                    "landmark '{}' coincides with the image origin",
                    landmark.name
                )));
            }
            Ok(((position.height - origin.height) / distance).atan())
        }
        LandmarkReference::Direction { pitch_deg, .. } => Ok(pitch_deg.to_radians()),
    }
}

/// Tilt of the image implied by one landmark pair (radians, in `(-π, π]`)
pub fn pair_tilt(p1: PixelPoint, p2: PixelPoint, bearing_diff: f64, pitch_diff: f64) -> f64 {
    let (a, b) = (p1.to_vector(), p2.to_vector());
    let horizontal = (b.y - a.y).atan2(b.x - a.x);
    let actual = pitch_diff.atan2(bearing_diff);
    constrain_angle(-actual - horizontal, PI)
}

/// Angular scale implied by one landmark pair
pub fn pair_pixels_per_degree(pixel_distance: f64, bearing_diff: f64, pitch_diff: f64) -> f64 {
    pixel_distance / bearing_diff.hypot(pitch_diff).to_degrees()
}

/// Pixel offset from `from` to `to` split into the image's bearing and
/// pitch axes: `(along, across)`, across positive downwards.
pub fn decompose_offset(tilt: f64, from: PixelPoint, to: PixelPoint) -> (f64, f64) {
    let offset = to.to_vector() - from.to_vector();
    let distance = offset.norm();
    let angle = offset.y.atan2(offset.x);
    ((angle + tilt).cos() * distance, (angle + tilt).sin() * distance)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ResolvedMark {
    name: String,
    pixel: PixelPoint,
    bearing: f64,
    pitch: f64,
}

/// Orientation estimate from one landmark pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSolution {
    pub first: usize,
    pub second: usize,
    pub tilt_rad: f64,
    pub pixels_per_degree: f64,
}

/// Direction of a pixel with its spread over the landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionEstimate {
    /// True bearing, `[0, 2π)`
    pub bearing_rad: f64,
    pub bearing_error_rad: f64,
    /// Pitch relative to the true horizontal, up positive
    pub pitch_rad: f64,
    pub pitch_error_rad: f64,
}

/// Orientation of the whole image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageOrientation {
    pub bearing_rad: f64,
    pub bearing_error_rad: f64,
    pub pitch_rad: f64,
    pub pitch_error_rad: f64,
    pub tilt_rad: f64,
    pub tilt_error_rad: f64,
}

/// Image tilt and angular calibration recovered from landmark correspondences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkOrientationSolver {
    marks: Vec<ResolvedMark>,
    pairs: Vec<PairSolution>,
    tilt_rad: f64,
    tilt_error_rad: f64,
    pixels_per_degree: f64,
    pixels_per_degree_error: f64,
}

impl LandmarkOrientationSolver {
    /// Solve for tilt and calibration from at least two landmark clicks
    pub fn solve(marks: &[LandmarkMark], origin: &GeoPoint) -> RangeResult<Self> {
        if marks.len() < MIN_LANDMARKS {
            return Err(RangeError::missing(format!(
                "landmarks: {} marked, {} required",
                marks.len(),
                MIN_LANDMARKS
            )));
        }

        let resolved = marks
            .iter()
            .map(|mark| {
                Ok(ResolvedMark {
                    name: mark.landmark.name.clone(),
                    pixel: mark.pixel,
                    bearing: landmark_bearing(&mark.landmark, origin),
                    pitch: landmark_pitch(&mark.landmark, origin)?,
                })
            })
            .collect::<RangeResult<Vec<_>>>()?;

        let mut pairs = Vec::with_capacity(resolved.len() * (resolved.len() - 1) / 2);
        for i in 0..resolved.len() {
            for j in (i + 1)..resolved.len() {
                pairs.push(Self::solve_pair(&resolved, i, j)?);
            }
        }

        let tilts: Vec<f64> = pairs.iter().map(|p| p.tilt_rad).collect();
        let scales: Vec<f64> = pairs.iter().map(|p| p.pixels_per_degree).collect();
        // tilts wrap at ±π for an upside-down image
        let (tilt, tilt_error) = mean_signed_angle(&tilts).ok_or_else(|| RangeError::missing("landmark pairs"))?;
        let (ppd, ppd_error) = mean_and_std(&scales).ok_or_else(|| RangeError::missing("landmark pairs"))?;

        log::debug!(
            "landmark solution from {} pairs: tilt {:.3}±{:.3} deg, {:.3}±{:.3} px/deg",
            pairs.len(),
            tilt.to_degrees(),
            tilt_error.to_degrees(),
            ppd,
            ppd_error
        );

        Ok(Self {
            marks: resolved,
            pairs,
            tilt_rad: tilt,
            tilt_error_rad: tilt_error,
            pixels_per_degree: ppd,
            pixels_per_degree_error: ppd_error,
        })
    }

    fn solve_pair(marks: &[ResolvedMark], i: usize, j: usize) -> RangeResult<PairSolution> {
        let (a, b) = (&marks[i], &marks[j]);
        let bearing_diff = bearing_difference(a.bearing, b.bearing);
        let pitch_diff = -(a.pitch - b.pitch);

        let pixel_distance = a.pixel.distance_to(&b.pixel);
        if pixel_distance == 0.0 {
            return Err(RangeError::degenerate(format!(
                "landmarks '{}' and '{}' marked on the same pixel",
                a.name, b.name
            )));
        }
        if bearing_diff == 0.0 && pitch_diff == 0.0 {
            return Err(RangeError::degenerate(format!(
                "landmarks '{}' and '{}' lie in the same direction",
                a.name, b.name
            )));
        }

        let pair = PairSolution {
            first: i,
            second: j,
            tilt_rad: pair_tilt(a.pixel, b.pixel, bearing_diff, pitch_diff),
            pixels_per_degree: pair_pixels_per_degree(pixel_distance, bearing_diff, pitch_diff),
        };
        log::trace!(
            "pair {}-{}: tilt {:.3} deg, {:.3} px/deg",
            a.name,
            b.name,
            pair.tilt_rad.to_degrees(),
            pair.pixels_per_degree
        );
        Ok(pair)
    }

    pub fn pairs(&self) -> &[PairSolution] {
        &self.pairs
    }

    pub fn tilt_rad(&self) -> f64 {
        self.tilt_rad
    }

    pub fn tilt_error_rad(&self) -> f64 {
        self.tilt_error_rad
    }

    pub fn pixels_per_degree(&self) -> f64 {
        self.pixels_per_degree
    }

    pub fn pixels_per_degree_error(&self) -> f64 {
        self.pixels_per_degree_error
    }

    /// Calibration implied by the landmarks
    pub fn calibration(&self) -> RangeResult<Calibration> {
        Calibration::new("landmark calibration", 1.0 / self.pixels_per_degree)
    }

    /// True bearing and pitch of `pixel`, averaged over the estimates made
    /// from each landmark
    pub fn locate(&self, pixel: PixelPoint) -> DirectionEstimate {
        let mut bearings = Vec::with_capacity(self.marks.len());
        let mut pitches = Vec::with_capacity(self.marks.len());
        for mark in &self.marks {
            let (along, across) = decompose_offset(self.tilt_rad, mark.pixel, pixel);
            bearings.push(wrap_two_pi(mark.bearing + (along / self.pixels_per_degree).to_radians()));
            pitches.push(mark.pitch - (across / self.pixels_per_degree).to_radians());
        }

        // solve() guarantees at least two marks
        let (bearing, bearing_error) = mean_bearing(&bearings).unwrap_or_default();
        let (pitch, pitch_error) = mean_and_std(&pitches).unwrap_or_default();
        DirectionEstimate {
            bearing_rad: bearing,
            bearing_error_rad: bearing_error,
            pitch_rad: pitch,
            pitch_error_rad: pitch_error,
        }
    }

    /// Orientation of the image centre
    pub fn image_orientation(&self, image_width: i32, image_height: i32) -> ImageOrientation {
        let centre = PixelPoint::new(image_width / 2, image_height / 2);
        let direction = self.locate(centre);
        ImageOrientation {
            bearing_rad: direction.bearing_rad,
            bearing_error_rad: direction.bearing_error_rad,
            pitch_rad: direction.pitch_rad,
            pitch_error_rad: direction.pitch_error_rad,
            tilt_rad: self.tilt_rad,
            tilt_error_rad: self.tilt_error_rad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn station() -> GeoPoint {
        GeoPoint::new(56.0, -5.0, 20.0)
    }

    fn direction_mark(name: &str, bearing: f64, pitch: f64, x: i32, y: i32) -> LandmarkMark {
        LandmarkMark::new(Landmark::at_direction(name, bearing, pitch, station()), PixelPoint::new(x, y))
    }

    #[test]
    fn test_two_landmark_scenario() {
        let marks = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 50.0, 0.0, 300, 200)];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();

        assert_abs_diff_eq!(solver.tilt_rad(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(solver.pixels_per_degree(), 5.0, epsilon = 1e-9);
        assert_eq!(solver.tilt_error_rad(), 0.0);
        assert_eq!(solver.pixels_per_degree_error(), 0.0);
        assert_eq!(solver.pairs().len(), 1);

        let target = solver.locate(PixelPoint::new(200, 200));
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(target.pitch_rad.to_degrees(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(target.bearing_error_rad, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(target.pitch_error_rad, 0.0, epsilon = 1e-12);

        assert_abs_diff_eq!(solver.calibration().unwrap().degrees_per_pixel(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_pair_symmetry() {
        let p1 = PixelPoint::new(120, 340);
        let p2 = PixelPoint::new(510, 280);
        let bd = 0.3;
        let pd = 0.05;

        let forward = pair_tilt(p1, p2, bd, pd);
        let reverse = pair_tilt(p2, p1, -bd, -pd);
        assert_abs_diff_eq!(forward, reverse, epsilon = 1e-12);

        let d = p1.distance_to(&p2);
        assert_abs_diff_eq!(pair_pixels_per_degree(d, bd, pd), pair_pixels_per_degree(d, -bd, -pd), epsilon = 1e-12);
    }

    #[test]
    fn test_solver_order_independent() {
        let a = direction_mark("a", 10.0, 1.0, 100, 180);
        let b = direction_mark("b", 50.0, -1.0, 300, 230);
        let forward = LandmarkOrientationSolver::solve(&[a.clone(), b.clone()], &station()).unwrap();
        let reverse = LandmarkOrientationSolver::solve(&[b, a], &station()).unwrap();
        assert_abs_diff_eq!(forward.tilt_rad(), reverse.tilt_rad(), epsilon = 1e-12);
        assert_abs_diff_eq!(forward.pixels_per_degree(), reverse.pixels_per_degree(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotated_image_recovers_tilt() {
        // landmarks 40 degrees apart drawn along a line rotated by 10 degrees
        let phi = 10.0_f64.to_radians();
        let x2 = 100 + (200.0 * phi.cos()).round() as i32;
        let y2 = 200 + (200.0 * phi.sin()).round() as i32;
        let marks = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 50.0, 0.0, x2, y2)];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        assert_abs_diff_eq!(solver.tilt_rad().to_degrees(), -10.0, epsilon = 0.3);

        let mid = PixelPoint::new((100 + x2) / 2, (200 + y2) / 2);
        let target = solver.locate(mid);
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 30.0, epsilon = 0.5);
        assert_abs_diff_eq!(target.pitch_rad.to_degrees(), 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_target_below_landmarks_pitches_down() {
        let marks = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 50.0, 0.0, 300, 200)];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        let target = solver.locate(PixelPoint::new(200, 250));
        assert_abs_diff_eq!(target.pitch_rad.to_degrees(), -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bearings_across_north() {
        let marks = vec![direction_mark("a", 350.0, 0.0, 100, 200), direction_mark("b", 10.0, 0.0, 300, 200)];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        assert_abs_diff_eq!(solver.pixels_per_degree(), 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(solver.tilt_rad(), 0.0, epsilon = 1e-12);

        let target = solver.locate(PixelPoint::new(150, 200));
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 355.0, epsilon = 1e-9);
        let north = solver.locate(PixelPoint::new(200, 200));
        assert!(north.bearing_rad.to_degrees() < 1e-6 || north.bearing_rad.to_degrees() > 360.0 - 1e-6);
    }

    #[test]
    fn test_three_landmarks_report_spread() {
        let marks = vec![
            direction_mark("a", 10.0, 0.0, 100, 200),
            direction_mark("b", 50.0, 0.0, 300, 200),
            direction_mark("c", 30.0, 0.0, 205, 200),
        ];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        assert_eq!(solver.pairs().len(), 3);
        assert!(solver.pixels_per_degree_error() > 0.0);
        let target = solver.locate(PixelPoint::new(200, 200));
        assert!(target.bearing_error_rad > 0.0);
    }

    #[test]
    fn test_upside_down_image_tilt() {
        let marks = vec![
            direction_mark("a", 10.0, 0.0, 300, 200),
            direction_mark("b", 50.0, 0.0, 100, 201),
            direction_mark("c", 30.0, 0.0, 200, 199),
        ];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        assert!(solver.tilt_rad().to_degrees().abs() > 179.0);
        assert!(solver.tilt_error_rad().to_degrees() < 1.0);

        let target = solver.locate(PixelPoint::new(200, 200));
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 30.0, epsilon = 0.5);
    }

    #[test]
    fn test_pair_tilt_extreme_pixels() {
        let tilt = pair_tilt(PixelPoint::new(i32::MIN, 0), PixelPoint::new(i32::MAX, 0), 0.5, 0.0);
        assert_abs_diff_eq!(tilt, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_positioned_landmarks() {
        let origin = GeoPoint::new(0.0, 0.0, 10.0);
        let north = GeoPoint::new(0.01, 0.0, 10.0);
        let east = GeoPoint::new(0.0, 0.01, 10.0);
        let marks = vec![
            LandmarkMark::new(Landmark::at_position("north", north), PixelPoint::new(100, 300)),
            LandmarkMark::new(Landmark::at_position("east", east), PixelPoint::new(1000, 300)),
        ];
        let solver = LandmarkOrientationSolver::solve(&marks, &origin).unwrap();
        assert_abs_diff_eq!(solver.pixels_per_degree(), 10.0, epsilon = 1e-6);
        let target = solver.locate(PixelPoint::new(550, 300));
        assert_abs_diff_eq!(target.bearing_rad.to_degrees(), 45.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_inputs() {
        let one = vec![direction_mark("a", 10.0, 0.0, 100, 200)];
        assert!(matches!(
            LandmarkOrientationSolver::solve(&one, &station()),
            Err(RangeError::MissingInput { .. })
        ));

        let same_pixel = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 50.0, 0.0, 100, 200)];
        assert!(matches!(
            LandmarkOrientationSolver::solve(&same_pixel, &station()),
            Err(RangeError::DegenerateGeometry { .. })
        ));

        let same_direction = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 10.0, 0.0, 300, 200)];
        assert!(matches!(
            LandmarkOrientationSolver::solve(&same_direction, &station()),
            Err(RangeError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_image_orientation_at_centre() {
        let marks = vec![direction_mark("a", 10.0, 0.0, 100, 200), direction_mark("b", 50.0, 0.0, 300, 200)];
        let solver = LandmarkOrientationSolver::solve(&marks, &station()).unwrap();
        let orientation = solver.image_orientation(400, 400);
        assert_abs_diff_eq!(orientation.bearing_rad.to_degrees(), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(orientation.pitch_rad.to_degrees(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_resolve_origin_prefers_group_vantage_point() {
        let group = LandmarkGroup::new(
            "theodolite",
            vec![Landmark::at_direction("a", 10.0, 0.0, station()), Landmark::at_direction("b", 50.0, 0.0, station())],
        )
        .unwrap();
        let gps = GeoPoint::new(50.0, 1.0, 0.0);
        let entry = HeightEntry::new("deck", 8.0);

        let origin = resolve_origin(&group, Some((gps, OriginSource::GpsTag)), Some(&entry), 0.5).unwrap();
        assert_eq!(origin.source, OriginSource::LandmarkGroup);
        assert_eq!(origin.position.latitude, 56.0);
        assert_abs_diff_eq!(origin.height.height_m, 20.5, epsilon = 1e-12);
        assert_abs_diff_eq!(origin.position.height, 20.5, epsilon = 1e-12);

        // no height entry needed when the group carries its own
        let origin = resolve_origin(&group, None, None, 0.0).unwrap();
        assert_eq!(origin.height.name, "forced landmark height");
    }

    #[test]
    fn test_resolve_origin_uses_external_position() {
        let group = LandmarkGroup::new(
            "surveyed",
            vec![
                Landmark::at_position("a", GeoPoint::new(56.01, -5.0, 5.0)),
                Landmark::at_position("b", GeoPoint::new(56.0, -4.99, 5.0)),
            ],
        )
        .unwrap();
        let entry = HeightEntry::new("deck", 8.0);

        assert!(matches!(
            resolve_origin(&group, None, Some(&entry), 0.5),
            Err(RangeError::MissingInput { .. })
        ));

        let gps = GeoPoint::new(56.0, -5.0, 0.0);
        let origin = resolve_origin(&group, Some((gps, OriginSource::GpsTag)), Some(&entry), 0.5).unwrap();
        assert_eq!(origin.source, OriginSource::GpsTag);
        assert_eq!(origin.height.name, "deck");
        assert_abs_diff_eq!(origin.position.height, 8.5, epsilon = 1e-12);
    }
}
