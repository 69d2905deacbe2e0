//! Measurement assembly
//!
//! Single entry point for one range measurement: the caller hands over the
//! clicked pixels, the chosen method and the selected parameters, and gets
//! back an immutable [`Measurement`] or the reason it could not be made.

use serde::{Deserialize, Serialize};

use crate::algorithms::geodesy::{self, bearing_difference};
use crate::algorithms::horizon::{angle_correction_deg, pixel_bearing_deg, select_shore_range, HorizonLine, HorizonMeasurer};
use crate::algorithms::horizon_range::{HorizonRangeModel, RangeModelKind};
use crate::algorithms::imu::ImuOrientation;
use crate::algorithms::landmark::{resolve_origin, DirectionEstimate, LandmarkMark, LandmarkOrientationSolver, OriginSource};
use crate::core::{Calibration, GeoPoint, HeightEntry, LandmarkGroup, PixelPoint};
use crate::processing::stats::{half_spread, quadrature};
use crate::processing::tide::{tide_offset, TideSeries};
use crate::validation::{RangeError, RangeResult};

/// How the image is oriented, with the clicks each method needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    /// Horizon clicked at two points
    Horizon { horizon: HorizonLine },
    /// Horizon rebuilt from a shore point. `shore_ranges_m` are the map
    /// distances to shore along the target bearing, nearest first.
    Shore {
        shore_point: PixelPoint,
        shore_ranges_m: Vec<f64>,
        ignore_closest: bool,
        tilt_deg: f64,
    },
    /// Landmarks clicked on the image, by index into the group
    Landmark { group: LandmarkGroup, marks: Vec<(usize, PixelPoint)> },
    /// Attitude read from an IMU
    Imu { orientation: ImuOrientation },
}

/// Method tag stored with a finished measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Horizon,
    Shore,
    Landmark,
    Imu,
}

impl Method {
    pub fn kind(&self) -> MethodKind {
        match self {
            Method::Horizon { .. } => MethodKind::Horizon,
            Method::Shore { .. } => MethodKind::Shore,
            Method::Landmark { .. } => MethodKind::Landmark,
            Method::Imu { .. } => MethodKind::Imu,
        }
    }
}

/// What is known about the image itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: i32,
    pub height: i32,
    /// Capture time, milliseconds since the Unix epoch
    pub time_ms: Option<i64>,
    pub origin: Option<(GeoPoint, OriginSource)>,
    /// True bearing of the image centre, when known independently
    pub heading_deg: Option<f64>,
}

impl ImageInfo {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height, time_ms: None, origin: None, heading_deg: None }
    }

    pub fn with_time(mut self, time_ms: i64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    pub fn with_origin(mut self, origin: GeoPoint, source: OriginSource) -> Self {
        self.origin = Some((origin, source));
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }
}

/// Everything needed to compute one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRequest {
    pub method: Method,
    pub target: PixelPoint,
    pub image: ImageInfo,
    pub calibration: Option<Calibration>,
    pub height: Option<HeightEntry>,
    #[serde(default)]
    pub range_model: RangeModelKind,
    pub tide: Option<TideSeries>,
}

impl MeasurementRequest {
    pub fn new(method: Method, target: PixelPoint, image: ImageInfo) -> Self {
        Self {
            method,
            target,
            image,
            calibration: None,
            height: None,
            range_model: RangeModelKind::default(),
            tide: None,
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn with_height(mut self, height: HeightEntry) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_range_model(mut self, range_model: RangeModelKind) -> Self {
        self.range_model = range_model;
        self
    }

    pub fn with_tide(mut self, tide: TideSeries) -> Self {
        self.tide = Some(tide);
        self
    }
}

/// An angle in degrees with its one-sigma error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleWithError {
    pub deg: f64,
    pub error_deg: f64,
}

impl AngleWithError {
    pub fn new(deg: f64, error_deg: f64) -> Self {
        Self { deg, error_deg }
    }

    fn from_radians(rad: f64, error_rad: f64) -> Self {
        Self::new(rad.to_degrees(), error_rad.to_degrees())
    }
}

/// A finished range measurement. Only the comment may change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    method: MethodKind,
    target_pixel: PixelPoint,
    reference_pixels: Vec<PixelPoint>,
    horizon_point: Option<(f64, f64)>,
    distance_pixels: Option<f64>,
    image_bearing: Option<AngleWithError>,
    image_pitch: Option<AngleWithError>,
    image_tilt: Option<AngleWithError>,
    target_bearing: Option<AngleWithError>,
    target_pitch: Option<AngleWithError>,
    angle_correction_deg: Option<f64>,
    range_m: f64,
    range_error_m: f64,
    pixel_accuracy_m: f64,
    origin: Option<GeoPoint>,
    origin_source: Option<OriginSource>,
    position: Option<GeoPoint>,
    image_time_ms: Option<i64>,
    calibration: Calibration,
    height: HeightEntry,
    range_model: RangeModelKind,
    landmark_group: Option<String>,
    comment: Option<String>,
}

impl Measurement {
    pub fn method(&self) -> MethodKind {
        self.method
    }

    pub fn target_pixel(&self) -> PixelPoint {
        self.target_pixel
    }

    /// Horizon end points, shore point or landmark clicks
    pub fn reference_pixels(&self) -> &[PixelPoint] {
        &self.reference_pixels
    }

    pub fn horizon_point(&self) -> Option<(f64, f64)> {
        self.horizon_point
    }

    pub fn distance_pixels(&self) -> Option<f64> {
        self.distance_pixels
    }

    pub fn image_bearing(&self) -> Option<AngleWithError> {
        self.image_bearing
    }

    pub fn image_pitch(&self) -> Option<AngleWithError> {
        self.image_pitch
    }

    pub fn image_tilt(&self) -> Option<AngleWithError> {
        self.image_tilt
    }

    pub fn target_bearing(&self) -> Option<AngleWithError> {
        self.target_bearing
    }

    pub fn target_pitch(&self) -> Option<AngleWithError> {
        self.target_pitch
    }

    /// Target bearing minus image bearing
    pub fn angle_correction_deg(&self) -> Option<f64> {
        self.angle_correction_deg
    }

    pub fn range_m(&self) -> f64 {
        self.range_m
    }

    pub fn range_error_m(&self) -> f64 {
        self.range_error_m
    }

    /// Range error caused by a single pixel
    pub fn pixel_accuracy_m(&self) -> f64 {
        self.pixel_accuracy_m
    }

    pub fn origin(&self) -> Option<&GeoPoint> {
        self.origin.as_ref()
    }

    pub fn origin_source(&self) -> Option<OriginSource> {
        self.origin_source
    }

    /// Target position, when both origin and bearing are known
    pub fn position(&self) -> Option<&GeoPoint> {
        self.position.as_ref()
    }

    pub fn image_time_ms(&self) -> Option<i64> {
        self.image_time_ms
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Camera height used, tide corrected
    pub fn height(&self) -> &HeightEntry {
        &self.height
    }

    pub fn range_model(&self) -> RangeModelKind {
        self.range_model
    }

    pub fn landmark_group(&self) -> Option<&str> {
        self.landmark_group.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }
}

/// Compute a measurement from a request
pub fn compute(request: &MeasurementRequest) -> RangeResult<Measurement> {
    MeasurementAssembler::new(request)?.assemble()
}

/// Runs one method and gathers its outputs with their provenance
#[derive(Debug)]
pub struct MeasurementAssembler<'a> {
    request: &'a MeasurementRequest,
    model: Box<dyn HorizonRangeModel>,
    tide_offset_m: f64,
}

impl<'a> MeasurementAssembler<'a> {
    pub fn new(request: &'a MeasurementRequest) -> RangeResult<Self> {
        let model = request.range_model.build()?;
        let tide_offset_m = tide_offset(request.tide.as_ref(), request.image.time_ms)?;
        Ok(Self { request, model, tide_offset_m })
    }

    pub fn assemble(&self) -> RangeResult<Measurement> {
        log::debug!(
            "assembling {:?} measurement with {} (tide {:+.2} m)",
            self.request.method.kind(),
            self.model.name(),
            self.tide_offset_m
        );
        match &self.request.method {
            Method::Horizon { horizon } => {
                let (p1, p2) = horizon.points();
                self.from_horizon(horizon, vec![p1, p2])
            }
            Method::Shore { shore_point, shore_ranges_m, ignore_closest, tilt_deg } => {
                self.from_shore(*shore_point, shore_ranges_m, *ignore_closest, *tilt_deg)
            }
            Method::Landmark { group, marks } => self.from_landmarks(group, marks),
            Method::Imu { orientation } => self.from_imu(orientation),
        }
    }

    fn calibration(&self) -> RangeResult<Calibration> {
        let calibration = self
            .request
            .calibration
            .as_ref()
            .ok_or_else(|| RangeError::missing("calibration"))?;
        // revalidate, the value may have come straight from a config file
        Calibration::new(calibration.name(), calibration.degrees_per_pixel())
    }

    fn height_entry(&self) -> RangeResult<&HeightEntry> {
        self.request.height.as_ref().ok_or_else(|| RangeError::missing("height"))
    }

    /// Selected height with the tide applied
    fn effective_height(&self) -> RangeResult<HeightEntry> {
        let entry = self.height_entry()?;
        Ok(HeightEntry::new(entry.name.clone(), entry.height_m + self.tide_offset_m))
    }

    fn base(&self, calibration: Calibration, height: HeightEntry, range_m: f64, range_error_m: f64, pixel_accuracy_m: f64) -> Measurement {
        let (origin, origin_source) = match self.request.image.origin {
            Some((point, source)) => (Some(point.with_height(height.height_m)), Some(source)),
            None => (None, None),
        };
        Measurement {
            method: self.request.method.kind(),
            target_pixel: self.request.target,
            reference_pixels: Vec::new(),
            horizon_point: None,
            distance_pixels: None,
            image_bearing: None,
            image_pitch: None,
            image_tilt: None,
            target_bearing: None,
            target_pitch: None,
            angle_correction_deg: None,
            range_m,
            range_error_m,
            pixel_accuracy_m,
            origin,
            origin_source,
            position: None,
            image_time_ms: self.request.image.time_ms,
            calibration,
            height,
            range_model: self.model.kind(),
            landmark_group: None,
            comment: None,
        }
    }

    fn from_horizon(&self, horizon: &HorizonLine, reference_pixels: Vec<PixelPoint>) -> RangeResult<Measurement> {
        let calibration = self.calibration()?;
        let height = self.effective_height()?;
        let measurer = HorizonMeasurer::new(&calibration, self.model.as_ref(), height.height_m);
        let raw = measurer.measure(horizon, self.request.target)?;

        let image = &self.request.image;
        let correction = angle_correction_deg(self.request.target.x, image.width, &calibration);
        let dip = self.model.horizon_dip(height.height_m);
        let target_pitch = AngleWithError::from_radians(-(raw.angle_rad + dip), calibration.unit_radians());
        let image_bearing = image.heading_deg.map(|heading| AngleWithError::new(heading, 0.0));
        let target_bearing = image
            .heading_deg
            .map(|heading| AngleWithError::new(pixel_bearing_deg(heading, self.request.target.x, image.width, &calibration), 0.0));
        let tilt = horizon.tilt_deg();

        let mut measurement = self.base(calibration, height, raw.range_m, quadrature(&[raw.pixel_accuracy_m]), raw.pixel_accuracy_m);
        measurement.reference_pixels = reference_pixels;
        measurement.horizon_point = Some(raw.horizon_point);
        measurement.distance_pixels = Some(raw.distance_pixels);
        measurement.image_bearing = image_bearing;
        measurement.image_tilt = Some(AngleWithError::new(tilt, 0.0));
        measurement.target_bearing = target_bearing;
        measurement.target_pitch = Some(target_pitch);
        measurement.angle_correction_deg = Some(correction);
        self.project(&mut measurement);
        Ok(measurement)
    }

    fn from_shore(&self, shore_point: PixelPoint, shore_ranges_m: &[f64], ignore_closest: bool, tilt_deg: f64) -> RangeResult<Measurement> {
        let shore_range = select_shore_range(shore_ranges_m, ignore_closest)
            .ok_or_else(|| RangeError::missing("shore range along the target bearing"))?;
        let calibration = self.calibration()?;
        let height = self.effective_height()?;
        let measurer = HorizonMeasurer::new(&calibration, self.model.as_ref(), height.height_m);
        let horizon = measurer.horizon_from_shore(shore_point, shore_range, self.request.image.width, tilt_deg)?;
        log::debug!("shore point at {:.1} m gives horizon {:?}", shore_range, horizon.points());
        self.from_horizon(&horizon, vec![shore_point])
    }

    fn from_landmarks(&self, group: &LandmarkGroup, marks: &[(usize, PixelPoint)]) -> RangeResult<Measurement> {
        group.validate()?;
        let marks = marks
            .iter()
            .map(|&(index, pixel)| {
                group
                    .get(index)
                    .map(|landmark| LandmarkMark::new(landmark.clone(), pixel))
                    .ok_or_else(|| RangeError::missing(format!("landmark {} in group '{}'", index, group.name())))
            })
            .collect::<RangeResult<Vec<_>>>()?;

        let origin = resolve_origin(group, self.request.image.origin, self.request.height.as_ref(), self.tide_offset_m)?;
        let solver = LandmarkOrientationSolver::solve(&marks, &origin.position)?;
        let image = &self.request.image;
        let orientation = solver.image_orientation(image.width, image.height);
        let target = solver.locate(self.request.target);

        let pixel_rad = (1.0 / solver.pixels_per_degree()).to_radians();
        let (range, pitch_error_m, pixel_error_m) = self.range_from_direction(origin.height.height_m, &target, pixel_rad)?;

        let mut measurement = self.base(solver.calibration()?, origin.height.clone(), range, quadrature(&[pitch_error_m, pixel_error_m]), pixel_error_m);
        measurement.reference_pixels = marks.iter().map(|mark| mark.pixel).collect();
        measurement.image_bearing = Some(AngleWithError::from_radians(orientation.bearing_rad, orientation.bearing_error_rad));
        measurement.image_pitch = Some(AngleWithError::from_radians(orientation.pitch_rad, orientation.pitch_error_rad));
        measurement.image_tilt = Some(AngleWithError::from_radians(orientation.tilt_rad, orientation.tilt_error_rad));
        measurement.origin = Some(origin.position);
        measurement.origin_source = Some(origin.source);
        measurement.landmark_group = Some(group.name().to_string());
        self.set_direction(&mut measurement, &target, orientation.bearing_rad);
        self.project(&mut measurement);
        Ok(measurement)
    }

    fn from_imu(&self, orientation: &ImuOrientation) -> RangeResult<Measurement> {
        let calibration = self.calibration()?;
        let height = self.effective_height()?;
        let image = &self.request.image;
        let target = orientation.locate(self.request.target, image.width, image.height, &calibration);
        let (range, pitch_error_m, pixel_error_m) = self.range_from_direction(height.height_m, &target, calibration.unit_radians())?;

        let mut measurement = self.base(calibration, height, range, quadrature(&[pitch_error_m, pixel_error_m]), pixel_error_m);
        measurement.image_bearing = Some(AngleWithError::from_radians(orientation.heading_rad, orientation.heading_error_rad));
        measurement.image_pitch = Some(AngleWithError::from_radians(orientation.pitch_rad, orientation.pitch_error_rad));
        measurement.image_tilt = Some(AngleWithError::from_radians(orientation.tilt_rad, orientation.tilt_error_rad));
        self.set_direction(&mut measurement, &target, orientation.heading_rad);
        self.project(&mut measurement);
        Ok(measurement)
    }

    /// Range to a point seen at `target.pitch_rad`, with the range errors from
    /// the pitch uncertainty and from a one-pixel click error
    fn range_from_direction(&self, height: f64, target: &DirectionEstimate, pixel_rad: f64) -> RangeResult<(f64, f64, f64)> {
        let model = self.model.as_ref();
        let pitch = target.pitch_rad;
        let range = model.range_from_pitch(height, pitch);
        if !range.is_finite() {
            return Err(RangeError::OutOfRange {
                range_m: f64::INFINITY,
                horizon_m: model.horizon_distance(height),
            });
        }

        let spread = |delta: f64| {
            half_spread(
                model.range_from_pitch(height, pitch - delta),
                model.range_from_pitch(height, pitch + delta),
                range,
            )
        };
        let pitch_error = spread(target.pitch_error_rad);
        let pixel_error = spread(pixel_rad);
        log::debug!(
            "pitch {:.4} deg -> {:.1} m (pitch ±{:.1} m, pixel ±{:.1} m)",
            pitch.to_degrees(),
            range,
            pitch_error,
            pixel_error
        );
        Ok((range, pitch_error, pixel_error))
    }

    fn set_direction(&self, measurement: &mut Measurement, target: &DirectionEstimate, image_bearing_rad: f64) {
        measurement.target_bearing = Some(AngleWithError::from_radians(target.bearing_rad, target.bearing_error_rad));
        measurement.target_pitch = Some(AngleWithError::from_radians(target.pitch_rad, target.pitch_error_rad));
        measurement.angle_correction_deg = Some(bearing_difference(image_bearing_rad, target.bearing_rad).to_degrees());
    }

    fn project(&self, measurement: &mut Measurement) {
        if let (Some(origin), Some(bearing)) = (measurement.origin, measurement.target_bearing) {
            measurement.position = Some(geodesy::project(&origin, bearing.deg, measurement.range_m));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::{bearing_deg, distance_m};
    use crate::algorithms::horizon_range::RoundEarth;
    use crate::core::Landmark;
    use crate::processing::tide::TideSample;
    use approx::assert_abs_diff_eq;

    fn horizon_request() -> MeasurementRequest {
        let horizon = HorizonLine::new(PixelPoint::new(0, 100), PixelPoint::new(400, 100)).unwrap();
        MeasurementRequest::new(Method::Horizon { horizon }, PixelPoint::new(200, 150), ImageInfo::new(400, 300))
            .with_calibration(Calibration::new("wide", 0.05).unwrap())
            .with_height(HeightEntry::new("bridge", 10.0))
    }

    fn station() -> GeoPoint {
        GeoPoint::new(56.0, -5.0, 20.0)
    }

    fn landmark_request(target: PixelPoint) -> MeasurementRequest {
        let group = LandmarkGroup::new(
            "headlands",
            vec![Landmark::at_direction("north head", 10.0, 0.0, station()), Landmark::at_direction("south head", 50.0, 0.0, station())],
        )
        .unwrap();
        let marks = vec![(0, PixelPoint::new(100, 200)), (1, PixelPoint::new(300, 200))];
        MeasurementRequest::new(Method::Landmark { group, marks }, target, ImageInfo::new(400, 400))
            .with_height(HeightEntry::new("deck", 8.0))
    }

    #[test]
    fn test_horizon_measurement() {
        let request = horizon_request();
        let measurement = compute(&request).unwrap();

        let model = RoundEarth::new();
        let expected = model.range(10.0, 2.5_f64.to_radians());
        assert_eq!(measurement.method(), MethodKind::Horizon);
        assert_abs_diff_eq!(measurement.range_m(), expected, epsilon = 1e-9);
        assert_eq!(measurement.distance_pixels(), Some(50.0));
        assert_eq!(measurement.horizon_point(), Some((200.0, 100.0)));
        assert_eq!(measurement.angle_correction_deg(), Some(0.0));
        assert_abs_diff_eq!(measurement.range_error_m(), measurement.pixel_accuracy_m(), epsilon = 1e-9);
        assert!(measurement.pixel_accuracy_m() > 0.0);
        assert_eq!(measurement.reference_pixels().len(), 2);

        // no origin and no heading: nothing to project
        assert!(measurement.position().is_none());
        assert!(measurement.target_bearing().is_none());
        assert!(measurement.comment().is_none());
    }

    #[test]
    fn test_horizon_position_projected() {
        let origin = GeoPoint::new(50.0, -4.0, 0.0);
        let mut request = horizon_request();
        request.image = ImageInfo::new(400, 300).with_origin(origin, OriginSource::GpsTag).with_heading(90.0);
        let measurement = compute(&request).unwrap();

        let position = measurement.position().unwrap();
        assert_abs_diff_eq!(distance_m(&origin, position), measurement.range_m(), epsilon = 1e-3);
        assert_abs_diff_eq!(bearing_deg(&origin, position), 90.0, epsilon = 1e-3);
        assert_eq!(measurement.target_bearing().unwrap().deg, 90.0);
        assert_eq!(measurement.origin_source(), Some(OriginSource::GpsTag));
    }

    #[test]
    fn test_tide_applied_once() {
        let tide = TideSeries::new(vec![TideSample::new(0, 1.0, 0.0, 0.0), TideSample::new(100, 2.0, 0.0, 0.0)]).unwrap();
        let mut request = horizon_request().with_tide(tide);
        request.image = request.image.clone().with_time(50);
        let measurement = compute(&request).unwrap();

        assert_abs_diff_eq!(measurement.height().height_m, 11.5, epsilon = 1e-12);
        let expected = RoundEarth::new().range(11.5, 2.5_f64.to_radians());
        assert_abs_diff_eq!(measurement.range_m(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_inputs() {
        let mut request = horizon_request();
        request.calibration = None;
        assert!(matches!(compute(&request), Err(RangeError::MissingInput { .. })));

        let mut request = horizon_request();
        request.height = None;
        assert!(matches!(compute(&request), Err(RangeError::MissingInput { .. })));
    }

    #[test]
    fn test_target_above_horizon() {
        let mut request = horizon_request();
        request.target = PixelPoint::new(200, 80);
        let err = compute(&request).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_refraction_model_recorded() {
        let request = horizon_request().with_range_model(RangeModelKind::Refraction { coefficient: 0.13 });
        let measurement = compute(&request).unwrap();
        assert_eq!(measurement.range_model(), RangeModelKind::Refraction { coefficient: 0.13 });
        let round = compute(&horizon_request()).unwrap();
        assert!(measurement.range_m() > round.range_m());
    }

    #[test]
    fn test_shore_measurement_matches_shore_range() {
        let method = Method::Shore {
            shore_point: PixelPoint::new(200, 300),
            shore_ranges_m: vec![150.0, 2000.0],
            ignore_closest: true,
            tilt_deg: 0.0,
        };
        let request = MeasurementRequest::new(method, PixelPoint::new(200, 300), ImageInfo::new(400, 600))
            .with_calibration(Calibration::new("wide", 0.05).unwrap())
            .with_height(HeightEntry::new("bridge", 10.0));
        let measurement = compute(&request).unwrap();

        assert_eq!(measurement.method(), MethodKind::Shore);
        assert!((measurement.range_m() - 2000.0).abs() < measurement.pixel_accuracy_m());
        assert_eq!(measurement.reference_pixels(), &[PixelPoint::new(200, 300)]);

        let mut request = request;
        request.method = Method::Shore {
            shore_point: PixelPoint::new(200, 300),
            shore_ranges_m: vec![150.0],
            ignore_closest: true,
            tilt_deg: 0.0,
        };
        assert!(matches!(compute(&request), Err(RangeError::MissingInput { .. })));
    }

    #[test]
    fn test_landmark_measurement() {
        let measurement = compute(&landmark_request(PixelPoint::new(200, 250))).unwrap();

        assert_eq!(measurement.method(), MethodKind::Landmark);
        assert_eq!(measurement.origin_source(), Some(OriginSource::LandmarkGroup));
        assert_eq!(measurement.landmark_group(), Some("headlands"));
        // survey height of the group wins over the selected entry
        assert_abs_diff_eq!(measurement.height().height_m, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(measurement.calibration().degrees_per_pixel(), 0.2, epsilon = 1e-12);

        let bearing = measurement.target_bearing().unwrap();
        let pitch = measurement.target_pitch().unwrap();
        assert_abs_diff_eq!(bearing.deg, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pitch.deg, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(measurement.angle_correction_deg().unwrap(), 0.0, epsilon = 1e-9);

        let expected = RoundEarth::new().range_from_pitch(20.0, -10.0_f64.to_radians());
        assert_abs_diff_eq!(measurement.range_m(), expected, epsilon = 1e-9);
        // two landmarks agree exactly, so only the click error remains
        assert_abs_diff_eq!(measurement.range_error_m(), measurement.pixel_accuracy_m(), epsilon = 1e-9);
        assert!(measurement.pixel_accuracy_m() > 0.0);

        let position = measurement.position().unwrap();
        assert_abs_diff_eq!(distance_m(&station(), position), expected, epsilon = 1e-3);
    }

    #[test]
    fn test_landmark_target_above_horizon() {
        let err = compute(&landmark_request(PixelPoint::new(200, 150))).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_landmark_index_out_of_group() {
        let mut request = landmark_request(PixelPoint::new(200, 250));
        if let Method::Landmark { marks, .. } = &mut request.method {
            marks.push((5, PixelPoint::new(10, 10)));
        }
        assert!(matches!(compute(&request), Err(RangeError::MissingInput { .. })));
    }

    #[test]
    fn test_imu_measurement() {
        let orientation = ImuOrientation::new(45.0_f64.to_radians(), -1.0_f64.to_radians(), 0.0).with_errors(0.0, 0.001, 0.0);
        let origin = GeoPoint::new(50.0, -4.0, 0.0);
        let request = MeasurementRequest::new(
            Method::Imu { orientation },
            PixelPoint::new(420, 260),
            ImageInfo::new(640, 480).with_origin(origin, OriginSource::Imu),
        )
        .with_calibration(Calibration::new("tele", 0.1).unwrap())
        .with_height(HeightEntry::new("mast", 15.0));
        let measurement = compute(&request).unwrap();

        assert_abs_diff_eq!(measurement.target_bearing().unwrap().deg, 55.0, epsilon = 1e-9);
        assert_abs_diff_eq!(measurement.target_pitch().unwrap().deg, -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(measurement.angle_correction_deg().unwrap(), 10.0, epsilon = 1e-9);
        let expected = RoundEarth::new().range_from_pitch(15.0, -3.0_f64.to_radians());
        assert_abs_diff_eq!(measurement.range_m(), expected, epsilon = 1e-9);
        assert!(measurement.range_error_m() > measurement.pixel_accuracy_m());
        assert!(measurement.position().is_some());
    }

    #[test]
    fn test_deserialized_coincident_horizon_rejected() {
        let mut json = serde_json::to_value(horizon_request()).unwrap();
        json["method"]["horizon"]["p2"] = json["method"]["horizon"]["p1"].clone();
        let err = serde_json::from_value::<MeasurementRequest>(json).unwrap_err();
        let expected = RangeError::degenerate("horizon points coincide").to_string();
        assert!(err.to_string().contains(&expected), "{}", err);
    }

    #[test]
    fn test_deserialized_zero_calibration_rejected() {
        let mut json = serde_json::to_value(horizon_request()).unwrap();
        json["calibration"]["degrees_per_pixel"] = serde_json::json!(0.0);
        let request: MeasurementRequest = serde_json::from_value(json).unwrap();
        assert!(matches!(compute(&request), Err(RangeError::InvalidCalibration { value }) if value == 0.0));
    }

    #[test]
    fn test_deserialized_mixed_origin_group_rejected() {
        let mut json = serde_json::to_value(landmark_request(PixelPoint::new(200, 250))).unwrap();
        json["method"]["group"]["landmarks"][1]["reference"]["origin"]["latitude"] = serde_json::json!(57.0);
        let request: MeasurementRequest = serde_json::from_value(json).unwrap();
        assert!(matches!(
            compute(&request),
            Err(RangeError::InconsistentLandmarkOrigin { group }) if group == "headlands"
        ));
    }

    #[test]
    fn test_comment_and_serialization() {
        let mut measurement = compute(&horizon_request()).unwrap();
        measurement.set_comment("pod of three");
        assert_eq!(measurement.comment(), Some("pod of three"));

        let json = serde_json::to_string(&measurement).unwrap();
        let back: Measurement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, measurement);
    }
}
