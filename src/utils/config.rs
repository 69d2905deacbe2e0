use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::algorithms::horizon_range::RangeModelKind;
use crate::algorithms::imu::{ImuMounting, ImuOrientation, ImuSample};
use crate::core::{Calibration, HeightEntry, LandmarkGroup, PixelPoint};
use crate::processing::assembler::{ImageInfo, Method, MeasurementRequest};
use crate::validation::{RangeError, RangeResult};

/// Default width of the IMU averaging window (milliseconds)
const DEFAULT_IMU_WINDOW_MS: i64 = 1000;

fn default_imu_window_ms() -> i64 {
    DEFAULT_IMU_WINDOW_MS
}

/// Stored parameter lists and the user's current selection in each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Lens calibrations
    pub calibrations: Vec<Calibration>,
    /// Camera heights above the reference sea level
    pub heights: Vec<HeightEntry>,
    /// Landmark groups, each surveyed for one site
    #[serde(default)]
    pub landmark_groups: Vec<LandmarkGroup>,
    /// Earth model used for horizon geometry
    #[serde(default)]
    pub range_model: RangeModelKind,
    /// Index into `calibrations`
    pub current_calibration: usize,
    /// Index into `heights`
    pub current_height: usize,
    /// Index into `landmark_groups`
    #[serde(default)]
    pub current_landmark_group: Option<usize>,
    /// Skip the nearest shore segment when rebuilding the horizon from shore
    #[serde(default)]
    pub ignore_closest_shore: bool,
    /// Fixed IMU mounting offsets
    #[serde(default)]
    pub imu_mounting: ImuMounting,
    /// Width of the window of IMU samples averaged around the image time
    #[serde(default = "default_imu_window_ms")]
    pub imu_window_ms: i64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            calibrations: Vec::new(),
            heights: Vec::new(),
            landmark_groups: Vec::new(),
            range_model: RangeModelKind::default(),
            current_calibration: 0,
            current_height: 0,
            current_landmark_group: None,
            ignore_closest_shore: false,
            imu_mounting: ImuMounting::default(),
            imu_window_ms: DEFAULT_IMU_WINDOW_MS,
        }
    }
}

/// The selected values, copied out of a [`ParameterSet`] for one computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub calibration: Calibration,
    pub height: HeightEntry,
    pub landmark_group: Option<LandmarkGroup>,
    pub range_model: RangeModelKind,
    pub ignore_closest_shore: bool,
    pub imu_mounting: ImuMounting,
    pub imu_window_ms: i64,
}

impl Selection {
    /// Start a measurement request carrying the selected parameters
    pub fn request(&self, method: Method, target: PixelPoint, image: ImageInfo) -> MeasurementRequest {
        MeasurementRequest::new(method, target, image)
            .with_calibration(self.calibration.clone())
            .with_height(self.height.clone())
            .with_range_model(self.range_model)
    }

    /// Shore method honouring the ignore-closest-shore setting
    pub fn shore_method(&self, shore_point: PixelPoint, shore_ranges_m: Vec<f64>, tilt_deg: f64) -> Method {
        Method::Shore {
            shore_point,
            shore_ranges_m,
            ignore_closest: self.ignore_closest_shore,
            tilt_deg,
        }
    }

    /// Landmark method over the selected group; `marks` index into it
    pub fn landmark_method(&self, marks: Vec<(usize, PixelPoint)>) -> Result<Method, ConfigError> {
        let group = self
            .landmark_group
            .clone()
            .ok_or_else(|| ConfigError::invalid("landmark_group", "no landmark group selected"))?;
        if let Some(&(index, _)) = marks.iter().find(|(index, _)| *index >= group.len()) {
            return Err(ConfigError::IndexOutOfRange {
                parameter: format!("landmark in '{}'", group.name()),
                index,
                len: group.len(),
            });
        }
        Ok(Method::Landmark { group, marks })
    }

    /// IMU method from raw samples, averaged over the configured window
    /// around `time_ms` with the configured mounting offsets
    pub fn imu_method(&self, samples: &[ImuSample], time_ms: i64) -> RangeResult<Method> {
        let orientation = ImuOrientation::from_samples(samples, time_ms, self.imu_window_ms, &self.imu_mounting)?;
        Ok(Method::Imu { orientation })
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
    /// Selection points outside its list
    #[error("{parameter} index {index} out of range for {len} entries")]
    IndexOutOfRange { parameter: String, index: usize, len: usize },
    /// Configuration file I/O error
    #[error("io error: {message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl From<ConfigError> for RangeError {
    fn from(err: ConfigError) -> Self {
        RangeError::Config { message: err.to_string() }
    }
}

impl ConfigError {
    fn invalid(parameter: impl Into<String>, reason: impl ToString) -> Self {
        ConfigError::InvalidParameter { parameter: parameter.into(), reason: reason.to_string() }
    }
}

/// Main configuration manager
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    /// Current parameters
    parameters: ParameterSet,
    /// Configuration file path
    config_file_path: Option<String>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with empty parameter lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Replace all parameters after validating them
    pub fn update_parameters(&mut self, parameters: ParameterSet) -> Result<(), ConfigError> {
        Self::validate(&parameters)?;
        self.parameters = parameters;
        self.is_modified = true;
        Ok(())
    }

    pub fn add_calibration(&mut self, calibration: Calibration) -> usize {
        self.parameters.calibrations.push(calibration);
        self.is_modified = true;
        self.parameters.calibrations.len() - 1
    }

    pub fn add_height(&mut self, height: HeightEntry) -> Result<usize, ConfigError> {
        if !height.height_m.is_finite() {
            return Err(ConfigError::invalid("height", format!("'{}' is not finite", height.name)));
        }
        self.parameters.heights.push(height);
        self.is_modified = true;
        Ok(self.parameters.heights.len() - 1)
    }

    pub fn add_landmark_group(&mut self, group: LandmarkGroup) -> Result<usize, ConfigError> {
        group.validate().map_err(|e| ConfigError::invalid("landmark_groups", e))?;
        self.parameters.landmark_groups.push(group);
        self.is_modified = true;
        Ok(self.parameters.landmark_groups.len() - 1)
    }

    pub fn select_calibration(&mut self, index: usize) -> Result<(), ConfigError> {
        check_index("calibration", index, self.parameters.calibrations.len())?;
        self.parameters.current_calibration = index;
        self.is_modified = true;
        Ok(())
    }

    pub fn select_height(&mut self, index: usize) -> Result<(), ConfigError> {
        check_index("height", index, self.parameters.heights.len())?;
        self.parameters.current_height = index;
        self.is_modified = true;
        Ok(())
    }

    pub fn select_landmark_group(&mut self, index: Option<usize>) -> Result<(), ConfigError> {
        if let Some(index) = index {
            check_index("landmark group", index, self.parameters.landmark_groups.len())?;
        }
        self.parameters.current_landmark_group = index;
        self.is_modified = true;
        Ok(())
    }

    pub fn set_range_model(&mut self, range_model: RangeModelKind) -> Result<(), ConfigError> {
        range_model.build().map_err(|e| ConfigError::invalid("range_model", e))?;
        self.parameters.range_model = range_model;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let parameters: ParameterSet = serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        // Validate before applying
        Self::validate(&parameters)?;
        log::debug!(
            "loaded {} calibrations, {} heights, {} landmark groups from {}",
            parameters.calibrations.len(),
            parameters.heights.len(),
            parameters.landmark_groups.len(),
            path_str
        );

        self.parameters = parameters;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.parameters).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::IoError { message: "No configuration file path set".to_string() }),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Check every stored value and every selection index
    pub fn validate(parameters: &ParameterSet) -> Result<(), ConfigError> {
        for calibration in &parameters.calibrations {
            Calibration::new(calibration.name(), calibration.degrees_per_pixel())
                .map_err(|e| ConfigError::invalid("calibrations", e))?;
        }
        for height in &parameters.heights {
            if !height.height_m.is_finite() {
                return Err(ConfigError::invalid("heights", format!("'{}' is not finite", height.name)));
            }
        }
        for group in &parameters.landmark_groups {
            group.validate().map_err(|e| ConfigError::invalid("landmark_groups", e))?;
        }
        parameters.range_model.build().map_err(|e| ConfigError::invalid("range_model", e))?;
        if parameters.imu_window_ms <= 0 {
            return Err(ConfigError::invalid("imu_window_ms", "must be positive"));
        }

        // an empty list has nothing to select yet
        if !parameters.calibrations.is_empty() {
            check_index("calibration", parameters.current_calibration, parameters.calibrations.len())?;
        }
        if !parameters.heights.is_empty() {
            check_index("height", parameters.current_height, parameters.heights.len())?;
        }
        if let Some(index) = parameters.current_landmark_group {
            check_index("landmark group", index, parameters.landmark_groups.len())?;
        }
        Ok(())
    }

    /// Copy the current selection out for a computation
    pub fn resolve(&self) -> Result<Selection, ConfigError> {
        let p = &self.parameters;
        let calibration = p.calibrations.get(p.current_calibration).ok_or_else(|| ConfigError::IndexOutOfRange {
            parameter: "calibration".to_string(),
            index: p.current_calibration,
            len: p.calibrations.len(),
        })?;
        let height = p.heights.get(p.current_height).ok_or_else(|| ConfigError::IndexOutOfRange {
            parameter: "height".to_string(),
            index: p.current_height,
            len: p.heights.len(),
        })?;
        let landmark_group = match p.current_landmark_group {
            Some(index) => {
                check_index("landmark group", index, p.landmark_groups.len())?;
                p.landmark_groups.get(index).cloned()
            }
            None => None,
        };

        Ok(Selection {
            calibration: calibration.clone(),
            height: height.clone(),
            landmark_group,
            range_model: p.range_model,
            ignore_closest_shore: p.ignore_closest_shore,
            imu_mounting: p.imu_mounting,
            imu_window_ms: p.imu_window_ms,
        })
    }
}

fn check_index(parameter: &str, index: usize, len: usize) -> Result<(), ConfigError> {
    if index >= len {
        return Err(ConfigError::IndexOutOfRange { parameter: parameter.to_string(), index, len });
    }
    Ok(())
}
