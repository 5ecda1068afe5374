use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// 3D volume field indexed as (level, row, col); level 0 is the lowest gate
pub type VolumeField = Array3<f64>;

/// 2D horizontal field indexed as (row, col)
pub type HorizontalField = Array2<f64>;

/// Vertically integrated liquid grid (kg/m^2), horizontal shape
pub type VilGrid = Array2<f64>;

/// Connected-region labels: 0 = background, k > 0 = cell k
pub type CellMask = Array2<u32>;

/// One radar volume collapsed onto a regular (level, row, col) grid.
///
/// `reflectivity` and `gate_height` share the full 3D shape. The geolocation
/// arrays and the hail-size estimate are horizontal only and must match the
/// trailing (row, col) dimensions of the volume.
#[derive(Debug, Clone)]
pub struct RadarVolume {
    /// Reflectivity factor in dBZ
    pub reflectivity: VolumeField,
    /// Gate height above the radar in meters
    pub gate_height: VolumeField,
    /// Gate longitude in degrees
    pub gate_longitude: HorizontalField,
    /// Gate latitude in degrees
    pub gate_latitude: HorizontalField,
    /// Maximum expected hail size estimate in inches
    pub hazard_size: HorizontalField,
    /// Volume-wide scan time
    pub scan_time: DateTime<Utc>,
}

impl RadarVolume {
    /// Build a volume, rejecting inconsistent array shapes
    pub fn new(
        reflectivity: VolumeField,
        gate_height: VolumeField,
        gate_longitude: HorizontalField,
        gate_latitude: HorizontalField,
        hazard_size: HorizontalField,
        scan_time: DateTime<Utc>,
    ) -> StormResult<Self> {
        let volume = Self {
            reflectivity,
            gate_height,
            gate_longitude,
            gate_latitude,
            hazard_size,
            scan_time,
        };
        volume.validate()?;
        Ok(volume)
    }

    /// Number of height levels
    pub fn num_levels(&self) -> usize {
        self.reflectivity.dim().0
    }

    /// Horizontal (rows, cols) shape
    pub fn horizontal_dim(&self) -> (usize, usize) {
        let (_, rows, cols) = self.reflectivity.dim();
        (rows, cols)
    }

    /// Check the shape invariants between the paired arrays
    pub fn validate(&self) -> StormResult<()> {
        let volume_dim = self.reflectivity.dim();
        if self.gate_height.dim() != volume_dim {
            return Err(StormError::shape_mismatch(
                "gate_height",
                format!("{:?}", volume_dim),
                format!("{:?}", self.gate_height.dim()),
            ));
        }

        let horizontal = self.horizontal_dim();
        let paired = [
            ("gate_longitude", self.gate_longitude.dim()),
            ("gate_latitude", self.gate_latitude.dim()),
            ("hazard_size", self.hazard_size.dim()),
        ];
        for (name, dim) in paired {
            if dim != horizontal {
                return Err(StormError::shape_mismatch(
                    name,
                    format!("{:?}", horizontal),
                    format!("{:?}", dim),
                ));
            }
        }

        Ok(())
    }
}

/// Descriptors of one detected storm cell in one volume.
///
/// `cell_id` is only unique within the volume it was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormCellFeatures {
    pub cell_id: u32,
    /// dBZ
    pub max_reflectivity: f64,
    /// mm
    pub max_derived_hazard_size: f64,
    /// km, 0 when no gate exceeds the echo-top threshold
    pub echo_top_height: f64,
    pub centroid_latitude: f64,
    pub centroid_longitude: f64,
    pub scan_time: DateTime<Utc>,
}

/// Ground-truth point report (e.g. a hail report with diameter in inches)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormReport {
    pub report_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
}

/// Storm cell features with the labels assigned from matching reports
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStormCell {
    pub features: StormCellFeatures,
    pub is_positive: bool,
    /// Largest magnitude among all matching reports, 0 when unmatched
    pub magnitude_label: f64,
}

impl LabeledStormCell {
    /// Unmatched row: negative label, zero magnitude
    pub fn unlabeled(features: StormCellFeatures) -> Self {
        Self {
            features,
            is_positive: false,
            magnitude_label: 0.0,
        }
    }
}

/// Error types for storm cell processing
#[derive(Debug, thiserror::Error)]
pub enum StormError {
    #[error("Shape mismatch for {field}: expected {expected}, found {found}")]
    ShapeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Report parsing error at line {line}: {reason}")]
    ReportParse { line: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl StormError {
    pub(crate) fn shape_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        StormError::ShapeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result type for storm cell operations
pub type StormResult<T> = Result<T, StormError>;
