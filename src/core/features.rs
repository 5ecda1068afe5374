use crate::core::segmentation::Segmentation;
use crate::types::{RadarVolume, StormCellFeatures, StormError, StormResult};
use serde::{Deserialize, Serialize};

/// Millimeters per inch
const MM_PER_INCH: f64 = 25.4;

/// How the fractional center of mass is turned into a geolocation index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentroidRounding {
    /// Round to the nearest index
    Nearest,
    /// Drop the fractional part, as older feature tables did
    Truncate,
}

impl CentroidRounding {
    fn to_index(self, position: f64, len: usize) -> usize {
        let index = match self {
            CentroidRounding::Nearest => position.round(),
            CentroidRounding::Truncate => position.trunc(),
        };
        (index.max(0.0) as usize).min(len.saturating_sub(1))
    }
}

/// Cell feature extraction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Reflectivity (dBZ) a gate must exceed to count toward the echo top
    pub echo_top_threshold_dbz: f64,
    /// Centroid to geolocation index policy
    pub centroid_rounding: CentroidRounding,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            echo_top_threshold_dbz: 18.0,
            centroid_rounding: CentroidRounding::Nearest,
        }
    }
}

/// Running per-cell statistics, filled in one pass over the mask
#[derive(Debug, Clone)]
struct CellAccumulator {
    pixels: usize,
    row_sum: f64,
    col_sum: f64,
    max_reflectivity: f64,
    max_hazard_size: f64,
    echo_top_m: Option<f64>,
}

impl Default for CellAccumulator {
    fn default() -> Self {
        Self {
            pixels: 0,
            row_sum: 0.0,
            col_sum: 0.0,
            max_reflectivity: f64::NEG_INFINITY,
            max_hazard_size: f64::NEG_INFINITY,
            echo_top_m: None,
        }
    }
}

/// Per-cell descriptor extraction from a volume and its cell mask
pub struct CellFeatureExtractor {
    params: FeatureParams,
}

impl CellFeatureExtractor {
    /// Create an extractor with the 18 dBZ echo-top threshold
    pub fn new() -> Self {
        Self {
            params: FeatureParams::default(),
        }
    }

    /// Create an extractor with custom parameters
    pub fn with_params(params: FeatureParams) -> Self {
        Self { params }
    }

    /// Compute one feature row per non-empty cell, in label order.
    ///
    /// Each 2D cell footprint is extended through every level of the volume.
    /// Non-finite reflectivity and hazard samples are ignored, as masked gates
    /// would be. A footprint with no finite reflectivity reports NaN, one
    /// with no finite hazard estimate reports 0 mm.
    pub fn extract(
        &self,
        volume: &RadarVolume,
        segmentation: &Segmentation,
    ) -> StormResult<Vec<StormCellFeatures>> {
        volume.validate()?;

        let horizontal = volume.horizontal_dim();
        if segmentation.mask.dim() != horizontal {
            return Err(StormError::shape_mismatch(
                "cell mask",
                format!("{:?}", horizontal),
                format!("{:?}", segmentation.mask.dim()),
            ));
        }

        log::info!(
            "Extracting features for {} cells at {}",
            segmentation.num_cells,
            volume.scan_time
        );

        let accumulators = self.accumulate(volume, segmentation)?;

        let mut features = Vec::with_capacity(segmentation.num_cells);
        for (index, acc) in accumulators.iter().enumerate() {
            let cell_id = index as u32 + 1;
            if acc.pixels == 0 {
                log::debug!("Skipping empty cell label {}", cell_id);
                continue;
            }

            let (latitude, longitude) = self.centroid_location(volume, acc);
            let row = StormCellFeatures {
                cell_id,
                max_reflectivity: if acc.max_reflectivity.is_finite() {
                    acc.max_reflectivity
                } else {
                    f64::NAN
                },
                max_derived_hazard_size: if acc.max_hazard_size.is_finite() {
                    acc.max_hazard_size * MM_PER_INCH
                } else {
                    0.0
                },
                echo_top_height: acc.echo_top_m.map_or(0.0, |h| h / 1000.0),
                centroid_latitude: latitude,
                centroid_longitude: longitude,
                scan_time: volume.scan_time,
            };
            log::debug!("Cell {}: {:?}", cell_id, row);
            features.push(row);
        }

        log::info!("Extracted {} feature rows", features.len());
        Ok(features)
    }

    fn accumulate(
        &self,
        volume: &RadarVolume,
        segmentation: &Segmentation,
    ) -> StormResult<Vec<CellAccumulator>> {
        let mut accumulators = vec![CellAccumulator::default(); segmentation.num_cells];
        let levels = volume.num_levels();

        for ((i, j), &label) in segmentation.mask.indexed_iter() {
            if label == 0 {
                continue;
            }
            let acc = accumulators.get_mut(label as usize - 1).ok_or_else(|| {
                StormError::InvalidParameter(format!(
                    "Mask label {} exceeds cell count {}",
                    label, segmentation.num_cells
                ))
            })?;

            acc.pixels += 1;
            acc.row_sum += i as f64;
            acc.col_sum += j as f64;

            let hazard = volume.hazard_size[[i, j]];
            if hazard.is_finite() {
                acc.max_hazard_size = acc.max_hazard_size.max(hazard);
            }

            for k in 0..levels {
                let dbz = volume.reflectivity[[k, i, j]];
                if !dbz.is_finite() {
                    continue;
                }
                acc.max_reflectivity = acc.max_reflectivity.max(dbz);
                if dbz > self.params.echo_top_threshold_dbz {
                    let height = volume.gate_height[[k, i, j]];
                    acc.echo_top_m = Some(acc.echo_top_m.map_or(height, |top| top.max(height)));
                }
            }
        }

        Ok(accumulators)
    }

    /// Nearest-index geolocation of the unweighted center of mass.
    ///
    /// Longitude is read along the first row, latitude along the first
    /// column. No interpolation between gates.
    fn centroid_location(&self, volume: &RadarVolume, acc: &CellAccumulator) -> (f64, f64) {
        let (rows, cols) = volume.horizontal_dim();
        let center_row = acc.row_sum / acc.pixels as f64;
        let center_col = acc.col_sum / acc.pixels as f64;

        let rounding = self.params.centroid_rounding;
        let row = rounding.to_index(center_row, rows);
        let col = rounding.to_index(center_col, cols);

        (volume.gate_latitude[[row, 0]], volume.gate_longitude[[0, col]])
    }
}

impl Default for CellFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
