//! Design matrices for the hail occurrence and hail size models.

use crate::types::{LabeledStormCell, StormResult, StormError};
use ndarray::{Array1, Array2};

/// Minimum number of positive rows for a regression set
pub const DEFAULT_MIN_REGRESSION_SAMPLES: usize = 10;

/// Predictor columns, in matrix column order
pub const FEATURE_NAMES: [&str; 3] = [
    "max_reflectivity",
    "max_derived_hazard_size",
    "echo_top_height",
];

/// Feature matrix with one target per row
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// (samples, FEATURE_NAMES.len())
    pub features: Array2<f64>,
    pub targets: Array1<f64>,
    pub feature_names: Vec<&'static str>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn from_rows<'a, I>(rows: I, target: impl Fn(&LabeledStormCell) -> f64) -> StormResult<Self>
    where
        I: IntoIterator<Item = &'a LabeledStormCell>,
    {
        let mut values = Vec::new();
        let mut targets = Vec::new();
        for row in rows {
            let f = &row.features;
            values.extend_from_slice(&[
                f.max_reflectivity,
                f.max_derived_hazard_size,
                f.echo_top_height,
            ]);
            targets.push(target(row));
        }

        let features = Array2::from_shape_vec((targets.len(), FEATURE_NAMES.len()), values)
            .map_err(|e| StormError::InvalidParameter(format!("Shape error: {}", e)))?;

        Ok(Self {
            features,
            targets: Array1::from(targets),
            feature_names: FEATURE_NAMES.to_vec(),
        })
    }
}

/// Hail occurrence set: every row, target 1.0 for positive rows else 0.0
pub fn classification_set(rows: &[LabeledStormCell]) -> StormResult<TrainingSet> {
    let set = TrainingSet::from_rows(rows, |row| if row.is_positive { 1.0 } else { 0.0 })?;
    let positives = set.targets.iter().filter(|&&t| t > 0.0).count();
    log::info!(
        "Classification set: {} samples, {} positive",
        set.len(),
        positives
    );
    Ok(set)
}

/// Hail size set: rows with a positive magnitude label, target the magnitude.
///
/// Returns `Ok(None)` when fewer than `min_samples` such rows exist; the
/// shortfall is logged, not raised, and the caller skips regression training.
pub fn regression_set(
    rows: &[LabeledStormCell],
    min_samples: usize,
) -> StormResult<Option<TrainingSet>> {
    let hail_rows: Vec<&LabeledStormCell> =
        rows.iter().filter(|row| row.magnitude_label > 0.0).collect();

    if hail_rows.len() < min_samples {
        log::warn!(
            "Not enough hail samples for regression: {} < {}",
            hail_rows.len(),
            min_samples
        );
        return Ok(None);
    }

    let set = TrainingSet::from_rows(hail_rows, |row| row.magnitude_label)?;
    log::info!("Regression set: {} samples", set.len());
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StormCellFeatures;
    use chrono::{TimeZone, Utc};

    fn labeled(id: u32, magnitude: f64) -> LabeledStormCell {
        LabeledStormCell {
            features: StormCellFeatures {
                cell_id: id,
                max_reflectivity: 40.0 + id as f64,
                max_derived_hazard_size: 10.0 * id as f64,
                echo_top_height: 8.0,
                centroid_latitude: 35.0,
                centroid_longitude: -97.0,
                scan_time: Utc.with_ymd_and_hms(2023, 5, 1, 21, 0, 0).unwrap(),
            },
            is_positive: magnitude > 0.0,
            magnitude_label: magnitude,
        }
    }

    #[test]
    fn test_classification_set_keeps_every_row() {
        let rows = vec![labeled(1, 0.0), labeled(2, 1.75), labeled(3, 0.0)];
        let set = classification_set(&rows).unwrap();

        assert_eq!(set.features.dim(), (3, 3));
        assert_eq!(set.targets.to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(set.features[[1, 0]], 42.0);
        assert_eq!(set.features[[1, 1]], 20.0);
        assert_eq!(set.feature_names, FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_regression_set_filters_positive_magnitudes() {
        let rows: Vec<LabeledStormCell> = (1..=12)
            .map(|i| labeled(i, if i % 2 == 0 { 0.0 } else { 0.25 * i as f64 }))
            .chain((13..=20).map(|i| labeled(i, 1.0)))
            .collect();

        let set = regression_set(&rows, 10).unwrap().unwrap();
        assert_eq!(set.len(), 14);
        assert!(set.targets.iter().all(|&t| t > 0.0));
        assert_eq!(set.targets[0], 0.25);
    }

    #[test]
    fn test_regression_set_skipped_when_too_few_samples() {
        let rows = vec![labeled(1, 1.0), labeled(2, 2.0), labeled(3, 0.0)];
        assert!(regression_set(&rows, DEFAULT_MIN_REGRESSION_SAMPLES)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_table() {
        let set = classification_set(&[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.features.dim(), (0, 3));
    }
}
