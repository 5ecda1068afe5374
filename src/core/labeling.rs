use crate::types::{LabeledStormCell, StormCellFeatures, StormError, StormReport, StormResult};
use serde::{Deserialize, Serialize};

/// Tolerance window for matching reports to cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingParams {
    /// Maximum |scan time - report time| in minutes, inclusive
    pub time_window_minutes: f64,
    /// Maximum |dlat| and |dlon| in degrees, inclusive
    pub distance_threshold_deg: f64,
}

impl Default for LabelingParams {
    fn default() -> Self {
        Self {
            time_window_minutes: 15.0,
            distance_threshold_deg: 0.5,
        }
    }
}

/// Label state of one row while reports are folded in
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LabelAccumulator {
    pub is_positive: bool,
    pub magnitude_label: f64,
}

impl LabelAccumulator {
    /// Record one matching report
    pub fn absorb(&mut self, magnitude: f64) {
        self.is_positive = true;
        self.magnitude_label = self.magnitude_label.max(magnitude);
    }

    /// Combine two partial results for the same row
    pub fn merge(self, other: Self) -> Self {
        Self {
            is_positive: self.is_positive || other.is_positive,
            magnitude_label: self.magnitude_label.max(other.magnitude_label),
        }
    }
}

/// Many-to-many join of storm cells with point reports.
///
/// A row matches a report when the time offset and both coordinate offsets
/// fall inside the (inclusive) tolerance box. Every match marks the row
/// positive and raises its magnitude to the largest matching report; no
/// report is consumed, so the result is independent of report order.
pub struct SpatiotemporalLabeler {
    params: LabelingParams,
}

impl SpatiotemporalLabeler {
    /// Create a labeler with the 15 minute / 0.5 degree window
    pub fn new() -> Self {
        Self {
            params: LabelingParams::default(),
        }
    }

    /// Create a labeler with a custom window
    pub fn with_params(params: LabelingParams) -> StormResult<Self> {
        if !(params.time_window_minutes >= 0.0) {
            return Err(StormError::InvalidParameter(format!(
                "time window must be non-negative, got {}",
                params.time_window_minutes
            )));
        }
        if !(params.distance_threshold_deg >= 0.0) {
            return Err(StormError::InvalidParameter(format!(
                "distance threshold must be non-negative, got {}",
                params.distance_threshold_deg
            )));
        }
        Ok(Self { params })
    }

    /// Whether `report` falls inside the tolerance box around `cell`
    pub fn matches(&self, cell: &StormCellFeatures, report: &StormReport) -> bool {
        let delta = cell.scan_time - report.report_time;
        let time_diff = match delta.num_nanoseconds() {
            Some(ns) => ns as f64 / 60e9,
            None => delta.num_milliseconds() as f64 / 60_000.0,
        };
        let lat_diff = cell.centroid_latitude - report.latitude;
        let lon_diff = cell.centroid_longitude - report.longitude;

        time_diff.abs() <= self.params.time_window_minutes
            && lat_diff.abs() <= self.params.distance_threshold_deg
            && lon_diff.abs() <= self.params.distance_threshold_deg
    }

    /// Label every row against every report
    pub fn label(
        &self,
        cells: &[StormCellFeatures],
        reports: &[StormReport],
    ) -> Vec<LabeledStormCell> {
        log::info!(
            "Labeling {} cells against {} reports",
            cells.len(),
            reports.len()
        );
        log::debug!("Labeling parameters: {:?}", self.params);

        let accumulators = reports
            .iter()
            .fold(vec![LabelAccumulator::default(); cells.len()], |acc, report| {
                self.fold_report(acc, cells, report)
            });

        self.finish(cells, accumulators)
    }

    /// Label with reports sharded across threads.
    ///
    /// Each shard folds its reports into its own accumulators, and shards are
    /// combined with [`LabelAccumulator::merge`], so the output equals
    /// [`SpatiotemporalLabeler::label`].
    #[cfg(feature = "parallel")]
    pub fn label_parallel(
        &self,
        cells: &[StormCellFeatures],
        reports: &[StormReport],
    ) -> Vec<LabeledStormCell> {
        use rayon::prelude::*;

        log::info!(
            "Labeling {} cells against {} reports in parallel",
            cells.len(),
            reports.len()
        );

        let empty = || vec![LabelAccumulator::default(); cells.len()];
        let accumulators = reports
            .par_iter()
            .fold(empty, |acc, report| self.fold_report(acc, cells, report))
            .reduce(empty, |left, right| {
                left.into_iter()
                    .zip(right)
                    .map(|(l, r)| l.merge(r))
                    .collect()
            });

        self.finish(cells, accumulators)
    }

    fn fold_report(
        &self,
        mut acc: Vec<LabelAccumulator>,
        cells: &[StormCellFeatures],
        report: &StormReport,
    ) -> Vec<LabelAccumulator> {
        for (state, cell) in acc.iter_mut().zip(cells) {
            if self.matches(cell, report) {
                state.absorb(report.magnitude);
            }
        }
        acc
    }

    fn finish(
        &self,
        cells: &[StormCellFeatures],
        accumulators: Vec<LabelAccumulator>,
    ) -> Vec<LabeledStormCell> {
        let labeled: Vec<LabeledStormCell> = cells
            .iter()
            .zip(accumulators)
            .map(|(cell, state)| LabeledStormCell {
                features: cell.clone(),
                is_positive: state.is_positive,
                magnitude_label: state.magnitude_label,
            })
            .collect();

        let positives = labeled.iter().filter(|row| row.is_positive).count();
        log::info!("{} of {} cells labeled positive", positives, labeled.len());
        labeled
    }
}

impl Default for SpatiotemporalLabeler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 1, 21, 0, 0).unwrap()
    }

    fn cell(id: u32, lat: f64, lon: f64, scan_time: DateTime<Utc>) -> StormCellFeatures {
        StormCellFeatures {
            cell_id: id,
            max_reflectivity: 55.0,
            max_derived_hazard_size: 30.0,
            echo_top_height: 10.0,
            centroid_latitude: lat,
            centroid_longitude: lon,
            scan_time,
        }
    }

    fn report(lat: f64, lon: f64, time: DateTime<Utc>, magnitude: f64) -> StormReport {
        StormReport {
            report_time: time,
            latitude: lat,
            longitude: lon,
            magnitude,
        }
    }

    #[test]
    fn test_rows_start_unlabeled() {
        let cells = vec![cell(1, 35.0, -97.0, base_time())];
        let labeled = SpatiotemporalLabeler::new().label(&cells, &[]);

        assert_eq!(labeled.len(), 1);
        assert!(!labeled[0].is_positive);
        assert_eq!(labeled[0].magnitude_label, 0.0);
    }

    #[test]
    fn test_max_aggregation_across_reports() {
        let cells = vec![cell(1, 35.0, -97.0, base_time())];
        let reports: Vec<StormReport> = [1.0, 2.5, 1.8]
            .iter()
            .map(|&m| report(35.0, -97.0, base_time(), m))
            .collect();

        let labeled = SpatiotemporalLabeler::new().label(&cells, &reports);
        assert!(labeled[0].is_positive);
        assert_eq!(labeled[0].magnitude_label, 2.5);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let labeler = SpatiotemporalLabeler::new();
        let scan = base_time();

        let edge = report(35.5, -96.5, scan + Duration::minutes(15), 1.0);
        assert!(labeler.matches(&cell(1, 35.0, -97.0, scan), &edge));

        let late = report(35.0, -97.0, scan + Duration::milliseconds(15 * 60_000 + 600), 1.0);
        assert!(!labeler.matches(&cell(1, 35.0, -97.0, scan), &late));

        let early = report(35.0, -97.0, scan - Duration::milliseconds(15 * 60_000 + 600), 1.0);
        assert!(!labeler.matches(&cell(1, 35.0, -97.0, scan), &early));
    }

    #[test]
    fn test_sub_millisecond_offset_past_window_is_excluded() {
        let labeler = SpatiotemporalLabeler::new();
        let scan = base_time();
        let target = cell(1, 35.0, -97.0, scan);
        let just_past = Duration::minutes(15) + Duration::microseconds(900);

        assert!(!labeler.matches(&target, &report(35.0, -97.0, scan + just_past, 1.0)));
        assert!(!labeler.matches(&target, &report(35.0, -97.0, scan - just_past, 1.0)));
        assert!(labeler.matches(
            &target,
            &report(35.0, -97.0, scan + Duration::minutes(15), 1.0)
        ));
    }

    #[test]
    fn test_box_is_axis_aligned() {
        let labeler = SpatiotemporalLabeler::new();
        let scan = base_time();
        let target = cell(1, 35.0, -97.0, scan);

        assert!(!labeler.matches(&target, &report(35.0, -96.25, scan, 1.0)));
        assert!(!labeler.matches(&target, &report(34.25, -97.0, scan, 1.0)));
        // Corner of the box is still inside, unlike a radius test
        assert!(labeler.matches(&target, &report(34.5, -97.5, scan, 1.0)));
    }

    #[test]
    fn test_one_report_matches_many_cells() {
        let scan = base_time();
        let cells = vec![
            cell(1, 35.0, -97.0, scan),
            cell(2, 35.25, -97.25, scan),
            cell(3, 38.0, -97.0, scan),
        ];
        let reports = vec![report(35.125, -97.125, scan, 1.25)];

        let labeled = SpatiotemporalLabeler::new().label(&cells, &reports);
        assert!(labeled[0].is_positive);
        assert!(labeled[1].is_positive);
        assert!(!labeled[2].is_positive);
        assert_eq!(labeled[1].magnitude_label, 1.25);
        assert_eq!(labeled[2].magnitude_label, 0.0);
    }

    #[test]
    fn test_positive_flag_is_sticky() {
        let scan = base_time();
        let cells = vec![cell(1, 35.0, -97.0, scan)];
        let reports = vec![
            report(35.0, -97.0, scan, 1.0),
            report(40.0, -90.0, scan, 4.0),
        ];

        let labeled = SpatiotemporalLabeler::new().label(&cells, &reports);
        assert!(labeled[0].is_positive);
        assert_eq!(labeled[0].magnitude_label, 1.0);
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let result = SpatiotemporalLabeler::with_params(LabelingParams {
            time_window_minutes: -1.0,
            ..LabelingParams::default()
        });
        assert!(matches!(result, Err(StormError::InvalidParameter(_))));

        let result = SpatiotemporalLabeler::with_params(LabelingParams {
            distance_threshold_deg: f64::NAN,
            ..LabelingParams::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_accumulator_merge() {
        let mut left = LabelAccumulator::default();
        left.absorb(1.5);
        let right = LabelAccumulator::default();

        let merged = left.merge(right);
        assert!(merged.is_positive);
        assert_eq!(merged.magnitude_label, 1.5);
        assert_eq!(right.merge(left), merged);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_labeling_matches_sequential() {
        let scan = base_time();
        let cells: Vec<StormCellFeatures> = (0..40)
            .map(|i| cell(i + 1, 30.0 + 0.25 * i as f64, -97.0, scan + Duration::minutes(i as i64)))
            .collect();
        let reports: Vec<StormReport> = (0..60)
            .map(|i| {
                report(
                    30.0 + 0.2 * i as f64,
                    -97.0 + 0.1 * (i % 7) as f64,
                    scan + Duration::minutes((i % 45) as i64),
                    0.25 * (i % 9) as f64,
                )
            })
            .collect();

        let labeler = SpatiotemporalLabeler::new();
        assert_eq!(
            labeler.label(&cells, &reports),
            labeler.label_parallel(&cells, &reports)
        );
    }
}
