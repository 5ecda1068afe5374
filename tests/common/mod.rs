//! Synthetic radar volumes shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ndarray::{Array2, Array3};
use stormcell::RadarVolume;

pub const LEVELS: usize = 2;
pub const ROWS: usize = 7;
pub const COLS: usize = 7;

pub fn scan_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, 21, 0, 0).unwrap()
}

pub fn latitude_of_row(row: usize) -> f64 {
    40.0 - 0.125 * row as f64
}

pub fn longitude_of_col(col: usize) -> f64 {
    -100.0 + 0.125 * col as f64
}

/// Two-level volume with a 55 dBZ block over `rows` x `cols` and 0 dBZ
/// elsewhere. Gates are 2 km apart vertically, which puts the block well
/// above 5 kg/m^2 of VIL and the background far below it.
pub fn block_volume(
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
    scan_time: DateTime<Utc>,
) -> RadarVolume {
    let reflectivity = Array3::from_shape_fn((LEVELS, ROWS, COLS), |(_, i, j)| {
        if rows.contains(&i) && cols.contains(&j) {
            55.0
        } else {
            0.0
        }
    });
    let hazard = Array2::from_shape_fn((ROWS, COLS), |(i, j)| {
        if rows.contains(&i) && cols.contains(&j) {
            1.5
        } else {
            0.0
        }
    });

    RadarVolume::new(
        reflectivity,
        Array3::from_shape_fn((LEVELS, ROWS, COLS), |(k, _, _)| 500.0 + 2000.0 * k as f64),
        Array2::from_shape_fn((ROWS, COLS), |(_, j)| longitude_of_col(j)),
        Array2::from_shape_fn((ROWS, COLS), |(i, _)| latitude_of_row(i)),
        hazard,
        scan_time,
    )
    .unwrap()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
