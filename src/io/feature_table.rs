//! CSV persistence for storm cell feature tables.
//!
//! Per-volume feature tables are written as they are produced and read back
//! for a single labeling pass; the labeled table is the hand-off to model
//! training. Timestamps are RFC 3339 strings.

use crate::types::{LabeledStormCell, StormCellFeatures, StormResult};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Flat CSV layout of a labeled row
#[derive(Debug, Serialize, Deserialize)]
struct LabeledRecord {
    cell_id: u32,
    max_reflectivity: f64,
    max_derived_hazard_size: f64,
    echo_top_height: f64,
    centroid_latitude: f64,
    centroid_longitude: f64,
    scan_time: DateTime<Utc>,
    is_positive: bool,
    magnitude_label: f64,
}

impl From<&LabeledStormCell> for LabeledRecord {
    fn from(row: &LabeledStormCell) -> Self {
        let f = &row.features;
        Self {
            cell_id: f.cell_id,
            max_reflectivity: f.max_reflectivity,
            max_derived_hazard_size: f.max_derived_hazard_size,
            echo_top_height: f.echo_top_height,
            centroid_latitude: f.centroid_latitude,
            centroid_longitude: f.centroid_longitude,
            scan_time: f.scan_time,
            is_positive: row.is_positive,
            magnitude_label: row.magnitude_label,
        }
    }
}

impl From<LabeledRecord> for LabeledStormCell {
    fn from(record: LabeledRecord) -> Self {
        Self {
            features: StormCellFeatures {
                cell_id: record.cell_id,
                max_reflectivity: record.max_reflectivity,
                max_derived_hazard_size: record.max_derived_hazard_size,
                echo_top_height: record.echo_top_height,
                centroid_latitude: record.centroid_latitude,
                centroid_longitude: record.centroid_longitude,
                scan_time: record.scan_time,
            },
            is_positive: record.is_positive,
            magnitude_label: record.magnitude_label,
        }
    }
}

/// Creates parent directories for a file path if they don't exist
fn ensure_parent_dirs(path: &Path) -> StormResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn write_records<W, T, I>(writer: W, records: I) -> StormResult<()>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn read_records<R: Read, T: DeserializeOwned>(reader: R) -> StormResult<Vec<T>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

fn create_buffered_writer(path: &Path) -> StormResult<BufWriter<File>> {
    ensure_parent_dirs(path)?;
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a feature table to any sink
pub fn write_features_to<W: Write>(writer: W, rows: &[StormCellFeatures]) -> StormResult<()> {
    write_records(writer, rows)
}

/// Read a feature table from any source
pub fn read_features_from<R: Read>(reader: R) -> StormResult<Vec<StormCellFeatures>> {
    read_records(reader)
}

/// Write a feature table to `path`, creating parent directories
pub fn write_feature_table<P: AsRef<Path>>(path: P, rows: &[StormCellFeatures]) -> StormResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} feature rows to {}", rows.len(), path.display());
    write_features_to(create_buffered_writer(path)?, rows)
}

/// Read a feature table written by [`write_feature_table`]
pub fn read_feature_table<P: AsRef<Path>>(path: P) -> StormResult<Vec<StormCellFeatures>> {
    let path = path.as_ref();
    let rows = read_features_from(File::open(path)?)?;
    log::info!("Read {} feature rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write a labeled table to any sink
pub fn write_labeled_to<W: Write>(writer: W, rows: &[LabeledStormCell]) -> StormResult<()> {
    write_records(writer, rows.iter().map(LabeledRecord::from))
}

/// Read a labeled table from any source
pub fn read_labeled_from<R: Read>(reader: R) -> StormResult<Vec<LabeledStormCell>> {
    let records: Vec<LabeledRecord> = read_records(reader)?;
    Ok(records.into_iter().map(LabeledStormCell::from).collect())
}

/// Write a labeled table to `path`, creating parent directories
pub fn write_labeled_table<P: AsRef<Path>>(path: P, rows: &[LabeledStormCell]) -> StormResult<()> {
    let path = path.as_ref();
    log::info!("Writing {} labeled rows to {}", rows.len(), path.display());
    write_labeled_to(create_buffered_writer(path)?, rows)
}

/// Read a labeled table written by [`write_labeled_table`]
pub fn read_labeled_table<P: AsRef<Path>>(path: P) -> StormResult<Vec<LabeledStormCell>> {
    let path = path.as_ref();
    let rows = read_labeled_from(File::open(path)?)?;
    log::info!("Read {} labeled rows from {}", rows.len(), path.display());
    Ok(rows)
}
