//! Ground-truth hail report ingestion.
//!
//! Reads Storm Prediction Center style CSV tables. A table is a sequence of
//! sections, each introduced by a header row (`Time,Size,Location,...,Lat,Lon`).
//! Daily SPC files concatenate tornado, wind and hail sections; only sections
//! whose header carries a `Size` column are read.
//!
//! SPC `Size` values are hundredths of an inch (`175` is 1.75 in). They are
//! returned unscaled unless a magnitude scale is set on the reader.

use crate::types::{StormError, StormReport, StormResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column positions of one header section
#[derive(Debug, Clone, Copy)]
struct SectionColumns {
    date: Option<usize>,
    time: usize,
    latitude: usize,
    longitude: usize,
    size: Option<usize>,
}

impl SectionColumns {
    /// Interpret `record` as a header row, if it is one
    fn from_header(record: &StringRecord) -> Option<Self> {
        let find = |name: &str| record.iter().position(|f| f.eq_ignore_ascii_case(name));

        Some(Self {
            time: find("time")?,
            latitude: find("lat")?,
            longitude: find("lon")?,
            date: find("date"),
            size: find("size"),
        })
    }
}

/// Hail report CSV reader
#[derive(Debug, Clone)]
pub struct ReportReader {
    /// Date applied to sections without a `Date` column
    default_date: Option<NaiveDate>,
    /// Factor applied to every `Size` value
    magnitude_scale: f64,
}

impl Default for ReportReader {
    fn default() -> Self {
        Self {
            default_date: None,
            magnitude_scale: 1.0,
        }
    }
}

impl ReportReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader for daily files whose rows carry only a time of day
    pub fn with_date(date: NaiveDate) -> Self {
        Self {
            default_date: Some(date),
            ..Self::default()
        }
    }

    /// Multiply every magnitude by `scale`; `0.01` turns SPC hundredths
    /// of an inch into inches
    pub fn with_magnitude_scale(mut self, scale: f64) -> StormResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(StormError::InvalidParameter(format!(
                "magnitude scale must be positive and finite, got {}",
                scale
            )));
        }
        self.magnitude_scale = scale;
        Ok(self)
    }

    /// Read a report file.
    ///
    /// Without an explicit default date, the date is taken from an SPC file
    /// name such as `230501_rpts.csv` when the table has no `Date` column.
    /// Magnitudes are the `Size` column (hundredths of an inch in SPC
    /// files) times the reader's magnitude scale, 1.0 by default.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> StormResult<Vec<StormReport>> {
        let path = path.as_ref();
        log::info!("Reading storm reports: {}", path.display());

        let reader = match self.default_date {
            Some(_) => self.clone(),
            None => Self {
                default_date: date_from_filename(path),
                ..self.clone()
            },
        };

        let file = File::open(path)?;
        reader.read_from(file)
    }

    /// Read reports from any CSV source.
    ///
    /// `Size` values are scaled as in [`ReportReader::read_file`].
    pub fn read_from<R: Read>(&self, source: R) -> StormResult<Vec<StormReport>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(source);

        let mut reports = Vec::new();
        let mut section: Option<SectionColumns> = None;
        let mut skipped_sections = 0;

        for result in csv_reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());

            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            if let Some(columns) = SectionColumns::from_header(&record) {
                if columns.size.is_none() {
                    skipped_sections += 1;
                }
                section = Some(columns);
                continue;
            }

            let columns = section.ok_or_else(|| StormError::ReportParse {
                line,
                reason: "data row before any header row".to_string(),
            })?;

            if let Some(size_column) = columns.size {
                reports.push(self.parse_row(&record, &columns, size_column, line)?);
            }
        }

        if skipped_sections > 0 {
            log::debug!("Skipped {} non-hail report sections", skipped_sections);
        }
        log::info!("Read {} hail reports", reports.len());
        Ok(reports)
    }

    fn parse_row(
        &self,
        record: &StringRecord,
        columns: &SectionColumns,
        size_column: usize,
        line: u64,
    ) -> StormResult<StormReport> {
        let field = |index: usize, name: &str| {
            record.get(index).ok_or_else(|| StormError::ReportParse {
                line,
                reason: format!("missing {} field", name),
            })
        };
        let number = |index: usize, name: &str| -> StormResult<f64> {
            let raw = field(index, name)?;
            raw.parse::<f64>().map_err(|_| StormError::ReportParse {
                line,
                reason: format!("invalid {} '{}'", name, raw),
            })
        };

        let date = match columns.date {
            Some(index) => {
                let raw = field(index, "date")?;
                parse_report_date(raw).ok_or_else(|| StormError::ReportParse {
                    line,
                    reason: format!("invalid date '{}'", raw),
                })?
            }
            None => self.default_date.ok_or_else(|| StormError::ReportParse {
                line,
                reason: "no Date column and no default date".to_string(),
            })?,
        };

        let raw_time = field(columns.time, "time")?;
        let time = parse_report_time(raw_time).ok_or_else(|| StormError::ReportParse {
            line,
            reason: format!("invalid time '{}'", raw_time),
        })?;

        Ok(StormReport {
            report_time: Utc.from_utc_datetime(&NaiveDateTime::new(date, time)),
            latitude: number(columns.latitude, "latitude")?,
            longitude: number(columns.longitude, "longitude")?,
            magnitude: number(size_column, "size")? * self.magnitude_scale,
        })
    }
}

/// Parse `YYYY-MM-DD`, `YYYYMMDD`, `YYMMDD` or `MM/DD/YYYY`
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let all_digits = raw.chars().all(|c| c.is_ascii_digit());
    let format = match raw.len() {
        8 if all_digits => "%Y%m%d",
        6 if all_digits => "%y%m%d",
        _ if raw.contains('/') => "%m/%d/%Y",
        _ => "%Y-%m-%d",
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Parse an `HHMM` time of day, left-padding short values (`930` is 09:30).
/// `HH:MM` is accepted as well.
pub fn parse_report_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.contains(':') {
        return NaiveTime::parse_from_str(raw, "%H:%M").ok();
    }
    if raw.is_empty() || raw.len() > 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let padded = format!("{:0>4}", raw);
    let hours: u32 = padded[..2].parse().ok()?;
    let minutes: u32 = padded[2..].parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Date encoded in an SPC daily file name (`YYMMDD_rpts*.csv`)
pub fn date_from_filename(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let prefix = stem.get(..6)?;
    if !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%y%m%d").ok()
}
