//! stormcell: storm-cell features and hail labels from weather radar volumes
//!
//! This library derives Vertically Integrated Liquid (VIL) from volumetric
//! reflectivity, segments storm cells from the VIL field, extracts per-cell
//! descriptors, and labels those cells against ground-truth hail reports to
//! build training tables for hail occurrence and hail size models.

pub mod types;
pub mod config;
pub mod dataset;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    RadarVolume, StormCellFeatures, StormReport, LabeledStormCell, StormError, StormResult,
    VilGrid, CellMask,
};

pub use config::PipelineConfig;
pub use core::{
    VilEstimator, CellSegmenter, CellFeatureExtractor, SpatiotemporalLabeler, StormCellPipeline,
};
pub use dataset::{classification_set, regression_set, TrainingSet};
pub use io::ReportReader;
