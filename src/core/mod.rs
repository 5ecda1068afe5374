//! Core storm cell processing modules

pub mod vil;
pub mod segmentation;
pub mod features;
pub mod labeling;
pub mod pipeline;

// Re-export main types
pub use vil::{VilEstimator, VilParams};
pub use segmentation::{CellSegmenter, Connectivity, Segmentation, SegmentationParams};
pub use features::{CellFeatureExtractor, CentroidRounding, FeatureParams};
pub use labeling::{LabelAccumulator, LabelingParams, SpatiotemporalLabeler};
pub use pipeline::StormCellPipeline;
