//! Parameter tree for the whole pipeline, loadable from YAML.

use crate::core::features::FeatureParams;
use crate::core::labeling::LabelingParams;
use crate::core::segmentation::SegmentationParams;
use crate::core::vil::VilParams;
use crate::dataset::DEFAULT_MIN_REGRESSION_SAMPLES;
use crate::types::StormResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Training-set preparation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetParams {
    /// Fewer positive rows than this skips the hail-size regression set
    pub min_regression_samples: usize,
}

impl Default for DatasetParams {
    fn default() -> Self {
        Self {
            min_regression_samples: DEFAULT_MIN_REGRESSION_SAMPLES,
        }
    }
}

/// Main configuration combining all component parameters.
///
/// Every section is optional in the YAML file; missing sections and fields
/// take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub vil: VilParams,

    #[serde(default)]
    pub segmentation: SegmentationParams,

    #[serde(default)]
    pub features: FeatureParams,

    #[serde(default)]
    pub labeling: LabelingParams,

    #[serde(default)]
    pub dataset: DatasetParams,
}

impl PipelineConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> StormResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> StormResult<Self> {
        log::info!("Reading configuration: {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> StormResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::CentroidRounding;
    use crate::core::segmentation::Connectivity;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.segmentation.threshold, 5.0);
        assert_eq!(config.segmentation.connectivity, Connectivity::Four);
        assert_eq!(config.features.echo_top_threshold_dbz, 18.0);
        assert_eq!(config.labeling.time_window_minutes, 15.0);
        assert_eq!(config.labeling.distance_threshold_deg, 0.5);
        assert_eq!(config.dataset.min_regression_samples, 10);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
segmentation:
  threshold: 7.5
features:
  centroid_rounding: truncate
labeling:
  time_window_minutes: 10
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.segmentation.threshold, 7.5);
        assert_eq!(config.segmentation.connectivity, Connectivity::Four);
        assert_eq!(config.features.centroid_rounding, CentroidRounding::Truncate);
        assert_eq!(config.labeling.time_window_minutes, 10.0);
        assert_eq!(config.labeling.distance_threshold_deg, 0.5);
        assert_eq!(config.vil, VilParams::default());
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let mut config = PipelineConfig::default();
        config.segmentation.connectivity = Connectivity::Eight;
        config.dataset.min_regression_samples = 25;
        config.to_yaml(&path).unwrap();

        assert_eq!(PipelineConfig::from_yaml(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let result = PipelineConfig::from_yaml_str("segmentation: [1, 2");
        assert!(matches!(result, Err(crate::types::StormError::Config(_))));
    }
}
