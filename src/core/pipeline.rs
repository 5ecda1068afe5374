use crate::config::PipelineConfig;
use crate::core::features::CellFeatureExtractor;
use crate::core::labeling::SpatiotemporalLabeler;
use crate::core::segmentation::CellSegmenter;
use crate::core::vil::VilEstimator;
use crate::types::{LabeledStormCell, RadarVolume, StormCellFeatures, StormReport, StormResult};

/// End-to-end driver: VIL, segmentation and feature extraction per volume,
/// then one labeling pass over the concatenated table
pub struct StormCellPipeline {
    vil: VilEstimator,
    segmenter: CellSegmenter,
    extractor: CellFeatureExtractor,
    labeler: SpatiotemporalLabeler,
}

impl StormCellPipeline {
    /// Create a pipeline with default parameters everywhere
    pub fn new() -> Self {
        Self {
            vil: VilEstimator::new(),
            segmenter: CellSegmenter::new(),
            extractor: CellFeatureExtractor::new(),
            labeler: SpatiotemporalLabeler::new(),
        }
    }

    /// Create a pipeline from a configuration tree
    pub fn from_config(config: &PipelineConfig) -> StormResult<Self> {
        Ok(Self {
            vil: VilEstimator::with_params(config.vil),
            segmenter: CellSegmenter::with_params(config.segmentation),
            extractor: CellFeatureExtractor::with_params(config.features),
            labeler: SpatiotemporalLabeler::with_params(config.labeling)?,
        })
    }

    /// Feature rows for every storm cell in one volume
    pub fn process_volume(&self, volume: &RadarVolume) -> StormResult<Vec<StormCellFeatures>> {
        volume.validate()?;
        log::info!("Processing volume scanned at {}", volume.scan_time);

        let vil = self.vil.estimate_volume(volume)?;
        let segmentation = self.segmenter.segment(&vil);
        if segmentation.num_cells == 0 {
            log::info!("No storm cells in volume at {}", volume.scan_time);
            return Ok(Vec::new());
        }

        self.extractor.extract(volume, &segmentation)
    }

    /// Feature rows for many volumes, concatenated in input order.
    ///
    /// Volumes are independent, so with the `parallel` feature each one is
    /// processed on its own rayon task. The first failing volume aborts the
    /// batch.
    pub fn process_volumes(&self, volumes: &[RadarVolume]) -> StormResult<Vec<StormCellFeatures>> {
        log::info!("Processing batch of {} volumes", volumes.len());

        #[cfg(feature = "parallel")]
        let per_volume: Vec<Vec<StormCellFeatures>> = {
            use rayon::prelude::*;
            volumes
                .par_iter()
                .map(|volume| self.process_volume(volume))
                .collect::<StormResult<_>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let per_volume: Vec<Vec<StormCellFeatures>> = volumes
            .iter()
            .map(|volume| self.process_volume(volume))
            .collect::<StormResult<_>>()?;

        let features: Vec<StormCellFeatures> = per_volume.into_iter().flatten().collect();
        log::info!("Batch produced {} feature rows", features.len());
        Ok(features)
    }

    /// Attach report labels to a feature table
    pub fn label(
        &self,
        features: &[StormCellFeatures],
        reports: &[StormReport],
    ) -> Vec<LabeledStormCell> {
        #[cfg(feature = "parallel")]
        {
            self.labeler.label_parallel(features, reports)
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.labeler.label(features, reports)
        }
    }

    /// Process all volumes and label the resulting table
    pub fn run(
        &self,
        volumes: &[RadarVolume],
        reports: &[StormReport],
    ) -> StormResult<Vec<LabeledStormCell>> {
        let features = self.process_volumes(volumes)?;
        Ok(self.label(&features, reports))
    }
}

impl Default for StormCellPipeline {
    fn default() -> Self {
        Self::new()
    }
}
