use crate::types::{RadarVolume, StormError, StormResult, VilGrid, VolumeField};
use ndarray::{Array2, ArrayView1, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Parameters of the water-content power law `M = a * Z^b` (mks units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VilParams {
    /// Coefficient `a`
    pub coefficient: f64,
    /// Exponent `b`
    pub exponent: f64,
}

impl Default for VilParams {
    fn default() -> Self {
        Self {
            coefficient: 3.44e-6,
            exponent: 4.0 / 7.0,
        }
    }
}

/// Vertically integrated liquid estimator
pub struct VilEstimator {
    params: VilParams,
}

impl VilEstimator {
    /// Create a new estimator with the standard empirical constants
    pub fn new() -> Self {
        Self {
            params: VilParams::default(),
        }
    }

    /// Create an estimator with custom constants
    pub fn with_params(params: VilParams) -> Self {
        Self { params }
    }

    /// Estimate VIL for a radar volume
    pub fn estimate_volume(&self, volume: &RadarVolume) -> StormResult<VilGrid> {
        self.estimate(&volume.reflectivity, &volume.gate_height)
    }

    /// Integrate liquid water content over the level axis.
    ///
    /// Each sample contributes `m * dh`, where `dh` is the height step to the
    /// next level up at the same horizontal position. The top level has no
    /// level above it and contributes nothing, so a single-level volume
    /// integrates to zero everywhere.
    pub fn estimate(
        &self,
        reflectivity: &VolumeField,
        gate_height: &VolumeField,
    ) -> StormResult<VilGrid> {
        if reflectivity.dim() != gate_height.dim() {
            return Err(StormError::shape_mismatch(
                "gate_height",
                format!("{:?}", reflectivity.dim()),
                format!("{:?}", gate_height.dim()),
            ));
        }

        let (levels, rows, cols) = reflectivity.dim();
        log::info!(
            "Estimating VIL over {} levels on a {}x{} grid",
            levels,
            rows,
            cols
        );
        log::debug!("VIL parameters: {:?}", self.params);

        if levels < 2 {
            log::warn!("Volume has {} level(s); VIL is zero everywhere", levels);
            return Ok(Array2::zeros((rows, cols)));
        }

        let mut vil = Array2::<f64>::zeros((rows, cols));
        let zip = Zip::from(&mut vil)
            .and(reflectivity.lanes(Axis(0)))
            .and(gate_height.lanes(Axis(0)));

        #[cfg(feature = "parallel")]
        zip.par_for_each(|out, dbz, height| *out = self.integrate_column(dbz, height));

        #[cfg(not(feature = "parallel"))]
        zip.for_each(|out, dbz, height| *out = self.integrate_column(dbz, height));

        log::info!("VIL estimation completed");
        Ok(vil)
    }

    /// Liquid water content for one reflectivity sample
    pub fn liquid_water_content(&self, dbz: f64) -> f64 {
        let z_linear = 10f64.powf(dbz / 10.0);
        self.params.coefficient * z_linear.powf(self.params.exponent)
    }

    fn integrate_column(&self, dbz: ArrayView1<f64>, height: ArrayView1<f64>) -> f64 {
        let levels = dbz.len();
        (0..levels.saturating_sub(1))
            .map(|k| self.liquid_water_content(dbz[k]) * (height[k + 1] - height[k]))
            .sum()
    }
}

impl Default for VilEstimator {
    fn default() -> Self {
        Self::new()
    }
}
