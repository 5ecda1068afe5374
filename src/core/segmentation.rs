use crate::types::{CellMask, VilGrid};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Pixel adjacency used when growing connected regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge neighbors only (up, down, left, right)
    Four,
    /// Edge and diagonal neighbors
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        static FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
        static EIGHT: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

/// Storm cell segmentation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// VIL threshold in kg/m^2; a pixel is foreground when strictly above it
    pub threshold: f64,
    pub connectivity: Connectivity,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            connectivity: Connectivity::Four,
        }
    }
}

/// Result of labeling a VIL grid
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// 0 = background, k in 1..=num_cells = member of cell k
    pub mask: CellMask,
    pub num_cells: usize,
    /// Pixel count per cell, index k - 1 for label k
    pub cell_sizes: Vec<usize>,
}

impl Segmentation {
    /// Labels in ascending order
    pub fn labels(&self) -> impl Iterator<Item = u32> {
        1..=self.num_cells as u32
    }

    /// Number of pixels carrying `label`, 0 for unknown labels
    pub fn cell_size(&self, label: u32) -> usize {
        if label == 0 {
            return 0;
        }
        self.cell_sizes
            .get(label as usize - 1)
            .copied()
            .unwrap_or(0)
    }
}

/// Connected-component labeler for thresholded VIL grids
pub struct CellSegmenter {
    params: SegmentationParams,
}

impl CellSegmenter {
    /// Create a segmenter with the default 5 kg/m^2 threshold
    pub fn new() -> Self {
        Self {
            params: SegmentationParams::default(),
        }
    }

    /// Create a segmenter with custom parameters
    pub fn with_params(params: SegmentationParams) -> Self {
        Self { params }
    }

    /// Create a segmenter with a custom threshold and default connectivity
    pub fn with_threshold(threshold: f64) -> Self {
        Self::with_params(SegmentationParams {
            threshold,
            ..SegmentationParams::default()
        })
    }

    /// Label every maximal connected group of above-threshold pixels.
    ///
    /// Regions are numbered from 1 in row-major order of their first pixel.
    /// NaN never exceeds the threshold and stays background.
    pub fn segment(&self, vil: &VilGrid) -> Segmentation {
        let (rows, cols) = vil.dim();
        log::info!(
            "Segmenting {}x{} VIL grid at threshold {:.2} ({:?}-connected)",
            rows,
            cols,
            self.params.threshold,
            self.params.connectivity
        );

        let foreground = vil.mapv(|v| v > self.params.threshold);
        let mut mask = Array2::<u32>::zeros((rows, cols));
        let mut cell_sizes = Vec::new();
        let mut queue = VecDeque::new();

        for i in 0..rows {
            for j in 0..cols {
                if !foreground[[i, j]] || mask[[i, j]] != 0 {
                    continue;
                }

                let label = cell_sizes.len() as u32 + 1;
                mask[[i, j]] = label;
                queue.push_back((i, j));
                let mut size = 0;

                while let Some((ci, cj)) = queue.pop_front() {
                    size += 1;
                    for &(di, dj) in self.params.connectivity.offsets() {
                        let ni = ci as isize + di;
                        let nj = cj as isize + dj;
                        if ni < 0 || nj < 0 || ni >= rows as isize || nj >= cols as isize {
                            continue;
                        }
                        let (ni, nj) = (ni as usize, nj as usize);
                        if foreground[[ni, nj]] && mask[[ni, nj]] == 0 {
                            mask[[ni, nj]] = label;
                            queue.push_back((ni, nj));
                        }
                    }
                }

                log::debug!("Cell {} seeded at ({}, {}) with {} pixels", label, i, j, size);
                cell_sizes.push(size);
            }
        }

        log::info!("Found {} storm cells", cell_sizes.len());
        Segmentation {
            mask,
            num_cells: cell_sizes.len(),
            cell_sizes,
        }
    }
}

impl Default for CellSegmenter {
    fn default() -> Self {
        Self::new()
    }
}
