//! Breadth-first region growing
//!
//! Every block is visited exactly once across the whole pass through a global
//! visited mask, so the cost is linear in the number of blocks and the
//! resulting regions never overlap. Growth compares candidates against the
//! seed block of the region rather than the block they were reached from,
//! which keeps a region from drifting slowly across a color gradient.

use super::region::Region;
use crate::detection::config::{MIN_REGION_BLOCKS, SegmentationConfig};
use crate::features::{BlockFeature, EdgeGrid, FeatureGrid, GridCoord};
use std::collections::VecDeque;
use tracing::debug;

/// Result of one segmentation pass
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    /// Regions that passed the minimum-size filter, in seed scan order
    pub regions: Vec<Region>,
    /// Blocks taken off the queue; equals the grid size
    pub cells_visited: usize,
    /// Connected components dropped for being too small
    pub discarded: usize,
}

#[derive(Debug, Clone)]
pub struct RegionSegmenter {
    edge_threshold: f64,
    color_threshold: f64,
    feature_threshold: f64,
    min_region_blocks: usize,
}

impl RegionSegmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            edge_threshold: config.edge_threshold,
            color_threshold: config.color_threshold,
            feature_threshold: config.feature_threshold,
            min_region_blocks: config.min_region_blocks.max(MIN_REGION_BLOCKS),
        }
    }

    /// Group low-edge, similar blocks into 4-connected regions
    pub fn segment(&self, grid: &FeatureGrid, edges: &EdgeGrid) -> Segmentation {
        let mut visited = vec![false; grid.len()];
        let mut segmentation = Segmentation::default();

        for seed in grid.coords() {
            if visited[grid.index_of(seed)] {
                continue;
            }

            let (cells, visits) = self.grow(grid, edges, seed, &mut visited);
            segmentation.cells_visited += visits;

            if cells.len() >= self.min_region_blocks {
                segmentation.regions.push(Region::new(cells));
            } else {
                segmentation.discarded += 1;
            }
        }

        debug!(
            regions = segmentation.regions.len(),
            discarded = segmentation.discarded,
            blocks = grid.len(),
            "segmentation finished"
        );

        segmentation
    }

    fn grow(
        &self,
        grid: &FeatureGrid,
        edges: &EdgeGrid,
        seed: GridCoord,
        visited: &mut [bool],
    ) -> (Vec<GridCoord>, usize) {
        let seed_block = &grid[seed];
        let mut cells = Vec::new();
        let mut queue = VecDeque::from([seed]);
        visited[grid.index_of(seed)] = true;

        while let Some(current) = queue.pop_front() {
            cells.push(current);

            for neighbor in grid.neighbors(current) {
                let index = grid.index_of(neighbor);
                if visited[index] {
                    continue;
                }
                if edges.get(neighbor) < self.edge_threshold
                    && self.is_similar(seed_block, &grid[neighbor])
                {
                    visited[index] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        let visits = cells.len();
        (cells, visits)
    }

    /// Color distance and greenness/grayness gaps all under their thresholds
    fn is_similar(&self, seed: &BlockFeature, candidate: &BlockFeature) -> bool {
        seed.color_distance(candidate) < self.color_threshold
            && (seed.greenness - candidate.greenness).abs() < self.feature_threshold
            && (seed.grayness - candidate.grayness).abs() < self.feature_threshold
    }
}
