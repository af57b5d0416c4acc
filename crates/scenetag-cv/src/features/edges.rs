//! Block-adjacency edge map

use super::grid::{FeatureGrid, GridCoord};

const INTRINSIC_WEIGHT: f64 = 2.0;
const NEIGHBOR_WEIGHT: f64 = 0.5;

/// Edge strength per block, same shape as the [`FeatureGrid`] it came from
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl EdgeGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Edge value at `coord`, `1.0` (a hard edge) outside the grid
    pub fn get(&self, coord: GridCoord) -> f64 {
        if coord.x >= self.width || coord.y >= self.height {
            return 1.0;
        }
        self.values[coord.y * self.width + coord.x]
    }
}

/// Builds an [`EdgeGrid`] from block features
pub struct EdgeMapBuilder;

impl EdgeMapBuilder {
    /// `2 × own edge + 0.5 × distance to right + 0.5 × distance to bottom`,
    /// clamped to 1.0. Missing neighbors contribute nothing.
    pub fn build(grid: &FeatureGrid) -> EdgeGrid {
        let values = grid
            .coords()
            .map(|coord| {
                let block = &grid[coord];
                let mut edge = block.edge_strength * INTRINSIC_WEIGHT;

                if let Some(right) = grid.get(GridCoord::new(coord.x + 1, coord.y)) {
                    edge += block.color_distance(right) * NEIGHBOR_WEIGHT;
                }
                if let Some(bottom) = grid.get(GridCoord::new(coord.x, coord.y + 1)) {
                    edge += block.color_distance(bottom) * NEIGHBOR_WEIGHT;
                }

                edge.min(1.0)
            })
            .collect();

        EdgeGrid {
            width: grid.width(),
            height: grid.height(),
            values,
        }
    }
}
