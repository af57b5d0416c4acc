//! Regions of coherent blocks

use crate::features::GridCoord;

/// Inclusive block-coordinate bounds of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExtent {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl BlockExtent {
    pub fn columns(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn rows(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// A connected, visually coherent set of grid blocks.
///
/// Built by one segmentation pass and consumed once by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    cells: Vec<GridCoord>,
}

impl Region {
    pub fn new(cells: Vec<GridCoord>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[GridCoord] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bounding block extent, `None` for an empty region
    pub fn extent(&self) -> Option<BlockExtent> {
        let first = self.cells.first()?;
        let init = BlockExtent {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };

        Some(self.cells.iter().fold(init, |acc, cell| BlockExtent {
            min_x: acc.min_x.min(cell.x),
            min_y: acc.min_y.min(cell.y),
            max_x: acc.max_x.max(cell.x),
            max_y: acc.max_y.max(cell.y),
        }))
    }
}
