//! Regular block grid over an image

use super::block::{BlockFeature, FeatureExtractor};
use scenetag_core::PixelBuffer;
use std::ops::Index;

/// Column/row position of a block in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: usize,
    pub y: usize,
}

impl GridCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Row-major grid of [`BlockFeature`]s.
///
/// The grid covers the whole image; blocks on the right and bottom border may
/// be partial when the block size does not divide the image extent.
#[derive(Debug, Clone)]
pub struct FeatureGrid {
    width: usize,
    height: usize,
    block_size: u32,
    image_width: u32,
    image_height: u32,
    cells: Vec<BlockFeature>,
}

impl FeatureGrid {
    /// Partition the buffer into `block_size` squares and extract each one
    pub fn build(buffer: &PixelBuffer<'_>, block_size: u32) -> Self {
        let block_size = block_size.max(1);
        let extractor = FeatureExtractor::new(block_size);
        let (image_width, image_height) = buffer.dimensions();
        let width = image_width.div_ceil(block_size) as usize;
        let height = image_height.div_ceil(block_size) as usize;

        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let origin_x = col as u32 * block_size;
                let origin_y = row as u32 * block_size;
                cells.push(extractor.extract(buffer, origin_x, origin_y));
            }
        }

        Self {
            width,
            height,
            block_size,
            image_width,
            image_height,
            cells,
        }
    }

    /// Assemble a grid from precomputed cells. `None` when the cell count
    /// does not match `width × height`.
    pub fn from_cells(
        width: usize,
        height: usize,
        block_size: u32,
        cells: Vec<BlockFeature>,
    ) -> Option<Self> {
        if cells.len() != width * height || block_size == 0 {
            return None;
        }

        Some(Self {
            width,
            height,
            block_size,
            image_width: (width as u32).saturating_mul(block_size),
            image_height: (height as u32).saturating_mul(block_size),
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Size of the analyzed image in pixels
    pub fn image_dimensions(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    pub fn index_of(&self, coord: GridCoord) -> usize {
        coord.y * self.width + coord.x
    }

    pub fn get(&self, coord: GridCoord) -> Option<&BlockFeature> {
        if coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        self.cells.get(self.index_of(coord))
    }

    pub fn cells(&self) -> &[BlockFeature] {
        &self.cells
    }

    /// All coordinates in row-major order
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridCoord::new(x, y)))
    }

    /// The 4-connected neighbors inside the grid (left, right, up, down)
    pub fn neighbors(&self, coord: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        const OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

        OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let x = coord.x.checked_add_signed(dx)?;
            let y = coord.y.checked_add_signed(dy)?;
            (x < self.width && y < self.height).then_some(GridCoord::new(x, y))
        })
    }
}

impl Index<GridCoord> for FeatureGrid {
    type Output = BlockFeature;

    fn index(&self, coord: GridCoord) -> &Self::Output {
        &self.cells[self.index_of(coord)]
    }
}
