//! Connected-region growth over the block grid

pub mod region;
pub mod segmenter;

pub use region::{BlockExtent, Region};
pub use segmenter::{RegionSegmenter, Segmentation};
