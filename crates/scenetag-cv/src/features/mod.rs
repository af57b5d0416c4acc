//! Block-wise color and edge statistics

pub mod block;
pub mod edges;
pub mod grid;

pub use block::{BlockFeature, FeatureExtractor};
pub use edges::{EdgeGrid, EdgeMapBuilder};
pub use grid::{FeatureGrid, GridCoord};
