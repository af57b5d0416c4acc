//! Scenetag core data model
//!
//! Types shared by the vision crate and its consumers: the two fixed object
//! categories, a borrowed RGBA pixel view and the seeded generator that makes
//! every "random" layout reproducible.

pub mod category;
pub mod random;
pub mod raster;

pub use category::{Category, UnknownCategory};
pub use random::{DEFAULT_FRAME, SeededLcg, frame_seed};
pub use raster::{PixelBuffer, RasterError};
