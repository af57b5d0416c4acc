//! Raw pixel access

pub mod buffer;

pub use buffer::{PixelBuffer, RasterError};
