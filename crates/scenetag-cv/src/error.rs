//! Typed failures of the detection layer

use scenetag_core::RasterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    /// The pixel buffer cannot be analyzed; the pipeline falls back
    #[error("malformed input: {0}")]
    MalformedInput(#[from] RasterError),

    #[error("invalid detection config: {0}")]
    InvalidConfig(String),

    /// The external inference backend failed to load or run
    #[error("inference backend: {0}")]
    Backend(String),
}
