//! Scenetag Computer Vision Library
//!
//! Heuristic tree and building detection from raw RGBA pixels: block features,
//! region growing, score-based classification and seeded fallback layouts.

pub mod backend;
pub mod bbox;
pub mod classify;
pub mod detection;
pub mod error;
pub mod fallback;
pub mod features;
pub mod merge;
pub mod scene;
pub mod segmentation;
pub mod utils;

// Re-export commonly used types
pub use backend::{ModelState, ModelStatus, RawPrediction};
pub use bbox::{BoundingBox, DebugInfo, Detection, DetectionSet};
pub use detection::{DetectionConfig, DetectionPath, DetectionPipeline, DetectionResult};
pub use error::DetectionError;
pub use fallback::{FallbackGenerator, FallbackProfile};
pub use merge::{MergeStrategy, OverlapResolver};
pub use scene::{SceneKind, SceneSummary};

pub use scenetag_core::{Category, PixelBuffer};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use super::*;

    /// Trait for same-category overlap merging implementations
    pub trait OverlapMerge {
        fn merge_overlaps(&self, detections: Vec<Detection>) -> Vec<Detection>;
    }

    /// A trained detector that can stand in for the heuristics
    pub trait InferenceBackend: Send + Sync {
        fn name(&self) -> &str;
        fn infer(&self, buffer: &PixelBuffer<'_>) -> Result<Vec<RawPrediction>>;
    }

    /// Produces an [`InferenceBackend`]; called again on each retry
    pub trait ModelLoader {
        fn load(&self) -> Result<Box<dyn InferenceBackend>>;
    }

    impl<F> ModelLoader for F
    where
        F: Fn() -> Result<Box<dyn InferenceBackend>>,
    {
        fn load(&self) -> Result<Box<dyn InferenceBackend>> {
            self()
        }
    }
}
