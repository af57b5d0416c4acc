//! High-level detection module

pub mod config;
pub mod detector;

pub use config::{DetectionConfig, MAX_DETECTIONS, MIN_REGION_BLOCKS, ModelConfig, OverlapConfig, SegmentationConfig};
pub use detector::{DetectionPath, DetectionPipeline, DetectionResult, DetectionStats};
