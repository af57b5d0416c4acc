//! Detection configuration

use crate::error::DetectionError;
use crate::merge::MergeStrategy;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest detection list any path may return
pub const MAX_DETECTIONS: usize = 6;
/// Smallest component reported as a region
pub const MIN_REGION_BLOCKS: usize = 4;

/// Main detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionConfig {
    /// Side of the square feature blocks in pixels
    pub block_size: u32,
    pub segmentation: SegmentationConfig,
    pub overlap: OverlapConfig,
    /// Upper bound on returned detections, at most [`MAX_DETECTIONS`]
    pub max_detections: usize,
    /// Seed perturbation; each step shifts the seed by 1000
    pub variation: Option<i64>,
    /// Attach ratio diagnostics to detections
    pub debug: bool,
    pub model: ModelConfig,
}

/// Region growing thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmentationConfig {
    /// Blocks at or above this edge value never join a region
    pub edge_threshold: f64,
    /// Maximum color distance to the region seed
    pub color_threshold: f64,
    /// Maximum greenness and grayness gap to the region seed
    pub feature_threshold: f64,
    /// Smaller components are discarded; at least [`MIN_REGION_BLOCKS`]
    pub min_region_blocks: usize,
}

/// Same-category overlap merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlapConfig {
    pub threshold: f64,
    pub strategy: MergeStrategy,
}

/// Inference backend post-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub max_load_retries: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            block_size: 16,
            segmentation: SegmentationConfig::default(),
            overlap: OverlapConfig::default(),
            max_detections: MAX_DETECTIONS,
            variation: None,
            debug: false,
            model: ModelConfig::default(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 0.3,
            color_threshold: 0.2,
            feature_threshold: 0.3,
            min_region_blocks: MIN_REGION_BLOCKS,
        }
    }
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            strategy: MergeStrategy::Greedy,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_load_retries: 2,
        }
    }
}

impl DetectionConfig {
    /// 8px blocks: slower, follows smaller structures
    pub fn fine_grained() -> Self {
        Self {
            block_size: 8,
            ..Self::default()
        }
    }

    /// 32px blocks for large images
    pub fn coarse() -> Self {
        Self {
            block_size: 32,
            ..Self::default()
        }
    }

    pub fn with_variation(mut self, variation: i64) -> Self {
        self.variation = Some(variation);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.overlap.strategy = strategy;
        self
    }

    /// Variation index, zero when unset
    pub fn variation(&self) -> i64 {
        self.variation.unwrap_or(0)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> std::result::Result<(), DetectionError> {
        if self.block_size == 0 {
            return Err(DetectionError::InvalidConfig("blockSize must be positive".into()));
        }
        if !(1..=MAX_DETECTIONS).contains(&self.max_detections) {
            return Err(DetectionError::InvalidConfig(format!(
                "maxDetections must be within [1, {MAX_DETECTIONS}], got {}",
                self.max_detections
            )));
        }
        if self.segmentation.min_region_blocks < MIN_REGION_BLOCKS {
            return Err(DetectionError::InvalidConfig(format!(
                "segmentation.minRegionBlocks must be at least {MIN_REGION_BLOCKS}, got {}",
                self.segmentation.min_region_blocks
            )));
        }

        let unit_ranged = [
            ("segmentation.edgeThreshold", self.segmentation.edge_threshold),
            ("segmentation.colorThreshold", self.segmentation.color_threshold),
            ("segmentation.featureThreshold", self.segmentation.feature_threshold),
            ("overlap.threshold", self.overlap.threshold),
            ("model.confidenceThreshold", self.model.confidence_threshold),
            ("model.iouThreshold", self.model.iou_threshold),
        ];
        for (name, value) in unit_ranged {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectionError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Load a camelCase JSON config; missing keys take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize detection config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Result<()> {
        DetectionConfig::default().validate()?;
        DetectionConfig::fine_grained().validate()?;
        DetectionConfig::coarse().validate()?;
        Ok(())
    }

    #[test]
    fn test_partial_json_uses_defaults() -> Result<()> {
        let config: DetectionConfig = serde_json::from_str(
            r#"{"blockSize": 24, "segmentation": {"edgeThreshold": 0.4}, "variation": 3}"#,
        )?;

        assert_eq!(config.block_size, 24);
        assert_eq!(config.segmentation.edge_threshold, 0.4);
        assert_eq!(config.segmentation.min_region_blocks, 4);
        assert_eq!(config.variation(), 3);
        assert_eq!(config.overlap.threshold, 0.7);
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = DetectionConfig::default();
        config.block_size = 0;
        assert!(matches!(config.validate(), Err(DetectionError::InvalidConfig(_))));

        let mut config = DetectionConfig::default();
        config.overlap.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detection_cap_bounds() {
        let mut config = DetectionConfig::default();
        for max in [0, MAX_DETECTIONS + 1, 50] {
            config.max_detections = max;
            assert!(matches!(config.validate(), Err(DetectionError::InvalidConfig(_))));
        }

        config.max_detections = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_region_floor_bounds() {
        let mut config = DetectionConfig::default();
        for blocks in 0..MIN_REGION_BLOCKS {
            config.segmentation.min_region_blocks = blocks;
            assert!(matches!(config.validate(), Err(DetectionError::InvalidConfig(_))));
        }

        config.segmentation.min_region_blocks = 9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_file_round_trip() -> Result<()> {
        let config = DetectionConfig::coarse()
            .with_variation(-2)
            .with_strategy(MergeStrategy::Connected);
        let path = std::env::temp_dir().join(format!("scenetag-config-{}.json", std::process::id()));
        std::fs::write(&path, config.to_json_string()?)?;

        let loaded = DetectionConfig::from_json_file(&path)?;
        std::fs::remove_file(&path)?;

        assert_eq!(loaded, config);
        Ok(())
    }
}
