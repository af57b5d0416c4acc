//! Detection pipeline
//!
//! Features, edges, segmentation, classification and overlap merging in one
//! call. Every call ends in one of the [`DetectionPath`] outcomes and always
//! returns a non-empty, capped and sorted [`DetectionSet`]; unreadable input
//! degrades to the seeded fallback layout instead of an error.

use super::config::{DetectionConfig, MAX_DETECTIONS};
use crate::backend::{ModelState, map_predictions};
use crate::bbox::DetectionSet;
use crate::classify::RegionClassifier;
use crate::error::DetectionError;
use crate::fallback::{FallbackGenerator, FallbackProfile};
use crate::features::{EdgeMapBuilder, FeatureGrid};
use crate::merge::OverlapResolver;
use crate::scene::SceneSummary;
use crate::segmentation::RegionSegmenter;
use crate::traits::ModelLoader;
use crate::Result;
use scenetag_core::{Category, PixelBuffer, SeededLcg, frame_seed};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a call produced its detections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectionPath {
    /// Inference backend output
    Model,
    /// Classified regions
    Segmentation,
    /// No region qualified; seeded fallback layout
    SegmentationEmpty,
    /// Input could not be analyzed; seeded fallback layout.
    ///
    /// A frame with a zero dimension has no area to place boxes in, so its
    /// layout is built against the default 640×480 frame instead.
    Fallback,
    /// Frame-size-only layout requested by the caller
    Stable,
}

impl DetectionPath {
    /// Whether the detections were synthesized rather than observed
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            DetectionPath::SegmentationEmpty | DetectionPath::Fallback | DetectionPath::Stable
        )
    }
}

/// Detection statistics
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub regions: usize,
    pub discarded_regions: usize,
    pub total_detections: usize,
    pub trees: usize,
    pub buildings: usize,
    pub avg_confidence: f64,
    pub processing_time_ms: u64,
}

/// Detection result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detections: DetectionSet,
    pub path: DetectionPath,
    pub stats: DetectionStats,
}

impl DetectionResult {
    fn new(detections: DetectionSet, path: DetectionPath, started: Instant) -> Self {
        let set_stats = detections.stats();
        let stats = DetectionStats {
            total_detections: set_stats.total,
            trees: set_stats.trees,
            buildings: set_stats.buildings,
            avg_confidence: set_stats.avg_confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
            ..DetectionStats::default()
        };

        Self {
            detections,
            path,
            stats,
        }
    }

    fn with_regions(mut self, regions: usize, discarded: usize) -> Self {
        self.stats.regions = regions;
        self.stats.discarded_regions = discarded;
        self
    }

    pub fn scene(&self) -> SceneSummary {
        SceneSummary::from_detections(&self.detections)
    }
}

/// Heuristic tree/building detector
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    config: DetectionConfig,
    segmenter: RegionSegmenter,
    resolver: OverlapResolver,
}

impl DetectionPipeline {
    /// Create a pipeline; fails only on an invalid config
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;

        let segmenter = RegionSegmenter::new(&config.segmentation);
        let resolver = OverlapResolver::new(config.overlap.threshold, config.overlap.strategy);

        Ok(Self {
            config,
            segmenter,
            resolver,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect trees and buildings in `buffer`
    pub fn detect(&self, buffer: &PixelBuffer<'_>) -> DetectionResult {
        let started = Instant::now();

        match self.segment_and_classify(buffer, started) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "analysis failed, using fallback layout");
                let (width, height) = buffer.dimensions();
                self.fallback(width, height, DetectionPath::Fallback, started)
            }
        }
    }

    /// Layout derived from the frame size and configured variation alone
    pub fn detect_stable(&self, width: u32, height: u32) -> DetectionResult {
        self.fallback(width, height, DetectionPath::Stable, Instant::now())
    }

    /// Prefer the inference backend, falling back to heuristics when it is
    /// unavailable, fails, or reports nothing usable
    pub fn detect_with_model(
        &self,
        buffer: &PixelBuffer<'_>,
        state: &mut ModelState,
        loader: &dyn ModelLoader,
    ) -> DetectionResult {
        let started = Instant::now();

        let outcome = match state.ensure_loaded(loader) {
            Some(backend) if buffer.validate().is_ok() => Some(
                backend
                    .infer(buffer)
                    .map_err(|err| DetectionError::Backend(format!("{}: {err:#}", backend.name()))),
            ),
            _ => None,
        };

        match outcome {
            Some(Ok(predictions)) => {
                let (width, height) = buffer.dimensions();
                let detections = map_predictions(predictions, &self.config.model, width, height)
                    .truncate(self.max_detections());

                if !detections.is_empty() {
                    self.log_outcome(&detections, DetectionPath::Model);
                    return DetectionResult::new(detections, DetectionPath::Model, started);
                }
                info!("inference backend reported no trees or buildings");
            }
            Some(Err(err)) => {
                warn!(error = %err, "inference failed, using heuristics");
                state.record_error(&err);
            }
            None => {}
        }

        self.detect(buffer)
    }

    /// Run [`Self::detect`] over many buffers; in parallel with the
    /// `parallel` feature
    pub fn detect_batch(&self, buffers: &[PixelBuffer<'_>]) -> Vec<DetectionResult> {
        #[cfg(feature = "parallel")]
        {
            buffers.par_iter().map(|buffer| self.detect(buffer)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            buffers.iter().map(|buffer| self.detect(buffer)).collect()
        }
    }

    fn segment_and_classify(&self, buffer: &PixelBuffer<'_>, started: Instant) -> Result<DetectionResult> {
        buffer.validate().map_err(DetectionError::from)?;

        let grid = FeatureGrid::build(buffer, self.config.block_size);
        let edges = EdgeMapBuilder::build(&grid);
        let segmentation = self.segmenter.segment(&grid, &edges);

        let (width, height) = buffer.dimensions();
        let mut rng = SeededLcg::new(frame_seed(width, height, self.config.variation()));
        let classifier = RegionClassifier::for_grid(&grid).with_debug(self.config.debug);
        let classified = classifier.classify_all(&segmentation.regions, &grid, &mut rng);

        if classified.is_empty() {
            info!(
                discarded = segmentation.discarded,
                "no qualifying regions, using fallback layout"
            );
            return Ok(self
                .fallback(width, height, DetectionPath::SegmentationEmpty, started)
                .with_regions(0, segmentation.discarded));
        }

        let detections = self.resolver.resolve(classified, self.max_detections());
        self.log_outcome(&detections, DetectionPath::Segmentation);

        Ok(DetectionResult::new(detections, DetectionPath::Segmentation, started)
            .with_regions(segmentation.regions.len(), segmentation.discarded))
    }

    fn fallback(&self, width: u32, height: u32, path: DetectionPath, started: Instant) -> DetectionResult {
        let profile = match path {
            DetectionPath::Stable => FallbackProfile::Stable,
            _ => FallbackProfile::Segmentation,
        };

        let layout = FallbackGenerator::new(width, height, self.config.variation())
            .with_debug(self.config.debug)
            .generate(profile);
        let detections = DetectionSet::from_vec(layout).truncate(self.max_detections());

        self.log_outcome(&detections, path);
        DetectionResult::new(detections, path, started)
    }

    /// Configured cap, never above [`MAX_DETECTIONS`]
    fn max_detections(&self) -> usize {
        self.config.max_detections.min(MAX_DETECTIONS)
    }

    fn log_outcome(&self, detections: &DetectionSet, path: DetectionPath) {
        info!(
            ?path,
            trees = detections.count(Category::Tree),
            buildings = detections.count(Category::Building),
            "detection finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawPrediction;
    use crate::bbox::BoundingBox;
    use crate::traits::InferenceBackend;
    use anyhow::bail;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((width * height) as usize)
    }

    #[test]
    fn test_pipeline_creation() -> Result<()> {
        let _pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        assert!(DetectionPipeline::new(DetectionConfig { block_size: 0, ..DetectionConfig::default() }).is_err());
        Ok(())
    }

    #[test]
    fn test_black_frame_is_building() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let data = solid(640, 480, [0, 0, 0, 255]);
        let result = pipeline.detect(&PixelBuffer::new(640, 480, &data));

        assert_eq!(result.path, DetectionPath::Segmentation);
        assert!(result.detections.count(Category::Building) > result.detections.count(Category::Tree));
        Ok(())
    }

    #[test]
    fn test_malformed_input_falls_back() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;

        let short = vec![0u8; 10];
        let result = pipeline.detect(&PixelBuffer::new(64, 64, &short));
        assert_eq!(result.path, DetectionPath::Fallback);
        assert!(!result.detections.is_empty());

        let result = pipeline.detect(&PixelBuffer::new(0, 0, &[]));
        assert_eq!(result.path, DetectionPath::Fallback);
        assert!(result.detections.iter().all(|d| d.bbox.fits_within(640.0, 480.0)));
        Ok(())
    }

    #[test]
    fn test_tiny_uniform_image_falls_back() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        // two blocks, below the four-block minimum
        let data = solid(24, 16, [128, 128, 128, 255]);
        let result = pipeline.detect(&PixelBuffer::new(24, 16, &data));

        assert_eq!(result.path, DetectionPath::SegmentationEmpty);
        assert_eq!(result.stats.discarded_regions, 1);
        assert!(result.detections.len() <= 6);
        Ok(())
    }

    #[test]
    fn test_stable_detection_is_repeatable() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default().with_variation(4))?;
        let a = pipeline.detect_stable(1280, 720);
        let b = pipeline.detect_stable(1280, 720);

        assert_eq!(a.path, DetectionPath::Stable);
        assert_eq!(
            serde_json::to_string(&a.detections)?,
            serde_json::to_string(&b.detections)?
        );
        Ok(())
    }

    struct Canned(Vec<RawPrediction>);

    impl InferenceBackend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn infer(&self, _buffer: &PixelBuffer<'_>) -> Result<Vec<RawPrediction>> {
            Ok(self.0.clone())
        }
    }

    struct CannedLoader(Vec<RawPrediction>);

    impl ModelLoader for CannedLoader {
        fn load(&self) -> Result<Box<dyn InferenceBackend>> {
            Ok(Box::new(Canned(self.0.clone())))
        }
    }

    struct Missing;

    impl ModelLoader for Missing {
        fn load(&self) -> Result<Box<dyn InferenceBackend>> {
            bail!("no model available")
        }
    }

    struct Broken;

    impl InferenceBackend for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn infer(&self, _buffer: &PixelBuffer<'_>) -> Result<Vec<RawPrediction>> {
            bail!("tensor shape mismatch")
        }
    }

    #[test]
    fn test_failing_backend_is_recorded() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let data = solid(64, 64, [0, 0, 0, 255]);
        let buffer = PixelBuffer::new(64, 64, &data);
        let loader = || -> Result<Box<dyn InferenceBackend>> { Ok(Box::new(Broken)) };
        let mut state = ModelState::default();

        let result = pipeline.detect_with_model(&buffer, &mut state, &loader);

        assert_eq!(result.path, DetectionPath::Segmentation);
        assert_eq!(state.last_error(), Some("inference backend: broken: tensor shape mismatch"));
        Ok(())
    }

    #[test]
    fn test_model_predictions_are_used() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let data = solid(100, 100, [0, 0, 0, 255]);
        let buffer = PixelBuffer::new(100, 100, &data);
        let loader = CannedLoader(vec![
            RawPrediction::new(58, 0.9, BoundingBox::new(10.0, 10.0, 30.0, 60.0)),
            RawPrediction::new(11, 0.7, BoundingBox::new(50.0, 5.0, 45.0, 40.0)),
        ]);
        let mut state = ModelState::default();

        let result = pipeline.detect_with_model(&buffer, &mut state, &loader);

        assert_eq!(result.path, DetectionPath::Model);
        assert_eq!(result.detections.len(), 2);
        assert_eq!(result.detections.as_slice()[0].category, Category::Tree);
        Ok(())
    }

    #[test]
    fn test_missing_model_uses_heuristics() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let data = solid(100, 100, [0, 0, 0, 255]);
        let buffer = PixelBuffer::new(100, 100, &data);
        let mut state = ModelState::default();

        let with_model = pipeline.detect_with_model(&buffer, &mut state, &Missing);
        let plain = pipeline.detect(&buffer);

        assert!(state.is_simulation());
        assert_eq!(with_model.path, plain.path);
        assert_eq!(
            serde_json::to_string(&with_model.detections)?,
            serde_json::to_string(&plain.detections)?
        );
        Ok(())
    }

    #[test]
    fn test_unusable_predictions_use_heuristics() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let data = solid(100, 100, [0, 0, 0, 255]);
        let buffer = PixelBuffer::new(100, 100, &data);
        let loader = CannedLoader(vec![RawPrediction::new(2, 0.99, BoundingBox::new(0.0, 0.0, 50.0, 50.0))]);
        let mut state = ModelState::default();

        let result = pipeline.detect_with_model(&buffer, &mut state, &loader);
        assert_eq!(result.path, DetectionPath::Segmentation);
        Ok(())
    }

    #[test]
    fn test_batch_matches_single_calls() -> Result<()> {
        let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
        let black = solid(64, 64, [0, 0, 0, 255]);
        let green = solid(64, 64, [40, 160, 40, 255]);
        let buffers = [PixelBuffer::new(64, 64, &black), PixelBuffer::new(64, 64, &green)];

        let results = pipeline.detect_batch(&buffers);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].detections.as_slice()[0].category, Category::Building);
        assert_eq!(results[1].detections.as_slice()[0].category, Category::Tree);
        Ok(())
    }
}
