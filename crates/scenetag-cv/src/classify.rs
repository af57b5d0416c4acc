//! Heuristic region classification
//!
//! Each region is averaged into a [`RegionProfile`] and scored on two integer
//! ladders, one for vegetation and one for built structures. The higher score
//! wins, ties go to building, and the gap between the scores sets confidence.

use crate::bbox::{BoundingBox, DebugInfo, Detection};
use crate::features::FeatureGrid;
use crate::segmentation::{BlockExtent, Region};
use scenetag_core::{Category, SeededLcg};
use serde::Serialize;
use tracing::debug;

const BASE_CONFIDENCE: f64 = 0.7;
const MAX_CONFIDENCE_BOOST: f64 = 0.25;
const CONFIDENCE_PER_POINT: f64 = 0.05;

/// Multiplicative bbox jitter range
const JITTER_LOW: f64 = 0.95;
const JITTER_HIGH: f64 = 1.05;

/// Mean block statistics over one region
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RegionProfile {
    pub green_ratio: f64,
    pub gray_ratio: f64,
    pub blue_ratio: f64,
    pub greenness: f64,
    pub grayness: f64,
    pub edge_strength: f64,
}

impl RegionProfile {
    /// Average the region's cells; `None` for an empty region
    pub fn from_region(region: &Region, grid: &FeatureGrid) -> Option<Self> {
        let mut profile = RegionProfile::default();
        let mut count = 0usize;

        for block in region.cells().iter().filter_map(|&coord| grid.get(coord)) {
            profile.green_ratio += block.green_ratio;
            profile.gray_ratio += block.gray_ratio;
            profile.blue_ratio += block.blue_ratio;
            profile.greenness += block.greenness;
            profile.grayness += block.grayness;
            profile.edge_strength += block.edge_strength;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;
        profile.green_ratio /= n;
        profile.gray_ratio /= n;
        profile.blue_ratio /= n;
        profile.greenness /= n;
        profile.grayness /= n;
        profile.edge_strength /= n;
        Some(profile)
    }
}

/// Tree and building scores of one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionScores {
    pub tree: i32,
    pub building: i32,
}

impl RegionScores {
    /// Ties favor building
    pub fn category(&self) -> Category {
        if self.tree > self.building {
            Category::Tree
        } else {
            Category::Building
        }
    }

    /// `0.7` plus `0.05` per point of score gap, capped at `0.95`
    pub fn confidence(&self) -> f64 {
        let gap = (self.tree - self.building).abs() as f64;
        BASE_CONFIDENCE + (gap * CONFIDENCE_PER_POINT).min(MAX_CONFIDENCE_BOOST)
    }
}

fn ladder(value: f64, steps: &[(f64, i32)]) -> i32 {
    steps
        .iter()
        .find(|&&(threshold, _)| value > threshold)
        .map_or(0, |&(_, points)| points)
}

/// Assigns a category, confidence and pixel box to segmented regions
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    block_size: u32,
    image_width: u32,
    image_height: u32,
    debug: bool,
}

impl RegionClassifier {
    pub fn new(block_size: u32, image_width: u32, image_height: u32) -> Self {
        Self {
            block_size,
            image_width,
            image_height,
            debug: false,
        }
    }

    /// Classifier matching the geometry of `grid`
    pub fn for_grid(grid: &FeatureGrid) -> Self {
        let (width, height) = grid.image_dimensions();
        Self::new(grid.block_size(), width, height)
    }

    /// Attach ratio diagnostics and scores to every detection
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Score a profile. `extent` feeds the tall-upper-region bonus.
    pub fn score(&self, profile: &RegionProfile, extent: &BlockExtent) -> RegionScores {
        let mut tree = ladder(profile.green_ratio, &[(0.4, 3), (0.25, 2), (0.15, 1)]);
        tree += ladder(profile.greenness, &[(0.2, 2), (0.1, 1)]);

        let mut building = ladder(profile.gray_ratio, &[(0.4, 3), (0.25, 2), (0.15, 1)]);
        building += ladder(profile.edge_strength, &[(0.08, 3), (0.05, 2), (0.03, 1)]);
        building += ladder(profile.grayness, &[(0.5, 2), (0.35, 1)]);

        if self.is_tall_upper_region(extent) {
            building += 1;
        }

        RegionScores { tree, building }
    }

    /// Center in the upper 40% of the image and taller than 30% of it
    fn is_tall_upper_region(&self, extent: &BlockExtent) -> bool {
        if self.image_height == 0 {
            return false;
        }

        let block = self.block_size as f64;
        let height = self.image_height as f64;
        let top = extent.min_y as f64 * block;
        let pixel_height = (extent.rows() as f64 * block).min(height - top).max(0.0);
        let center_y = top + pixel_height / 2.0;

        center_y / height < 0.4 && pixel_height > height * 0.3
    }

    /// Classify one region. Empty regions are skipped with `None`.
    ///
    /// The box is the block extent in pixels, each of x, y, width and height
    /// scaled by a factor drawn from `rng` in `[0.95, 1.05)`, then clipped to
    /// the image.
    pub fn classify(&self, region: &Region, grid: &FeatureGrid, rng: &mut SeededLcg) -> Option<Detection> {
        let profile = RegionProfile::from_region(region, grid)?;
        let extent = region.extent()?;
        let scores = self.score(&profile, &extent);
        let category = scores.category();
        let confidence = scores.confidence();

        debug!(
            min_x = extent.min_x,
            min_y = extent.min_y,
            max_x = extent.max_x,
            max_y = extent.max_y,
            tree_score = scores.tree,
            building_score = scores.building,
            category = category.label(),
            confidence,
            "classified region"
        );

        let block = self.block_size as f64;
        let bbox = BoundingBox::new(
            extent.min_x as f64 * block * rng.next_in(JITTER_LOW, JITTER_HIGH),
            extent.min_y as f64 * block * rng.next_in(JITTER_LOW, JITTER_HIGH),
            extent.columns() as f64 * block * rng.next_in(JITTER_LOW, JITTER_HIGH),
            extent.rows() as f64 * block * rng.next_in(JITTER_LOW, JITTER_HIGH),
        )
        .clamp_to(self.image_width as f64, self.image_height as f64);

        let detection = Detection::new(category, confidence, bbox);
        if !self.debug {
            return Some(detection);
        }

        Some(detection.with_debug(DebugInfo {
            green_ratio: profile.green_ratio,
            gray_ratio: profile.gray_ratio,
            tree_score: Some(scores.tree),
            building_score: Some(scores.building),
        }))
    }

    /// Classify every region in order, dropping the ones that yield nothing
    pub fn classify_all(&self, regions: &[Region], grid: &FeatureGrid, rng: &mut SeededLcg) -> Vec<Detection> {
        regions
            .iter()
            .filter_map(|region| self.classify(region, grid, rng))
            .collect()
    }
}
