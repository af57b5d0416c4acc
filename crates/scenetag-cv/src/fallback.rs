//! Seeded fallback layouts
//!
//! When segmentation finds nothing usable, or the caller only knows the frame
//! size, plausible detections are manufactured from a [`SeededLcg`]. The same
//! frame and variation always give the same list.

use crate::bbox::{BoundingBox, DebugInfo, Detection};
use scenetag_core::{Category, DEFAULT_FRAME, SeededLcg, frame_seed};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which call site the layout is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackProfile {
    /// Segmentation was empty or the input was unreadable
    Segmentation,
    /// Frame-size-only detection, confidence favors centered boxes
    Stable,
}

impl FallbackProfile {
    /// Extra detections on top of the minimum of two: `floor(r × spread)`
    fn count_spread(self) -> f64 {
        match self {
            FallbackProfile::Segmentation => 4.0,
            FallbackProfile::Stable => 3.0,
        }
    }

    /// Wider frames lean toward trees
    fn tree_probability(self, aspect: f64) -> f64 {
        match self {
            FallbackProfile::Segmentation if aspect > 1.6 => 0.4,
            FallbackProfile::Segmentation if aspect > 1.3 => 0.3,
            FallbackProfile::Segmentation => 0.25,
            FallbackProfile::Stable if aspect > 1.2 => 0.6,
            FallbackProfile::Stable => 0.4,
        }
    }

    fn center_penalty(self) -> f64 {
        match self {
            FallbackProfile::Segmentation => 0.0,
            FallbackProfile::Stable => 0.3,
        }
    }
}

/// Generates fallback layouts for a single frame
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    width: f64,
    height: f64,
    seed: i64,
    debug: bool,
}

impl FallbackGenerator {
    /// Zero-sized frames are laid out against the default 640×480 frame
    pub fn new(width: u32, height: u32, variation: i64) -> Self {
        let (width, height) = if width == 0 || height == 0 {
            DEFAULT_FRAME
        } else {
            (width, height)
        };

        Self {
            width: width as f64,
            height: height as f64,
            seed: frame_seed(width, height, variation),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Produce a layout sorted by descending confidence, uncapped.
    ///
    /// Every layout holds at least one tree and one building.
    pub fn generate(&self, profile: FallbackProfile) -> Vec<Detection> {
        let mut rng = SeededLcg::new(self.seed);
        let count = 2 + (rng.next_unit() * profile.count_spread()).floor() as usize;
        let tree_probability = profile.tree_probability(self.aspect_ratio());
        let section = self.width / (count + 1) as f64;

        let mut has_tree = false;
        let mut has_building = false;
        let mut detections = Vec::with_capacity(count);

        for slot in 0..count {
            let category = if slot + 2 == count && !has_building {
                Category::Building
            } else if slot + 1 == count && !has_tree {
                Category::Tree
            } else if rng.chance(tree_probability) {
                Category::Tree
            } else {
                Category::Building
            };

            match category {
                Category::Tree => has_tree = true,
                Category::Building => has_building = true,
            }

            let bbox = self.place(category, slot, section, &mut rng);
            let mut confidence = base_confidence(category) + rng.next_unit() * 0.25;
            let diagnostics = synthetic_ratios(category, &mut rng);

            confidence -= profile.center_penalty() * self.center_distance(&bbox);

            let mut detection = Detection::new(category, confidence, bbox);
            if self.debug {
                detection = detection.with_debug(diagnostics);
            }
            detections.push(detection);
        }

        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        debug!(
            ?profile,
            seed = self.seed,
            trees = detections.iter().filter(|d| d.category.is_tree()).count(),
            buildings = detections.iter().filter(|d| !d.category.is_tree()).count(),
            "generated fallback layout"
        );

        detections
    }

    /// Center the box in its horizontal section with jitter, then keep it
    /// inside the frame
    fn place(&self, category: Category, slot: usize, section: f64, rng: &mut SeededLcg) -> BoundingBox {
        let x = section * (slot + 1) as f64 - section / 2.0 + rng.next_centered() * section;

        let (y, width, height) = match category {
            Category::Tree => (
                self.height * rng.next_in(0.3, 0.5),
                self.width * rng.next_in(0.08, 0.2),
                self.height * rng.next_in(0.25, 0.55),
            ),
            Category::Building => (
                self.height * rng.next_in(0.15, 0.4),
                self.width * rng.next_in(0.18, 0.4),
                self.height * rng.next_in(0.25, 0.55),
            ),
        };

        let x = x.min(self.width - width).max(0.0);
        let y = y.min(self.height - height).max(0.0);
        BoundingBox::new(x, y, width, height).clamp_to(self.width, self.height)
    }

    /// Distance of the box center from the frame center, 1.0 at a corner
    fn center_distance(&self, bbox: &BoundingBox) -> f64 {
        let (cx, cy) = bbox.center();
        let dx = cx - self.width / 2.0;
        let dy = cy - self.height / 2.0;
        let half_diagonal = ((self.width / 2.0).powi(2) + (self.height / 2.0).powi(2)).sqrt();
        (dx * dx + dy * dy).sqrt() / half_diagonal
    }
}

fn base_confidence(category: Category) -> f64 {
    match category {
        Category::Tree => 0.6,
        Category::Building => 0.7,
    }
}

/// Ratios in the range a real region of this category would show. Always
/// drawn so the layout does not depend on the debug flag.
fn synthetic_ratios(category: Category, rng: &mut SeededLcg) -> DebugInfo {
    let (green_ratio, gray_ratio) = match category {
        Category::Tree => (rng.next_in(0.65, 0.9), rng.next_in(0.05, 0.2)),
        Category::Building => (rng.next_in(0.05, 0.2), rng.next_in(0.55, 0.8)),
    };

    DebugInfo {
        green_ratio,
        gray_ratio,
        tree_score: None,
        building_score: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_frame_same_layout() -> anyhow::Result<()> {
        let a = FallbackGenerator::new(800, 600, 0).generate(FallbackProfile::Segmentation);
        let b = FallbackGenerator::new(800, 600, 0).generate(FallbackProfile::Segmentation);

        assert_eq!(serde_json::to_string(&a)?, serde_json::to_string(&b)?);
        Ok(())
    }

    #[test]
    fn test_variation_changes_seed() {
        let base = FallbackGenerator::new(800, 600, 0);
        let varied = FallbackGenerator::new(800, 600, 3);
        assert_eq!(varied.seed() - base.seed(), 3000);
    }

    #[test]
    fn test_layouts_hold_both_categories() {
        for profile in [FallbackProfile::Segmentation, FallbackProfile::Stable] {
            for variation in 0..40 {
                let layout = FallbackGenerator::new(1024, 512, variation).generate(profile);
                assert!(layout.iter().any(|d| d.category == Category::Tree));
                assert!(layout.iter().any(|d| d.category == Category::Building));
            }
        }
    }

    #[test]
    fn test_layout_bounds_and_order() {
        for (width, height) in [(640, 480), (300, 900), (1920, 1080), (17, 5)] {
            for profile in [FallbackProfile::Segmentation, FallbackProfile::Stable] {
                let layout = FallbackGenerator::new(width, height, 1).generate(profile);
                let max = match profile {
                    FallbackProfile::Segmentation => 5,
                    FallbackProfile::Stable => 4,
                };

                assert!((2..=max).contains(&layout.len()));
                assert!(layout.windows(2).all(|w| w[0].confidence >= w[1].confidence));
                for detection in &layout {
                    assert!((0.0..=1.0).contains(&detection.confidence));
                    assert!(detection.bbox.fits_within(width as f64, height as f64));
                }
            }
        }
    }

    #[test]
    fn test_center_distance_spans_center_to_corner() {
        let generator = FallbackGenerator::new(800, 600, 0);

        let centered = BoundingBox::new(350.0, 250.0, 100.0, 100.0);
        let corner = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        let halfway = BoundingBox::new(190.0, 140.0, 20.0, 20.0);

        assert!(generator.center_distance(&centered).abs() < 1e-12);
        assert!((generator.center_distance(&corner) - 1.0).abs() < 1e-12);
        assert!((generator.center_distance(&halfway) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stable_confidence_drops_away_from_center() {
        for variation in 0..20 {
            let generator = FallbackGenerator::new(1280, 720, variation);

            for detection in generator.generate(FallbackProfile::Stable) {
                let penalty = 0.3 * generator.center_distance(&detection.bbox);
                let base = base_confidence(detection.category);

                assert!(detection.confidence <= base + 0.25 - penalty + 1e-9);
                assert!(detection.confidence >= base - penalty - 1e-9);
            }

            // the segmentation profile carries no penalty
            for detection in generator.generate(FallbackProfile::Segmentation) {
                assert!(detection.confidence >= base_confidence(detection.category) - 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_frame_uses_default() {
        let generator = FallbackGenerator::new(0, 0, 0);
        assert_eq!(generator.seed(), frame_seed(640, 480, 0));

        for detection in generator.generate(FallbackProfile::Segmentation) {
            assert!(detection.bbox.fits_within(640.0, 480.0));
        }
    }

    #[test]
    fn test_debug_flag_only_adds_diagnostics() {
        let plain = FallbackGenerator::new(640, 480, 0).generate(FallbackProfile::Stable);
        let debug = FallbackGenerator::new(640, 480, 0)
            .with_debug(true)
            .generate(FallbackProfile::Stable);

        assert_eq!(plain.len(), debug.len());
        for (a, b) in plain.iter().zip(&debug) {
            assert_eq!(a.bbox, b.bbox);
            let info = b.debug.as_ref().unwrap();
            if b.category == Category::Tree {
                assert!(info.green_ratio >= 0.65);
            } else {
                assert!(info.gray_ratio >= 0.55);
            }
        }
    }
}
