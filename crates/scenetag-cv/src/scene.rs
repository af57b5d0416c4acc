//! Scene labelling from detection counts

use crate::bbox::Detection;
use scenetag_core::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// More trees than buildings
    Nature,
    /// More buildings than trees
    Urban,
    /// As many trees as buildings
    Mixed,
    /// Nothing detected
    General,
}

impl SceneKind {
    /// Percentage reported alongside the label
    pub fn probability(self) -> u8 {
        match self {
            SceneKind::Nature => 70,
            SceneKind::Urban => 80,
            SceneKind::Mixed => 60,
            SceneKind::General => 50,
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SceneKind::Nature => "nature",
            SceneKind::Urban => "urban",
            SceneKind::Mixed => "mixed",
            SceneKind::General => "general",
        };
        f.write_str(label)
    }
}

/// Counts and scene label consumed by the geo tagging layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub kind: SceneKind,
    pub probability: u8,
    pub trees: usize,
    pub buildings: usize,
    pub mean_confidence: f64,
}

impl SceneSummary {
    pub fn from_detections<'a, I>(detections: I) -> Self
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        let mut trees = 0;
        let mut buildings = 0;
        let mut confidence = 0.0;

        for detection in detections {
            match detection.category {
                Category::Tree => trees += 1,
                Category::Building => buildings += 1,
            }
            confidence += detection.confidence;
        }

        let total = trees + buildings;
        let kind = if total == 0 {
            SceneKind::General
        } else if trees > buildings {
            SceneKind::Nature
        } else if buildings > trees {
            SceneKind::Urban
        } else {
            SceneKind::Mixed
        };

        Self {
            kind,
            probability: kind.probability(),
            trees,
            buildings,
            mean_confidence: if total == 0 { 0.0 } else { confidence / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BoundingBox;

    fn detection(category: Category, confidence: f64) -> Detection {
        Detection::new(category, confidence, BoundingBox::new(0.0, 0.0, 1.0, 1.0))
    }

    #[test]
    fn test_scene_kinds() {
        let nature = [detection(Category::Tree, 0.8), detection(Category::Tree, 0.6), detection(Category::Building, 0.7)];
        let summary = SceneSummary::from_detections(&nature);
        assert_eq!(summary.kind, SceneKind::Nature);
        assert_eq!(summary.probability, 70);
        assert!((summary.mean_confidence - 0.7).abs() < 1e-12);

        let urban = [detection(Category::Building, 0.9)];
        assert_eq!(SceneSummary::from_detections(&urban).kind, SceneKind::Urban);

        let mixed = [detection(Category::Building, 0.9), detection(Category::Tree, 0.9)];
        assert_eq!(SceneSummary::from_detections(&mixed).probability, 60);
    }

    #[test]
    fn test_empty_scene_is_general() {
        let summary = SceneSummary::from_detections(&[]);
        assert_eq!(summary.kind, SceneKind::General);
        assert_eq!(summary.mean_confidence, 0.0);
        assert_eq!(summary.kind.to_string(), "general");
    }
}
