//! Bounding boxes and detection records
//!
//! Core abstraction for representing and manipulating detection results.

use scenetag_core::{Category, UnknownCategory};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in the pixel space of the source image
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Area of the box; negative extents count as empty
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Center point `(x, y)`
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Area shared with `other`, zero when disjoint
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let x_overlap = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let y_overlap = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        x_overlap * y_overlap
    }

    /// Intersection area divided by the smaller of the two areas.
    ///
    /// Unlike IoU this reaches 1.0 when one box sits inside the other.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f64 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / smaller
    }

    /// Calculate intersection over union (IoU) with another box
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Clip the box into `[0, width] × [0, height]`
    pub fn clamp_to(&self, width: f64, height: f64) -> BoundingBox {
        let x = self.x.clamp(0.0, width);
        let y = self.y.clamp(0.0, height);
        let right = self.right().clamp(x, width);
        let bottom = self.bottom().clamp(y, height);
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    /// Check the box lies inside `[0, width] × [0, height]`
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.width >= 0.0
            && self.height >= 0.0
            && self.right() <= width + EPS
            && self.bottom() <= height + EPS
    }
}

/// Ratio diagnostics attached to a detection when debug output is requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub green_ratio: f64,
    pub gray_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_score: Option<i32>,
}

/// One classified, confidence-scored bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "DetectionRecord", try_from = "DetectionRecord")]
pub struct Detection {
    pub category: Category,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub debug: Option<DebugInfo>,
}

impl Detection {
    /// Create a detection; confidence is clamped into `[0, 1]`
    pub fn new(category: Category, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
            debug: None,
        }
    }

    /// Attach debug diagnostics
    pub fn with_debug(mut self, debug: DebugInfo) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Wire class id of the category
    pub fn class_id(&self) -> i32 {
        self.category.class_id()
    }

    /// Wire class name of the category
    pub fn class_name(&self) -> &'static str {
        self.category.label()
    }
}

/// Wire form: `{class, className, confidence, bbox, debug?}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionRecord {
    class: i32,
    class_name: String,
    confidence: f64,
    bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    debug: Option<DebugInfo>,
}

impl From<Detection> for DetectionRecord {
    fn from(detection: Detection) -> Self {
        Self {
            class: detection.class_id(),
            class_name: detection.class_name().to_string(),
            confidence: detection.confidence,
            bbox: detection.bbox,
            debug: detection.debug,
        }
    }
}

impl TryFrom<DetectionRecord> for Detection {
    type Error = UnknownCategory;

    fn try_from(record: DetectionRecord) -> Result<Self, Self::Error> {
        let category = Category::try_from(record.class)?;
        Ok(Self {
            category,
            confidence: record.confidence.clamp(0.0, 1.0),
            bbox: record.bbox,
            debug: record.debug,
        })
    }
}

/// Collection of detections with batch operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    /// Create new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap detections as they are, without sorting
    pub fn from_vec(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Add a detection at the end
    pub fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    /// Detections in their current order
    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    /// Number of detections
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Whether the set holds no detections
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Sort by confidence (descending). Stable, so equal confidences keep
    /// their input order.
    pub fn sort_by_confidence(&mut self) {
        self.detections
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    }

    /// Keep at most `max` entries
    pub fn truncate(mut self, max: usize) -> Self {
        self.detections.truncate(max);
        self
    }

    /// Apply class-aware non-maximum suppression.
    ///
    /// Highest confidence first; a box is suppressed when a kept box of the
    /// same category reaches `threshold` IoU with it.
    pub fn apply_class_nms(mut self, threshold: f64) -> Self {
        if self.detections.is_empty() {
            return self;
        }

        self.sort_by_confidence();

        let mut keep = Vec::new();
        let mut suppressed = vec![false; self.detections.len()];

        for i in 0..self.detections.len() {
            if suppressed[i] {
                continue;
            }

            keep.push(self.detections[i].clone());

            for j in (i + 1)..self.detections.len() {
                if suppressed[j] || self.detections[i].category != self.detections[j].category {
                    continue;
                }
                if self.detections[i].bbox.iou(&self.detections[j].bbox) >= threshold {
                    suppressed[j] = true;
                }
            }
        }

        Self::from_vec(keep)
    }

    /// Count detections of one category
    pub fn count(&self, category: Category) -> usize {
        self.detections
            .iter()
            .filter(|d| d.category == category)
            .count()
    }

    /// Get statistics
    pub fn stats(&self) -> SetStats {
        let mut total_confidence = 0.0;
        let mut max_confidence: f64 = 0.0;
        let mut min_confidence = f64::INFINITY;

        for detection in &self.detections {
            total_confidence += detection.confidence;
            max_confidence = max_confidence.max(detection.confidence);
            min_confidence = min_confidence.min(detection.confidence);
        }

        let avg_confidence = if self.detections.is_empty() {
            0.0
        } else {
            total_confidence / self.detections.len() as f64
        };

        SetStats {
            total: self.detections.len(),
            trees: self.count(Category::Tree),
            buildings: self.count(Category::Building),
            avg_confidence,
            max_confidence,
            min_confidence: if min_confidence == f64::INFINITY {
                0.0
            } else {
                min_confidence
            },
        }
    }

    /// Iterate in the current order
    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }
}

impl IntoIterator for DetectionSet {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<T: IntoIterator<Item = Detection>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Statistics about a set of detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetStats {
    pub total: usize,
    pub trees: usize,
    pub buildings: usize,
    pub avg_confidence: f64,
    pub max_confidence: f64,
    pub min_confidence: f64,
}
