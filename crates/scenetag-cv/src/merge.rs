//! Same-category overlap merging
//!
//! Overlap between two boxes is their intersection divided by the smaller
//! area, so a box nested inside another always counts as fully overlapping.

use crate::bbox::{Detection, DetectionSet};
use crate::traits::OverlapMerge;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How overlapping same-category detections are grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Scan order: the first detection anchors and grows as it absorbs later ones
    #[default]
    Greedy,
    /// Connected components of the overlap graph; independent of input order.
    /// Produces different groupings than `Greedy` on chained overlaps.
    Connected,
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Greedy => write!(f, "greedy"),
            MergeStrategy::Connected => write!(f, "connected"),
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(MergeStrategy::Greedy),
            "connected" | "union-find" => Ok(MergeStrategy::Connected),
            other => Err(format!("unknown merge strategy '{other}', expected greedy or connected")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverlapResolver {
    threshold: f64,
    strategy: MergeStrategy,
}

impl OverlapResolver {
    pub fn new(threshold: f64, strategy: MergeStrategy) -> Self {
        Self { threshold, strategy }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Merge, sort by descending confidence and keep at most `max` entries
    pub fn resolve(&self, detections: Vec<Detection>, max: usize) -> DetectionSet {
        let mut merged = DetectionSet::from_vec(self.merge_overlaps(detections));
        merged.sort_by_confidence();
        merged.truncate(max)
    }

    fn should_merge(&self, a: &Detection, b: &Detection) -> bool {
        a.category == b.category && a.bbox.overlap_ratio(&b.bbox) > self.threshold
    }

    fn merge_greedy(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut consumed = vec![false; detections.len()];
        let mut merged = Vec::with_capacity(detections.len());

        for i in 0..detections.len() {
            if consumed[i] {
                continue;
            }
            consumed[i] = true;
            let mut anchor = detections[i].clone();

            for j in (i + 1)..detections.len() {
                if consumed[j] || !self.should_merge(&anchor, &detections[j]) {
                    continue;
                }
                absorb(&mut anchor, &detections[j]);
                consumed[j] = true;
            }

            merged.push(anchor);
        }

        merged
    }

    fn merge_connected(&self, detections: Vec<Detection>) -> Vec<Detection> {
        let mut sets = DisjointSet::new(detections.len());
        for i in 0..detections.len() {
            for j in (i + 1)..detections.len() {
                if self.should_merge(&detections[i], &detections[j]) {
                    sets.union(i, j);
                }
            }
        }

        // Components are emitted in order of their first member
        let mut slots: Vec<Option<usize>> = vec![None; detections.len()];
        let mut merged: Vec<Detection> = Vec::new();

        for (i, detection) in detections.iter().enumerate() {
            let root = sets.find(i);
            match slots[root] {
                Some(slot) => absorb(&mut merged[slot], detection),
                None => {
                    slots[root] = Some(merged.len());
                    merged.push(detection.clone());
                }
            }
        }

        merged
    }
}

impl OverlapMerge for OverlapResolver {
    fn merge_overlaps(&self, detections: Vec<Detection>) -> Vec<Detection> {
        if detections.len() <= 1 {
            return detections;
        }

        match self.strategy {
            MergeStrategy::Greedy => self.merge_greedy(detections),
            MergeStrategy::Connected => self.merge_connected(detections),
        }
    }
}

/// Grow `anchor` to cover `other` and keep the higher confidence
fn absorb(anchor: &mut Detection, other: &Detection) {
    anchor.bbox = anchor.bbox.union(&other.bbox);
    anchor.confidence = anchor.confidence.max(other.confidence);
}

/// Union-find with path halving and union by size
struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}
