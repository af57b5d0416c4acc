//! Optional inference collaborator
//!
//! A trained detector can be plugged in through [`ModelLoader`] and
//! [`InferenceBackend`]. Load state lives in an explicit [`ModelState`] owned
//! by the caller, so nothing about model availability is global and the
//! heuristic pipeline works the same with no backend at all.

use crate::bbox::{BoundingBox, Detection, DetectionSet};
use crate::detection::config::ModelConfig;
use crate::traits::{InferenceBackend, ModelLoader};
use scenetag_core::Category;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Raw backend class ids treated as vegetation
pub const TREE_CLASS_IDS: [i32; 3] = [18, 58, 64];
/// Raw backend class ids treated as built structures
pub const BUILDING_CLASS_IDS: [i32; 2] = [11, 13];

/// One prediction as reported by a backend, before category mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub class_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub score: f64,
    pub bbox: BoundingBox,
}

impl RawPrediction {
    pub fn new(class_id: i32, score: f64, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            label: None,
            score,
            bbox,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Map the raw class onto a supported category.
    ///
    /// Known backend ids win; otherwise the wire ids and then the free-form
    /// label are tried. Anything else is unsupported.
    pub fn category(&self) -> Option<Category> {
        if TREE_CLASS_IDS.contains(&self.class_id) {
            return Some(Category::Tree);
        }
        if BUILDING_CLASS_IDS.contains(&self.class_id) {
            return Some(Category::Building);
        }

        Category::from_class_id(self.class_id)
            .or_else(|| self.label.as_deref().and_then(Category::from_label))
    }
}

/// Turn backend predictions into clipped, de-duplicated detections.
///
/// Drops low scores and unsupported classes, clips boxes to the frame and
/// applies class-aware NMS. The result is sorted but not capped.
pub fn map_predictions(
    predictions: Vec<RawPrediction>,
    config: &ModelConfig,
    width: u32,
    height: u32,
) -> DetectionSet {
    predictions
        .into_iter()
        .filter(|prediction| prediction.score >= config.confidence_threshold)
        .filter_map(|prediction| {
            let category = prediction.category()?;
            let bbox = prediction.bbox.clamp_to(width as f64, height as f64);
            (bbox.area() > 0.0).then(|| Detection::new(category, prediction.score, bbox))
        })
        .collect::<DetectionSet>()
        .apply_class_nms(config.iou_threshold)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// No load attempted yet
    Unloaded,
    /// A backend is loaded and used for inference
    Ready,
    /// Loading failed for good; heuristics only
    Simulation,
}

/// Load state of the inference collaborator for one caller
pub struct ModelState {
    status: ModelStatus,
    retries: u32,
    max_retries: u32,
    last_error: Option<String>,
    backend: Option<Box<dyn InferenceBackend>>,
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("status", &self.status)
            .field("retries", &self.retries)
            .field("max_retries", &self.max_retries)
            .field("last_error", &self.last_error)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::new(ModelConfig::default().max_load_retries)
    }
}

impl ModelState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            status: ModelStatus::Unloaded,
            retries: 0,
            max_retries,
            last_error: None,
            backend: None,
        }
    }

    /// State that never tries to load a model
    pub fn simulation() -> Self {
        Self {
            status: ModelStatus::Simulation,
            ..Self::new(0)
        }
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_simulation(&self) -> bool {
        self.status == ModelStatus::Simulation
    }

    /// Load the backend on first use.
    ///
    /// A failed load is retried up to `max_retries` more times, after which
    /// the state switches to simulation mode for good.
    pub fn ensure_loaded(&mut self, loader: &dyn ModelLoader) -> Option<&dyn InferenceBackend> {
        if self.status == ModelStatus::Unloaded {
            self.load_with_retries(loader);
        }

        match self.status {
            ModelStatus::Ready => self.backend.as_deref(),
            _ => None,
        }
    }

    fn load_with_retries(&mut self, loader: &dyn ModelLoader) {
        loop {
            match loader.load() {
                Ok(backend) => {
                    info!(backend = backend.name(), retries = self.retries, "inference backend loaded");
                    self.backend = Some(backend);
                    self.status = ModelStatus::Ready;
                    return;
                }
                Err(err) => {
                    self.last_error = Some(format!("{err:#}"));

                    if self.retries >= self.max_retries {
                        warn!(error = %err, "giving up on inference backend, using heuristics");
                        self.status = ModelStatus::Simulation;
                        return;
                    }

                    self.retries += 1;
                    warn!(
                        error = %err,
                        attempt = self.retries,
                        max = self.max_retries,
                        "inference backend failed to load, retrying"
                    );
                }
            }
        }
    }

    /// Record an inference failure without changing the load status
    pub fn record_error(&mut self, err: &impl std::fmt::Display) {
        self.last_error = Some(err.to_string());
    }
}
