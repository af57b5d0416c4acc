//! Image analysis report using scenetag-cv

use anyhow::Context;
use scenetag_cv::{
    detection::{DetectionConfig, DetectionPipeline, DetectionResult},
    utils::ImageUtils,
    Result, SceneSummary,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything printed for one image
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    pub scene: SceneSummary,
    #[serde(flatten)]
    pub result: DetectionResult,
}

/// Load `path` and run the pipeline, or only the stable layout when
/// `stable` is set
pub fn analyze_file(path: &Path, config: DetectionConfig, stable: bool) -> Result<Report> {
    let pipeline = DetectionPipeline::new(config)?;
    let image = ImageUtils::load_rgba(path)?;
    let (width, height) = image.dimensions();

    let result = if stable {
        pipeline.detect_stable(width, height)
    } else {
        pipeline.detect(&ImageUtils::as_buffer(&image))
    };

    Ok(Report {
        image: path.to_path_buf(),
        width,
        height,
        scene: result.scene(),
        result,
    })
}

impl Report {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    pub fn print(&self) {
        println!("{} ({}x{})", self.image.display(), self.width, self.height);
        println!("  path: {:?}", self.result.path);

        for detection in &self.result.detections {
            let bbox = &detection.bbox;
            println!(
                "  {:<8} {:.2}  x={:.0} y={:.0} w={:.0} h={:.0}",
                detection.class_name(),
                detection.confidence,
                bbox.x,
                bbox.y,
                bbox.width,
                bbox.height
            );
            if let Some(debug) = &detection.debug {
                println!(
                    "           green={:.2} gray={:.2}",
                    debug.green_ratio, debug.gray_ratio
                );
            }
        }

        println!(
            "  scene: {} ({}%), {} trees, {} buildings",
            self.scene.kind, self.scene.probability, self.scene.trees, self.scene.buildings
        );
        println!(
            "  regions: {}, avg confidence: {:.3}, time: {}ms",
            self.result.stats.regions,
            self.result.stats.avg_confidence,
            self.result.stats.processing_time_ms
        );
    }
}
