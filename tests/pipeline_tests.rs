// tests/pipeline_tests.rs
use image::{Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenetag_core::{Category, PixelBuffer};
use scenetag_cv::{
    detection::{DetectionConfig, DetectionPath, DetectionPipeline, DetectionResult, MAX_DETECTIONS},
    features::{EdgeMapBuilder, FeatureGrid},
    segmentation::RegionSegmenter,
    traits::OverlapMerge,
    utils::ImageUtils,
    BoundingBox, Detection, FallbackGenerator, FallbackProfile, MergeStrategy, OverlapResolver, Result,
};
use std::collections::HashSet;

fn noise_image(rng: &mut StdRng, width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, _| Rgba([rng.gen(), rng.gen(), rng.gen(), 255]))
}

/// Flat patches of random color, so segmentation finds real regions
fn patch_image(rng: &mut StdRng, width: u32, height: u32, patch: u32) -> RgbaImage {
    let columns = width.div_ceil(patch);
    let rows = height.div_ceil(patch);
    let colors: Vec<[u8; 3]> = (0..columns * rows).map(|_| [rng.gen(), rng.gen(), rng.gen()]).collect();

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = colors[((y / patch) * columns + x / patch) as usize];
        Rgba([r, g, b, 255])
    })
}

/// Five flat colors in `cell`-pixel squares, no two neighbors alike
fn checkerboard(width: u32, height: u32, cell: u32) -> RgbaImage {
    const COLORS: [[u8; 3]; 5] = [[220, 30, 30], [30, 200, 40], [30, 40, 220], [230, 220, 40], [20, 20, 20]];

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = COLORS[((x / cell + 2 * (y / cell)) % 5) as usize];
        Rgba([r, g, b, 255])
    })
}

fn assert_well_formed(result: &DetectionResult, width: u32, height: u32) {
    let (width, height) = if width == 0 || height == 0 { (640, 480) } else { (width, height) };
    let detections = result.detections.as_slice();

    assert!(!detections.is_empty());
    assert!(detections.len() <= 6);
    assert!(detections.windows(2).all(|w| w[0].confidence >= w[1].confidence));

    for detection in detections {
        assert!([58, -1].contains(&detection.class_id()));
        assert!((0.0..=1.0).contains(&detection.confidence));
        assert!(
            detection.bbox.fits_within(width as f64, height as f64),
            "{:?} outside {}x{}",
            detection.bbox,
            width,
            height
        );
    }
}

#[test]
fn test_random_images_produce_well_formed_output() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5ce7);
    let pipeline = DetectionPipeline::new(DetectionConfig::default().with_debug(true))?;

    for _ in 0..12 {
        let width = rng.gen_range(1..200);
        let height = rng.gen_range(1..200);
        let patch = rng.gen_range(8..64);

        for image in [noise_image(&mut rng, width, height), patch_image(&mut rng, width, height, patch)] {
            let result = pipeline.detect(&ImageUtils::as_buffer(&image));
            assert_well_formed(&result, width, height);
        }
    }
    Ok(())
}

#[test]
fn test_presets_produce_well_formed_output() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(11);
    let image = patch_image(&mut rng, 320, 240, 40);

    for config in [DetectionConfig::fine_grained(), DetectionConfig::coarse()] {
        for strategy in [MergeStrategy::Greedy, MergeStrategy::Connected] {
            let pipeline = DetectionPipeline::new(config.clone().with_strategy(strategy))?;
            assert_well_formed(&pipeline.detect(&ImageUtils::as_buffer(&image)), 320, 240);
        }
    }
    Ok(())
}

#[test]
fn test_many_regions_are_capped() -> Result<()> {
    let image = checkerboard(640, 480, 64);

    for strategy in [MergeStrategy::Greedy, MergeStrategy::Connected] {
        let pipeline = DetectionPipeline::new(DetectionConfig::default().with_strategy(strategy))?;
        let result = pipeline.detect(&ImageUtils::as_buffer(&image));

        assert_eq!(result.path, DetectionPath::Segmentation);
        assert!(result.stats.regions > MAX_DETECTIONS);
        assert_well_formed(&result, 640, 480);
    }

    let mut config = DetectionConfig::default();
    config.max_detections = 3;
    let result = DetectionPipeline::new(config)?.detect(&ImageUtils::as_buffer(&image));
    assert_eq!(result.detections.len(), 3);
    Ok(())
}

#[test]
fn test_configs_breaking_output_limits_are_rejected() {
    let mut config = DetectionConfig::default();
    config.max_detections = 50;
    assert!(DetectionPipeline::new(config).is_err());

    let mut config = DetectionConfig::default();
    config.segmentation.min_region_blocks = 1;
    assert!(DetectionPipeline::new(config).is_err());
}

#[test]
fn test_pipeline_is_deterministic() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(3);
    let image = patch_image(&mut rng, 256, 192, 48);
    let pipeline = DetectionPipeline::new(DetectionConfig::default())?;

    let first = pipeline.detect(&ImageUtils::as_buffer(&image));
    let second = pipeline.detect(&ImageUtils::as_buffer(&image));

    assert_eq!(
        serde_json::to_string(&first.detections)?,
        serde_json::to_string(&second.detections)?
    );
    Ok(())
}

#[test]
fn test_green_rectangle_on_gray_is_tree() -> Result<()> {
    let image = RgbaImage::from_fn(256, 256, |x, y| {
        if (64..192).contains(&x) && (64..192).contains(&y) {
            Rgba([40, 160, 40, 255])
        } else {
            Rgba([128, 128, 128, 255])
        }
    });
    let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
    let result = pipeline.detect(&ImageUtils::as_buffer(&image));
    let rectangle = BoundingBox::new(64.0, 64.0, 128.0, 128.0);

    assert_eq!(result.path, DetectionPath::Segmentation);
    let tree = result
        .detections
        .iter()
        .find(|d| d.bbox.iou(&rectangle) > 0.5)
        .expect("a detection covering the green rectangle");
    assert_eq!(tree.category, Category::Tree);
    assert_eq!(tree.class_id(), 58);
    assert!(tree.confidence >= 0.7);
    Ok(())
}

#[test]
fn test_black_frame_is_mostly_building() -> Result<()> {
    let image = RgbaImage::from_pixel(640, 480, Rgba([0, 0, 0, 255]));
    let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
    let result = pipeline.detect(&ImageUtils::as_buffer(&image));

    let buildings = result.detections.count(Category::Building);
    assert!(buildings > result.detections.len() - buildings);
    assert_well_formed(&result, 640, 480);
    Ok(())
}

#[test]
fn test_uniform_gray_too_small_for_regions_falls_back() -> Result<()> {
    let image = RgbaImage::from_pixel(40, 12, Rgba([128, 128, 128, 255]));
    let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
    let result = pipeline.detect(&ImageUtils::as_buffer(&image));

    assert_eq!(result.path, DetectionPath::SegmentationEmpty);
    assert!(result.path.is_synthetic());
    assert!(result.detections.count(Category::Tree) >= 1);
    assert!(result.detections.count(Category::Building) >= 1);
    assert_well_formed(&result, 40, 12);
    Ok(())
}

#[test]
fn test_malformed_buffers_fall_back() -> Result<()> {
    let pipeline = DetectionPipeline::new(DetectionConfig::default())?;

    let short = vec![255u8; 100];
    let result = pipeline.detect(&PixelBuffer::new(320, 200, &short));
    assert_eq!(result.path, DetectionPath::Fallback);
    assert_well_formed(&result, 320, 200);

    let result = pipeline.detect(&PixelBuffer::new(0, 50, &[]));
    assert_eq!(result.path, DetectionPath::Fallback);
    assert_well_formed(&result, 0, 50);
    Ok(())
}

#[test]
fn test_fallback_is_byte_identical_for_same_seed() -> Result<()> {
    for (width, height, variation) in [(640, 480, 0), (1920, 1080, 7), (300, 1200, -3)] {
        for profile in [FallbackProfile::Segmentation, FallbackProfile::Stable] {
            let a = FallbackGenerator::new(width, height, variation).generate(profile);
            let b = FallbackGenerator::new(width, height, variation).generate(profile);
            assert_eq!(serde_json::to_vec(&a)?, serde_json::to_vec(&b)?);
        }
    }
    Ok(())
}

#[test]
fn test_stable_detection_follows_variation() -> Result<()> {
    let base = DetectionPipeline::new(DetectionConfig::default())?.detect_stable(800, 600);
    let again = DetectionPipeline::new(DetectionConfig::default().with_variation(0))?.detect_stable(800, 600);
    let base = serde_json::to_string(&base.detections)?;
    assert_eq!(base, serde_json::to_string(&again.detections)?);

    let varied: Vec<String> = (1..6)
        .map(|v| -> Result<String> {
            let pipeline = DetectionPipeline::new(DetectionConfig::default().with_variation(v))?;
            Ok(serde_json::to_string(&pipeline.detect_stable(800, 600).detections)?)
        })
        .collect::<Result<_>>()?;
    assert!(varied.iter().any(|layout| *layout != base));
    Ok(())
}

#[test]
fn test_overlapping_boxes_merge_into_union() {
    let resolver = OverlapResolver::new(0.7, MergeStrategy::Greedy);
    let a = Detection::new(Category::Building, 0.8, BoundingBox::new(10.0, 10.0, 100.0, 100.0));
    let b = Detection::new(Category::Building, 0.9, BoundingBox::new(20.0, 15.0, 100.0, 100.0));
    let c = Detection::new(Category::Building, 0.7, BoundingBox::new(300.0, 10.0, 50.0, 50.0));
    assert!(a.bbox.overlap_ratio(&b.bbox) > 0.7);

    let merged = resolver.merge_overlaps(vec![a.clone(), b.clone(), c]);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].bbox, a.bbox.union(&b.bbox));
    assert_eq!(merged[0].confidence, 0.9);
}

#[test]
fn test_segmentation_visits_each_block_once() {
    let mut rng = StdRng::seed_from_u64(99);
    let image = patch_image(&mut rng, 300, 220, 37);
    let buffer = ImageUtils::as_buffer(&image);

    let grid = FeatureGrid::build(&buffer, 16);
    let edges = EdgeMapBuilder::build(&grid);
    let config = DetectionConfig::default();
    let segmentation = RegionSegmenter::new(&config.segmentation).segment(&grid, &edges);

    assert_eq!(segmentation.cells_visited, grid.len());

    let mut seen = HashSet::new();
    for region in &segmentation.regions {
        assert!(region.len() >= 4);
        for cell in region.cells() {
            assert!(seen.insert(*cell), "block {:?} in two regions", cell);
        }
    }
}

#[test]
fn test_json_wire_format() -> Result<()> {
    let image = RgbaImage::from_pixel(128, 96, Rgba([90, 90, 90, 255]));
    let pipeline = DetectionPipeline::new(DetectionConfig::default().with_debug(true))?;
    let result = pipeline.detect(&ImageUtils::as_buffer(&image));

    let value = serde_json::to_value(&result.detections)?;
    let first = &value[0];
    assert!(first["class"].is_i64());
    assert!(first["className"].is_string());
    assert!(first["bbox"]["width"].is_f64());
    assert!(first["debug"]["greenRatio"].is_f64());
    Ok(())
}
