//! Per-block feature extraction
//!
//! A block is summarized by its mean color, color variance, an intrinsic edge
//! strength, and the share of pixels that read as green (vegetation), neutral
//! gray (masonry, concrete, asphalt) or blue (sky, glass).

use scenetag_core::PixelBuffer;
use serde::Serialize;

/// Channel depth used to normalize color and edge values into `[0, 1]`
const CHANNEL_MAX: f64 = 255.0;

/// Statistics of one grid cell. Built once per analysis and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BlockFeature {
    pub mean_r: f64,
    pub mean_g: f64,
    pub mean_b: f64,
    /// Mean per-channel variance around the block means
    pub variance: f64,
    /// Finite-difference edge strength in `[0, 1]`
    pub edge_strength: f64,
    pub green_ratio: f64,
    pub gray_ratio: f64,
    pub blue_ratio: f64,
    pub greenness: f64,
    pub grayness: f64,
    pub blueness: f64,
    pub pixel_count: usize,
}

impl BlockFeature {
    /// Mean absolute per-channel difference of the block means, in `[0, 1]`
    pub fn color_distance(&self, other: &BlockFeature) -> f64 {
        ((self.mean_r - other.mean_r).abs()
            + (self.mean_g - other.mean_g).abs()
            + (self.mean_b - other.mean_b).abs())
            / (CHANNEL_MAX * 3.0)
    }

    /// No pixel contributed to this block
    pub fn is_empty(&self) -> bool {
        self.pixel_count == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelClass {
    Green,
    Gray,
    Blue,
    Other,
}

/// First matching test wins: green, then gray, then blue.
fn classify_pixel(r: f64, g: f64, b: f64) -> PixelClass {
    if g > r * 1.15 && g > b * 1.15 {
        PixelClass::Green
    } else if r.max(g).max(b) - r.min(g).min(b) < 30.0 {
        PixelClass::Gray
    } else if b > r * 1.2 && b > g * 1.1 {
        PixelClass::Blue
    } else {
        PixelClass::Other
    }
}

fn channel_gap(r: u8, g: u8, b: u8, other: [u8; 4]) -> f64 {
    (r.abs_diff(other[0]) as f64) + (g.abs_diff(other[1]) as f64) + (b.abs_diff(other[2]) as f64)
}

/// Computes [`BlockFeature`]s over a square block grid
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    block_size: u32,
}

impl FeatureExtractor {
    pub fn new(block_size: u32) -> Self {
        Self { block_size }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Extract the block whose top-left pixel is `(origin_x, origin_y)`
    pub fn extract(&self, buffer: &PixelBuffer<'_>, origin_x: u32, origin_y: u32) -> BlockFeature {
        self.extract_region(buffer, origin_x, origin_y, self.block_size, self.block_size)
    }

    /// Extract an arbitrary rectangle, clamped to the image bounds.
    ///
    /// Pixels that fall past the end of a short buffer are skipped, so a
    /// block with nothing readable yields the all-zero feature.
    pub fn extract_region(
        &self,
        buffer: &PixelBuffer<'_>,
        origin_x: u32,
        origin_y: u32,
        width: u32,
        height: u32,
    ) -> BlockFeature {
        let end_x = origin_x.saturating_add(width).min(buffer.width());
        let end_y = origin_y.saturating_add(height).min(buffer.height());

        let mut sum = [0u64; 3];
        let mut green = 0usize;
        let mut gray = 0usize;
        let mut blue = 0usize;
        let mut pixel_count = 0usize;

        for y in origin_y..end_y {
            for x in origin_x..end_x {
                let Some([r, g, b, _]) = buffer.pixel(x, y) else {
                    continue;
                };

                sum[0] += r as u64;
                sum[1] += g as u64;
                sum[2] += b as u64;

                match classify_pixel(r as f64, g as f64, b as f64) {
                    PixelClass::Green => green += 1,
                    PixelClass::Gray => gray += 1,
                    PixelClass::Blue => blue += 1,
                    PixelClass::Other => {}
                }

                pixel_count += 1;
            }
        }

        if pixel_count == 0 {
            return BlockFeature::default();
        }

        let count = pixel_count as f64;
        let mean_r = sum[0] as f64 / count;
        let mean_g = sum[1] as f64 / count;
        let mean_b = sum[2] as f64 / count;

        // Second pass: spread around the means, plus right/down differences
        let mut squared = 0.0;
        let mut edges = 0.0;

        for y in origin_y..end_y {
            for x in origin_x..end_x {
                let Some([r, g, b, _]) = buffer.pixel(x, y) else {
                    continue;
                };

                squared += (r as f64 - mean_r).powi(2)
                    + (g as f64 - mean_g).powi(2)
                    + (b as f64 - mean_b).powi(2);

                if x + 1 < end_x && y + 1 < end_y {
                    if let (Some(right), Some(below)) = (buffer.pixel(x + 1, y), buffer.pixel(x, y + 1)) {
                        let horizontal = channel_gap(r, g, b, right);
                        let vertical = channel_gap(r, g, b, below);
                        edges += (horizontal + vertical) / 2.0;
                    }
                }
            }
        }

        let greenness = if mean_g > mean_r * 1.15 && mean_g > mean_b * 1.15 {
            (mean_g - mean_r.max(mean_b)) / CHANNEL_MAX
        } else {
            0.0
        };

        let deviation = (mean_r - mean_g)
            .abs()
            .max((mean_r - mean_b).abs())
            .max((mean_g - mean_b).abs());
        let grayness = 1.0 - deviation / CHANNEL_MAX;

        let blueness = if mean_b > mean_r * 1.1 && mean_b > mean_g * 1.05 {
            (mean_b - mean_r.max(mean_g)) / CHANNEL_MAX
        } else {
            0.0
        };

        BlockFeature {
            mean_r,
            mean_g,
            mean_b,
            variance: squared / (3.0 * count),
            edge_strength: edges / (count * CHANNEL_MAX * 3.0),
            green_ratio: green as f64 / count,
            gray_ratio: gray as f64 / count,
            blue_ratio: blue as f64 / count,
            greenness,
            grayness,
            blueness,
            pixel_count,
        }
    }
}
