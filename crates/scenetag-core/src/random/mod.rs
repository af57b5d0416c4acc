//! Reproducible pseudo-random numbers

pub mod lcg;

pub use lcg::SeededLcg;

/// Frame used for seeding and layout when an image reports a zero dimension
pub const DEFAULT_FRAME: (u32, u32) = (640, 480);

/// Seed derived from the image geometry and a caller supplied variation.
///
/// `hash = width * height * 13 + round(aspect * 100)`, then each variation
/// step moves the seed by 1000.
pub fn frame_seed(width: u32, height: u32, variation: i64) -> i64 {
    let (width, height) = if width == 0 || height == 0 {
        DEFAULT_FRAME
    } else {
        (width, height)
    };

    let aspect = width as f64 / height as f64;
    let area = width as i64 * height as i64;
    let hash = area
        .wrapping_mul(13)
        .wrapping_add((aspect * 100.0).round() as i64);

    hash.wrapping_add(variation.wrapping_mul(1000))
}
