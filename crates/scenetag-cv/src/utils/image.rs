//! Image loading through the `image` crate

use crate::Result;
use anyhow::Context;
use image::RgbaImage;
use scenetag_core::PixelBuffer;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Decode any supported format into 8-bit RGBA
    pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;

        Ok(img.to_rgba8())
    }

    /// Borrow an RGBA image as a pipeline buffer
    pub fn as_buffer(image: &RgbaImage) -> PixelBuffer<'_> {
        PixelBuffer::new(image.width(), image.height(), image.as_raw())
    }

    /// Decode image bytes held in memory
    pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
        let img = image::load_from_memory(bytes).context("Failed to decode image bytes")?;
        Ok(img.to_rgba8())
    }
}
