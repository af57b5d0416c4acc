//! Borrowed RGBA8 pixel buffer

use thiserror::Error;

/// Reasons a pixel buffer cannot be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("image has zero size ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, {expected} expected")]
    BufferTooShort { expected: usize, actual: usize },
    #[error("image dimensions {width}x{height} overflow the address space")]
    DimensionOverflow { width: u32, height: u32 },
}

/// Read-only view over a `width × height` grid of RGBA samples.
///
/// The caller owns the bytes; the view only lives for one analysis call.
/// Construction never fails so that a malformed buffer can still be handed to
/// the pipeline, which checks it with [`PixelBuffer::validate`].
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    pub const CHANNELS: usize = 4;

    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Self {
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Width over height, `None` for a degenerate frame
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }

    /// Number of bytes the dimensions imply
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(Self::CHANNELS)
    }

    /// Check the dimensions and the byte count against each other
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }

        let expected = self.expected_len().ok_or(RasterError::DimensionOverflow {
            width: self.width,
            height: self.height,
        })?;

        if self.data.len() < expected {
            return Err(RasterError::BufferTooShort {
                expected,
                actual: self.data.len(),
            });
        }

        Ok(())
    }

    /// RGBA sample at `(x, y)`; `None` outside the frame or past the end of
    /// a short buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        let bytes = self.data.get(index..index + Self::CHANNELS)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}
