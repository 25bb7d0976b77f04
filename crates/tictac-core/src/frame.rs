use std::time::Duration;

use crate::{GrayImage, GrayImageView};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
}

/// One captured camera frame, converted to 8-bit luma.
///
/// Frames are immutable once built; every pipeline stage borrows them.
#[derive(Clone, Debug)]
pub struct Frame {
    image: GrayImage,
    captured_at: Duration,
}

impl Frame {
    /// Wrap an existing gray image. `captured_at` is relative to the source's epoch.
    pub fn new(image: GrayImage, captured_at: Duration) -> Result<Self, FrameError> {
        check_buffer(image.width, image.height, 1, image.data.len())?;
        Ok(Self { image, captured_at })
    }

    /// Build a frame from a row-major gray buffer.
    pub fn from_gray8(
        width: usize,
        height: usize,
        pixels: &[u8],
        captured_at: Duration,
    ) -> Result<Self, FrameError> {
        check_buffer(width, height, 1, pixels.len())?;
        Ok(Self {
            image: GrayImage {
                width,
                height,
                data: pixels.to_vec(),
            },
            captured_at,
        })
    }

    /// Build a frame from packed RGB8, converting to luma (ITU-R BT.601 weights).
    pub fn from_rgb8(
        width: usize,
        height: usize,
        pixels: &[u8],
        captured_at: Duration,
    ) -> Result<Self, FrameError> {
        check_buffer(width, height, 3, pixels.len())?;
        let data = pixels
            .chunks_exact(3)
            .map(|px| {
                let y = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                ((y + 500) / 1000) as u8
            })
            .collect();
        Ok(Self {
            image: GrayImage {
                width,
                height,
                data,
            },
            captured_at,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.image.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.image.height
    }

    #[inline]
    pub fn captured_at(&self) -> Duration {
        self.captured_at
    }

    #[inline]
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

fn check_buffer(
    width: usize,
    height: usize,
    channels: usize,
    got: usize,
) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::InvalidDimensions { width, height });
    }
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(FrameError::InvalidDimensions { width, height })?;
    if got != expected {
        return Err(FrameError::InvalidBuffer { expected, got });
    }
    Ok(())
}
