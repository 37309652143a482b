//! Floating-point RGB image buffer used throughout the resampling engine.

use crate::resample::ResampleError;

/// Number of interleaved color channels in every [`FloatImage`].
pub const CHANNELS: usize = 3;

/// An RGB image with real-valued samples.
///
/// Samples are stored row-major and channel-interleaved:
/// the sample for pixel `(x, y)` and channel `c` lives at
/// `(y * width + x) * 3 + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Interleaved RGB samples. Length is `width * height * 3`.
    pub samples: Vec<f32>,
}

impl FloatImage {
    /// Create a new FloatImage with the given dimensions and sample data.
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::InvalidDimensions` if either dimension is zero and
    /// `ResampleError::InvalidPixelData` if `samples` does not hold exactly
    /// `width * height * 3` values.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, ResampleError> {
        let expected = sample_count(width, height)?;
        if samples.len() != expected {
            return Err(ResampleError::InvalidPixelData {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Create an image where every sample equals `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self, ResampleError> {
        let len = sample_count(width, height)?;
        Ok(Self {
            width,
            height,
            samples: vec![value; len],
        })
    }

    /// Create an image from single-channel data by broadcasting each value
    /// to all three channels.
    pub fn from_luma(width: u32, height: u32, luma: &[f32]) -> Result<Self, ResampleError> {
        let expected = sample_count(width, height)? / CHANNELS;
        if luma.len() != expected {
            return Err(ResampleError::InvalidPixelData {
                expected,
                actual: luma.len(),
            });
        }
        let samples = luma.iter().flat_map(|&v| [v; CHANNELS]).collect();
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Get the pixel at `(x, y)` as an RGB triple.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [f32; CHANNELS] {
        let idx = self.index(x, y);
        [
            self.samples[idx],
            self.samples[idx + 1],
            self.samples[idx + 2],
        ]
    }

    /// Overwrite the pixel at `(x, y)`.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [f32; CHANNELS]) {
        let idx = self.index(x, y);
        self.samples[idx..idx + CHANNELS].copy_from_slice(&value);
    }

    /// Check that the sample buffer matches the declared dimensions.
    pub fn validate(&self) -> Result<(), ResampleError> {
        let expected = sample_count(self.width, self.height)?;
        if self.samples.len() != expected {
            return Err(ResampleError::InvalidPixelData {
                expected,
                actual: self.samples.len(),
            });
        }
        Ok(())
    }

    /// Return the transposed image: pixel `(x, y)` of the result is pixel
    /// `(y, x)` of `self`.
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::Allocation` if the new buffer cannot be allocated.
    pub fn transposed(&self) -> Result<Self, ResampleError> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut samples = try_zeroed(self.samples.len())?;
        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * CHANNELS;
                let dst = (x * h + y) * CHANNELS;
                samples[dst..dst + CHANNELS].copy_from_slice(&self.samples[src..src + CHANNELS]);
            }
        }
        Ok(Self {
            width: self.height,
            height: self.width,
            samples,
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

/// Number of samples in a `width x height` RGB image, rejecting empty and
/// overflowing sizes.
pub(crate) fn sample_count(width: u32, height: u32) -> Result<usize, ResampleError> {
    if width == 0 || height == 0 {
        return Err(ResampleError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(ResampleError::InvalidDimensions { width, height })
}

/// Allocate `len` zeroed samples, reporting failure instead of aborting.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f32>, ResampleError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ResampleError::Allocation(len))?;
    buf.resize(len, 0.0);
    Ok(buf)
}
