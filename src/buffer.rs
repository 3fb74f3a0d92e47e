//! Pixel buffer shared by every filter.
//!
//! ## Layout
//!
//! Samples are stored row-major in one flat `Vec<u8>`:
//!
//! | Format | Channels | Pixel layout |
//! |--------|----------|--------------|
//! | RGB8   | 3        | `r g b`      |
//! | RGBA8  | 4        | `r g b a`    |
//!
//! The sample of pixel `(x, y)` channel `c` lives at
//! `y * row_stride + x * channels + c`, with `row_stride = width * channels`.
//! Kernels index the slice directly instead of going through per-pixel
//! accessors.
//!
//! Buffers convert to and from `(height, width, channels)` ndarray arrays for
//! the numpy and wasm bindings.

use ndarray::{Array3, ArrayView3};

use crate::error::FilterError;

/// Number of colour channels every filter recomputes. Channel 3, if present,
/// is alpha and is passed through.
pub const COLOR_CHANNELS: usize = 3;

/// A width x height grid of RGB or RGBA `u8` samples.
///
/// Dimensions are fixed at construction. Filters never mutate their input:
/// they allocate a new buffer or transform a private copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: usize,
    samples: Vec<u8>,
}

/// Reserve a zeroed sample vector, reporting allocation failure instead of
/// aborting.
pub(crate) fn alloc_samples(len: usize) -> Result<Vec<u8>, FilterError> {
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(len)
        .map_err(|_| FilterError::Allocation { bytes: len })?;
    samples.resize(len, 0);
    Ok(samples)
}

fn sample_len(width: u32, height: u32, channels: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)
}

impl PixelBuffer {
    /// Wrap an existing sample vector.
    ///
    /// # Errors
    /// `InvalidChannels` unless `channels` is 3 or 4, `InvalidDimensions` if
    /// `samples.len() != width * height * channels`.
    pub fn from_samples(
        width: u32,
        height: u32,
        channels: usize,
        samples: Vec<u8>,
    ) -> Result<Self, FilterError> {
        if channels != 3 && channels != 4 {
            return Err(FilterError::InvalidChannels(channels));
        }
        if sample_len(width, height, channels) != Some(samples.len()) {
            return Err(FilterError::InvalidDimensions {
                width,
                height,
                channels,
                len: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    /// Allocate a zeroed (black, transparent) buffer.
    pub fn new(width: u32, height: u32, channels: usize) -> Result<Self, FilterError> {
        if channels != 3 && channels != 4 {
            return Err(FilterError::InvalidChannels(channels));
        }
        let len = sample_len(width, height, channels).ok_or(FilterError::InvalidDimensions {
            width,
            height,
            channels,
            len: usize::MAX,
        })?;
        Self::from_samples(width, height, channels, alloc_samples(len)?)
    }

    /// Allocate a buffer with every pixel set to `pixel`.
    ///
    /// `pixel.len()` decides the channel count.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Result<Self, FilterError> {
        let mut buffer = Self::new(width, height, pixel.len())?;
        for chunk in buffer.samples.chunks_exact_mut(pixel.len()) {
            chunk.copy_from_slice(pixel);
        }
        Ok(buffer)
    }

    /// Copy a `(height, width, channels)` array into a buffer.
    pub fn from_array(input: ArrayView3<u8>) -> Result<Self, FilterError> {
        let (height, width, channels) = input.dim();
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(input.len())
            .map_err(|_| FilterError::Allocation { bytes: input.len() })?;
        // Logical iteration order is row-major regardless of memory layout.
        samples.extend(input.iter().copied());
        Self::from_samples(width as u32, height as u32, channels, samples)
    }

    /// Convert into a `(height, width, channels)` array without copying.
    pub fn into_array(self) -> Result<Array3<u8>, FilterError> {
        let shape = (self.height as usize, self.width as usize, self.channels);
        Ok(Array3::from_shape_vec(shape, self.samples)?)
    }

    /// Fallible deep copy.
    pub fn try_clone(&self) -> Result<Self, FilterError> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(self.samples.len())
            .map_err(|_| FilterError::Allocation {
                bytes: self.samples.len(),
            })?;
        samples.extend_from_slice(&self.samples);
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            samples,
        })
    }

    /// Allocate a zeroed buffer with the same dimensions and channel count.
    pub fn blank_like(&self) -> Result<Self, FilterError> {
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: self.channels,
            samples: alloc_samples(self.samples.len())?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Number of samples in one row.
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.channels
    }

    /// Offset of the first sample of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        y * self.row_stride() + x * self.channels
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    /// Samples of pixel `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = self.offset(x as usize, y as usize);
        Some(&self.samples[start..start + self.channels])
    }

    /// Overwrite pixel `(x, y)`. Extra samples in `value` are ignored;
    /// out-of-bounds writes do nothing.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: &[u8]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let start = self.offset(x as usize, y as usize);
        let n = self.channels.min(value.len());
        self.samples[start..start + n].copy_from_slice(&value[..n]);
    }
}
