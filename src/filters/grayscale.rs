//! Grayscale conversion filter.
//!
//! Uses ITU-R BT.601 luma coefficients, rounded to the nearest integer.
//! Output keeps the input's channel count with R=G=B=luma and alpha preserved.

use crate::buffer::PixelBuffer;
use crate::error::FilterError;

use super::core::map_color;

/// ITU-R BT.601 luma coefficients
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Rounded BT.601 luma of one pixel.
///
/// The weights sum to 1, so the result is always within `0..=255`.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32).round() as u8
}

/// Convert an RGB or RGBA buffer to grayscale.
pub fn grayscale(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    map_color(input, |px| {
        let gray = luma(px[0], px[1], px[2]);
        px.fill(gray);
    })
}
