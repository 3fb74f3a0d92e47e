//! Colour adjustment filters: Sepia, Invert, Brightness, Contrast.
//!
//! These are pixel-wise operations that don't require spatial context. Each
//! one transforms a private copy of the input. Alpha (if present) is always
//! preserved unchanged.

use crate::buffer::PixelBuffer;
use crate::error::FilterError;

use super::core::{clamp_trunc_u8, map_color};

/// Additive offset applied by [`brightness`].
pub const BRIGHTNESS_OFFSET: u8 = 50;

/// Gain applied around mid-gray by [`contrast`].
pub const CONTRAST_FACTOR: f32 = 1.5;

const CONTRAST_PIVOT: f32 = 128.0;

// ============================================================================
// Sepia
// ============================================================================

/// Warm vintage tone.
///
/// Each output channel is a weighted sum of the input RGB, capped at 255 with
/// the fraction truncated.
pub fn sepia(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    map_color(input, |px| {
        let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
        px[0] = clamp_trunc_u8(0.393 * r + 0.769 * g + 0.189 * b);
        px[1] = clamp_trunc_u8(0.349 * r + 0.686 * g + 0.168 * b);
        px[2] = clamp_trunc_u8(0.272 * r + 0.534 * g + 0.131 * b);
    })
}

// ============================================================================
// Invert
// ============================================================================

/// Negative: `255 - v` per colour channel.
pub fn invert(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    map_color(input, |px| px.iter_mut().for_each(|v| *v = 255 - *v))
}

// ============================================================================
// Brightness
// ============================================================================

/// Add [`BRIGHTNESS_OFFSET`] to every colour channel, saturating at 255.
pub fn brightness(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    map_color(input, |px| {
        px.iter_mut()
            .for_each(|v| *v = v.saturating_add(BRIGHTNESS_OFFSET))
    })
}

// ============================================================================
// Contrast
// ============================================================================

/// Stretch each colour channel away from 128 by [`CONTRAST_FACTOR`].
pub fn contrast(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    map_color(input, |px| {
        px.iter_mut().for_each(|v| {
            *v = clamp_trunc_u8((*v as f32 - CONTRAST_PIVOT) * CONTRAST_FACTOR + CONTRAST_PIVOT)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, channels: usize) -> PixelBuffer {
        let mut img = PixelBuffer::new(width, height, channels).unwrap();
        for (i, v) in img.samples_mut().iter_mut().enumerate() {
            *v = (i * 29 % 256) as u8;
        }
        img
    }

    #[test]
    fn test_sepia_known_pixel() {
        let img = PixelBuffer::filled(1, 1, &[100, 50, 20]).unwrap();
        let result = sepia(&img).unwrap();
        // 39.3 + 38.45 + 3.78 = 81.53, 34.9 + 34.3 + 3.36 = 72.56, 27.2 + 26.7 + 2.62 = 56.52
        assert_eq!(result.pixel(0, 0).unwrap(), &[81, 72, 56]);
    }

    #[test]
    fn test_sepia_caps_at_255() {
        let img = PixelBuffer::filled(1, 1, &[255, 255, 255, 9]).unwrap();
        let result = sepia(&img).unwrap();
        // 0.272 + 0.534 + 0.131 = 0.937 -> 238.9
        assert_eq!(result.pixel(0, 0).unwrap(), &[255, 255, 238, 9]);
    }

    #[test]
    fn test_invert_is_an_involution() {
        let img = gradient(9, 4, 4);
        let twice = invert(&invert(&img).unwrap()).unwrap();
        assert_eq!(twice, img);
    }

    #[test]
    fn test_invert_rgba_keeps_alpha() {
        let img = PixelBuffer::filled(1, 1, &[0, 100, 255, 42]).unwrap();
        assert_eq!(invert(&img).unwrap().pixel(0, 0).unwrap(), &[255, 155, 0, 42]);
    }

    #[test]
    fn test_white_brightness_and_invert() {
        let white = PixelBuffer::filled(4, 4, &[255, 255, 255]).unwrap();
        assert!(brightness(&white).unwrap().samples().iter().all(|&v| v == 255));
        assert!(invert(&white).unwrap().samples().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_brightness_offset() {
        let img = PixelBuffer::filled(1, 1, &[0, 205, 206, 3]).unwrap();
        assert_eq!(brightness(&img).unwrap().pixel(0, 0).unwrap(), &[50, 255, 255, 3]);
    }

    #[test]
    fn test_contrast_pivot_and_clamp() {
        let img = PixelBuffer::filled(1, 1, &[128, 0, 255]).unwrap();
        // (0-128)*1.5+128 = -64 -> 0, (255-128)*1.5+128 = 318.5 -> 255
        assert_eq!(contrast(&img).unwrap().pixel(0, 0).unwrap(), &[128, 0, 255]);

        let img = PixelBuffer::filled(1, 1, &[100, 150, 129]).unwrap();
        // 86, 161, 129.5 -> 129
        assert_eq!(contrast(&img).unwrap().pixel(0, 0).unwrap(), &[86, 161, 129]);
    }

    #[test]
    fn test_pointwise_filters_keep_dimensions() {
        let img = gradient(5, 3, 3);
        for f in [sepia, invert, brightness, contrast] {
            let out = f(&img).unwrap();
            assert_eq!((out.width(), out.height(), out.channels()), (5, 3, 3));
        }
    }
}
