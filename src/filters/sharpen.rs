//! Sharpen filter.
//!
//! Convolves the colour channels with the 3x3 kernel
//!
//! ```text
//!  0 -1  0
//! -1  5 -1
//!  0 -1  0
//! ```
//!
//! on interior pixels only. The 1-pixel border is copied through from the
//! source unchanged, and so is alpha everywhere.

use crate::buffer::{PixelBuffer, COLOR_CHANNELS};
use crate::error::FilterError;

use super::core::{clamp_u8, for_each_row};

/// Apply the 3x3 sharpen kernel.
pub fn sharpen(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    // Starting from a copy gives the border (and alpha) for free.
    let mut output = input.try_clone()?;
    let (width, height) = (input.width() as usize, input.height() as usize);
    if width < 3 || height < 3 {
        return Ok(output);
    }

    let channels = input.channels();
    let stride = input.row_stride();
    let src = input.samples();

    for_each_row(&mut output, |y, row| {
        if y == 0 || y == height - 1 {
            return;
        }
        for x in 1..width - 1 {
            let center = y * stride + x * channels;
            for c in 0..COLOR_CHANNELS {
                let i = center + c;
                let v = 5 * src[i] as i32
                    - src[i - channels] as i32
                    - src[i + channels] as i32
                    - src[i - stride] as i32
                    - src[i + stride] as i32;
                row[x * channels + c] = clamp_u8(v);
            }
        }
    });

    Ok(output)
}
