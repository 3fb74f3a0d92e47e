//! Box blur.
//!
//! Averages R/G/B independently over a 5x5 window. The window is clipped to
//! the image bounds, so border pixels are averaged over fewer samples and no
//! read ever leaves the image. Alpha is copied from the source pixel.

use crate::buffer::{PixelBuffer, COLOR_CHANNELS};
use crate::error::FilterError;

use super::core::for_each_row;

/// Window half-size: offsets `-2..=2`.
pub const BLUR_RADIUS: usize = 2;

/// Apply the clipped 5x5 box blur.
pub fn box_blur(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    let mut output = input.blank_like()?;
    let (width, height) = (input.width() as usize, input.height() as usize);
    let channels = input.channels();
    let stride = input.row_stride();
    let src = input.samples();

    for_each_row(&mut output, |y, row| {
        let y0 = y.saturating_sub(BLUR_RADIUS);
        let y1 = (y + BLUR_RADIUS).min(height - 1);

        for x in 0..width {
            let x0 = x.saturating_sub(BLUR_RADIUS);
            let x1 = (x + BLUR_RADIUS).min(width - 1);
            let count = ((y1 - y0 + 1) * (x1 - x0 + 1)) as u32;

            let mut sum = [0u32; COLOR_CHANNELS];
            for sy in y0..=y1 {
                let line = &src[sy * stride..(sy + 1) * stride];
                for sx in x0..=x1 {
                    let px = &line[sx * channels..sx * channels + COLOR_CHANNELS];
                    for c in 0..COLOR_CHANNELS {
                        sum[c] += px[c] as u32;
                    }
                }
            }

            let out = &mut row[x * channels..(x + 1) * channels];
            for c in 0..COLOR_CHANNELS {
                out[c] = (sum[c] / count) as u8;
            }
            if channels == 4 {
                out[3] = src[y * stride + x * channels + 3];
            }
        }
    });

    Ok(output)
}
