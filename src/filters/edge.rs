//! Sobel edge detection.
//!
//! The image is reduced to BT.601 luma first (same rounding as the grayscale
//! filter). Gradient magnitude `min(255, round(sqrt(gx² + gy²)))` is written
//! to R, G and B. The 1-pixel border has no full neighbourhood and is set to
//! black. Alpha (if present) is preserved everywhere.

use crate::buffer::{alloc_samples, PixelBuffer, COLOR_CHANNELS};
use crate::error::FilterError;

use super::core::for_each_row;
use super::grayscale::luma;

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Apply Sobel edge detection.
pub fn edge_detect(input: &PixelBuffer) -> Result<PixelBuffer, FilterError> {
    let (width, height) = (input.width() as usize, input.height() as usize);
    let channels = input.channels();
    let src = input.samples();

    // Luma plane, one sample per pixel.
    let mut gray = alloc_samples(width * height)?;
    for (g, px) in gray.iter_mut().zip(src.chunks_exact(channels)) {
        *g = luma(px[0], px[1], px[2]);
    }

    let mut output = input.blank_like()?;
    let stride = input.row_stride();
    let gray = &gray;

    for_each_row(&mut output, |y, row| {
        if channels == 4 {
            for x in 0..width {
                row[x * 4 + 3] = src[y * stride + x * 4 + 3];
            }
        }
        if y == 0 || y + 1 >= height || width < 3 {
            return;
        }

        for x in 1..width - 1 {
            let mut gx = 0i32;
            let mut gy = 0i32;
            for ky in 0..3 {
                let line = (y + ky - 1) * width;
                for kx in 0..3 {
                    let lum = gray[line + x + kx - 1] as i32;
                    gx += lum * SOBEL_X[ky][kx];
                    gy += lum * SOBEL_Y[ky][kx];
                }
            }

            let magnitude = ((gx * gx + gy * gy) as f32).sqrt().round().min(255.0) as u8;
            row[x * channels..x * channels + COLOR_CHANNELS].fill(magnitude);
        }
    });

    Ok(output)
}
