//! Core utilities shared by the filters.
//!
//! - Point-wise mapping over the colour samples of a private copy
//! - Row-parallel iteration for neighbourhood kernels
//! - Clamping helpers

use rayon::prelude::*;

use crate::buffer::{PixelBuffer, COLOR_CHANNELS};
use crate::error::FilterError;

/// Clamp an intermediate value into the `u8` sample range.
#[inline]
pub fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Clamp a float into `0..=255` and truncate the fraction.
#[inline]
pub fn clamp_trunc_u8(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Copy `input` and apply `op` to every pixel of the copy in parallel.
///
/// `op` receives the three colour samples of a pixel; alpha (if present) is
/// never handed out and so stays as it was.
pub fn map_color<F>(input: &PixelBuffer, op: F) -> Result<PixelBuffer, FilterError>
where
    F: Fn(&mut [u8]) + Sync + Send,
{
    let mut output = input.try_clone()?;
    let channels = output.channels();
    output
        .samples_mut()
        .par_chunks_exact_mut(channels)
        .for_each(|pixel| op(&mut pixel[..COLOR_CHANNELS]));
    Ok(output)
}

/// Fill `output` row by row in parallel.
///
/// `op(y, row)` receives the row index and the mutable samples of that row.
/// Empty images are left untouched.
pub fn for_each_row<F>(output: &mut PixelBuffer, op: F)
where
    F: Fn(usize, &mut [u8]) + Sync + Send,
{
    let stride = output.row_stride();
    if stride == 0 || output.height() == 0 {
        return;
    }
    output
        .samples_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| op(y, row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_color_skips_alpha() {
        let input = PixelBuffer::filled(2, 2, &[1, 2, 3, 77]).unwrap();
        let out = map_color(&input, |px| px.iter_mut().for_each(|v| *v = 0)).unwrap();
        assert!(out.samples().chunks(4).all(|p| p == [0, 0, 0, 77]));
        // input untouched
        assert!(input.samples().chunks(4).all(|p| p == [1, 2, 3, 77]));
    }

    #[test]
    fn test_for_each_row_visits_every_row() {
        let mut buf = PixelBuffer::new(3, 5, 3).unwrap();
        for_each_row(&mut buf, |y, row| row.iter_mut().for_each(|v| *v = y as u8));
        for y in 0..5 {
            assert_eq!(buf.pixel(2, y).unwrap(), &[y as u8; 3]);
        }
    }

    #[test]
    fn test_for_each_row_handles_empty() {
        let mut buf = PixelBuffer::new(0, 4, 3).unwrap();
        for_each_row(&mut buf, |_, _| panic!("no rows expected"));
    }

    #[test]
    fn test_clamp_helpers() {
        assert_eq!(clamp_u8(-5), 0);
        assert_eq!(clamp_u8(300), 255);
        assert_eq!(clamp_trunc_u8(254.9), 254);
        assert_eq!(clamp_trunc_u8(-1.0), 0);
    }
}
