//! WebAssembly exports for the filter catalog.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Images cross
//! the boundary as flat RGB or RGBA byte arrays (length =
//! width * height * channels).

use wasm_bindgen::prelude::*;

use crate::buffer::PixelBuffer;
use crate::filters::FilterCatalog;

/// Names of the built-in filters in cycle order.
#[wasm_bindgen]
pub fn filter_names_wasm() -> Vec<String> {
    FilterCatalog::standard()
        .iter()
        .map(|f| f.name.to_string())
        .collect()
}

/// Apply the catalog filter at `index` (wrapping) to a flat image.
///
/// # Arguments
/// * `data` - Flat array of RGB or RGBA bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `channels` - 3 or 4
/// * `index` - Catalog position, taken modulo the catalog length
///
/// # Returns
/// Flat array of the same length with the filtered samples
#[wasm_bindgen]
pub fn apply_filter_wasm(
    data: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    index: usize,
) -> Result<Vec<u8>, JsError> {
    let input = PixelBuffer::from_samples(width, height, channels, data.to_vec())?;
    let output = FilterCatalog::standard().at(index).apply(&input)?;
    Ok(output.into_samples())
}
