//! Filter modules for the catalog.
//!
//! ## Supported Formats
//!
//! | Format | Channels | Type | Description |
//! |--------|----------|------|-------------|
//! | RGB8   | 3 | u8 | Red, green, blue, 0-255 |
//! | RGBA8  | 4 | u8 | RGB + alpha, 0-255 |
//!
//! ## Architecture
//!
//! All filters follow these principles:
//! - **Pure** - Input is read-only, output is a new buffer of the same size
//! - **Alpha preservation** - Alpha channel (if present) is always copied through
//! - **Fallible allocation** - Output allocation failure returns `FilterError::Allocation`
//! - **Parallel** - Rows or pixels are processed with rayon
//!
//! ## Filter Categories
//!
//! - **Pixel-wise**: grayscale, sepia, invert, brightness, contrast
//! - **Neighbourhood**: box blur (clipped window), sharpen (border copied),
//!   edge detection (border black)

pub mod catalog;
pub mod core;

pub mod blur;
pub mod color_adjust;
pub mod edge;
pub mod grayscale;
pub mod sharpen;

pub use catalog::{FilterCatalog, FilterDescriptor, Transform};
