//! Image intake and export.
//!
//! Decoding and encoding go through the `image` crate. The filter core only
//! ever sees a decoded [`PixelBuffer`].

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::buffer::PixelBuffer;
use crate::config::{ExportConfig, ExportFormat};
use crate::controller::DualStreamController;
use crate::error::{ExportError, LoadError};
use crate::stream::Side;

impl From<ExportFormat> for ImageFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::Bmp => ImageFormat::Bmp,
            ExportFormat::Gif => ImageFormat::Gif,
        }
    }
}

/// Decode any supported raster format.
///
/// Sources with an alpha channel become RGBA, everything else RGB.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, LoadError> {
    let image = image::load_from_memory(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
    let (width, height) = (image.width(), image.height());
    let buffer = if image.color().has_alpha() {
        PixelBuffer::from_samples(width, height, 4, image.to_rgba8().into_raw())?
    } else {
        PixelBuffer::from_samples(width, height, 3, image.to_rgb8().into_raw())?
    };
    Ok(buffer)
}

/// Encode `buffer` in `format`. Alpha is dropped for JPEG.
pub fn encode_image(buffer: &PixelBuffer, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let (width, height) = (buffer.width(), buffer.height());
    let invalid = || ExportError::Encode(format!("invalid {}x{} buffer", width, height));

    let image = if buffer.has_alpha() {
        let rgba = RgbaImage::from_raw(width, height, buffer.samples().to_vec()).ok_or_else(invalid)?;
        match format {
            ExportFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()),
            _ => DynamicImage::ImageRgba8(rgba),
        }
    } else {
        DynamicImage::ImageRgb8(
            RgbImage::from_raw(width, height, buffer.samples().to_vec()).ok_or_else(invalid)?,
        )
    };

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format.into())
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// File name for an exported stream: `{base}_{side}_{suffix}.{ext}`, or
/// `{side}_{suffix}.{ext}` without a base name.
pub fn export_file_name(base: Option<&str>, side: Side, export: &ExportConfig) -> String {
    let ext = export.format.extension();
    match base.filter(|b| !b.is_empty()) {
        Some(base) => format!("{}_{}_{}.{}", base, side.label(), export.suffix, ext),
        None => format!("{}_{}.{}", side.label(), export.suffix, ext),
    }
}

impl DualStreamController {
    /// Decode `bytes` and load the result as the new source.
    pub fn load_image(&self, bytes: &[u8]) -> Result<(), LoadError> {
        let buffer = decode_image(bytes)?;
        self.load_buffer(buffer)
    }

    /// Read and load an image file.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.load_image(&bytes)?;
        tracing::info!("Opened image: {}", path.display());
        Ok(())
    }

    /// Encode `side`'s current buffer.
    pub fn export(&self, side: Side, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        self.with_current(side, |buffer| encode_image(buffer, format))
            .ok_or(ExportError::NoImage(side))?
    }

    /// Write `side`'s current buffer into `dir`, returning the path written.
    pub fn save(
        &self,
        side: Side,
        dir: impl AsRef<Path>,
        base: Option<&str>,
        export: &ExportConfig,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.export(side, export.format)?;
        let path = dir.as_ref().join(export_file_name(base, side, export));
        std::fs::write(&path, bytes)?;
        tracing::info!("Saved {} image: {}", side.label(), path.display());
        Ok(path)
    }

    /// Write every non-empty stream into `dir`.
    ///
    /// # Errors
    /// `NothingToSave` if both streams are empty.
    pub fn save_all(
        &self,
        dir: impl AsRef<Path>,
        base: Option<&str>,
        export: &ExportConfig,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let mut written = Vec::new();
        for side in Side::ALL {
            match self.save(side, dir.as_ref(), base, export) {
                Ok(path) => written.push(path),
                Err(ExportError::NoImage(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        if written.is_empty() {
            return Err(ExportError::NothingToSave);
        }
        Ok(written)
    }
}
