//! Error types shared across the crate.

use thiserror::Error;

use crate::stream::Side;

/// Failures raised while building buffers or running a transform.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to allocate {bytes} bytes for the output buffer")]
    Allocation { bytes: usize },
    #[error("invalid dimensions {width}x{height}x{channels} for {len} samples")]
    InvalidDimensions {
        width: u32,
        height: u32,
        channels: usize,
        len: usize,
    },
    #[error("unsupported channel count {0} (expected 3 or 4)")]
    InvalidChannels(usize),
    #[error("filter catalog must contain at least one filter")]
    EmptyCatalog,
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Failures while bringing a new source image into the controller.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Buffer(#[from] FilterError),
}

/// Failures surfaced by a step on one of the streams.
///
/// A step requested while the stream is busy is not an error; it is reported
/// as [`crate::controller::StepOutcome::Skipped`].
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("no image loaded")]
    NoImageLoaded,
    #[error("error applying {filter}: {source}")]
    Filter {
        filter: &'static str,
        #[source]
        source: FilterError,
    },
    #[error("{filter} panicked")]
    Panicked { filter: &'static str },
}

/// Failures while encoding or writing a stream's current buffer.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no {} image to save", .0.label())]
    NoImage(Side),
    #[error("no images to save")]
    NothingToSave,
    #[error("could not encode image: {0}")]
    Encode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while reading or validating a [`crate::config::PlayerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tick interval must be positive, got {0} ms")]
    InvalidInterval(u64),
}
