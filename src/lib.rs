//! dualfilter
//!
//! A fixed catalog of pixel filters cycled over one source image by two
//! independent streams: a manual stream advanced on demand and an automatic
//! stream advanced by a periodic tick. Each stream owns its current output
//! buffer; transforms run on rayon workers with at most one in flight per
//! stream.
//!
//! ## Image Format
//! Buffers are 8-bit RGB (3 channels) or RGBA (4 channels), stored as one
//! flat row-major sample array. Alpha is carried through every filter
//! unchanged.
//!
//! ## Entry points
//! - [`DualStreamController`] - load images, step either stream, read results
//! - [`Ticker`] - fixed-cadence driver for the automatic stream
//! - [`FilterCatalog`] - the filters themselves, usable standalone
//!
//! Python bindings (feature `python`) and WASM bindings (feature `wasm`)
//! expose the catalog on numpy arrays and flat byte arrays.

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod filters;
pub mod status;
pub mod stream;
pub mod ticker;

#[cfg(feature = "codecs")]
pub mod io;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use buffer::PixelBuffer;
pub use config::{ExportConfig, ExportFormat, PlayerConfig};
pub use controller::{Dispatch, DualStreamController, FilterApplied, SkipReason, StepOutcome};
pub use error::{ApplyError, ConfigError, ExportError, FilterError, LoadError};
pub use filters::{FilterCatalog, FilterDescriptor};
pub use status::StatusReport;
pub use stream::{FilterStream, Side};
pub use ticker::Ticker;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::{PyKeyError, PyMemoryError, PyValueError};
    use pyo3::prelude::*;

    use crate::buffer::PixelBuffer;
    use crate::error::FilterError;
    use crate::filters::FilterCatalog;

    fn to_py_err(err: FilterError) -> PyErr {
        match err {
            FilterError::Allocation { .. } => PyMemoryError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }

    /// Names of the built-in filters in cycle order.
    #[pyfunction]
    pub fn filter_names() -> Vec<&'static str> {
        FilterCatalog::standard().names()
    }

    /// Apply one catalog filter, by name, to an (H, W, 3|4) u8 array.
    ///
    /// Raises KeyError for unknown names and ValueError for other shapes.
    #[pyfunction]
    pub fn apply_filter<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        name: &str,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let catalog = FilterCatalog::standard();
        let (_, filter) = catalog
            .find(name)
            .ok_or_else(|| PyKeyError::new_err(format!("unknown filter: {}", name)))?;

        let input = PixelBuffer::from_array(image.as_array()).map_err(to_py_err)?;
        // Release the GIL while the kernel runs on the rayon pool.
        let output = py
            .allow_threads(|| filter.apply(&input))
            .map_err(to_py_err)?;
        Ok(output.into_array().map_err(to_py_err)?.into_pyarray(py))
    }

    #[pymodule]
    pub fn dualfilter(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(filter_names, m)?)?;
        m.add_function(wrap_pyfunction!(apply_filter, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::dualfilter;
