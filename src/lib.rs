//! pnm_stencil
//!
//! Fixed 3x3 convolution filters for 8-bit PNM images, with the per-pixel
//! work split across a group of cooperating workers.
//!
//! ## Image Format
//! Images are flat, row-major buffers of 8-bit samples:
//! - **Grayscale**: 1 sample per pixel (PNM `P5`)
//! - **RGB**: 3 samples per pixel, red-green-blue (PNM `P6`)
//!
//! ## Filters
//! `smooth`, `blur`, `sharpen`, `mean` and `emboss`, applied in the order
//! given. Pixels on the outermost rows and columns pass through unchanged.
//!
//! ## Execution
//! The image is split into one contiguous block per worker. Every filter
//! stage scatters the blocks, filters them against the pre-stage image,
//! gathers the results on the coordinator and broadcasts the new image to
//! every worker before the next stage starts. Output is byte-identical for
//! any worker count.

pub mod config;
pub mod error;
pub mod filters;
pub mod group;
pub mod image;
pub mod logging;
pub mod partition;
pub mod pipeline;
pub mod pnm;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::FilterConfig;
pub use error::{Error, Result};
pub use filters::kernels::{lookup, FilterName, Kernel};
pub use filters::stencil::Narrowing;
pub use image::{ChannelMode, Image};
pub use pipeline::{apply_filters, apply_filters_serial, run};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use ndarray::Array3;
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::{ChannelMode, FilterConfig, Image, Narrowing};

    fn to_py_err(e: impl std::fmt::Display) -> PyErr {
        PyValueError::new_err(e.to_string())
    }

    /// Apply a chain of 3x3 filters to a u8 image.
    ///
    /// # Arguments
    /// * `image` - Image with 1 or 3 channels (height, width, channels)
    /// * `filters` - Filter names, applied in order
    /// * `workers` - Number of cooperating workers (capped at the pixel count)
    /// * `saturate` - Clamp out-of-range sums instead of wrapping them
    ///
    /// # Returns
    /// Filtered image with the same shape
    #[pyfunction]
    #[pyo3(signature = (image, filters, workers=1, saturate=false))]
    pub fn apply_filters<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, u8>,
        filters: Vec<String>,
        workers: usize,
        saturate: bool,
    ) -> PyResult<Bound<'py, PyArray3<u8>>> {
        let input = image.as_array();
        let (height, width, channels) = input.dim();
        let mode = match channels {
            1 => ChannelMode::Gray,
            3 => ChannelMode::Rgb,
            n => {
                return Err(PyValueError::new_err(format!(
                    "expected 1 or 3 channels, got {n}"
                )))
            }
        };

        let samples: Vec<u8> = input.iter().copied().collect();
        let mut img = Image::new(width, height, mode, 255, samples).map_err(to_py_err)?;

        let narrowing = if saturate {
            Narrowing::Saturate
        } else {
            Narrowing::Wrap
        };
        let config = FilterConfig::default()
            .with_workers(workers)
            .with_narrowing(narrowing)
            .capped_to(img.pixel_count());

        py.allow_threads(|| crate::apply_filters(&mut img, &filters, &config))
            .map_err(to_py_err)?;

        let result = Array3::from_shape_vec((height, width, channels), img.into_samples())
            .map_err(to_py_err)?;
        Ok(result.into_pyarray(py))
    }

    /// Names of the available filters.
    #[pyfunction]
    pub fn filter_names() -> Vec<&'static str> {
        crate::FilterName::ALL.iter().map(|f| f.as_str()).collect()
    }

    #[pymodule]
    pub fn pnm_stencil(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(apply_filters, m)?)?;
        m.add_function(wrap_pyfunction!(filter_names, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::pnm_stencil;
