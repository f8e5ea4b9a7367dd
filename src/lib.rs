//! QA Mask Rust Extensions
//!
//! High-performance Landsat-8 QA band masking implemented in Rust with
//! Python bindings via PyO3.
//!
//! ## What it does
//! The QA band encodes per-pixel quality flags as bit-fields in a 16-bit
//! integer. This crate decodes those flags against a set of named exclusion
//! criteria (e.g. `CLOUD_YES`, `WATER_MAYBE`) and produces a binary mask:
//! 1 = keep the pixel, 0 = exclude it. A pixel is excluded when its code
//! matches ANY selected criterion.
//!
//! ## Division of labor
//! File I/O stays with the caller: the Python side reads the QA band out of
//! a GeoTIFF with GDAL, hands this crate the raw 2D code grid plus the
//! geotransform, and writes the returned mask grid to a new Int16 GeoTIFF
//! with that same geotransform. The core here is a pure grid transform,
//! parallel across pixels and memoized per QA code.
//!
//! See [`criteria`] for the full bit layout and criterion names.

pub mod criteria;
pub mod mask;

pub use mask::{compute_mask, qa_mask, CriteriaSet, GeoTransform, MaskError, MaskedBand};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::mask::{self, CriteriaSet, GeoTransform};

    /// Mask a Landsat-8 QA band.
    ///
    /// Returns the (rows, cols) Int16 mask (1 = keep, 0 = exclude) and the
    /// geotransform unchanged, ready for the GTiff writer.
    ///
    /// # Arguments
    /// * `band` - 2D uint16 array of QA codes
    /// * `criteria` - criterion names to EXCLUDE, e.g. `["CLOUD_YES", "WATER_YES"]`
    /// * `geo_transform` - 6 affine coefficients from GetGeoTransform()
    #[pyfunction]
    pub fn qa_mask<'py>(
        py: Python<'py>,
        band: PyReadonlyArray2<'py, u16>,
        criteria: Vec<String>,
        geo_transform: GeoTransform,
    ) -> PyResult<(Bound<'py, PyArray2<i16>>, GeoTransform)> {
        let result = mask::qa_mask(band.as_array(), &criteria, geo_transform)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok((result.mask.into_pyarray(py), result.geo_transform))
    }

    /// Evaluate a single QA code against a set of exclusion criteria.
    #[pyfunction]
    pub fn is_excluded(code: u16, criteria: Vec<String>) -> PyResult<bool> {
        let set = CriteriaSet::resolve(&criteria)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(set.is_excluded(code))
    }

    /// All registered criterion names, in bit-layout order.
    #[pyfunction]
    pub fn criterion_names() -> Vec<&'static str> {
        crate::criteria::criterion_names()
    }

    /// QA mask Rust extension module
    #[pymodule]
    pub fn qamask_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(qa_mask, m)?)?;
        m.add_function(wrap_pyfunction!(is_excluded, m)?)?;
        m.add_function(wrap_pyfunction!(criterion_names, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::qamask_rust;
