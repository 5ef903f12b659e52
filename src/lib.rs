//! seviri: A Fast, Modular MSG/SEVIRI Level 1.5 Reader and Preprocessor
//!
//! This library decodes SEVIRI level 1.5 imagery from native (.nat, also
//! zipped) and segmented HRIT products, and converts raw counts into
//! radiances, reflectances or brightness temperatures alongside per-pixel
//! geolocation, solar and viewing geometry.

use numpy::{PyArray2, PyArray3, ToPyArray};
use pyo3::prelude::*;

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    Bounds, SeviriError, SeviriResult, Units, BandCube, CountCube, SeviriImage, TimeImage,
    FILL_VALUE_D, FILL_VALUE_F, FILL_VALUE_US,
};

pub use io::{get_dimens, read_hrit, read_native, write_native, HritName, SeviriData};
pub use crate::core::{read_and_preprocess, CalibrationMode, PreprocessParams, PreprocessedProduct, Preprocessor};

fn to_py_err(e: SeviriError) -> PyErr {
    if e.is_input_error() {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
    } else {
        PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySeviriPreproc>()?;
    m.add_function(wrap_pyfunction!(py_get_dimens, m)?)?;
    m.add("FILL_VALUE", FILL_VALUE_F)?;
    Ok(())
}

/// Read and preprocess a SEVIRI product
#[pyclass(name = "SeviriPreproc")]
struct PySeviriPreproc {
    inner: PreprocessedProduct,
}

#[pymethods]
impl PySeviriPreproc {
    #[new]
    #[pyo3(signature = (filename, band_ids, units, bounds, pixel_coords=None, lat_lon_coords=None, do_gsics=false))]
    fn new(
        py: Python,
        filename: String,
        band_ids: Vec<u8>,
        units: Vec<String>,
        bounds: &str,
        pixel_coords: Option<(u32, u32, u32, u32)>,
        lat_lon_coords: Option<(f64, f64, f64, f64)>,
        do_gsics: bool,
    ) -> PyResult<Self> {
        let units = units
            .iter()
            .map(|u| u.parse::<Units>())
            .collect::<SeviriResult<Vec<_>>>()
            .map_err(to_py_err)?;
        let bounds = Bounds::from_mode(bounds, pixel_coords, lat_lon_coords).map_err(to_py_err)?;
        let calibration = if do_gsics { CalibrationMode::Feedback } else { CalibrationMode::Nominal };

        let product = py
            .allow_threads(|| read_and_preprocess(&filename, &band_ids, &units, &bounds, calibration))
            .map_err(to_py_err)?;

        Ok(PySeviriPreproc { inner: product })
    }

    #[getter]
    fn n_bands(&self) -> usize {
        self.inner.n_bands
    }

    #[getter]
    fn n_lines(&self) -> usize {
        self.inner.n_lines
    }

    #[getter]
    fn n_columns(&self) -> usize {
        self.inner.n_columns
    }

    #[getter]
    fn fill_value(&self) -> f32 {
        self.inner.fill_value
    }

    #[getter]
    fn satellite_position(&self) -> String {
        self.inner.satellite_position.clone()
    }

    #[getter]
    fn satellite(&self) -> &str {
        self.inner.satellite
    }

    #[getter]
    fn band_ids(&self) -> Vec<u8> {
        self.inner.band_ids.clone()
    }

    #[getter]
    fn time<'py>(&self, py: Python<'py>) -> &'py PyArray2<f64> {
        self.inner.time.to_pyarray(py)
    }

    #[getter]
    fn lat<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.lat.to_pyarray(py)
    }

    #[getter]
    fn lon<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.lon.to_pyarray(py)
    }

    #[getter]
    fn sza<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.sza.to_pyarray(py)
    }

    #[getter]
    fn saa<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.saa.to_pyarray(py)
    }

    #[getter]
    fn vza<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.vza.to_pyarray(py)
    }

    #[getter]
    fn vaa<'py>(&self, py: Python<'py>) -> &'py PyArray2<f32> {
        self.inner.vaa.to_pyarray(py)
    }

    #[getter]
    fn data<'py>(&self, py: Python<'py>) -> &'py PyArray3<f32> {
        self.inner.data.to_pyarray(py)
    }

    fn __repr__(&self) -> String {
        format!(
            "SeviriPreproc(satellite='{}', bands={:?}, lines={}, columns={})",
            self.inner.satellite, self.inner.band_ids, self.inner.n_lines, self.inner.n_columns
        )
    }
}

/// (i_line, i_column, n_lines, n_columns) of the grid a native product
/// would be read into
#[pyfunction]
#[pyo3(name = "get_dimens", signature = (filename, bounds, pixel_coords=None, lat_lon_coords=None))]
fn py_get_dimens(
    filename: String,
    bounds: &str,
    pixel_coords: Option<(u32, u32, u32, u32)>,
    lat_lon_coords: Option<(f64, f64, f64, f64)>,
) -> PyResult<(usize, usize, usize, usize)> {
    let bounds = Bounds::from_mode(bounds, pixel_coords, lat_lon_coords).map_err(to_py_err)?;
    get_dimens(&filename, &bounds).map_err(to_py_err)
}
