//! Conversion of decoded counts into physical units with per-pixel
//! geolocation, solar and viewing geometry.

use crate::core::calibrate::{
    brightness_temperature, check_unit, planck_coefs, reflectance_factor, resolve_calibration,
    satellite_info, CalibrationChoice, CalibrationMode, SatelliteInfo,
};
use crate::core::geometry::{day_of_year, solar_params, viewing_angles, wrap_azimuth};
use crate::core::navigation::{pixel_to_latlon, NAV_SCALING_VIR};
use crate::core::orbit::{satellite_position, satellite_position_descriptor};
use crate::io::hrit::{is_hrit_name, read_hrit, read_hrit_file, HritName};
use crate::io::native::{native_source, read_native, SeviriData};
use crate::types::{
    BandCube, Bounds, SeviriError, SeviriImage, SeviriResult, TimeImage, Units, FILL_VALUE_D,
    FILL_VALUE_F, FILL_VALUE_US, IMAGE_SIZE_VIR_LINES,
};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayViewMut2, Zip};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rows of geometry evaluated per parallel batch
const ROW_CHUNK: usize = 64;

/// Parameters for preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessParams {
    /// Output unit of each band, in band list order
    pub units: Vec<Units>,
    /// Source of the radiance calibration
    pub calibration: CalibrationMode,
    /// Keep the arrays of a product passed to `preprocess_into` when their
    /// shape already matches
    pub reuse_buffers: bool,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            calibration: CalibrationMode::Nominal,
            reuse_buffers: false,
        }
    }
}

impl PreprocessParams {
    pub fn with_units(units: &[Units]) -> Self {
        Self {
            units: units.to_vec(),
            ..Self::default()
        }
    }
}

/// Physical quantities and geometry over the requested grid. Every array
/// holds `fill_value` (or `FILL_VALUE_D` for `time`) where undefined.
#[derive(Debug, Clone)]
pub struct PreprocessedProduct {
    pub n_bands: usize,
    pub n_lines: usize,
    pub n_columns: usize,
    pub fill_value: f32,

    /// Full disk line and column of the first output pixel
    pub i_line: usize,
    pub i_column: usize,

    pub band_ids: Vec<u8>,
    pub units: Vec<Units>,
    /// Calibration used per band, None for raw counts
    pub calibration: Vec<Option<CalibrationChoice>>,

    pub satellite: &'static str,
    /// Julian day at the middle of the forward scan
    pub mid_scan_time: f64,
    /// Satellite position descriptor used for parallax correction
    pub satellite_position: String,

    pub time: TimeImage,
    pub lat: SeviriImage,
    pub lon: SeviriImage,
    pub sza: SeviriImage,
    pub saa: SeviriImage,
    pub vza: SeviriImage,
    pub vaa: SeviriImage,
    /// Band values (band x line x column)
    pub data: BandCube,
}

impl PreprocessedProduct {
    fn empty() -> Self {
        Self {
            n_bands: 0,
            n_lines: 0,
            n_columns: 0,
            fill_value: FILL_VALUE_F,
            i_line: 0,
            i_column: 0,
            band_ids: Vec::new(),
            units: Vec::new(),
            calibration: Vec::new(),
            satellite: "",
            mid_scan_time: FILL_VALUE_D,
            satellite_position: String::new(),
            time: Array2::zeros((0, 0)),
            lat: Array2::zeros((0, 0)),
            lon: Array2::zeros((0, 0)),
            sza: Array2::zeros((0, 0)),
            saa: Array2::zeros((0, 0)),
            vza: Array2::zeros((0, 0)),
            vaa: Array2::zeros((0, 0)),
            data: Array3::zeros((0, 0, 0)),
        }
    }

    pub fn band(&self, i: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![i, .., ..])
    }

    /// Allocate, or reset in place when `reuse` is set and the shapes match
    fn prepare(&mut self, n_bands: usize, n_lines: usize, n_columns: usize, reuse: bool) {
        let shape = (n_lines, n_columns);
        let same_shape = self.data.dim() == (n_bands, n_lines, n_columns) && self.lat.dim() == shape;

        if reuse && same_shape {
            log::debug!("Reusing output buffers of {} x {}", n_lines, n_columns);
            self.time.fill(FILL_VALUE_D);
            for a in [&mut self.lat, &mut self.lon, &mut self.sza, &mut self.saa, &mut self.vza, &mut self.vaa] {
                a.fill(FILL_VALUE_F);
            }
            self.data.fill(FILL_VALUE_F);
        } else {
            self.time = Array2::from_elem(shape, FILL_VALUE_D);
            self.lat = Array2::from_elem(shape, FILL_VALUE_F);
            self.lon = Array2::from_elem(shape, FILL_VALUE_F);
            self.sza = Array2::from_elem(shape, FILL_VALUE_F);
            self.saa = Array2::from_elem(shape, FILL_VALUE_F);
            self.vza = Array2::from_elem(shape, FILL_VALUE_F);
            self.vaa = Array2::from_elem(shape, FILL_VALUE_F);
            self.data = Array3::from_elem((n_bands, n_lines, n_columns), FILL_VALUE_F);
        }

        self.n_bands = n_bands;
        self.n_lines = n_lines;
        self.n_columns = n_columns;
        self.fill_value = FILL_VALUE_F;
    }
}

/// Geometry of one earth pixel
#[derive(Debug, Clone, Copy)]
struct PixelGeometry {
    lat: f32,
    lon: f32,
    sza: f32,
    saa: f32,
    vza: f32,
    vaa: f32,
}

/// Inputs shared by every geometry row
#[derive(Debug, Clone, Copy)]
struct GeometryContext {
    i_line: usize,
    i_column: usize,
    n_columns: usize,
    sub_lon: f64,
    earth_model: u8,
    scan_start: f64,
    scan_end: f64,
    mid_scan: f64,
    position: [f64; 3],
}

impl GeometryContext {
    /// Acquisition time of full disk line `line`
    fn line_time(&self, line: usize) -> f64 {
        self.scan_start
            + line as f64 / (IMAGE_SIZE_VIR_LINES - 1) as f64 * (self.scan_end - self.scan_start)
    }

    fn row(&self, i: usize) -> Vec<Option<PixelGeometry>> {
        let line = self.i_line + i;
        let [x, y, z] = self.position;

        (0..self.n_columns)
            .map(|j| {
                let (lat, lon) = pixel_to_latlon(
                    (line + 1) as u32,
                    (self.i_column + j + 1) as u32,
                    self.sub_lon,
                    &NAV_SCALING_VIR,
                    self.earth_model,
                )?;

                let sun = solar_params(self.mid_scan, lat, lon);
                let (vza, vaa) = viewing_angles(lat, lon, 0.0, x, y, z);

                Some(PixelGeometry {
                    lat: lat as f32,
                    lon: lon as f32,
                    sza: sun.zenith as f32,
                    saa: wrap_azimuth(sun.azimuth) as f32,
                    vza: vza as f32,
                    vaa: wrap_azimuth(vaa) as f32,
                })
            })
            .collect()
    }
}

/// Radiometric preprocessor
pub struct Preprocessor {
    params: PreprocessParams,
}

impl Preprocessor {
    /// Create a new preprocessor
    pub fn new(params: PreprocessParams) -> Self {
        Self { params }
    }

    /// Create a preprocessor with nominal calibration. Units must still be
    /// set per band with [`Preprocessor::with_units`].
    pub fn standard() -> Self {
        Self::new(PreprocessParams::default())
    }

    pub fn with_units(mut self, units: &[Units]) -> Self {
        self.params.units = units.to_vec();
        self
    }

    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    /// Preprocess decoded data into a new product
    pub fn preprocess(&self, data: &SeviriData) -> SeviriResult<PreprocessedProduct> {
        let mut product = PreprocessedProduct::empty();
        self.preprocess_into(data, &mut product)?;
        Ok(product)
    }

    /// Preprocess decoded data into `product`. On error the product
    /// content is unspecified.
    pub fn preprocess_into(&self, data: &SeviriData, product: &mut PreprocessedProduct) -> SeviriResult<()> {
        let image = &data.image;
        let units = &self.params.units;

        let info = satellite_info(data.satellite_id())?;

        if units.len() != image.n_bands() {
            log::error!("{} units given for {} bands", units.len(), image.n_bands());
            return Err(SeviriError::InvalidInput(format!(
                "{} units given for {} bands",
                units.len(),
                image.n_bands()
            )));
        }
        for (&band_id, &unit) in image.band_ids.iter().zip(units.iter()) {
            check_unit(band_id, unit)?;
        }

        log::info!(
            "Preprocessing {} bands of {} over {} x {} pixels",
            image.n_bands(),
            info.name,
            image.n_lines(),
            image.n_columns()
        );

        product.prepare(image.n_bands(), image.n_lines(), image.n_columns(), self.params.reuse_buffers);
        product.i_line = image.i_line();
        product.i_column = image.i_column();
        product.band_ids = image.band_ids.clone();
        product.units = units.clone();
        product.satellite = info.name;

        let (scan_start, scan_end) = data.scan_times();
        let mid_scan = (scan_start + scan_end) / 2.0;
        let doy = day_of_year(mid_scan).ok_or_else(|| {
            SeviriError::Domain(format!("invalid scan time: Julian day {}", mid_scan))
        })?;
        product.mid_scan_time = mid_scan;
        log::debug!("Mid-scan Julian day {:.6}, day of year {:.4}", mid_scan, doy);

        let position = satellite_position(mid_scan, &data.header.satellite_status.orbit_polynomial)?;
        let geometric = &data.header.geometric_processing;
        product.satellite_position = satellite_position_descriptor(
            &position,
            geometric.equatorial_radius,
            geometric.north_polar_radius,
        );

        let context = GeometryContext {
            i_line: image.i_line(),
            i_column: image.i_column(),
            n_columns: image.n_columns(),
            sub_lon: data.header.image_description.longitude_of_ssp as f64,
            earth_model: geometric.type_of_earth_model,
            scan_start,
            scan_end,
            mid_scan,
            position,
        };
        self.compute_geometry(&context, product);

        product.calibration = Vec::with_capacity(image.n_bands());
        for (i, (&band_id, &unit)) in image.band_ids.iter().zip(units.iter()).enumerate() {
            let choice = match unit {
                Units::Cnt => None,
                _ => Some(resolve_calibration(
                    info,
                    band_id,
                    self.params.calibration,
                    &data.header.radiometric_processing,
                    mid_scan,
                )?),
            };

            let out = product.data.slice_mut(s![i, .., ..]);
            convert_band(info, band_id, unit, choice, doy, image.band(i), product.sza.view(), out)?;
            product.calibration.push(choice);

            log::info!("Band {} converted to {}", band_id, unit);
        }

        Ok(())
    }

    fn compute_geometry(&self, context: &GeometryContext, product: &mut PreprocessedProduct) {
        let n_lines = product.n_lines;
        let lines: Vec<usize> = (0..n_lines).collect();

        for chunk in lines.chunks(ROW_CHUNK) {
            let rows = geometry_rows(context, chunk);

            for (&i, row) in chunk.iter().zip(rows) {
                let time = context.line_time(context.i_line + i);
                for (j, pixel) in row.into_iter().enumerate() {
                    let Some(g) = pixel else { continue };
                    product.time[[i, j]] = time;
                    product.lat[[i, j]] = g.lat;
                    product.lon[[i, j]] = g.lon;
                    product.sza[[i, j]] = g.sza;
                    product.saa[[i, j]] = g.saa;
                    product.vza[[i, j]] = g.vza;
                    product.vaa[[i, j]] = g.vaa;
                }
            }
        }
    }

    /// Read a native (`.nat` or zipped) or segmented product and preprocess it
    pub fn read_and_preprocess<P: AsRef<Path>>(
        &self,
        path: P,
        band_ids: &[u8],
        bounds: &Bounds,
    ) -> SeviriResult<PreprocessedProduct> {
        let data = read_product(path, band_ids, bounds)?;
        self.preprocess(&data)
    }

    /// Read the segmented timeslot named by `name` and preprocess it
    pub fn read_and_preprocess_hrit(
        &self,
        name: &HritName,
        band_ids: &[u8],
        bounds: &Bounds,
    ) -> SeviriResult<PreprocessedProduct> {
        let data = read_hrit(name, band_ids, bounds)?;
        self.preprocess(&data)
    }
}

#[cfg(feature = "parallel")]
fn geometry_rows(context: &GeometryContext, chunk: &[usize]) -> Vec<Vec<Option<PixelGeometry>>> {
    use rayon::prelude::*;
    chunk.par_iter().map(|&i| context.row(i)).collect()
}

#[cfg(not(feature = "parallel"))]
fn geometry_rows(context: &GeometryContext, chunk: &[usize]) -> Vec<Vec<Option<PixelGeometry>>> {
    chunk.iter().map(|&i| context.row(i)).collect()
}

/// Convert the counts of one band into `unit`. Only valid counts (neither
/// fill nor zero) are converted; reflectances additionally need the sun
/// above the horizon.
#[allow(clippy::too_many_arguments)]
fn convert_band(
    info: &SatelliteInfo,
    band_id: u8,
    unit: Units,
    choice: Option<CalibrationChoice>,
    doy: f64,
    counts: ArrayView2<u16>,
    sza: ArrayView2<f32>,
    out: ArrayViewMut2<f32>,
) -> SeviriResult<()> {
    let valid = |c: u16| c != FILL_VALUE_US && c > 0;

    let choice = match (unit, choice) {
        (Units::Cnt, _) | (_, None) => {
            Zip::from(out).and(&counts).for_each(|o, &c| {
                if valid(c) {
                    *o = c as f32;
                }
            });
            return Ok(());
        }
        (_, Some(choice)) => choice,
    };

    match unit {
        Units::Cnt => {}
        Units::Rad => {
            Zip::from(out).and(&counts).for_each(|o, &c| {
                if valid(c) {
                    *o = choice.radiance(c as f64) as f32;
                }
            });
        }
        Units::Ref | Units::Brf => {
            let factor = reflectance_factor(info, band_id, doy)?;
            let brf = unit == Units::Brf;
            Zip::from(out).and(&counts).and(&sza).for_each(|o, &c, &z| {
                if valid(c) && z >= 0.0 && z < 90.0 {
                    let r = factor * choice.radiance(c as f64);
                    let value = if brf { r / (z as f64).to_radians().cos() } else { r };
                    *o = value as f32;
                }
            });
        }
        Units::Bt => {
            let coefs = planck_coefs(info, band_id)?;
            Zip::from(out).and(&counts).for_each(|o, &c| {
                if valid(c) {
                    if let Some(t) = brightness_temperature(&coefs, choice.radiance(c as f64)) {
                        *o = t as f32;
                    }
                }
            });
        }
    }

    Ok(())
}

/// Decode a product, choosing the reader from the file name: `.nat` and
/// `.zip` files are native products, names carrying the segment marker are
/// segmented products.
pub fn read_product<P: AsRef<Path>>(path: P, band_ids: &[u8], bounds: &Bounds) -> SeviriResult<SeviriData> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "nat" | "zip" => {
            let (native, _extracted) = native_source(path)?;
            read_native(native, band_ids, bounds)
        }
        _ if is_hrit_name(&name) => read_hrit_file(&name, band_ids, bounds),
        _ => {
            log::error!("Unrecognised product file name: {}", name);
            Err(SeviriError::InvalidFilename(name.into_owned()))
        }
    }
}

/// Read and preprocess in one call
pub fn read_and_preprocess<P: AsRef<Path>>(
    path: P,
    band_ids: &[u8],
    units: &[Units],
    bounds: &Bounds,
    calibration: CalibrationMode,
) -> SeviriResult<PreprocessedProduct> {
    let params = PreprocessParams {
        units: units.to_vec(),
        calibration,
        reuse_buffers: false,
    };
    Preprocessor::new(params).read_and_preprocess(path, band_ids, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calibrate::SATELLITES;
    use ndarray::array;

    #[test]
    fn test_line_time_spans_scan() {
        let context = GeometryContext {
            i_line: 0,
            i_column: 0,
            n_columns: 0,
            sub_lon: 0.0,
            earth_model: 2,
            scan_start: 100.0,
            scan_end: 100.5,
            mid_scan: 100.25,
            position: [42164.0, 0.0, 0.0],
        };
        assert_eq!(context.line_time(0), 100.0);
        assert_eq!(context.line_time(3711), 100.5);
    }

    #[test]
    fn test_space_pixels_have_no_geometry() {
        let context = GeometryContext {
            i_line: 0,
            i_column: 1854,
            n_columns: 4,
            sub_lon: 0.0,
            earth_model: 2,
            scan_start: 2455000.0,
            scan_end: 2455000.01,
            mid_scan: 2455000.005,
            position: [42164.0, 0.0, 0.0],
        };
        // Line 1 is off the disk, the centre line is not
        assert!(context.row(0).iter().all(Option::is_none));
        assert!(context.row(1855).iter().all(Option::is_some));
    }

    #[test]
    fn test_convert_counts_and_radiance() {
        let counts = array![[0u16, 10], [FILL_VALUE_US, 1023]];
        let sza = Array2::from_elem((2, 2), 30.0f32);

        let mut out = Array2::from_elem((2, 2), FILL_VALUE_F);
        convert_band(&SATELLITES[0], 9, Units::Cnt, None, 100.0, counts.view(), sza.view(), out.view_mut()).unwrap();
        assert_eq!(out, array![[FILL_VALUE_F, 10.0], [FILL_VALUE_F, 1023.0]]);

        let choice = CalibrationChoice::Nominal { slope: 0.5, offset: -1.0 };
        let mut out = Array2::from_elem((2, 2), FILL_VALUE_F);
        convert_band(&SATELLITES[0], 9, Units::Rad, Some(choice), 100.0, counts.view(), sza.view(), out.view_mut()).unwrap();
        assert_eq!(out, array![[FILL_VALUE_F, 4.0], [FILL_VALUE_F, 510.5]]);
    }

    #[test]
    fn test_brf_needs_daylight() {
        let counts = array![[100u16, 100, 100]];
        let sza = array![[60.0f32, 95.0, FILL_VALUE_F]];
        let choice = CalibrationChoice::Nominal { slope: 1.0, offset: 0.0 };

        let mut out = Array2::from_elem((1, 3), FILL_VALUE_F);
        convert_band(&SATELLITES[0], 1, Units::Brf, Some(choice), 100.0, counts.view(), sza.view(), out.view_mut()).unwrap();

        let factor = reflectance_factor(&SATELLITES[0], 1, 100.0).unwrap();
        assert!((out[[0, 0]] as f64 - factor * 100.0 / 0.5).abs() < 1e-4);
        assert_eq!(out[[0, 1]], FILL_VALUE_F);
        assert_eq!(out[[0, 2]], FILL_VALUE_F);
    }

    #[test]
    fn test_unknown_file_name() {
        let err = read_product("/tmp/product.h5", &[1], &Bounds::FullDisk).unwrap_err();
        assert!(matches!(err, SeviriError::InvalidFilename(_)));
    }
}
