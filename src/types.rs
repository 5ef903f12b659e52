use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of SEVIRI channels, HRV included
pub const N_BANDS: usize = 12;

/// Number of VIS/IR channels (HRV excluded)
pub const N_BANDS_VIR: usize = 11;

/// Band id of the high resolution visible channel
pub const HRV_BAND_ID: u8 = 12;

/// Full disk size of the VIS/IR reference grid
pub const IMAGE_SIZE_VIR_LINES: usize = 3712;
pub const IMAGE_SIZE_VIR_COLUMNS: usize = 3712;

/// Full disk size of the HRV reference grid
pub const IMAGE_SIZE_HRV_LINES: usize = 11136;
pub const IMAGE_SIZE_HRV_COLUMNS: usize = 11136;

/// Fill value of decoded counts. Outside the 10-bit count domain.
pub const FILL_VALUE_US: u16 = 65535;

/// Fill value of every preprocessed float array
pub const FILL_VALUE_F: f32 = -999.0;

/// Fill value of the time array
pub const FILL_VALUE_D: f64 = -999.0;

/// Channel names as they appear in segmented product filenames
pub const CHANNEL_NAMES: [&str; N_BANDS] = [
    "VIS006", "VIS008", "IR_016", "IR_039", "WV_062", "WV_073",
    "IR_087", "IR_097", "IR_108", "IR_120", "IR_134", "HRV",
];

/// Decoded count cube (band x line x column)
pub type CountCube = Array3<u16>;

/// Physical value cube (band x line x column)
pub type BandCube = Array3<f32>;

/// Single preprocessed image plane (line x column)
pub type SeviriImage = Array2<f32>;

/// Per-pixel Julian day plane
pub type TimeImage = Array2<f64>;

/// Output unit requested for a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    /// Raw 10-bit count
    Cnt,
    /// Radiance in mW m-2 sr-1 (cm-1)-1
    Rad,
    /// Top of atmosphere reflectance
    Ref,
    /// Bidirectional reflectance factor (reflectance / cos(sza))
    Brf,
    /// Brightness temperature in K
    Bt,
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Units::Cnt => write!(f, "CNT"),
            Units::Rad => write!(f, "RAD"),
            Units::Ref => write!(f, "REF"),
            Units::Brf => write!(f, "BRF"),
            Units::Bt => write!(f, "BT"),
        }
    }
}

impl FromStr for Units {
    type Err = SeviriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CNT" => Ok(Units::Cnt),
            "RAD" => Ok(Units::Rad),
            "REF" => Ok(Units::Ref),
            "BRF" => Ok(Units::Brf),
            "BT" => Ok(Units::Bt),
            _ => Err(SeviriError::InvalidInput(format!("invalid units: {}", s))),
        }
    }
}

/// Region of the disk to read.
///
/// Line and column bounds are 0-based and inclusive. Latitudes and
/// longitudes are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bounds {
    /// The whole 3712 x 3712 disk, with the product placed at its offset
    FullDisk,
    /// Only the rectangle actually present in the product
    ActualImage,
    /// A line/column box on the full disk grid
    LineColumn {
        line0: u32,
        line1: u32,
        column0: u32,
        column1: u32,
    },
    /// A latitude/longitude box
    LatLon {
        lat0: f64,
        lat1: f64,
        lon0: f64,
        lon1: f64,
    },
}

impl Bounds {
    /// Build bounds from a mode name and the optional coordinates used by
    /// that mode. Mode names are `full_disk`, `actual_image`,
    /// `line_column` and `lat_lon`.
    pub fn from_mode(
        mode: &str,
        pixel_coords: Option<(u32, u32, u32, u32)>,
        lat_lon_coords: Option<(f64, f64, f64, f64)>,
    ) -> SeviriResult<Self> {
        match mode.trim().to_lowercase().as_str() {
            "full_disk" => Ok(Bounds::FullDisk),
            "actual_image" => Ok(Bounds::ActualImage),
            "line_column" => {
                let (line0, line1, column0, column1) = pixel_coords.ok_or_else(|| {
                    SeviriError::InvalidInput(
                        "line_column bounds require pixel coordinates".to_string(),
                    )
                })?;
                Ok(Bounds::LineColumn { line0, line1, column0, column1 })
            }
            "lat_lon" => {
                let (lat0, lat1, lon0, lon1) = lat_lon_coords.ok_or_else(|| {
                    SeviriError::InvalidInput(
                        "lat_lon bounds require latitude/longitude coordinates".to_string(),
                    )
                })?;
                Ok(Bounds::LatLon { lat0, lat1, lon0, lon1 })
            }
            _ => Err(SeviriError::InvalidInput(format!(
                "invalid seviri_bounds type: {}",
                mode
            ))),
        }
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bounds::FullDisk => write!(f, "full_disk"),
            Bounds::ActualImage => write!(f, "actual_image"),
            Bounds::LineColumn { line0, line1, column0, column1 } => {
                write!(f, "line_column({}, {}, {}, {})", line0, line1, column0, column1)
            }
            Bounds::LatLon { lat0, lat1, lon0, lon1 } => {
                write!(f, "lat_lon({}, {}, {}, {})", lat0, lat1, lon0, lon1)
            }
        }
    }
}

/// Error types for SEVIRI decoding and preprocessing
#[derive(Debug, thiserror::Error)]
pub enum SeviriError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl SeviriError {
    /// True for errors caused by the caller's request rather than the data
    pub fn is_input_error(&self) -> bool {
        matches!(self, SeviriError::InvalidInput(_) | SeviriError::Unsupported(_))
    }
}

/// Result type for SEVIRI operations
pub type SeviriResult<T> = Result<T, SeviriError>;

/// Collapse a result into a 0 (success) / -1 (failure) status code
pub fn status_code<T>(result: &SeviriResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => -1,
    }
}
