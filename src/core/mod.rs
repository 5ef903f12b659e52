//! Core SEVIRI processing modules

pub mod unpack;
pub mod window;
pub mod navigation;
pub mod orbit;
pub mod geometry;
pub mod calibrate;
pub mod preprocess;

// Re-export main types
pub use window::{resolve_window, ImageWindow, SelectedRectangle};
pub use navigation::{latlon_to_pixel, pixel_to_latlon, NavScalingFactors, NAV_SCALING_HRV, NAV_SCALING_VIR};
pub use orbit::{satellite_position, satellite_position_descriptor};
pub use geometry::{solar_params, viewing_angles, SolarGeometry};
pub use calibrate::{CalibrationChoice, CalibrationMode, SatelliteInfo, SATELLITES};
pub use preprocess::{read_and_preprocess, read_product, PreprocessParams, PreprocessedProduct, Preprocessor};
