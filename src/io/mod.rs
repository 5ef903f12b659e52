//! I/O modules for SEVIRI level 1.5 products

pub mod swap;
pub mod records;
pub mod header;
pub mod trailer;
pub mod native;
pub mod hrit;
pub mod driver;
pub mod geotiff;

pub use native::{get_dimens, read_native, write_native, ImageData, SeviriData};
pub use hrit::{read_hrit, read_hrit_file, HritName};
pub use driver::{AncillaryLayer, DriverConfig, InputFormat, OutputFormat};
pub use geotiff::{write_geotiff, GeoTiffOptions};
