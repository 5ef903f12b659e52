//! GeoTIFF output of preprocessed products
use crate::core::preprocess::PreprocessedProduct;
use crate::io::driver::AncillaryLayer;
use crate::types::{SeviriResult, CHANNEL_NAMES};
use gdal::raster::{Buffer, RasterCreationOption};
use gdal::{DriverManager, Metadata};
use ndarray::Array2;
use std::path::Path;

/// Output options for [`write_geotiff`]
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Ancillary layers appended after the band data, in order
    pub ancillary: Vec<AncillaryLayer>,
    /// LZW compression
    pub compress: bool,
    /// Written to the dataset description
    pub description: String,
}

fn ancillary_layer(product: &PreprocessedProduct, layer: AncillaryLayer) -> Array2<f32> {
    match layer {
        // Julian days lose precision as f32 but match the band type
        AncillaryLayer::Time => product.time.mapv(|t| t as f32),
        AncillaryLayer::Lat => product.lat.clone(),
        AncillaryLayer::Lon => product.lon.clone(),
        AncillaryLayer::Sza => product.sza.clone(),
        AncillaryLayer::Saa => product.saa.clone(),
        AncillaryLayer::Vza => product.vza.clone(),
        AncillaryLayer::Vaa => product.vaa.clone(),
    }
}

/// Save a preprocessed product as a float32 GeoTIFF, one raster band per
/// requested channel followed by the selected ancillary layers.
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    product: &PreprocessedProduct,
    options: &GeoTiffOptions,
) -> SeviriResult<()> {
    let path = path.as_ref();
    log::info!("Saving preprocessed product as GeoTIFF: {}", path.display());

    let (width, height) = (product.n_columns, product.n_lines);
    let n_layers = product.n_bands + options.ancillary.len();

    let creation_options: Vec<RasterCreationOption> = if options.compress {
        vec![RasterCreationOption { key: "COMPRESS", value: "LZW" }]
    } else {
        Vec::new()
    };

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type_with_options::<f32, _>(
        path,
        width as isize,
        height as isize,
        n_layers as isize,
        &creation_options,
    )?;

    if !options.description.is_empty() {
        dataset.set_description(&options.description)?;
    }
    dataset.set_metadata_item("SATELLITE", product.satellite, "")?;
    dataset.set_metadata_item("SATELLITE_POSITION", product.satellite_position.trim_end(), "")?;
    dataset.set_metadata_item("MID_SCAN_JULIAN_DAY", &format!("{:.8}", product.mid_scan_time), "")?;
    dataset.set_metadata_item("FIRST_LINE", &product.i_line.to_string(), "")?;
    dataset.set_metadata_item("FIRST_COLUMN", &product.i_column.to_string(), "")?;

    let mut layers: Vec<(String, Array2<f32>)> = Vec::with_capacity(n_layers);
    for (i, (&band_id, unit)) in product.band_ids.iter().zip(&product.units).enumerate() {
        let name = format!("{} ({})", CHANNEL_NAMES[band_id as usize - 1], unit);
        layers.push((name, product.band(i).to_owned()));
    }
    for &layer in &options.ancillary {
        layers.push((layer.name().to_string(), ancillary_layer(product, layer)));
    }

    for (i, (name, data)) in layers.into_iter().enumerate() {
        let mut band = dataset.rasterband(i as isize + 1)?;
        let flat: Vec<f32> = data.iter().cloned().collect();
        band.write((0, 0), (width, height), &Buffer::new((width, height), flat))?;
        band.set_no_data_value(Some(product.fill_value as f64))?;
        band.set_description(&name)?;
        log::debug!("Wrote GeoTIFF band {}: {}", i + 1, name);
    }

    log::info!("GeoTIFF saved with {} bands", n_layers);
    Ok(())
}
