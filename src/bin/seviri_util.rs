//! Command line driver: read a native or segmented SEVIRI product as
//! described by a driver file, preprocess it and save the result.

use anyhow::{bail, Context, Result};
use seviri::core::preprocess::{read_product, PreprocessParams, PreprocessedProduct, Preprocessor};
use seviri::io::driver::{DriverConfig, InputFormat, OutputFormat};
use seviri::io::geotiff::{write_geotiff, GeoTiffOptions};
use seviri::io::hrit::read_hrit;
use seviri::types::{status_code, SeviriResult, CHANNEL_NAMES};

const USAGE: &str = "Usage: seviri_util <driver-file>

The driver file holds, one per line:
  HRIT or NAT
  input directory (HRIT) or input file (NAT)
  timeslot YYYYMMDDhhmm (HRIT only)
  satellite number 1-4 (HRIT only)
  RSS flag (0/1)
  IODC flag (0/1)
  bands to read, e.g. 11010100100
  output format: HDF, CDF or TIF
  output units: CNT, RAD or RBT
  output path (extension is appended)
  initial line (-100 full disk, -200 actual image), then final line,
  initial column and final column
followed by any of: time lat lon sza saa vza vaa compress calib";

fn run_driver(driver: &DriverConfig) -> SeviriResult<PreprocessedProduct> {
    let preprocessor = Preprocessor::new(PreprocessParams {
        units: driver.units.clone(),
        calibration: driver.calibration,
        ..PreprocessParams::default()
    });

    let data = match driver.input_format {
        InputFormat::Hrit => read_hrit(&driver.hrit_name()?, &driver.band_ids, &driver.bounds)?,
        InputFormat::Nat => read_product(&driver.input, &driver.band_ids, &driver.bounds)?,
    };
    preprocessor.preprocess(&data)
}

fn print_centre_pixel(product: &PreprocessedProduct) {
    if product.n_lines == 0 || product.n_columns == 0 {
        return;
    }
    let (i, j) = ((product.n_lines / 2).saturating_sub(1), (product.n_columns / 2).saturating_sub(1));

    println!("Centre pixel (line {}, column {}):", i, j);
    println!("  Julian day:            {:.6}", product.time[[i, j]]);
    println!("  latitude:              {:.4}", product.lat[[i, j]]);
    println!("  longitude:             {:.4}", product.lon[[i, j]]);
    println!("  solar zenith angle:    {:.4}", product.sza[[i, j]]);
    println!("  solar azimuth angle:   {:.4}", product.saa[[i, j]]);
    println!("  viewing zenith angle:  {:.4}", product.vza[[i, j]]);
    println!("  viewing azimuth angle: {:.4}", product.vaa[[i, j]]);
    for (b, &band_id) in product.band_ids.iter().enumerate() {
        println!("  {}:                {:08.4}", CHANNEL_NAMES[band_id as usize - 1], product.data[[b, i, j]]);
    }
}

fn run(driver_path: &str) -> Result<()> {
    let driver = DriverConfig::from_file(driver_path)
        .with_context(|| format!("failed to parse driver file {}", driver_path))?;

    log::info!(
        "Processing {} bands from {} into {}",
        driver.band_ids.len(),
        driver.input,
        driver.output_path.display()
    );

    if driver.output_format != OutputFormat::Tif {
        bail!("{} output is not supported in this build, use TIF", driver.output_format);
    }

    let result = run_driver(&driver);
    if status_code(&result) != 0 {
        log::error!("Preprocessing failed for {}", driver.input);
    }
    let product = result.context("failed to read and preprocess the input")?;

    print_centre_pixel(&product);

    let options = GeoTiffOptions {
        ancillary: driver.ancillary.clone(),
        compress: driver.compress,
        description: driver.description(),
    };
    write_geotiff(&driver.output_path, &product, &options)
        .with_context(|| format!("failed to write {}", driver.output_path.display()))?;

    println!("Saved {}", driver.output_path.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("{}", USAGE);
        std::process::exit(-1);
    }

    if let Err(e) = run(&args[1]) {
        eprintln!("Error: {:#}", e);
        std::process::exit(-1);
    }
}
