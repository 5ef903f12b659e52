//! Driver file parser for the `seviri_util` command line tool.
//!
//! The driver is a line oriented text file: input format, input location,
//! (timeslot and satellite number for segmented input), service flags, band
//! selection, output format, units, output path and bounds, followed by
//! optional keywords selecting ancillary layers, compression and feedback
//! calibration.

use crate::core::calibrate::{is_solar_band, CalibrationMode};
use crate::io::hrit::HritName;
use crate::types::{Bounds, SeviriError, SeviriResult, Units, IMAGE_SIZE_VIR_LINES, N_BANDS_VIR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::Lines;

/// Initial line value selecting the full disk
pub const DRIVER_FULL_DISK: i64 = -100;

/// Initial line value selecting the actually scanned image
pub const DRIVER_ACTUAL_IMAGE: i64 = -200;

const MAX_INDEX: i64 = IMAGE_SIZE_VIR_LINES as i64 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Hrit,
    Nat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Hdf,
    Cdf,
    Tif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Hdf => "h5",
            OutputFormat::Cdf => "nc",
            OutputFormat::Tif => "tiff",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OutputFormat::Hdf => "HDF",
            OutputFormat::Cdf => "CDF",
            OutputFormat::Tif => "TIF",
        };
        write!(f, "{}", s)
    }
}

/// Geometry layers that can be saved next to the band data, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AncillaryLayer {
    Time,
    Lat,
    Lon,
    Sza,
    Saa,
    Vza,
    Vaa,
}

impl AncillaryLayer {
    pub const ALL: [AncillaryLayer; 7] = [
        AncillaryLayer::Time,
        AncillaryLayer::Lat,
        AncillaryLayer::Lon,
        AncillaryLayer::Sza,
        AncillaryLayer::Saa,
        AncillaryLayer::Vza,
        AncillaryLayer::Vaa,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AncillaryLayer::Time => "time",
            AncillaryLayer::Lat => "lat",
            AncillaryLayer::Lon => "lon",
            AncillaryLayer::Sza => "sza",
            AncillaryLayer::Saa => "saa",
            AncillaryLayer::Vza => "vza",
            AncillaryLayer::Vaa => "vaa",
        }
    }

    fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|layer| layer.name() == s)
    }
}

/// Parsed driver file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub input_format: InputFormat,
    /// Input directory (segmented) or file (native)
    pub input: String,
    pub timeslot: Option<String>,
    pub satellite: Option<u8>,
    pub rss: bool,
    pub iodc: bool,
    pub band_ids: Vec<u8>,
    pub output_format: OutputFormat,
    pub units: Vec<Units>,
    /// Output path including the format extension
    pub output_path: PathBuf,
    pub bounds: Bounds,
    /// Selected ancillary layers, in output order
    pub ancillary: Vec<AncillaryLayer>,
    pub compress: bool,
    pub calibration: CalibrationMode,
}

fn driver_error(what: &str) -> SeviriError {
    log::error!("Failure reading {} line of driver file", what);
    SeviriError::InvalidInput(format!("failure reading {} line of driver file", what))
}

fn next_line<'a>(lines: &mut Lines<'a>, what: &str) -> SeviriResult<&'a str> {
    lines.next().map(str::trim_end).ok_or_else(|| driver_error(what))
}

fn parse_int(s: &str, what: &str) -> SeviriResult<i64> {
    s.trim().parse::<i64>().map_err(|_| driver_error(what))
}

fn parse_flag(s: &str, what: &str) -> SeviriResult<bool> {
    match parse_int(s, what)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(driver_error(what)),
    }
}

/// Band ids selected by a string of `0`/`1`: character i selects band i + 1
pub fn parse_band_selection(s: &str) -> SeviriResult<Vec<u8>> {
    if s.len() > N_BANDS_VIR {
        return Err(driver_error("bands to process"));
    }

    let mut band_ids = Vec::new();
    for (i, ch) in s.chars().enumerate() {
        match ch {
            '1' => band_ids.push(i as u8 + 1),
            '0' => {}
            _ => return Err(driver_error("bands to process")),
        }
    }

    if band_ids.is_empty() {
        return Err(driver_error("bands to process"));
    }
    Ok(band_ids)
}

fn parse_units(s: &str, band_ids: &[u8]) -> SeviriResult<Vec<Units>> {
    let units = match s {
        "CNT" => vec![Units::Cnt; band_ids.len()],
        "RAD" => vec![Units::Rad; band_ids.len()],
        "RBT" => band_ids
            .iter()
            .map(|&id| if is_solar_band(id) { Units::Brf } else { Units::Bt })
            .collect(),
        _ => return Err(driver_error("output units type")),
    };
    Ok(units)
}

/// Line/column bounds from the four driver values, clamped to the disk
fn line_column_bounds(iline: i64, fline: i64, icol: i64, fcol: i64) -> SeviriResult<Bounds> {
    let (iline, icol) = (iline.max(0), icol.max(0));
    let (fline, fcol) = (fline.min(MAX_INDEX), fcol.min(MAX_INDEX));

    if iline > MAX_INDEX || icol > MAX_INDEX {
        return Err(SeviriError::InvalidInput(format!(
            "the initial processing line/column cannot be greater than {}, got {} and {}",
            MAX_INDEX, iline, icol
        )));
    }
    if fline < 0 || fcol < 0 {
        return Err(SeviriError::InvalidInput(format!(
            "the final processing line/column cannot be less than 0, got {} and {}",
            fline, fcol
        )));
    }
    if icol >= fcol {
        return Err(SeviriError::InvalidInput(format!(
            "the initial processing column must be below the final column, got {} and {}",
            icol, fcol
        )));
    }
    if iline >= fline {
        return Err(SeviriError::InvalidInput(format!(
            "the initial processing line must be below the final line, got {} and {}",
            iline, fline
        )));
    }

    Ok(Bounds::LineColumn {
        line0: iline as u32,
        line1: fline as u32,
        column0: icol as u32,
        column1: fcol as u32,
    })
}

impl DriverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SeviriResult<Self> {
        let path = path.as_ref();
        log::info!("Parsing driver file: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> SeviriResult<Self> {
        let mut lines = text.lines();

        let input_format = match next_line(&mut lines, "input type")? {
            "HRIT" => InputFormat::Hrit,
            "NAT" => InputFormat::Nat,
            _ => return Err(driver_error("input type")),
        };

        let input = next_line(&mut lines, "input file/dir")?;
        if input.len() < 4 {
            return Err(driver_error("input file/dir"));
        }

        let (timeslot, satellite) = match input_format {
            InputFormat::Hrit => {
                let timeslot = next_line(&mut lines, "input timeslot")?;
                if timeslot.len() < 12 {
                    return Err(driver_error("input timeslot"));
                }
                let satellite = match parse_int(next_line(&mut lines, "satellite number")?, "satellite number")? {
                    n @ 1..=4 => n as u8,
                    _ => return Err(driver_error("satellite number")),
                };
                (Some(timeslot[..12].to_string()), Some(satellite))
            }
            InputFormat::Nat => (None, None),
        };

        let rss = parse_flag(next_line(&mut lines, "RSS flag")?, "RSS flag")?;
        let iodc = parse_flag(next_line(&mut lines, "IODC flag")?, "IODC flag")?;

        let band_ids = parse_band_selection(next_line(&mut lines, "bands to process")?)?;

        let output_format = match next_line(&mut lines, "output file type")? {
            "HDF" => OutputFormat::Hdf,
            "CDF" => OutputFormat::Cdf,
            "TIF" => OutputFormat::Tif,
            _ => return Err(driver_error("output file type")),
        };

        let units = parse_units(next_line(&mut lines, "output units type")?, &band_ids)?;

        let output = next_line(&mut lines, "output filename")?;
        if output.len() < 4 {
            return Err(driver_error("output filename"));
        }
        let output_path = PathBuf::from(format!("{}.{}", output, output_format.extension()));

        let bounds = match parse_int(next_line(&mut lines, "initial line")?, "initial line")? {
            DRIVER_FULL_DISK => Bounds::FullDisk,
            DRIVER_ACTUAL_IMAGE => Bounds::ActualImage,
            iline => {
                let fline = parse_int(next_line(&mut lines, "final line")?, "final line")?;
                let icol = parse_int(next_line(&mut lines, "initial column")?, "initial column")?;
                let fcol = parse_int(next_line(&mut lines, "final column")?, "final column")?;
                line_column_bounds(iline, fline, icol, fcol)?
            }
        };

        let mut selected = [false; 7];
        let mut compress = false;
        let mut calibration = CalibrationMode::Nominal;
        for keyword in lines.map(str::trim).filter(|l| !l.is_empty()) {
            match keyword {
                "compress" => compress = true,
                "calib" => calibration = CalibrationMode::Feedback,
                other => match AncillaryLayer::from_keyword(other) {
                    Some(layer) => selected[layer as usize] = true,
                    None => log::warn!("Ignoring unknown driver keyword: {}", other),
                },
            }
        }
        let ancillary = AncillaryLayer::ALL
            .iter()
            .copied()
            .filter(|&layer| selected[layer as usize])
            .collect();

        Ok(Self {
            input_format,
            input: input.to_string(),
            timeslot,
            satellite,
            rss,
            iodc,
            band_ids,
            output_format,
            units,
            output_path,
            bounds,
            ancillary,
            compress,
            calibration,
        })
    }

    /// Segmented product name of the configured timeslot
    pub fn hrit_name(&self) -> SeviriResult<HritName> {
        match (&self.timeslot, self.satellite) {
            (Some(timeslot), Some(satellite)) => {
                Ok(HritName::new(&self.input, timeslot, satellite)?.with_service(self.rss, self.iodc))
            }
            _ => Err(SeviriError::InvalidInput(
                "segmented input needs a timeslot and satellite number".to_string(),
            )),
        }
    }

    /// Human readable provenance written into the output file
    pub fn description(&self) -> String {
        match (self.input_format, &self.timeslot, self.satellite) {
            (InputFormat::Hrit, Some(timeslot), Some(satellite)) => format!(
                "Image created with the SEVIRI reader utility. This file was produced from MSG{} data in timeslot {}.",
                satellite, timeslot
            ),
            _ => format!(
                "Image created with the SEVIRI reader utility. This file was produced from {}.",
                self.input
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HRIT_DRIVER: &str = "HRIT\n/data/seviri/\n200603031200\n1\n0\n0\n11100011011\nTIF\nRBT\n/tmp/out\n500\n1003\n1000\n2003\nlat\nlon\nvza\ncompress\ncalib\n";

    #[test]
    fn test_parse_hrit_driver() {
        let driver = DriverConfig::parse(HRIT_DRIVER).unwrap();
        assert_eq!(driver.input_format, InputFormat::Hrit);
        assert_eq!(driver.timeslot.as_deref(), Some("200603031200"));
        assert_eq!(driver.satellite, Some(1));
        assert_eq!(driver.band_ids, vec![1, 2, 3, 7, 8, 10, 11]);
        assert_eq!(driver.units[..4], [Units::Brf, Units::Brf, Units::Brf, Units::Bt]);
        assert_eq!(driver.output_path, PathBuf::from("/tmp/out.tiff"));
        assert_eq!(
            driver.bounds,
            Bounds::LineColumn { line0: 500, line1: 1003, column0: 1000, column1: 2003 }
        );
        assert_eq!(driver.ancillary, vec![AncillaryLayer::Lat, AncillaryLayer::Lon, AncillaryLayer::Vza]);
        assert!(driver.compress);
        assert_eq!(driver.calibration, CalibrationMode::Feedback);

        let name = driver.hrit_name().unwrap();
        assert_eq!(name.satellite, 1);
    }

    #[test]
    fn test_parse_native_full_disk() {
        let text = "NAT\n/data/MSG3-SEVI-MSG15.nat\n0\n0\n0000000001\nHDF\nCNT\n/tmp/out\n-100\ntime\n";
        let driver = DriverConfig::parse(text).unwrap();
        assert_eq!(driver.input_format, InputFormat::Nat);
        assert_eq!(driver.band_ids, vec![10]);
        assert_eq!(driver.bounds, Bounds::FullDisk);
        assert_eq!(driver.output_path, PathBuf::from("/tmp/out.h5"));
        assert_eq!(driver.ancillary, vec![AncillaryLayer::Time]);
        assert_eq!(driver.calibration, CalibrationMode::Nominal);
        assert!(driver.hrit_name().is_err());
    }

    #[test]
    fn test_bounds_are_clamped() {
        let b = line_column_bounds(-5, 5000, 0, 3).unwrap();
        assert_eq!(b, Bounds::LineColumn { line0: 0, line1: 3711, column0: 0, column1: 3 });

        assert!(line_column_bounds(4000, 4001, 0, 3).is_err());
        assert!(line_column_bounds(0, -1, 0, 3).is_err());
        assert!(line_column_bounds(10, 10, 0, 3).is_err());
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(parse_band_selection("000").is_err());
        assert!(parse_band_selection("111111111111").is_err());
        assert!(DriverConfig::parse("GRIB\n").is_err());
        assert!(DriverConfig::parse("NAT\n/data/x.nat\n0\n2\n1\nTIF\nCNT\n/tmp/out\n-200\n").is_err());
        assert!(DriverConfig::parse("NAT\n/data/x.nat\n0\n0\n1\nTIF\nREF\n/tmp/out\n-200\n").is_err());
    }
}
