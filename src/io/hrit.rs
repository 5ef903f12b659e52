//! Segmented (HRIT) level 1.5 product reader.
//!
//! A timeslot is spread over one prologue (PRO), one epilogue (EPI) and,
//! per channel, up to 8 image segments of 464 full-disk lines each (24 for
//! HRV). Segments hold only packed samples after a fixed-size header.

use crate::core::unpack::{packed_len, unpack_10bit};
use crate::core::window::resolve_window;
use crate::io::header::{
    GeometricProcessing, Header15, ImageDescription, RadiometricProcessing, SatelliteStatus,
};
use crate::io::native::{check_band_ids, ImageData, SeviriData};
use crate::io::records::{CdsShortTime, MarfHeader, PacketHeader};
use crate::io::swap::{Record, SwapReader, Transfer};
use crate::io::trailer::Trailer15;
use crate::types::{
    Bounds, SeviriError, SeviriResult, CHANNEL_NAMES, IMAGE_SIZE_VIR_COLUMNS,
    IMAGE_SIZE_VIR_LINES,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Bytes of segment header skipped before the image data
pub const SEGMENT_HEADER_SIZE: u64 = 6198;

/// Full-disk lines per VIS/IR segment
pub const SEGMENT_LINES: usize = 464;

/// VIS/IR segments per channel
pub const N_SEGMENTS_VIR: usize = 8;

/// First 0-based segment present in rapid-scan products
pub const RSS_FIRST_SEGMENT: usize = 5;

/// Absolute prologue offset of the image description record
pub const PROLOGUE_IMAGE_DESCRIPTION_OFFSET: u64 = 386982;

/// Preamble length assumed when the header-length probe fails
const DEFAULT_HEADER_LENGTH: u64 = 10;

const NAME_MARKER: &str = "H-000-MSG";

/// The pieces of a segmented product file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HritName {
    /// Directory prefix, including its trailing separator
    pub dir: String,
    /// YYYYMMDDhhmm
    pub timeslot: String,
    /// MSG platform number, 1 to 4
    pub satellite: u8,
    /// Rapid scanning service
    pub rss: bool,
    /// Indian Ocean data coverage service
    pub iodc: bool,
}

impl HritName {
    pub fn new(dir: &str, timeslot: &str, satellite: u8) -> SeviriResult<Self> {
        if timeslot.len() != 12 || !timeslot.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SeviriError::InvalidInput(format!(
                "timeslot must be YYYYMMDDhhmm: {}",
                timeslot
            )));
        }
        if !(1..=4).contains(&satellite) {
            return Err(SeviriError::InvalidInput(format!(
                "satellite number must be 1 to 4: {}",
                satellite
            )));
        }

        let mut dir = dir.to_string();
        if !dir.is_empty() && !dir.ends_with('/') {
            dir.push('/');
        }

        Ok(Self {
            dir,
            timeslot: timeslot.to_string(),
            satellite,
            rss: false,
            iodc: false,
        })
    }

    pub fn with_service(mut self, rss: bool, iodc: bool) -> Self {
        self.rss = rss;
        self.iodc = iodc;
        self
    }

    /// Recover the name pieces from any segment, prologue or epilogue path
    pub fn parse(filename: &str) -> SeviriResult<Self> {
        let re = Regex::new(
            r"H-000-MSG(\d)__-MSG\d(________|_RSS____|_IODC___)-[A-Z0-9_]{9}-[A-Z0-9_]{9}-(\d{12})-__",
        )
        .map_err(|e| SeviriError::Processing(format!("filename pattern: {}", e)))?;

        let caps = re.captures(filename).ok_or_else(|| {
            log::error!("Incorrectly formatted HRIT file name: {}", filename);
            SeviriError::InvalidFilename(filename.to_string())
        })?;

        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let satellite = caps[1]
            .parse::<u8>()
            .map_err(|_| SeviriError::InvalidFilename(filename.to_string()))?;
        let service = &caps[2];

        Ok(Self {
            dir: filename[..start].to_string(),
            timeslot: caps[3].to_string(),
            satellite,
            rss: service.starts_with("_RSS"),
            iodc: service.starts_with("_IODC"),
        })
    }

    fn service(&self) -> String {
        if self.rss {
            format!("MSG{}_RSS____", self.satellite)
        } else if self.iodc {
            format!("MSG{}_IODC___", self.satellite)
        } else {
            format!("MSG{}________", self.satellite)
        }
    }

    fn build(&self, channel: &str, segment: &str) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{}__-{}-{}___-{}-{}-__",
            self.dir,
            NAME_MARKER,
            self.satellite,
            self.service(),
            channel,
            segment,
            self.timeslot
        ))
    }

    /// Path of 1-based segment `segment` of band `band_id`
    pub fn segment(&self, band_id: u8, segment: usize) -> PathBuf {
        self.build(&channel_field(band_id), &format!("{:06}___", segment))
    }

    pub fn prologue(&self) -> PathBuf {
        self.build("______", "PRO______")
    }

    pub fn epilogue(&self) -> PathBuf {
        self.build("______", "EPI______")
    }

    /// 0-based segments of a VIS/IR channel present for this service
    pub fn segment_range(&self) -> std::ops::Range<usize> {
        if self.rss {
            RSS_FIRST_SEGMENT..N_SEGMENTS_VIR
        } else {
            0..N_SEGMENTS_VIR
        }
    }
}

/// Six-character channel field of a segment name
fn channel_field(band_id: u8) -> String {
    let name = CHANNEL_NAMES
        .get((band_id as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("______");
    format!("{:_<6}", name)
}

/// True for paths that look like a segmented product file
pub fn is_hrit_name(path: &str) -> bool {
    path.contains(NAME_MARKER)
}

fn open(path: &Path) -> SeviriResult<SwapReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| {
        log::error!("Problem opening file for reading: {} ... {}", path.display(), e);
        SeviriError::Io(e)
    })?;
    Ok(SwapReader::new(BufReader::new(file)))
}

/// Probe the transport preamble: a [0, 0, 16] magic announces a 4-byte
/// header length, otherwise the length defaults to 10.
fn header_length<R: Read + Seek>(io: &mut SwapReader<R>) -> SeviriResult<u64> {
    let mut probe = [0u8; 4];
    io.bytes(&mut probe)?;
    if probe[..3] == [0, 0, 16] {
        let mut length = 0u32;
        io.u32(&mut length)?;
        Ok(length as u64)
    } else {
        log::debug!("No header length magic, assuming {} bytes", DEFAULT_HEADER_LENGTH);
        Ok(DEFAULT_HEADER_LENGTH)
    }
}

/// Parts of the 15HEADER carried by the prologue
#[derive(Debug, Clone, Default)]
pub struct Prologue {
    pub satellite_status: SatelliteStatus,
    pub image_description: ImageDescription,
    pub radiometric_processing: RadiometricProcessing,
    pub geometric_processing: GeometricProcessing,
}

pub fn read_prologue<P: AsRef<Path>>(path: P) -> SeviriResult<Prologue> {
    let path = path.as_ref();
    log::debug!("Reading prologue {}", path.display());

    let mut io = open(path)?;
    let length = header_length(&mut io)?;
    io.seek(SeekFrom::Start(length))?;

    let mut prologue = Prologue::default();
    prologue.satellite_status.transfer(&mut io)?;

    io.seek(SeekFrom::Start(PROLOGUE_IMAGE_DESCRIPTION_OFFSET))?;
    prologue.image_description.transfer(&mut io)?;
    prologue.radiometric_processing.transfer(&mut io)?;
    prologue.geometric_processing.transfer(&mut io)?;

    Ok(prologue)
}

/// Scan summary carried by the epilogue
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Epilogue {
    pub satellite_id: i16,
    pub nominal_image_scanning: u8,
    pub reduced_scan: u8,
    pub act_scan_forward_start: CdsShortTime,
    pub act_scan_forward_end: CdsShortTime,
}

impl Record for Epilogue {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i16(&mut self.satellite_id)?;
        io.u8(&mut self.nominal_image_scanning)?;
        io.u8(&mut self.reduced_scan)?;
        self.act_scan_forward_start.transfer(io)?;
        self.act_scan_forward_end.transfer(io)?;
        Ok(())
    }
}

pub fn read_epilogue<P: AsRef<Path>>(path: P) -> SeviriResult<Epilogue> {
    let path = path.as_ref();
    log::debug!("Reading epilogue {}", path.display());

    let mut io = open(path)?;
    let length = header_length(&mut io)?;
    // Skip the trailer version byte
    io.seek(SeekFrom::Start(length + 1))?;

    let mut epilogue = Epilogue::default();
    epilogue.transfer(&mut io)?;
    Ok(epilogue)
}

/// Decode the lines of 0-based segment `segnum` that fall in the requested
/// window into band `i_band` of `image`.
fn read_segment(path: &Path, segnum: usize, i_band: usize, image: &mut ImageData) -> SeviriResult<()> {
    let window = image.window;
    let first_line = window.i_line_requested;
    let last_line = first_line + window.n_lines_requested - 1;
    let first_column = window.i_column_requested;
    let last_column = first_column + window.n_columns_requested - 1;

    let n_columns = window.selected.n_columns;
    let mut packed = vec![0u8; packed_len(n_columns)];
    let mut samples = vec![0u16; packed.len() / 5 * 4];

    let (n_bands, n_lines, n_cols) = image.counts.dim();
    if segnum >= N_SEGMENTS_VIR
        || i_band >= n_bands
        || last_line >= IMAGE_SIZE_VIR_LINES
        || last_line - first_line >= n_lines
        || last_column - first_column >= n_cols
        || first_column >= samples.len()
    {
        log::error!(
            "Segment {} of {} cannot be placed in a {} x {} x {} grid",
            segnum + 1,
            path.display(),
            n_bands,
            n_lines,
            n_cols
        );
        return Err(SeviriError::InvalidFormat(format!(
            "segment {} placement outside lines {}..{}, columns {}..{}",
            segnum + 1,
            first_line,
            last_line,
            first_column,
            last_column
        )));
    }

    let mut io = open(path)?;
    io.seek(SeekFrom::Start(SEGMENT_HEADER_SIZE))?;

    let offset = segnum * SEGMENT_LINES;
    for x in offset..offset + SEGMENT_LINES {
        if x < first_line || x > last_line {
            io.seek(SeekFrom::Current(packed.len() as i64))?;
            continue;
        }

        io.bytes(&mut packed)?;
        unpack_10bit(&packed, &mut samples)?;

        let last = last_column.min(samples.len() - 1);
        for j in first_column..=last {
            image.counts[[i_band, x - first_line, j - first_column]] = samples[j];
        }
    }

    Ok(())
}

/// Read bands `band_ids` of the timeslot named by `name` over `bounds`.
///
/// Segments outside the requested lines are not opened. Missing segment
/// files leave their lines at fill.
pub fn read_hrit(name: &HritName, band_ids: &[u8], bounds: &Bounds) -> SeviriResult<SeviriData> {
    check_band_ids(band_ids)?;

    log::info!(
        "Reading HRIT timeslot {} of MSG{} from {}",
        name.timeslot, name.satellite, name.dir
    );

    let prologue = read_prologue(name.prologue())?;
    let epilogue = read_epilogue(name.epilogue())?;

    // Segmented products always cover the full disk
    let marf = MarfHeader::for_rectangle(
        band_ids,
        1,
        IMAGE_SIZE_VIR_LINES as u32,
        1,
        IMAGE_SIZE_VIR_COLUMNS as u32,
    );

    let header = Header15 {
        satellite_status: prologue.satellite_status,
        image_description: prologue.image_description,
        radiometric_processing: prologue.radiometric_processing,
        geometric_processing: prologue.geometric_processing,
        ..Header15::default()
    };

    let mut trailer = Trailer15::default();
    let stats = &mut trailer.image_production_stats;
    stats.satellite_id = epilogue.satellite_id;
    stats.nominal_image_scanning = epilogue.nominal_image_scanning;
    stats.reduced_scan = epilogue.reduced_scan;
    stats.act_scan_forward_start = epilogue.act_scan_forward_start;
    stats.act_scan_forward_end = epilogue.act_scan_forward_end;

    let sub_lon = header.image_description.longitude_of_ssp as f64;
    let window = resolve_window(&marf, bounds, sub_lon)?;

    let mut image = ImageData::new(band_ids, window);
    image.packet_headers.clear();
    image.line_side_info.clear();

    let first_line = window.i_line_requested;
    let last_line = first_line + window.n_lines_requested - 1;

    for (i_band, &band_id) in band_ids.iter().enumerate() {
        for segnum in name.segment_range() {
            let seg_first = segnum * SEGMENT_LINES;
            let seg_last = seg_first + SEGMENT_LINES - 1;
            if seg_last < first_line || seg_first > last_line {
                continue;
            }

            let path = name.segment(band_id, segnum + 1);
            if !path.exists() {
                log::warn!("Missing segment {}, leaving its lines at fill", path.display());
                continue;
            }

            log::debug!("Reading segment {} of band {}", segnum + 1, band_id);
            read_segment(&path, segnum, i_band, &mut image)?;
        }
        log::info!("Band {} read", band_id);
    }

    Ok(SeviriData {
        marf,
        packet_header1: PacketHeader::default(),
        header,
        image,
        packet_header2: PacketHeader::default(),
        trailer,
    })
}

/// Read a timeslot starting from the path of any of its files
pub fn read_hrit_file(path: &str, band_ids: &[u8], bounds: &Bounds) -> SeviriResult<SeviriData> {
    let name = HritName::parse(path)?;
    read_hrit(&name, band_ids, bounds)
}
