//! Synthetic products shared by the integration tests
#![allow(dead_code)]

use ndarray::s;
use seviri::core::unpack::{pack_10bit, packed_len};
use seviri::core::window::resolve_window;
use seviri::io::header::{Header15, OrbitCoef};
use seviri::io::hrit::{Epilogue, HritName, SEGMENT_HEADER_SIZE, SEGMENT_LINES, PROLOGUE_IMAGE_DESCRIPTION_OFFSET};
use seviri::io::native::{ImageData, SeviriData};
use seviri::io::records::{CdsShortTime, MarfHeader, PacketHeader};
use seviri::io::swap::{Record, SwapWriter, Transfer};
use seviri::io::trailer::Trailer15;
use seviri::types::{Bounds, IMAGE_SIZE_VIR_COLUMNS};
use std::fs;
use std::path::Path;

/// CDS day of 2020-06-21
pub const CDS_DAY: u16 = 22817;

/// Forward scan from 12:00 to 12:12 UTC
pub const SCAN_START_MSEC: u32 = 43_200_000;
pub const SCAN_END_MSEC: u32 = 43_920_000;

pub const CAL_SLOPE: f64 = 0.02;
pub const CAL_OFFSET: f64 = -1.0;

/// Count stored for band index `b` at rectangle line `l`, column `c`
pub fn count_at(b: usize, l: usize, c: usize) -> u16 {
    (60 + 10 * b + 8 * l + c) as u16
}

/// Count stored in segmented files for full disk line `x`, column `j`
pub fn hrit_count_at(x: usize, j: usize) -> u16 {
    ((x * 3 + j) % 1000 + 1) as u16
}

pub fn header(satellite_id: i16) -> Header15 {
    let mut header = Header15::default();
    header.satellite_status.satellite_id = satellite_id;

    // One orbit segment spanning the whole day
    let mut coef = OrbitCoef::default();
    coef.start_time = CdsShortTime::new(CDS_DAY, 0);
    coef.end_time = CdsShortTime::new(CDS_DAY + 1, 0);
    coef.x[0] = 42164.0;
    header.satellite_status.orbit_polynomial = vec![coef];

    header.image_description.longitude_of_ssp = 0.0;
    header.geometric_processing.type_of_earth_model = 2;
    header.geometric_processing.equatorial_radius = 6378.169;
    header.geometric_processing.north_polar_radius = 6356.5838;
    header.geometric_processing.south_polar_radius = 6356.5838;

    for cal in header.radiometric_processing.level1_5_image_calibration.iter_mut() {
        cal.cal_slope = CAL_SLOPE;
        cal.cal_offset = CAL_OFFSET;
    }
    header
}

pub fn trailer(satellite_id: i16) -> Trailer15 {
    let mut trailer = Trailer15::default();
    let stats = &mut trailer.image_production_stats;
    stats.satellite_id = satellite_id;
    stats.nominal_image_scanning = 1;
    stats.act_scan_forward_start = CdsShortTime::new(CDS_DAY, SCAN_START_MSEC);
    stats.act_scan_forward_end = CdsShortTime::new(CDS_DAY, SCAN_END_MSEC);
    trailer
}

/// A native product holding `band_ids` over the 1-based rectangle
/// south..=north, east..=west, filled with [`count_at`]
pub fn native_product(band_ids: &[u8], south: u32, north: u32, east: u32, west: u32) -> SeviriData {
    let marf = MarfHeader::for_rectangle(band_ids, south, north, east, west);
    let window = resolve_window(&marf, &Bounds::ActualImage, 0.0).expect("rectangle resolves");

    let mut image = ImageData::new(band_ids, window);
    let (n_bands, n_lines, n_columns) = image.counts.dim();
    for b in 0..n_bands {
        for l in 0..n_lines {
            for c in 0..n_columns {
                image.counts[[b, l, c]] = count_at(b, l, c);
            }
        }
    }
    for (b, headers) in image.packet_headers.iter_mut().enumerate() {
        for (l, ph) in headers.iter_mut().enumerate() {
            ph.sequence_count = (b * 1000 + l) as u16;
        }
    }

    SeviriData {
        marf,
        packet_header1: PacketHeader::default(),
        header: header(323),
        image,
        packet_header2: PacketHeader::default(),
        trailer: trailer(323),
    }
}

/// The 8 x 8 product at the disk centre used by most tests
pub fn centre_product(band_ids: &[u8]) -> SeviriData {
    native_product(band_ids, 1857, 1864, 1857, 1864)
}

fn record_bytes<R: Record>(record: &mut R) -> Vec<u8> {
    let mut io = SwapWriter::new(Vec::new());
    record.transfer(&mut io).expect("record encodes");
    io.into_inner()
}

/// Transport preamble announcing a 16-byte header
fn preamble() -> Vec<u8> {
    let mut bytes = vec![0u8, 0, 16, 0];
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.resize(16, 0);
    bytes
}

/// Write the prologue and epilogue of `name`
pub fn write_hrit_ancillary(name: &HritName, satellite_id: i16) {
    let mut header = header(satellite_id);

    let mut pro = preamble();
    pro.extend(record_bytes(&mut header.satellite_status));
    assert!(pro.len() < PROLOGUE_IMAGE_DESCRIPTION_OFFSET as usize);
    pro.resize(PROLOGUE_IMAGE_DESCRIPTION_OFFSET as usize, 0);
    pro.extend(record_bytes(&mut header.image_description));
    pro.extend(record_bytes(&mut header.radiometric_processing));
    pro.extend(record_bytes(&mut header.geometric_processing));
    fs::write(name.prologue(), pro).expect("prologue written");

    let mut epilogue = Epilogue {
        satellite_id,
        nominal_image_scanning: 1,
        reduced_scan: 0,
        act_scan_forward_start: CdsShortTime::new(CDS_DAY, SCAN_START_MSEC),
        act_scan_forward_end: CdsShortTime::new(CDS_DAY, SCAN_END_MSEC),
    };
    let mut epi = preamble();
    // Trailer version byte
    epi.push(1);
    epi.extend(record_bytes(&mut epilogue));
    fs::write(name.epilogue(), epi).expect("epilogue written");
}

/// Write 1-based segment `segment` of `band_id`, filled with [`hrit_count_at`]
pub fn write_hrit_segment(name: &HritName, band_id: u8, segment: usize) {
    let mut bytes = vec![0u8; SEGMENT_HEADER_SIZE as usize];
    let mut packed = vec![0u8; packed_len(IMAGE_SIZE_VIR_COLUMNS)];

    let first = (segment - 1) * SEGMENT_LINES;
    for x in first..first + SEGMENT_LINES {
        let samples: Vec<u16> = (0..IMAGE_SIZE_VIR_COLUMNS).map(|j| hrit_count_at(x, j)).collect();
        pack_10bit(&samples, &mut packed).expect("line packs");
        bytes.extend_from_slice(&packed);
    }
    fs::write(name.segment(band_id, segment), bytes).expect("segment written");
}

/// Directory prefix understood by [`HritName::new`]
pub fn dir_prefix(dir: &Path) -> String {
    format!("{}/", dir.display())
}

/// Band `b` of `data` as a plain vector, for assertions
pub fn band_counts(data: &SeviriData, b: usize) -> Vec<u16> {
    data.image.counts.slice(s![b, .., ..]).iter().copied().collect()
}
