//! MARF preamble, CDS time codes and per-line framing records.

use crate::core::geometry::cds_epoch_julian_day;
use crate::io::swap::{Record, Transfer};
use crate::types::{SeviriError, SeviriResult, N_BANDS};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Size in bytes of the packet header that starts every image line record
pub const PACKET_HEADER_SIZE: usize = 38;

/// Size in bytes of the line side info that follows the packet header
pub const LINE_SIDE_INFO_SIZE: usize = 27;

const MSEC_PER_DAY: f64 = 86_400_000.0;

fn cds_to_datetime(day: u16, msec: u32) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1958, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let t = epoch + Duration::days(day as i64) + Duration::milliseconds(msec as i64);
    Some(DateTime::from_naive_utc_and_offset(t, Utc))
}

/// CCSDS day segmented time with microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CdsTime {
    pub day: u16,
    pub msec: u32,
    pub usec: u16,
}

impl Record for CdsTime {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u16(&mut self.day)?;
        io.u32(&mut self.msec)?;
        io.u16(&mut self.usec)?;
        Ok(())
    }
}

/// CCSDS day segmented time, day and milliseconds only
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CdsShortTime {
    pub day: u16,
    pub msec: u32,
}

impl CdsShortTime {
    pub fn new(day: u16, msec: u32) -> Self {
        Self { day, msec }
    }

    /// Julian day (fractional) of this time code
    pub fn to_julian(&self) -> f64 {
        cds_epoch_julian_day() + self.day as f64 + self.msec as f64 / MSEC_PER_DAY
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        cds_to_datetime(self.day, self.msec)
    }
}

impl Record for CdsShortTime {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u16(&mut self.day)?;
        io.u32(&mut self.msec)?;
        Ok(())
    }
}

/// CCSDS day segmented time down to nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CdsExpandedTime {
    pub day: u16,
    pub msec: u32,
    pub usec: u16,
    pub nsec: u16,
}

impl Record for CdsExpandedTime {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u16(&mut self.day)?;
        io.u32(&mut self.msec)?;
        io.u16(&mut self.usec)?;
        io.u16(&mut self.nsec)?;
        Ok(())
    }
}

fn fixed_ascii<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [b' '; N];
    for (dst, src) in field.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    field
}

fn ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// One ASCII name/value entry of the product header (30 + 50 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct PhData {
    pub name: [u8; 30],
    pub value: [u8; 50],
}

impl Default for PhData {
    fn default() -> Self {
        Self {
            name: [b' '; 30],
            value: [b' '; 50],
        }
    }
}

impl PhData {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: fixed_ascii(name),
            value: fixed_ascii(value),
        }
    }

    pub fn name_str(&self) -> String {
        ascii_field(&self.name)
    }

    pub fn value_str(&self) -> String {
        ascii_field(&self.value)
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = fixed_ascii(value);
    }

    /// Parse the leading unsigned integer of the value field
    pub fn value_u32(&self) -> SeviriResult<u32> {
        let text = self.value_str();
        let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u32>().map_err(|_| {
            SeviriError::InvalidFormat(format!(
                "header field '{}' is not an unsigned integer: '{}'",
                self.name_str(),
                text
            ))
        })
    }
}

impl Record for PhData {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.bytes(&mut self.name)?;
        io.bytes(&mut self.value)?;
        Ok(())
    }
}

/// One dataset identification entry (30 + 16 + 16 bytes)
#[derive(Debug, Clone, PartialEq)]
pub struct PhDataId {
    pub name: [u8; 30],
    pub size: [u8; 16],
    pub address: [u8; 16],
}

impl Default for PhDataId {
    fn default() -> Self {
        Self {
            name: [b' '; 30],
            size: [b' '; 16],
            address: [b' '; 16],
        }
    }
}

impl Record for PhDataId {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.bytes(&mut self.name)?;
        io.bytes(&mut self.size)?;
        io.bytes(&mut self.address)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainProductHeader {
    pub format_name: PhData,
    pub format_document_name: PhData,
    pub document_major_version: PhData,
    pub document_minor_version: PhData,
    pub creation_date_time: PhData,
    pub creating_center: PhData,
    pub data_set_identification: Vec<PhDataId>,
    pub total_file_size: PhData,
    pub gort: PhData,
    pub asti: PhData,
    pub llos: PhData,
    pub snit: PhData,
    pub aiid: PhData,
    pub ssbt: PhData,
    pub ssst: PhData,
    pub rrcc: PhData,
    pub rrbt: PhData,
    pub rrst: PhData,
    pub pprc: PhData,
    pub ppdt: PhData,
    pub gplv: PhData,
    pub apnm: PhData,
    pub aarf: PhData,
    pub uudt: PhData,
    pub qqov: PhData,
    pub udsp: PhData,
}

impl Record for MainProductHeader {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.format_name.transfer(io)?;
        self.format_document_name.transfer(io)?;
        self.document_major_version.transfer(io)?;
        self.document_minor_version.transfer(io)?;
        self.creation_date_time.transfer(io)?;
        self.creating_center.transfer(io)?;
        self.data_set_identification.resize(27, PhDataId::default());
        io.records(&mut self.data_set_identification)?;
        for field in [
            &mut self.total_file_size,
            &mut self.gort,
            &mut self.asti,
            &mut self.llos,
            &mut self.snit,
            &mut self.aiid,
            &mut self.ssbt,
            &mut self.ssst,
            &mut self.rrcc,
            &mut self.rrbt,
            &mut self.rrst,
            &mut self.pprc,
            &mut self.ppdt,
            &mut self.gplv,
            &mut self.apnm,
            &mut self.aarf,
            &mut self.uudt,
            &mut self.qqov,
            &mut self.udsp,
        ] {
            field.transfer(io)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondaryProductHeader {
    pub abid: PhData,
    pub smod: PhData,
    pub apxs: PhData,
    pub avpa: PhData,
    pub lscd: PhData,
    pub lmpa: PhData,
    pub qdlc: PhData,
    pub qdlp: PhData,
    pub qqai: PhData,
    pub selected_band_ids: PhData,
    pub south_line_selected_rectangle: PhData,
    pub north_line_selected_rectangle: PhData,
    pub east_column_selected_rectangle: PhData,
    pub west_column_selected_rectangle: PhData,
    pub number_lines_visir: PhData,
    pub number_columns_visir: PhData,
    pub number_lines_hrv: PhData,
    pub number_columns_hrv: PhData,
}

impl Record for SecondaryProductHeader {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        for field in [
            &mut self.abid,
            &mut self.smod,
            &mut self.apxs,
            &mut self.avpa,
            &mut self.lscd,
            &mut self.lmpa,
            &mut self.qdlc,
            &mut self.qdlp,
            &mut self.qqai,
            &mut self.selected_band_ids,
            &mut self.south_line_selected_rectangle,
            &mut self.north_line_selected_rectangle,
            &mut self.east_column_selected_rectangle,
            &mut self.west_column_selected_rectangle,
            &mut self.number_lines_visir,
            &mut self.number_columns_visir,
            &mut self.number_lines_hrv,
            &mut self.number_columns_hrv,
        ] {
            field.transfer(io)?;
        }
        Ok(())
    }
}

/// ASCII product header at the start of a native file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarfHeader {
    pub main: MainProductHeader,
    pub secondary: SecondaryProductHeader,
}

impl Record for MarfHeader {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.main.transfer(io)?;
        self.secondary.transfer(io)?;
        Ok(())
    }
}

impl MarfHeader {
    /// Header describing a product that holds `band_ids` over the 1-based
    /// inclusive rectangle south..=north, east..=west.
    pub fn for_rectangle(band_ids: &[u8], south: u32, north: u32, east: u32, west: u32) -> Self {
        let mut header = MarfHeader::default();
        let s = &mut header.secondary;
        s.selected_band_ids = PhData::new("SelectedBandIDs", &band_flags(band_ids));
        s.south_line_selected_rectangle =
            PhData::new("SouthLineSelectedRectangle", &south.to_string());
        s.north_line_selected_rectangle =
            PhData::new("NorthLineSelectedRectangle", &north.to_string());
        s.east_column_selected_rectangle =
            PhData::new("EastColumnSelectedRectangle", &east.to_string());
        s.west_column_selected_rectangle =
            PhData::new("WestColumnSelectedRectangle", &west.to_string());
        s.number_lines_visir = PhData::new("NumberLinesVISIR", &(north - south + 1).to_string());
        s.number_columns_visir =
            PhData::new("NumberColumnsVISIR", &(west - east + 1).to_string());
        s.number_lines_hrv = PhData::new("NumberLinesHRV", &(3 * (north - south + 1)).to_string());
        s.number_columns_hrv =
            PhData::new("NumberColumnsHRV", &(3 * (west - east + 1)).to_string());
        header
    }

    /// Selection flag ('X' or '-') for each of the 12 channels
    pub fn band_selected(&self) -> [bool; N_BANDS] {
        let mut selected = [false; N_BANDS];
        for (flag, byte) in selected.iter_mut().zip(self.secondary.selected_band_ids.value.iter()) {
            *flag = *byte == b'X';
        }
        selected
    }

    /// Position of `band_id` among the bands stored in the file, or None
    /// when the band was not selected into this product.
    pub fn band_position_in_file(&self, band_id: u8) -> Option<usize> {
        let selected = self.band_selected();
        let index = band_id.checked_sub(1)? as usize;
        if index >= N_BANDS || !selected[index] {
            return None;
        }
        Some(selected[..index].iter().filter(|&&s| s).count())
    }

    /// Number of VIS/IR bands stored in the file
    pub fn n_bands_vir(&self) -> usize {
        self.band_selected()[..N_BANDS - 1].iter().filter(|&&s| s).count()
    }

    /// Number of HRV bands stored in the file (0 or 1)
    pub fn n_bands_hrv(&self) -> usize {
        usize::from(self.band_selected()[N_BANDS - 1])
    }
}

/// Selection string with 'X' for every band in `band_ids` and '-' elsewhere
pub fn band_flags(band_ids: &[u8]) -> String {
    (1..=N_BANDS as u8)
        .map(|id| if band_ids.contains(&id) { 'X' } else { '-' })
        .collect()
}

/// Packet header of an image line record. Stored in host byte order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacketHeader {
    pub header_version_no: u8,
    pub packet_type: u8,
    pub sub_header_type: u8,
    pub source_facility_id: u8,
    pub source_env_id: u8,
    pub source_instance_id: u8,
    pub source_su_id: i32,
    pub source_cpu_id: [u8; 4],
    pub dest_facility_id: u8,
    pub dest_env_id: u8,
    pub sequence_count: u16,
    pub packet_length: i32,
    pub sub_header_version_no: u8,
    pub checksum_flag: u8,
    pub acknowledgement: [u8; 4],
    pub service_type: u8,
    pub service_subtype: u8,
    pub packet_time: [u8; 6],
    pub spacecraft_id: i16,
}

impl Record for PacketHeader {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.with_swap(false, |io| {
            io.u8(&mut self.header_version_no)?;
            io.u8(&mut self.packet_type)?;
            io.u8(&mut self.sub_header_type)?;
            io.u8(&mut self.source_facility_id)?;
            io.u8(&mut self.source_env_id)?;
            io.u8(&mut self.source_instance_id)?;
            io.i32(&mut self.source_su_id)?;
            io.bytes(&mut self.source_cpu_id)?;
            io.u8(&mut self.dest_facility_id)?;
            io.u8(&mut self.dest_env_id)?;
            io.u16(&mut self.sequence_count)?;
            io.i32(&mut self.packet_length)?;
            io.u8(&mut self.sub_header_version_no)?;
            io.u8(&mut self.checksum_flag)?;
            io.bytes(&mut self.acknowledgement)?;
            io.u8(&mut self.service_type)?;
            io.u8(&mut self.service_subtype)?;
            io.bytes(&mut self.packet_time)?;
            io.i16(&mut self.spacecraft_id)?;
            Ok(())
        })
    }
}

/// Level 1.5 line side info following each packet header
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineSideInfo {
    pub version: u8,
    pub satellite_id: i16,
    pub true_repeat_cycle_start: CdsExpandedTime,
    pub line_number_in_grid: i32,
    pub channel_id: u8,
    pub l10_line_mean_acquisition_time: CdsShortTime,
    pub line_validity: u8,
    pub line_radiometric_quality: u8,
    pub line_geometric_quality: u8,
}

impl Record for LineSideInfo {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.version)?;
        io.i16(&mut self.satellite_id)?;
        self.true_repeat_cycle_start.transfer(io)?;
        io.i32(&mut self.line_number_in_grid)?;
        io.u8(&mut self.channel_id)?;
        self.l10_line_mean_acquisition_time.transfer(io)?;
        io.u8(&mut self.line_validity)?;
        io.u8(&mut self.line_radiometric_quality)?;
        io.u8(&mut self.line_geometric_quality)?;
        Ok(())
    }
}
