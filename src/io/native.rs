//! Native (.nat) level 1.5 product reader and writer.
//!
//! A native file is the MARF header, a packet header, the 15HEADER, the
//! image line records, a second packet header and the 15TRAILER. Each image
//! line group holds one record per stored band: packet header, line side
//! info and the packed 10-bit samples of the selected rectangle.

use crate::core::unpack::{pack_10bit, packed_len, unpack_10bit};
use crate::core::window::{resolve_window, ImageWindow};
use crate::io::header::Header15;
use crate::io::records::{LineSideInfo, MarfHeader, PacketHeader, LINE_SIDE_INFO_SIZE, PACKET_HEADER_SIZE};
use crate::io::swap::{read_record, Record, SwapReader, SwapWriter, Transfer};
use crate::io::trailer::Trailer15;
use crate::types::{
    Bounds, CountCube, SeviriError, SeviriResult, FILL_VALUE_US, HRV_BAND_ID, N_BANDS,
};
use ndarray::{s, Array3, ArrayView2};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Decoded image section: requested band counts plus the per-line records
/// of every band line that was read.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub band_ids: Vec<u8>,
    pub window: ImageWindow,
    /// Packet header of each to-read line, per band. Empty for segmented products.
    pub packet_headers: Vec<Vec<PacketHeader>>,
    /// Line side info of each to-read line, per band. Empty for segmented products.
    pub line_side_info: Vec<Vec<LineSideInfo>>,
    /// Counts (band x line x column) over the requested grid
    pub counts: CountCube,
}

impl ImageData {
    /// Fill-initialized image for `band_ids` over `window`
    pub fn new(band_ids: &[u8], window: ImageWindow) -> Self {
        let n_bands = band_ids.len();
        Self {
            band_ids: band_ids.to_vec(),
            window,
            packet_headers: vec![vec![PacketHeader::default(); window.n_lines_to_read]; n_bands],
            line_side_info: vec![vec![LineSideInfo::default(); window.n_lines_to_read]; n_bands],
            counts: Array3::from_elem(
                (n_bands, window.n_lines_requested, window.n_columns_requested),
                FILL_VALUE_US,
            ),
        }
    }

    pub fn n_bands(&self) -> usize {
        self.band_ids.len()
    }

    pub fn n_lines(&self) -> usize {
        self.window.n_lines_requested
    }

    pub fn n_columns(&self) -> usize {
        self.window.n_columns_requested
    }

    /// Full disk line of the first output line
    pub fn i_line(&self) -> usize {
        self.window.i_line_requested
    }

    /// Full disk column of the first output column
    pub fn i_column(&self) -> usize {
        self.window.i_column_requested
    }

    pub fn band(&self, i: usize) -> ArrayView2<'_, u16> {
        self.counts.slice(s![i, .., ..])
    }
}

/// Everything decoded from a level 1.5 product
#[derive(Debug, Clone)]
pub struct SeviriData {
    pub marf: MarfHeader,
    pub packet_header1: PacketHeader,
    pub header: Header15,
    pub image: ImageData,
    pub packet_header2: PacketHeader,
    pub trailer: Trailer15,
}

impl SeviriData {
    pub fn satellite_id(&self) -> i16 {
        self.header.satellite_status.satellite_id
    }

    /// Julian times of the actual forward scan start and end
    pub fn scan_times(&self) -> (f64, f64) {
        let stats = &self.trailer.image_production_stats;
        (
            stats.act_scan_forward_start.to_julian(),
            stats.act_scan_forward_end.to_julian(),
        )
    }
}

/// Reject band lists the readers cannot serve
pub(crate) fn check_band_ids(band_ids: &[u8]) -> SeviriResult<()> {
    if band_ids.is_empty() {
        return Err(SeviriError::InvalidInput("no bands requested".to_string()));
    }

    for (i, &id) in band_ids.iter().enumerate() {
        if id < 1 || id as usize > N_BANDS {
            log::error!("Invalid SEVIRI band Id at band list element {}: {}", i, id);
            return Err(SeviriError::InvalidInput(format!(
                "Invalid SEVIRI band Id at band list element {}: {}",
                i, id
            )));
        }
    }

    if band_ids.contains(&HRV_BAND_ID) {
        log::error!("Reading of the HRV channel is not yet fully supported");
        return Err(SeviriError::Unsupported(
            "Reading of the HRV channel is not yet fully supported".to_string(),
        ));
    }

    Ok(())
}

/// Byte layout of the image section
#[derive(Debug, Clone, Copy)]
struct LineLayout {
    vir_line: u64,
    line_group: u64,
}

impl LineLayout {
    fn new(marf: &MarfHeader, window: &ImageWindow) -> Self {
        let record = (PACKET_HEADER_SIZE + LINE_SIDE_INFO_SIZE) as u64;
        let vir_line = record + packed_len(window.selected.n_columns) as u64;
        let hrv_line = record + (packed_len(window.selected.n_columns_hrv) / 2) as u64;
        let line_group =
            marf.n_bands_vir() as u64 * vir_line + marf.n_bands_hrv() as u64 * 3 * hrv_line;
        Self { vir_line, line_group }
    }
}

fn read_image<R: Read + Seek>(
    io: &mut SwapReader<R>,
    marf: &MarfHeader,
    band_ids: &[u8],
    window: ImageWindow,
) -> SeviriResult<ImageData> {
    let layout = LineLayout::new(marf, &window);
    let mut image = ImageData::new(band_ids, window);

    let positions: Vec<Option<usize>> =
        band_ids.iter().map(|&id| marf.band_position_in_file(id)).collect();
    for (id, position) in band_ids.iter().zip(&positions) {
        if position.is_none() {
            log::warn!("Band {} is not stored in this product, leaving it at fill", id);
        }
    }

    let skip = packed_len(window.i_column_to_read) as i64;
    let mut packed = vec![0u8; packed_len(window.n_columns_to_read)];
    let mut samples = vec![0u16; packed.len() / 5 * 4];

    let file_start = io.position()?;
    let mut offset = file_start + window.i_line_to_read as u64 * layout.line_group;

    log::debug!(
        "Image section at byte {}: line record {} bytes, line group {} bytes",
        file_start, layout.vir_line, layout.line_group
    );

    for i in 0..window.n_lines_to_read {
        for (i_band, position) in positions.iter().enumerate() {
            let Some(position) = *position else { continue };

            io.seek(SeekFrom::Start(offset + position as u64 * layout.vir_line))?;
            image.packet_headers[i_band][i].transfer(io)?;
            image.line_side_info[i_band][i].transfer(io)?;

            io.seek(SeekFrom::Current(skip))?;
            io.bytes(&mut packed)?;
            unpack_10bit(&packed, &mut samples)?;

            let (line, column) = window.output_index(i, 0);
            image
                .counts
                .slice_mut(s![i_band, line, column..column + samples.len()])
                .iter_mut()
                .zip(samples.iter())
                .for_each(|(out, &v)| *out = v);
        }
        offset += layout.line_group;
    }

    io.seek(SeekFrom::Start(
        file_start + window.selected.n_lines as u64 * layout.line_group,
    ))?;

    Ok(image)
}

fn write_image<W: std::io::Write>(io: &mut SwapWriter<W>, image: &ImageData) -> SeviriResult<()> {
    let window = &image.window;
    let mut packed = vec![0u8; packed_len(window.n_columns_to_read)];

    for i in 0..window.n_lines_to_read {
        let (line, column) = window.output_index(i, 0);
        for i_band in 0..image.n_bands() {
            let mut packet_header = image.packet_headers[i_band][i];
            let mut line_side_info = image.line_side_info[i_band][i];
            packet_header.transfer(io)?;
            line_side_info.transfer(io)?;

            let row = image.counts.slice(s![i_band, line, column..column + window.n_columns_to_read]);
            // Fill is stored as count 0, the no-data count
            let samples: Vec<u16> = row
                .iter()
                .map(|&c| if c == FILL_VALUE_US { 0 } else { c })
                .collect();
            pack_10bit(&samples, &mut packed)?;
            io.bytes(&mut packed)?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> SeviriResult<File> {
    File::open(path).map_err(|e| {
        log::error!("Problem opening file for reading: {} ... {}", path.display(), e);
        SeviriError::Io(e)
    })
}

/// Read the MARF header and 15HEADER and resolve `bounds` into
/// `(i_line, i_column, n_lines, n_columns)` of the requested grid without
/// decoding the image. Zip archives are extracted first.
pub fn get_dimens<P: AsRef<Path>>(path: P, bounds: &Bounds) -> SeviriResult<(usize, usize, usize, usize)> {
    let (path, _extracted) = native_source(path.as_ref())?;
    let mut io = SwapReader::new(BufReader::new(open(&path)?));

    let marf: MarfHeader = read_record(&mut io)?;
    let _: PacketHeader = read_record(&mut io)?;
    let header: Header15 = read_record(&mut io)?;

    let sub_lon = header.image_description.longitude_of_ssp as f64;
    let window = resolve_window(&marf, bounds, sub_lon)?;
    Ok(window.requested_dimensions())
}

/// Read bands `band_ids` of a native product over `bounds`
pub fn read_native<P: AsRef<Path>>(path: P, band_ids: &[u8], bounds: &Bounds) -> SeviriResult<SeviriData> {
    let path = path.as_ref();
    check_band_ids(band_ids)?;

    log::info!("Reading native product {}", path.display());

    let mut io = SwapReader::new(BufReader::new(open(path)?));

    let marf: MarfHeader = read_record(&mut io)?;
    let packet_header1: PacketHeader = read_record(&mut io)?;
    let header: Header15 = read_record(&mut io)?;

    let sub_lon = header.image_description.longitude_of_ssp as f64;
    let window = resolve_window(&marf, bounds, sub_lon)?;
    log::info!(
        "Window {} resolved to {} lines x {} columns at ({}, {})",
        bounds,
        window.n_lines_requested,
        window.n_columns_requested,
        window.i_line_requested,
        window.i_column_requested
    );

    let image = read_image(&mut io, &marf, band_ids, window)?;
    let packet_header2: PacketHeader = read_record(&mut io)?;
    let trailer: Trailer15 = read_record(&mut io)?;

    Ok(SeviriData { marf, packet_header1, header, image, packet_header2, trailer })
}

/// Write `data` in the native layout. The image section holds the to-read
/// window of every band in `data.image`.
pub fn write_native<P: AsRef<Path>>(path: P, data: &SeviriData) -> SeviriResult<()> {
    let path = path.as_ref();
    log::info!("Writing native product {}", path.display());

    let file = File::create(path).map_err(|e| {
        log::error!("Problem opening file for writing: {} ... {}", path.display(), e);
        SeviriError::Io(e)
    })?;
    let mut io = SwapWriter::new(BufWriter::new(file));

    // Records are transferred through &mut, so work on a copy of the headers
    let mut marf = data.marf.clone();
    let mut packet_header1 = data.packet_header1;
    let mut header = data.header.clone();
    let mut packet_header2 = data.packet_header2;
    let mut trailer = data.trailer.clone();

    marf.transfer(&mut io)?;
    packet_header1.transfer(&mut io)?;
    header.transfer(&mut io)?;
    write_image(&mut io, &data.image)?;
    packet_header2.transfer(&mut io)?;
    trailer.transfer(&mut io)?;
    io.flush()?;

    Ok(())
}

/// A native product extracted from a zip archive. The temporary copy is
/// removed when this value is dropped.
pub struct ExtractedProduct {
    file: tempfile::NamedTempFile,
    pub member: String,
}

impl ExtractedProduct {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Extract the first `.nat` member of a zip archive to a temporary file
pub fn extract_native_from_zip<P: AsRef<Path>>(zip_path: P) -> SeviriResult<ExtractedProduct> {
    let zip_path = zip_path.as_ref();
    let mut archive = ZipArchive::new(open(zip_path)?)?;

    let member = archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(".nat"))
        .map(str::to_string)
        .ok_or_else(|| {
            log::error!("No .nat member in {}", zip_path.display());
            SeviriError::InvalidFormat(format!("no .nat file in archive {}", zip_path.display()))
        })?;

    log::info!("Extracting {} from {}", member, zip_path.display());

    let mut zip_file = archive.by_name(&member)?;
    let mut temp_file = tempfile::Builder::new().suffix(".nat").tempfile()?;
    std::io::copy(&mut zip_file, &mut temp_file)?;

    Ok(ExtractedProduct { file: temp_file, member })
}

/// True for paths naming a zip archive
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Native product path, extracting zip archives first
pub fn native_source(path: &Path) -> SeviriResult<(PathBuf, Option<ExtractedProduct>)> {
    if is_zip(path) {
        let extracted = extract_native_from_zip(path)?;
        Ok((extracted.path().to_path_buf(), Some(extracted)))
    } else {
        Ok((path.to_path_buf(), None))
    }
}
