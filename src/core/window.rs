//! Resolution of a bounds request into read and output geometry.

use crate::core::navigation::{latlon_to_pixel, NAV_SCALING_VIR};
use crate::io::records::MarfHeader;
use crate::types::{Bounds, SeviriError, SeviriResult, IMAGE_SIZE_VIR_COLUMNS, IMAGE_SIZE_VIR_LINES};
use serde::{Deserialize, Serialize};

/// The rectangle actually stored in a product, 0-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRectangle {
    pub i0_line: usize,
    pub i1_line: usize,
    pub i0_column: usize,
    pub i1_column: usize,
    pub n_lines: usize,
    pub n_columns: usize,
    pub n_lines_hrv: usize,
    pub n_columns_hrv: usize,
}

impl SelectedRectangle {
    /// Read the selected rectangle from the product header, converting
    /// the 1-based bounds to 0-based.
    pub fn from_marf(marf: &MarfHeader) -> SeviriResult<Self> {
        let s = &marf.secondary;

        let south = s.south_line_selected_rectangle.value_u32()?;
        let north = s.north_line_selected_rectangle.value_u32()?;
        let east = s.east_column_selected_rectangle.value_u32()?;
        let west = s.west_column_selected_rectangle.value_u32()?;

        if south == 0
            || east == 0
            || north < south
            || west < east
            || north as usize > IMAGE_SIZE_VIR_LINES
            || west as usize > IMAGE_SIZE_VIR_COLUMNS
        {
            return Err(format_error(format!(
                "invalid selected rectangle: lines {}..{}, columns {}..{}",
                south, north, east, west
            )));
        }

        let n_lines = s.number_lines_visir.value_u32()?;
        let n_columns = s.number_columns_visir.value_u32()?;
        if n_lines != north - south + 1 || n_columns != west - east + 1 {
            return Err(format_error(format!(
                "selected rectangle lines {}..{}, columns {}..{} disagree with {} x {} VIS/IR samples",
                south, north, east, west, n_lines, n_columns
            )));
        }

        Ok(Self {
            i0_line: south as usize - 1,
            i1_line: north as usize - 1,
            i0_column: east as usize - 1,
            i1_column: west as usize - 1,
            n_lines: n_lines as usize,
            n_columns: n_columns as usize,
            n_lines_hrv: s.number_lines_hrv.value_u32()? as usize,
            n_columns_hrv: s.number_columns_hrv.value_u32()? as usize,
        })
    }
}

/// Read and output geometry of one image read.
///
/// `requested` is the output grid on the full disk, `to_read` is the part
/// of the stored rectangle that is decoded (relative to the rectangle
/// origin), and `in_output` is where the first decoded sample lands in the
/// output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageWindow {
    pub selected: SelectedRectangle,

    pub i_line_requested: usize,
    pub i_column_requested: usize,
    pub n_lines_requested: usize,
    pub n_columns_requested: usize,

    pub i_line_to_read: usize,
    pub i_column_to_read: usize,
    pub n_lines_to_read: usize,
    pub n_columns_to_read: usize,

    pub i_line_in_output: usize,
    pub i_column_in_output: usize,
}

impl ImageWindow {
    /// `(i_line, i_column, n_lines, n_columns)` of the requested grid
    pub fn requested_dimensions(&self) -> (usize, usize, usize, usize) {
        (
            self.i_line_requested,
            self.i_column_requested,
            self.n_lines_requested,
            self.n_columns_requested,
        )
    }

    /// Output grid position of decoded sample (`line`, `column`), both
    /// relative to the to-read window.
    pub fn output_index(&self, line: usize, column: usize) -> (usize, usize) {
        (self.i_line_in_output + line, self.i_column_in_output + column)
    }
}

fn format_error(msg: String) -> SeviriError {
    log::error!("{}", msg);
    SeviriError::InvalidFormat(msg)
}

fn input_error(msg: String) -> SeviriError {
    log::error!("{}", msg);
    SeviriError::InvalidInput(msg)
}

fn check_column_alignment(column0: i64, column1: i64, i0_column: i64) -> SeviriResult<()> {
    if (column0 - i0_column).rem_euclid(4) != 0 || (column1 - i0_column).rem_euclid(4) != 3 {
        return Err(input_error(
            "column bounds must be on boundaries of a multiple of 4".to_string(),
        ));
    }
    Ok(())
}

/// Convert the lat/lon corners to a column-aligned line/column box.
///
/// (`lat0`, `lon1`) is the south-east corner and (`lat1`, `lon0`) the
/// north-west corner on the south-up, east-left grid.
fn latlon_box(
    lat0: f64,
    lat1: f64,
    lon0: f64,
    lon1: f64,
    sub_lon: f64,
    i0_column: i64,
) -> SeviriResult<(i64, i64, i64, i64)> {
    let (line0, column0) = latlon_to_pixel(lat0, lon1, sub_lon, &NAV_SCALING_VIR).ok_or_else(|| {
        input_error(format!("corner (lat = {}, lon = {}) is not on the earth disk", lat0, lon1))
    })?;
    let (line1, column1) = latlon_to_pixel(lat1, lon0, sub_lon, &NAV_SCALING_VIR).ok_or_else(|| {
        input_error(format!("corner (lat = {}, lon = {}) is not on the earth disk", lat1, lon0))
    })?;

    let line0 = line0 as i64 - 1;
    let line1 = line1 as i64 - 1;
    let mut column0 = column0 as i64 - 1;
    let mut column1 = column1 as i64 - 1;

    // Snap outward to whole 4-sample groups
    column0 = i0_column + (column0 - i0_column).div_euclid(4) * 4;
    if (column1 - i0_column).rem_euclid(4) != 3 {
        column1 = i0_column + ((column1 - i0_column).div_euclid(4) + 1) * 4 - 1;
    }

    Ok((line0, line1, column0, column1))
}

/// Resolve `bounds` against the product header.
///
/// `sub_lon` is the sub-satellite longitude used by the lat/lon mode.
pub fn resolve_window(marf: &MarfHeader, bounds: &Bounds, sub_lon: f64) -> SeviriResult<ImageWindow> {
    let selected = SelectedRectangle::from_marf(marf)?;
    resolve_selected(selected, bounds, sub_lon)
}

/// Same as [`resolve_window`] for an already parsed rectangle
pub fn resolve_selected(
    selected: SelectedRectangle,
    bounds: &Bounds,
    sub_lon: f64,
) -> SeviriResult<ImageWindow> {
    let window = match *bounds {
        Bounds::FullDisk => ImageWindow {
            selected,
            i_line_requested: 0,
            i_column_requested: 0,
            n_lines_requested: IMAGE_SIZE_VIR_LINES,
            n_columns_requested: IMAGE_SIZE_VIR_COLUMNS,
            i_line_to_read: 0,
            i_column_to_read: 0,
            n_lines_to_read: selected.n_lines,
            n_columns_to_read: selected.n_columns,
            i_line_in_output: selected.i0_line,
            i_column_in_output: selected.i0_column,
        },
        Bounds::ActualImage => ImageWindow {
            selected,
            i_line_requested: selected.i0_line,
            i_column_requested: selected.i0_column,
            n_lines_requested: selected.n_lines,
            n_columns_requested: selected.n_columns,
            i_line_to_read: 0,
            i_column_to_read: 0,
            n_lines_to_read: selected.n_lines,
            n_columns_to_read: selected.n_columns,
            i_line_in_output: 0,
            i_column_in_output: 0,
        },
        Bounds::LineColumn { line0, line1, column0, column1 } => {
            let i0_column = selected.i0_column as i64;
            check_column_alignment(column0 as i64, column1 as i64, i0_column)?;
            line_column_window(selected, line0 as i64, line1 as i64, column0 as i64, column1 as i64)?
        }
        Bounds::LatLon { lat0, lat1, lon0, lon1 } => {
            let (line0, line1, column0, column1) =
                latlon_box(lat0, lat1, lon0, lon1, sub_lon, selected.i0_column as i64)?;
            log::debug!(
                "Lat/lon box maps to lines {}..{}, columns {}..{}",
                line0, line1, column0, column1
            );
            line_column_window(selected, line0, line1, column0, column1)?
        }
    };

    log::debug!(
        "Window: requested ({}, {}) {}x{}, to read ({}, {}) {}x{}, in output ({}, {})",
        window.i_line_requested,
        window.i_column_requested,
        window.n_lines_requested,
        window.n_columns_requested,
        window.i_line_to_read,
        window.i_column_to_read,
        window.n_lines_to_read,
        window.n_columns_to_read,
        window.i_line_in_output,
        window.i_column_in_output
    );

    Ok(window)
}

fn line_column_window(
    selected: SelectedRectangle,
    line0: i64,
    line1: i64,
    column0: i64,
    column1: i64,
) -> SeviriResult<ImageWindow> {
    let i0_line = selected.i0_line as i64;
    let i0_column = selected.i0_column as i64;
    let last_line = i0_line + selected.n_lines as i64 - 1;
    let last_column = i0_column + selected.n_columns as i64 - 1;

    if line0 < i0_line {
        return Err(input_error(format!(
            "requested start line (line0 = {}) is less than that of the actual image: {}",
            line0, i0_line
        )));
    }
    if line1 > last_line {
        return Err(input_error(format!(
            "requested end line (line1 = {}) is greater than that of the actual image: {}",
            line1, selected.i1_line
        )));
    }
    if column0 < i0_column {
        return Err(input_error(format!(
            "requested start column (column0 = {}) is less than that of the actual image: {}",
            column0, i0_column
        )));
    }
    if column1 > last_column {
        return Err(input_error(format!(
            "requested end column (column1 = {}) is greater than that of the actual image: {}",
            column1, selected.i1_column
        )));
    }
    if line1 < line0 || column1 < column0 {
        return Err(input_error(format!(
            "requested bounds are empty: lines {}..{}, columns {}..{}",
            line0, line1, column0, column1
        )));
    }

    let i_line_requested = line0 as usize;
    let i_column_requested = column0 as usize;
    let n_lines_requested = (line1 - line0 + 1) as usize;
    let n_columns_requested = (column1 - column0 + 1) as usize;

    let i_line_to_read = i_line_requested.saturating_sub(selected.i0_line);
    let i_column_to_read = i_column_requested.saturating_sub(selected.i0_column);

    Ok(ImageWindow {
        selected,
        i_line_requested,
        i_column_requested,
        n_lines_requested,
        n_columns_requested,
        i_line_to_read,
        i_column_to_read,
        n_lines_to_read: (selected.n_lines - i_line_to_read).min(n_lines_requested),
        n_columns_to_read: (selected.n_columns - i_column_to_read).min(n_columns_requested),
        i_line_in_output: 0,
        i_column_in_output: 0,
    })
}
