//! Level 1.5 header (15HEADER) records.
//!
//! Table fields are held in `Vec`s and resized to their on-disk length
//! before every transfer, so a default-constructed record always encodes
//! to the exact format size.

use crate::io::records::{CdsExpandedTime, CdsShortTime};
use crate::io::swap::{Record, Transfer};
use crate::types::{SeviriResult, N_BANDS};

pub const N_ORBIT_COEFS: usize = 100;
pub const N_EPHEMERIS_COEFS: usize = 100;
pub const N_DETECTORS: usize = 42;

pub const ATTITUDE_BLOB_SIZE: usize = 20420;
pub const UTC_CORRELATION_BLOB_SIZE: usize = 59;
pub const TIME_GENERALIZED_BLOB_SIZE: usize = 134915;
pub const BLACK_BODY_BLOB_SIZE: usize = 967;
pub const RADIOMETRIC_TAIL_BLOB_SIZE: usize = 19200;
pub const IMPF_CONFIGURATION_SIZE: usize = 19786;

/// Total encoded size of the 15HEADER
pub const HEADER15_SIZE: usize = 445248;

pub(crate) fn fixed<T: Default + Clone>(v: &mut Vec<T>, n: usize) -> &mut [T] {
    v.resize(n, T::default());
    v.as_mut_slice()
}

/// One time-windowed orbit polynomial segment (positions in km)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitCoef {
    pub start_time: CdsShortTime,
    pub end_time: CdsShortTime,
    pub x: [f64; 8],
    pub y: [f64; 8],
    pub z: [f64; 8],
    pub vx: [f64; 8],
    pub vy: [f64; 8],
    pub vz: [f64; 8],
}

impl Record for OrbitCoef {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.start_time.transfer(io)?;
        self.end_time.transfer(io)?;
        io.f64s(&mut self.x)?;
        io.f64s(&mut self.y)?;
        io.f64s(&mut self.z)?;
        io.f64s(&mut self.vx)?;
        io.f64s(&mut self.vy)?;
        io.f64s(&mut self.vz)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SatelliteStatus {
    pub satellite_id: i16,
    pub nominal_longitude: f32,
    pub satellite_status: u8,
    pub last_manoeuvre_flag: u8,
    pub last_manoeuvre_start_time: CdsShortTime,
    pub last_manoeuvre_end_time: CdsShortTime,
    pub last_manoeuvre_type: u8,
    pub next_manoeuvre_flag: u8,
    pub next_manoeuvre_start_time: CdsShortTime,
    pub next_manoeuvre_end_time: CdsShortTime,
    pub next_manoeuvre_type: u8,
    pub period_start_time: CdsShortTime,
    pub period_end_time: CdsShortTime,
    pub orbit_polynomial: Vec<OrbitCoef>,
    pub attitude: Vec<u8>,
    pub spin_rate_at_rc_start: f64,
    pub utc_correlation: Vec<u8>,
}

impl Record for SatelliteStatus {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i16(&mut self.satellite_id)?;
        io.f32(&mut self.nominal_longitude)?;
        io.u8(&mut self.satellite_status)?;
        io.u8(&mut self.last_manoeuvre_flag)?;
        self.last_manoeuvre_start_time.transfer(io)?;
        self.last_manoeuvre_end_time.transfer(io)?;
        io.u8(&mut self.last_manoeuvre_type)?;
        io.u8(&mut self.next_manoeuvre_flag)?;
        self.next_manoeuvre_start_time.transfer(io)?;
        self.next_manoeuvre_end_time.transfer(io)?;
        io.u8(&mut self.next_manoeuvre_type)?;
        self.period_start_time.transfer(io)?;
        self.period_end_time.transfer(io)?;
        io.records(fixed(&mut self.orbit_polynomial, N_ORBIT_COEFS))?;
        io.bytes(fixed(&mut self.attitude, ATTITUDE_BLOB_SIZE))?;
        io.f64(&mut self.spin_rate_at_rc_start)?;
        io.bytes(fixed(&mut self.utc_correlation, UTC_CORRELATION_BLOB_SIZE))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAcquisition {
    pub true_repeat_cycle_start: CdsExpandedTime,
    pub planned_forward_scan_end: CdsExpandedTime,
    pub planned_repeat_cycle_end: CdsExpandedTime,
    pub channel_status: [u8; N_BANDS],
    pub detector_status: Vec<u8>,
    pub mdu_sampling_delays: Vec<u16>,
    pub mdu_nom_hrv_delay1: u16,
    pub mdu_nom_hrv_delay2: u16,
    pub spare: [u8; 2],
    pub mdu_nom_hrv_breakline: u16,
    pub dhss_synch_selection: u8,
    pub mdu_out_gain: Vec<u16>,
    pub mdu_course_gain: Vec<u8>,
    pub mdu_fine_gain: Vec<u16>,
    pub mdu_numerical_offset: Vec<u16>,
    pub pu_gain: Vec<u16>,
    pub pu_offset: Vec<u16>,
    pub pu_bias: Vec<u16>,
    pub l0_line_counter: u16,
    pub k1_retrace_lines: u16,
    pub k2_pause_deciseconds: u16,
    pub k3_retrace_lines: u16,
    pub k4_pause_deciseconds: u16,
    pub k5_retrace_lines: u16,
    pub x_deep_space_window_pos: u8,
    pub refocusing_lines: u16,
    pub refocusing_direction: u8,
    pub refocusing_position: u16,
    pub scan_ref_pos_flag: u8,
    pub scan_ref_pos_number: u16,
    pub scan_ref_pot_val: f32,
    pub scan_first_line: u16,
    pub scan_last_line: u16,
    pub retrace_start_line: u16,
    pub last_gain_change_flag: u8,
    pub last_gain_change_time: CdsShortTime,
    pub decontamination_now: u8,
    pub decontamination_start: CdsShortTime,
    pub decontamination_end: CdsShortTime,
    pub bb_cal_scheduled: u8,
    pub bb_calibration_type: u8,
    pub bb_first_line: u16,
    pub bb_last_line: u16,
    pub cold_focal_plane_op_temp: u16,
    pub warm_focal_plane_op_temp: u16,
}

impl Record for ImageAcquisition {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.true_repeat_cycle_start.transfer(io)?;
        self.planned_forward_scan_end.transfer(io)?;
        self.planned_repeat_cycle_end.transfer(io)?;
        io.bytes(&mut self.channel_status)?;
        io.bytes(fixed(&mut self.detector_status, N_DETECTORS))?;
        io.u16s(fixed(&mut self.mdu_sampling_delays, N_DETECTORS))?;
        io.u16(&mut self.mdu_nom_hrv_delay1)?;
        io.u16(&mut self.mdu_nom_hrv_delay2)?;
        io.bytes(&mut self.spare)?;
        io.u16(&mut self.mdu_nom_hrv_breakline)?;
        io.u8(&mut self.dhss_synch_selection)?;
        io.u16s(fixed(&mut self.mdu_out_gain, N_DETECTORS))?;
        io.bytes(fixed(&mut self.mdu_course_gain, N_DETECTORS))?;
        io.u16s(fixed(&mut self.mdu_fine_gain, N_DETECTORS))?;
        io.u16s(fixed(&mut self.mdu_numerical_offset, N_DETECTORS))?;
        io.u16s(fixed(&mut self.pu_gain, N_DETECTORS))?;
        io.u16s(fixed(&mut self.pu_offset, 27))?;
        io.u16s(fixed(&mut self.pu_bias, 15))?;
        io.u16(&mut self.l0_line_counter)?;
        io.u16(&mut self.k1_retrace_lines)?;
        io.u16(&mut self.k2_pause_deciseconds)?;
        io.u16(&mut self.k3_retrace_lines)?;
        io.u16(&mut self.k4_pause_deciseconds)?;
        io.u16(&mut self.k5_retrace_lines)?;
        io.u8(&mut self.x_deep_space_window_pos)?;
        io.u16(&mut self.refocusing_lines)?;
        io.u8(&mut self.refocusing_direction)?;
        io.u16(&mut self.refocusing_position)?;
        io.u8(&mut self.scan_ref_pos_flag)?;
        io.u16(&mut self.scan_ref_pos_number)?;
        io.f32(&mut self.scan_ref_pot_val)?;
        io.u16(&mut self.scan_first_line)?;
        io.u16(&mut self.scan_last_line)?;
        io.u16(&mut self.retrace_start_line)?;
        io.u8(&mut self.last_gain_change_flag)?;
        self.last_gain_change_time.transfer(io)?;
        io.u8(&mut self.decontamination_now)?;
        self.decontamination_start.transfer(io)?;
        self.decontamination_end.transfer(io)?;
        io.u8(&mut self.bb_cal_scheduled)?;
        io.u8(&mut self.bb_calibration_type)?;
        io.u16(&mut self.bb_first_line)?;
        io.u16(&mut self.bb_last_line)?;
        io.u16(&mut self.cold_focal_plane_op_temp)?;
        io.u16(&mut self.warm_focal_plane_op_temp)?;
        Ok(())
    }
}

/// Earth, Moon or Sun ephemeris segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EphemerisCoef {
    pub start_time: CdsShortTime,
    pub end_time: CdsShortTime,
    pub alpha_coef: [f64; 8],
    pub beta_coef: [f64; 8],
}

impl Record for EphemerisCoef {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.start_time.transfer(io)?;
        self.end_time.transfer(io)?;
        io.f64s(&mut self.alpha_coef)?;
        io.f64s(&mut self.beta_coef)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarCoef {
    pub star_id: u16,
    pub start_time: CdsShortTime,
    pub end_time: CdsShortTime,
    pub alpha_coef: [f64; 8],
    pub beta_coef: [f64; 8],
}

impl Record for StarCoef {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u16(&mut self.star_id)?;
        self.start_time.transfer(io)?;
        self.end_time.transfer(io)?;
        io.f64s(&mut self.alpha_coef)?;
        io.f64s(&mut self.beta_coef)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CelestialEvents {
    pub period_start_time: CdsShortTime,
    pub period_end_time: CdsShortTime,
    pub related_orbit_file_time: Vec<u8>,
    pub related_attitude_file_time: Vec<u8>,
    pub earth_ephemeris: Vec<EphemerisCoef>,
    pub moon_ephemeris: Vec<EphemerisCoef>,
    pub sun_ephemeris: Vec<EphemerisCoef>,
    pub star_ephemeris: Vec<StarCoef>,
    pub type_of_eclipse: u8,
    pub eclipse_start_time: CdsShortTime,
    pub eclipse_end_time: CdsShortTime,
    pub visible_bodies_in_image: u8,
    pub bodies_close_to_fov: u8,
    pub impact_on_image_quality: u8,
}

impl Record for CelestialEvents {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        self.period_start_time.transfer(io)?;
        self.period_end_time.transfer(io)?;
        io.bytes(fixed(&mut self.related_orbit_file_time, TIME_GENERALIZED_BLOB_SIZE))?;
        io.bytes(fixed(&mut self.related_attitude_file_time, TIME_GENERALIZED_BLOB_SIZE))?;
        io.records(fixed(&mut self.earth_ephemeris, N_EPHEMERIS_COEFS))?;
        io.records(fixed(&mut self.moon_ephemeris, N_EPHEMERIS_COEFS))?;
        io.records(fixed(&mut self.sun_ephemeris, N_EPHEMERIS_COEFS))?;
        io.records(fixed(&mut self.star_ephemeris, N_EPHEMERIS_COEFS))?;
        io.u8(&mut self.type_of_eclipse)?;
        self.eclipse_start_time.transfer(io)?;
        self.eclipse_end_time.transfer(io)?;
        io.u8(&mut self.visible_bodies_in_image)?;
        io.u8(&mut self.bodies_close_to_fov)?;
        io.u8(&mut self.impact_on_image_quality)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReferenceGrid {
    pub number_of_lines: i32,
    pub number_of_columns: i32,
    pub line_dir_grid_step: f32,
    pub column_dir_grid_step: f32,
    pub grid_origin: u8,
}

impl Record for ReferenceGrid {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i32(&mut self.number_of_lines)?;
        io.i32(&mut self.number_of_columns)?;
        io.f32(&mut self.line_dir_grid_step)?;
        io.f32(&mut self.column_dir_grid_step)?;
        io.u8(&mut self.grid_origin)?;
        Ok(())
    }
}

/// Southern, northern, eastern and western bound of a coverage
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coverage {
    pub southern_line: i32,
    pub northern_line: i32,
    pub eastern_column: i32,
    pub western_column: i32,
}

impl Record for Coverage {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i32(&mut self.southern_line)?;
        io.i32(&mut self.northern_line)?;
        io.i32(&mut self.eastern_column)?;
        io.i32(&mut self.western_column)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageDescription {
    pub type_of_projection: u8,
    pub longitude_of_ssp: f32,
    pub reference_grid_vis_ir: ReferenceGrid,
    pub reference_grid_hrv: ReferenceGrid,
    pub planned_coverage_vis_ir: Coverage,
    pub planned_coverage_hrv_lower: Coverage,
    pub planned_coverage_hrv_upper: Coverage,
    pub image_proc_direction: u8,
    pub pixel_gen_direction: u8,
    pub planned_chan_processing: [u8; N_BANDS],
}

impl Record for ImageDescription {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.type_of_projection)?;
        io.f32(&mut self.longitude_of_ssp)?;
        self.reference_grid_vis_ir.transfer(io)?;
        self.reference_grid_hrv.transfer(io)?;
        self.planned_coverage_vis_ir.transfer(io)?;
        self.planned_coverage_hrv_lower.transfer(io)?;
        self.planned_coverage_hrv_upper.transfer(io)?;
        io.u8(&mut self.image_proc_direction)?;
        io.u8(&mut self.pixel_gen_direction)?;
        io.bytes(&mut self.planned_chan_processing)?;
        Ok(())
    }
}

/// Nominal linear calibration of one band
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageCalibration {
    pub cal_slope: f64,
    pub cal_offset: f64,
}

impl Record for ImageCalibration {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f64(&mut self.cal_slope)?;
        io.f64(&mut self.cal_offset)?;
        Ok(())
    }
}

/// MPEF absolute calibration feedback of one band, including the GSICS
/// inter-calibration coefficients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MpefCalFeedback {
    pub image_quality_flag: u8,
    pub reference_data_flag: u8,
    pub abs_cal_method: u8,
    pub pad: u8,
    pub abs_cal_weight_vic: f32,
    pub abs_cal_weight_xsat: f32,
    pub abs_cal_coeff: f32,
    pub abs_cal_error: f32,
    pub gsics_cal_coeff: f32,
    pub gsics_cal_error: f32,
    pub gsics_offset_count: f32,
}

impl Record for MpefCalFeedback {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.image_quality_flag)?;
        io.u8(&mut self.reference_data_flag)?;
        io.u8(&mut self.abs_cal_method)?;
        io.u8(&mut self.pad)?;
        io.f32(&mut self.abs_cal_weight_vic)?;
        io.f32(&mut self.abs_cal_weight_xsat)?;
        io.f32(&mut self.abs_cal_coeff)?;
        io.f32(&mut self.abs_cal_error)?;
        io.f32(&mut self.gsics_cal_coeff)?;
        io.f32(&mut self.gsics_cal_error)?;
        io.f32(&mut self.gsics_offset_count)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadiometricProcessing {
    pub radiance_linearization: [u8; N_BANDS],
    pub detector_equalization: [u8; N_BANDS],
    pub on_board_calibration_result: [u8; N_BANDS],
    pub mpef_cal_feedback_flags: [u8; N_BANDS],
    pub mtf_adaptation: [u8; N_BANDS],
    pub straylight_correction_flag: [u8; N_BANDS],
    pub level1_5_image_calibration: [ImageCalibration; N_BANDS],
    pub black_body_data: Vec<u8>,
    pub mpef_cal_feedback: [MpefCalFeedback; N_BANDS],
    pub radiometric_tail: Vec<u8>,
}

impl Record for RadiometricProcessing {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.bytes(&mut self.radiance_linearization)?;
        io.bytes(&mut self.detector_equalization)?;
        io.bytes(&mut self.on_board_calibration_result)?;
        io.bytes(&mut self.mpef_cal_feedback_flags)?;
        io.bytes(&mut self.mtf_adaptation)?;
        io.bytes(&mut self.straylight_correction_flag)?;
        io.records(&mut self.level1_5_image_calibration)?;
        io.bytes(fixed(&mut self.black_body_data, BLACK_BODY_BLOB_SIZE))?;
        io.records(&mut self.mpef_cal_feedback)?;
        io.bytes(fixed(&mut self.radiometric_tail, RADIOMETRIC_TAIL_BLOB_SIZE))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometricProcessing {
    pub e_w_focal_plane: Vec<f32>,
    pub n_s_focal_plane: Vec<f32>,
    pub type_of_earth_model: u8,
    pub equatorial_radius: f64,
    pub north_polar_radius: f64,
    pub south_polar_radius: f64,
    pub atmospheric_model: Vec<f32>,
    pub resampling_functions: [u8; N_BANDS],
}

impl Record for GeometricProcessing {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f32s(fixed(&mut self.e_w_focal_plane, N_DETECTORS))?;
        io.f32s(fixed(&mut self.n_s_focal_plane, N_DETECTORS))?;
        io.u8(&mut self.type_of_earth_model)?;
        io.f64(&mut self.equatorial_radius)?;
        io.f64(&mut self.north_polar_radius)?;
        io.f64(&mut self.south_polar_radius)?;
        io.f32s(fixed(&mut self.atmospheric_model, N_BANDS * 360))?;
        io.bytes(&mut self.resampling_functions)?;
        Ok(())
    }
}

/// Complete 15HEADER
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header15 {
    pub version: u8,
    pub satellite_status: SatelliteStatus,
    pub image_acquisition: ImageAcquisition,
    pub celestial_events: CelestialEvents,
    pub image_description: ImageDescription,
    pub radiometric_processing: RadiometricProcessing,
    pub geometric_processing: GeometricProcessing,
    pub impf_configuration: Vec<u8>,
}

impl Record for Header15 {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.version)?;
        self.satellite_status.transfer(io)?;
        self.image_acquisition.transfer(io)?;
        self.celestial_events.transfer(io)?;
        self.image_description.transfer(io)?;
        self.radiometric_processing.transfer(io)?;
        self.geometric_processing.transfer(io)?;
        io.bytes(fixed(&mut self.impf_configuration, IMPF_CONFIGURATION_SIZE))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::swap::{read_record, SwapReader, SwapWriter};
    use std::io::Cursor;

    fn encode<R: Record>(record: &mut R) -> Vec<u8> {
        let mut io = SwapWriter::new(Vec::new());
        record.transfer(&mut io).unwrap();
        io.into_inner()
    }

    #[test]
    fn test_sub_record_sizes() {
        assert_eq!(encode(&mut SatelliteStatus::default()).len(), 60134);
        assert_eq!(encode(&mut ImageAcquisition::default()).len(), 700);
        assert_eq!(encode(&mut CelestialEvents::default()).len(), 326058);
        assert_eq!(encode(&mut ImageDescription::default()).len(), 101);
        assert_eq!(encode(&mut RadiometricProcessing::default()).len(), 20815);
        assert_eq!(encode(&mut GeometricProcessing::default()).len(), 17653);
        assert_eq!(encode(&mut Header15::default()).len(), HEADER15_SIZE);
    }

    #[test]
    fn test_calibration_fields_are_big_endian() {
        let mut rad = RadiometricProcessing::default();
        rad.level1_5_image_calibration[0].cal_slope = 1.0;
        let bytes = encode(&mut rad);
        // Six 12-byte flag arrays precede the calibration table
        assert_eq!(&bytes[72..80], &1.0f64.to_be_bytes());
    }

    #[test]
    fn test_header_decodes_what_was_written() {
        let mut header = Header15::default();
        header.satellite_status.satellite_id = 322;
        header.satellite_status.orbit_polynomial = vec![OrbitCoef::default(); N_ORBIT_COEFS];
        header.satellite_status.orbit_polynomial[5].x[0] = 42164.0;
        header.image_description.longitude_of_ssp = 0.0;
        header.radiometric_processing.mpef_cal_feedback[8].gsics_cal_coeff = 0.5;
        header.geometric_processing.equatorial_radius = 6378.169;

        let bytes = encode(&mut header);
        let mut reader = SwapReader::new(Cursor::new(bytes));
        let decoded: Header15 = read_record(&mut reader).unwrap();

        assert_eq!(decoded.satellite_status.satellite_id, 322);
        assert_eq!(decoded.satellite_status.orbit_polynomial[5].x[0], 42164.0);
        assert_eq!(decoded.radiometric_processing.mpef_cal_feedback[8].gsics_cal_coeff, 0.5);
        assert_eq!(decoded.geometric_processing.equatorial_radius, 6378.169);
    }
}
