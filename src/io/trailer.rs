//! Level 1.5 trailer (15TRAILER) records.

use crate::io::header::{fixed, Coverage};
use crate::io::records::{CdsShortTime, CdsTime};
use crate::io::swap::{Record, Transfer};
use crate::types::{SeviriResult, N_BANDS};

pub const N_HORIZONS: usize = 4;
pub const N_STARS: usize = 20;
pub const N_LANDMARKS: usize = 50;
pub const N_L10_CHANNELS: usize = 42;
pub const TRAILER_TAIL_SIZE: usize = 214;

/// Total encoded size of the 15TRAILER
pub const TRAILER15_SIZE: usize = 380325;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct L15ImageValidity {
    pub nominal_image: u8,
    pub non_nominal_because_incomplete: u8,
    pub non_nominal_radiometric_quality: u8,
    pub non_nominal_geometric_quality: u8,
    pub non_nominal_timeliness: u8,
    pub incomplete_l15: u8,
}

impl Record for L15ImageValidity {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.nominal_image)?;
        io.u8(&mut self.non_nominal_because_incomplete)?;
        io.u8(&mut self.non_nominal_radiometric_quality)?;
        io.u8(&mut self.non_nominal_geometric_quality)?;
        io.u8(&mut self.non_nominal_timeliness)?;
        io.u8(&mut self.incomplete_l15)?;
        Ok(())
    }
}

/// Image production statistics. The forward scan start and end drive the
/// per-line time model of the preprocessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageProductionStats {
    pub satellite_id: i16,
    pub nominal_image_scanning: u8,
    pub reduced_scan: u8,
    pub act_scan_forward_start: CdsShortTime,
    pub act_scan_forward_end: CdsShortTime,
    pub nominal_behaviour: u8,
    pub rad_scan_irregularity: u8,
    pub rad_stoppage: u8,
    pub repeat_cycle_not_completed: u8,
    pub gain_change_took_place: u8,
    pub decontamination_took_place: u8,
    pub no_bb_calibration_achieved: u8,
    pub incorrect_temperature: u8,
    pub invalid_bb_data: u8,
    pub invalid_aux_or_hktm_data: u8,
    pub refocusing_mechanism_actuated: u8,
    pub mirror_back_to_reference_pos: u8,
    // One byte per band on disk
    pub planned_number_of_l10_lines: [u8; N_BANDS],
    pub number_of_missing_l10_lines: [u8; N_BANDS],
    pub number_of_corrupted_l10_lines: [u8; N_BANDS],
    pub number_of_replaced_l10_lines: [u8; N_BANDS],
    pub l15_image_validity: [L15ImageValidity; N_BANDS],
    pub actual_coverage_vis_ir: Coverage,
    pub actual_coverage_hrv_lower: Coverage,
    pub actual_coverage_hrv_upper: Coverage,
}

impl Record for ImageProductionStats {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i16(&mut self.satellite_id)?;
        io.u8(&mut self.nominal_image_scanning)?;
        io.u8(&mut self.reduced_scan)?;
        self.act_scan_forward_start.transfer(io)?;
        self.act_scan_forward_end.transfer(io)?;
        for flag in [
            &mut self.nominal_behaviour,
            &mut self.rad_scan_irregularity,
            &mut self.rad_stoppage,
            &mut self.repeat_cycle_not_completed,
            &mut self.gain_change_took_place,
            &mut self.decontamination_took_place,
            &mut self.no_bb_calibration_achieved,
            &mut self.incorrect_temperature,
            &mut self.invalid_bb_data,
            &mut self.invalid_aux_or_hktm_data,
            &mut self.refocusing_mechanism_actuated,
            &mut self.mirror_back_to_reference_pos,
        ] {
            io.u8(flag)?;
        }
        io.bytes(&mut self.planned_number_of_l10_lines)?;
        io.bytes(&mut self.number_of_missing_l10_lines)?;
        io.bytes(&mut self.number_of_corrupted_l10_lines)?;
        io.bytes(&mut self.number_of_replaced_l10_lines)?;
        io.records(&mut self.l15_image_validity)?;
        self.actual_coverage_vis_ir.transfer(io)?;
        self.actual_coverage_hrv_lower.transfer(io)?;
        self.actual_coverage_hrv_upper.transfer(io)?;
        Ok(())
    }
}

/// Angular observation fields shared by horizon, star and landmark records
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    pub alpha: f64,
    pub alpha_confidence: f64,
    pub beta: f64,
    pub beta_confidence: f64,
    pub observation_time: CdsTime,
    pub spin_rate: f64,
    pub alpha_deviation: f64,
    pub beta_deviation: f64,
}

impl Record for Observation {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f64(&mut self.alpha)?;
        io.f64(&mut self.alpha_confidence)?;
        io.f64(&mut self.beta)?;
        io.f64(&mut self.beta_confidence)?;
        self.observation_time.transfer(io)?;
        io.f64(&mut self.spin_rate)?;
        io.f64(&mut self.alpha_deviation)?;
        io.f64(&mut self.beta_deviation)?;
        Ok(())
    }
}

/// Horizon or star observation: a one-byte id then the observation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IdentifiedObservation {
    pub id: u8,
    pub observation: Observation,
}

impl Record for IdentifiedObservation {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.id)?;
        self.observation.transfer(io)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandmarkObservation {
    pub landmark_id: u8,
    pub landmark_longitude: f64,
    pub landmark_latitude: f64,
    pub observation: Observation,
}

impl Record for LandmarkObservation {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.landmark_id)?;
        io.f64(&mut self.landmark_longitude)?;
        io.f64(&mut self.landmark_latitude)?;
        self.observation.transfer(io)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationExtractionResults {
    pub extracted_horizons: Vec<IdentifiedObservation>,
    pub extracted_stars: Vec<IdentifiedObservation>,
    pub extracted_landmarks: Vec<LandmarkObservation>,
}

impl Record for NavigationExtractionResults {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.records(fixed(&mut self.extracted_horizons, N_HORIZONS))?;
        io.records(fixed(&mut self.extracted_stars, N_STARS))?;
        io.records(fixed(&mut self.extracted_landmarks, N_LANDMARKS))?;
        Ok(())
    }
}

/// Mean and standard deviation pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanStd {
    pub mean: f32,
    pub std_dev: f32,
}

impl Record for MeanStd {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f32(&mut self.mean)?;
        io.f32(&mut self.std_dev)?;
        Ok(())
    }
}

/// Power spectral densities, EW and NS, of the centre square and full image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralDensities {
    pub image_center_square_ew: Vec<f32>,
    pub full_image_ew: Vec<f32>,
    pub image_center_square_ns: Vec<f32>,
    pub full_image_ns: Vec<f32>,
}

impl Record for SpectralDensities {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f32s(fixed(&mut self.image_center_square_ew, 128))?;
        io.f32s(fixed(&mut self.full_image_ew, 128))?;
        io.f32s(fixed(&mut self.image_center_square_ns, 128))?;
        io.f32s(fixed(&mut self.full_image_ns, 128))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct L10RadQuality {
    pub full_image_minimum_count: i16,
    pub full_image_maximum_count: i16,
    pub earth_disk_minimum_count: i16,
    pub earth_disk_maximum_count: i16,
    pub moon_minimum_count: i16,
    pub moon_maximum_count: i16,
    pub full_image: MeanStd,
    pub earth_disk: MeanStd,
    pub moon: MeanStd,
    pub space: MeanStd,
    pub se_space_corner: MeanStd,
    pub sw_space_corner: MeanStd,
    pub ne_space_corner: MeanStd,
    pub nw_space_corner: MeanStd,
    pub four_space_corners: MeanStd,
    pub full_image_histogram: Vec<u32>,
    pub earth_disk_histogram: Vec<u32>,
    pub image_center_square_histogram: Vec<u32>,
    pub se_space_corner_histogram: Vec<u32>,
    pub sw_space_corner_histogram: Vec<u32>,
    pub ne_space_corner_histogram: Vec<u32>,
    pub nw_space_corner_histogram: Vec<u32>,
    /// Entropies: full image, earth disk, centre square, SE, SW, NE, NW
    /// corner and all four corners
    pub entropy: [[f32; 3]; 8],
    pub psd: SpectralDensities,
}

impl Record for L10RadQuality {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i16(&mut self.full_image_minimum_count)?;
        io.i16(&mut self.full_image_maximum_count)?;
        io.i16(&mut self.earth_disk_minimum_count)?;
        io.i16(&mut self.earth_disk_maximum_count)?;
        io.i16(&mut self.moon_minimum_count)?;
        io.i16(&mut self.moon_maximum_count)?;
        for stats in [
            &mut self.full_image,
            &mut self.earth_disk,
            &mut self.moon,
            &mut self.space,
            &mut self.se_space_corner,
            &mut self.sw_space_corner,
            &mut self.ne_space_corner,
            &mut self.nw_space_corner,
            &mut self.four_space_corners,
        ] {
            stats.transfer(io)?;
        }
        io.u32s(fixed(&mut self.full_image_histogram, 256))?;
        io.u32s(fixed(&mut self.earth_disk_histogram, 256))?;
        io.u32s(fixed(&mut self.image_center_square_histogram, 256))?;
        io.u32s(fixed(&mut self.se_space_corner_histogram, 128))?;
        io.u32s(fixed(&mut self.sw_space_corner_histogram, 128))?;
        io.u32s(fixed(&mut self.ne_space_corner_histogram, 128))?;
        io.u32s(fixed(&mut self.nw_space_corner_histogram, 128))?;
        for entropy in self.entropy.iter_mut() {
            io.f32s(entropy)?;
        }
        self.psd.transfer(io)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct L15RadQuality {
    pub full_image_minimum_count: i16,
    pub full_image_maximum_count: i16,
    pub earth_disk_minimum_count: i16,
    pub earth_disk_maximum_count: i16,
    pub full_image: MeanStd,
    pub earth_disk: MeanStd,
    pub space: MeanStd,
    pub full_image_histogram: Vec<u32>,
    pub earth_disk_histogram: Vec<u32>,
    pub image_center_square_histogram: Vec<u32>,
    /// Entropies: full image, earth disk, centre square
    pub entropy: [[f32; 3]; 3],
    pub psd: SpectralDensities,
    /// RMS and mean of the SE, SW, NE and NW space corners
    pub space_corner_l15: [MeanStd; 4],
}

impl Record for L15RadQuality {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.i16(&mut self.full_image_minimum_count)?;
        io.i16(&mut self.full_image_maximum_count)?;
        io.i16(&mut self.earth_disk_minimum_count)?;
        io.i16(&mut self.earth_disk_maximum_count)?;
        self.full_image.transfer(io)?;
        self.earth_disk.transfer(io)?;
        self.space.transfer(io)?;
        io.u32s(fixed(&mut self.full_image_histogram, 256))?;
        io.u32s(fixed(&mut self.earth_disk_histogram, 256))?;
        io.u32s(fixed(&mut self.image_center_square_histogram, 256))?;
        for entropy in self.entropy.iter_mut() {
            io.f32s(entropy)?;
        }
        self.psd.transfer(io)?;
        io.records(&mut self.space_corner_l15)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadiometricQuality {
    pub l10_rad_quality: Vec<L10RadQuality>,
    pub l15_rad_quality: Vec<L15RadQuality>,
}

impl Record for RadiometricQuality {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.records(fixed(&mut self.l10_rad_quality, N_L10_CHANNELS))?;
        io.records(fixed(&mut self.l15_rad_quality, N_BANDS))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accuracy {
    pub quality_info_validity: u8,
    /// East-west, north-south and magnitude of: RMS accuracy, RMS
    /// uncertainty, maximum deviation and maximum uncertainty
    pub values: [f32; 12],
}

impl Record for Accuracy {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.quality_info_validity)?;
        io.f32s(&mut self.values)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MisregistrationResiduals {
    pub quality_info_validity: u8,
    pub east_west_residual: f32,
    pub north_south_residual: f32,
    pub east_west_uncertainty: f32,
    pub north_south_uncertainty: f32,
    pub east_west_rms: f32,
    pub north_south_rms: f32,
    pub east_west_magnitude: f32,
    pub north_south_magnitude: f32,
    pub east_west_magnitude_uncertainty: f32,
    pub north_south_magnitude_uncertainty: f32,
}

impl Record for MisregistrationResiduals {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.quality_info_validity)?;
        for v in [
            &mut self.east_west_residual,
            &mut self.north_south_residual,
            &mut self.east_west_uncertainty,
            &mut self.north_south_uncertainty,
            &mut self.east_west_rms,
            &mut self.north_south_rms,
            &mut self.east_west_magnitude,
            &mut self.north_south_magnitude,
            &mut self.east_west_magnitude_uncertainty,
            &mut self.north_south_magnitude_uncertainty,
        ] {
            io.f32(v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometricQualityStatus {
    pub quality_nominal: u8,
    pub nominal_absolute: u8,
    pub nominal_relative_to_previous_image: u8,
    pub nominal_for_rel500: u8,
    pub nominal_for_rel16: u8,
    pub nominal_for_res_misreg: u8,
}

impl Record for GeometricQualityStatus {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.quality_nominal)?;
        io.u8(&mut self.nominal_absolute)?;
        io.u8(&mut self.nominal_relative_to_previous_image)?;
        io.u8(&mut self.nominal_for_rel500)?;
        io.u8(&mut self.nominal_for_rel16)?;
        io.u8(&mut self.nominal_for_res_misreg)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometricQuality {
    pub absolute_accuracy: [Accuracy; N_BANDS],
    pub relative_accuracy: [Accuracy; N_BANDS],
    pub pixels_500_relative_accuracy: [Accuracy; N_BANDS],
    pub pixels_16_relative_accuracy: [Accuracy; N_BANDS],
    pub misregistration_residuals: [MisregistrationResiduals; N_BANDS],
    pub geometric_quality_status: [GeometricQualityStatus; N_BANDS],
}

impl Record for GeometricQuality {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.records(&mut self.absolute_accuracy)?;
        io.records(&mut self.relative_accuracy)?;
        io.records(&mut self.pixels_500_relative_accuracy)?;
        io.records(&mut self.pixels_16_relative_accuracy)?;
        io.records(&mut self.misregistration_residuals)?;
        io.records(&mut self.geometric_quality_status)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Completeness {
    pub planned_l15_image_lines: u16,
    pub generated_l15_image_lines: u16,
    pub valid_l15_image_lines: u16,
    pub dummy_l15_image_lines: u16,
    pub corrupted_l15_image_lines: u16,
}

impl Record for Completeness {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u16(&mut self.planned_l15_image_lines)?;
        io.u16(&mut self.generated_l15_image_lines)?;
        io.u16(&mut self.valid_l15_image_lines)?;
        io.u16(&mut self.dummy_l15_image_lines)?;
        io.u16(&mut self.corrupted_l15_image_lines)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelinessAndCompleteness {
    pub max_delay: f32,
    pub min_delay: f32,
    pub mean_delay: f32,
    pub completeness: [Completeness; N_BANDS],
}

impl Record for TimelinessAndCompleteness {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.f32(&mut self.max_delay)?;
        io.f32(&mut self.min_delay)?;
        io.f32(&mut self.mean_delay)?;
        io.records(&mut self.completeness)?;
        Ok(())
    }
}

/// Complete 15TRAILER
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trailer15 {
    pub version: u8,
    pub image_production_stats: ImageProductionStats,
    pub navigation_extraction_results: NavigationExtractionResults,
    pub radiometric_quality: RadiometricQuality,
    pub geometric_quality: GeometricQuality,
    pub timeliness_and_completeness: TimelinessAndCompleteness,
    pub tail: Vec<u8>,
}

impl Record for Trailer15 {
    fn transfer<T: Transfer>(&mut self, io: &mut T) -> SeviriResult<()> {
        io.u8(&mut self.version)?;
        self.image_production_stats.transfer(io)?;
        self.navigation_extraction_results.transfer(io)?;
        self.radiometric_quality.transfer(io)?;
        self.geometric_quality.transfer(io)?;
        self.timeliness_and_completeness.transfer(io)?;
        io.bytes(fixed(&mut self.tail, TRAILER_TAIL_SIZE))?;
        Ok(())
    }
}
