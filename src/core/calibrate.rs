//! Radiometric calibration of SEVIRI counts.
//!
//! Holds the per-satellite constant tables (solar irradiance, Planck
//! linearization constants, vicarious calibration coefficients), the
//! band/unit legality rules and the calibration choice made per band.

use crate::core::geometry::{cal_to_julian_day, solar_distance_factor};
use crate::io::header::RadiometricProcessing;
use crate::types::{SeviriError, SeviriResult, Units, N_BANDS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Planck constant c1 in mW m-2 sr-1 (cm-1)-4
pub const PLANCK_C1: f64 = 1.19104e-5;

/// Planck constant c2 in K cm
pub const PLANCK_C2: f64 = 1.43877;

/// GSICS coefficients below this are treated as missing
pub const FEEDBACK_THRESHOLD: f64 = 1e-4;

/// Space count subtracted by the vicarious calibration
pub const VICARIOUS_DARK_COUNT: f64 = 51.0;

/// Planck linearization constants of one thermal band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanckCoefs {
    /// Central wavenumber (cm-1)
    pub nu: f64,
    pub a: f64,
    pub b: f64,
}

const fn planck(nu: f64, a: f64, b: f64) -> PlanckCoefs {
    PlanckCoefs { nu, a, b }
}

/// Vicarious calibration: gain = (c0 + c1 * days / 1000) / 1000
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VicariousCoefs {
    pub c0: f64,
    pub c1: f64,
}

const fn vicarious(c0: f64, c1: f64) -> VicariousCoefs {
    VicariousCoefs { c0, c1 }
}

/// Constant tables of one MSG platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteInfo {
    pub id: i16,
    pub name: &'static str,
    /// Launch date (year, month, day)
    pub launch: (i32, u32, u32),
    /// Band solar irradiance, indexed by band id - 1. Zero for thermal bands.
    pub irradiance: [f64; N_BANDS],
    /// Planck constants of bands 4 to 11
    pub planck: [PlanckCoefs; 8],
    /// Vicarious coefficients of bands 1 to 3
    pub vicarious: [VicariousCoefs; 3],
}

pub static SATELLITES: [SatelliteInfo; 4] = [
    SatelliteInfo {
        id: 321,
        name: "MSG-1",
        launch: (2002, 8, 28),
        irradiance: [65.2296, 73.0127, 62.3715, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 78.7599],
        planck: [
            planck(2569.094, 0.9959, 3.471),
            planck(1598.566, 0.9963, 2.219),
            planck(1362.142, 0.9991, 0.485),
            planck(1149.083, 0.9996, 0.181),
            planck(1034.345, 0.9999, 0.060),
            planck(930.659, 0.9983, 0.627),
            planck(839.661, 0.9988, 0.397),
            planck(752.381, 0.9981, 0.576),
        ],
        vicarious: [vicarious(24.346, 0.3739), vicarious(30.989, 0.3111), vicarious(22.869, 0.0065)],
    },
    SatelliteInfo {
        id: 322,
        name: "MSG-2",
        launch: (2005, 12, 21),
        irradiance: [65.2065, 73.1869, 61.9923, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 79.0113],
        planck: [
            planck(2568.832, 0.9954, 3.438),
            planck(1600.548, 0.9963, 2.185),
            planck(1360.330, 0.9991, 0.470),
            planck(1148.620, 0.9996, 0.179),
            planck(1035.289, 0.9999, 0.056),
            planck(931.700, 0.9983, 0.640),
            planck(836.445, 0.9988, 0.408),
            planck(751.792, 0.9981, 0.561),
        ],
        vicarious: [vicarious(21.026, 0.2556), vicarious(26.875, 0.1835), vicarious(21.394, 0.0498)],
    },
    SatelliteInfo {
        id: 323,
        name: "MSG-3",
        launch: (2012, 7, 5),
        irradiance: [65.5148, 73.1807, 62.0208, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 78.9416],
        planck: [
            planck(2547.771, 0.9915, 2.9002),
            planck(1595.621, 0.9960, 2.0337),
            planck(1360.377, 0.9991, 0.4340),
            planck(1148.130, 0.9996, 0.1714),
            planck(1034.715, 0.9999, 0.0527),
            planck(929.842, 0.9983, 0.6084),
            planck(838.659, 0.9988, 0.3882),
            planck(750.653, 0.9982, 0.5390),
        ],
        vicarious: [vicarious(19.829, 0.5856), vicarious(25.284, 0.6787), vicarious(23.066, -0.0286)],
    },
    SatelliteInfo {
        id: 324,
        name: "MSG-4",
        launch: (2015, 7, 15),
        irradiance: [65.2656, 73.1692, 61.9416, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 79.0035],
        planck: [
            planck(2555.280, 0.9916, 2.9438),
            planck(1596.080, 0.9959, 2.0780),
            planck(1361.748, 0.9990, 0.4929),
            planck(1147.433, 0.9996, 0.1731),
            planck(1034.851, 0.9998, 0.0597),
            planck(931.122, 0.9983, 0.6256),
            planck(839.113, 0.9988, 0.4002),
            planck(748.585, 0.9981, 0.5635),
        ],
        vicarious: [vicarious(19.759, 0.3984), vicarious(25.008, 0.6123), vicarious(21.907, 0.1000)],
    },
];

/// Index into [`SATELLITES`] of the header satellite id
pub fn satellite_index(satellite_id: i16) -> SeviriResult<usize> {
    SATELLITES
        .iter()
        .position(|s| s.id == satellite_id)
        .ok_or_else(|| {
            log::error!("Satellite ID not supported: {}", satellite_id);
            SeviriError::Domain(format!("Satellite ID not supported: {}", satellite_id))
        })
}

/// Constant tables of the header satellite id
pub fn satellite_info(satellite_id: i16) -> SeviriResult<&'static SatelliteInfo> {
    Ok(&SATELLITES[satellite_index(satellite_id)?])
}

/// Solar bands: the three VIS/NIR channels and HRV
pub fn is_solar_band(band_id: u8) -> bool {
    matches!(band_id, 1..=3 | 12)
}

/// Reject unit/band combinations without a physical meaning
pub fn check_unit(band_id: u8, unit: Units) -> SeviriResult<()> {
    let valid = match unit {
        Units::Cnt | Units::Rad => true,
        Units::Ref | Units::Brf => is_solar_band(band_id),
        Units::Bt => !is_solar_band(band_id),
    };

    if !valid {
        let msg = format!("invalid units for band {}: {}", band_id, unit);
        log::error!("{}", msg);
        return Err(SeviriError::InvalidInput(msg));
    }

    Ok(())
}

/// Source of the count-to-radiance coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationMode {
    /// Level 1.5 header slope and offset
    #[default]
    Nominal,
    /// GSICS feedback coefficients, with fallback when they are missing
    Feedback,
}

/// Count-to-radiance conversion chosen for one band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CalibrationChoice {
    Nominal { slope: f64, offset: f64 },
    Feedback { slope: f64, offset: f64 },
    Vicarious { gain: f64 },
}

impl CalibrationChoice {
    pub fn radiance(&self, count: f64) -> f64 {
        match *self {
            CalibrationChoice::Nominal { slope, offset }
            | CalibrationChoice::Feedback { slope, offset } => count * slope + offset,
            CalibrationChoice::Vicarious { gain } => (count - VICARIOUS_DARK_COUNT) * gain,
        }
    }
}

/// Days elapsed between the launch of the satellite and Julian time `jtime`
pub fn days_since_launch(info: &SatelliteInfo, jtime: f64) -> f64 {
    let (year, month, day) = info.launch;
    jtime - (cal_to_julian_day(year, month, day) as f64 - 0.5)
}

/// Vicarious gain of solar band 1..=3
pub fn vicarious_gain(info: &SatelliteInfo, band_id: u8, days: f64) -> SeviriResult<f64> {
    let coefs = match band_id {
        1..=3 => info.vicarious[band_id as usize - 1],
        _ => {
            return Err(SeviriError::InvalidInput(format!(
                "no vicarious calibration for band {}",
                band_id
            )))
        }
    };
    Ok((coefs.c0 + coefs.c1 * days / 1000.0) / 1000.0)
}

/// Choose the radiance calibration of `band_id`.
///
/// In feedback mode a GSICS coefficient below [`FEEDBACK_THRESHOLD`] falls
/// back to the vicarious calibration for bands 1 to 3 and to the nominal
/// header coefficients for every other band.
pub fn resolve_calibration(
    info: &SatelliteInfo,
    band_id: u8,
    mode: CalibrationMode,
    radiometric: &RadiometricProcessing,
    jtime: f64,
) -> SeviriResult<CalibrationChoice> {
    let index = band_id as usize - 1;
    let nominal = &radiometric.level1_5_image_calibration[index];
    let nominal = CalibrationChoice::Nominal { slope: nominal.cal_slope, offset: nominal.cal_offset };

    if mode == CalibrationMode::Nominal {
        return Ok(nominal);
    }

    let feedback = &radiometric.mpef_cal_feedback[index];
    let coeff = feedback.gsics_cal_coeff as f64;

    if coeff < FEEDBACK_THRESHOLD {
        if (1..=3).contains(&band_id) {
            let days = days_since_launch(info, jtime);
            let gain = vicarious_gain(info, band_id, days)?;
            log::warn!(
                "No GSICS coefficient for band {}, using vicarious calibration ({:.1} days since launch)",
                band_id, days
            );
            return Ok(CalibrationChoice::Vicarious { gain });
        }
        log::warn!("No GSICS coefficient for band {}, using nominal calibration", band_id);
        return Ok(nominal);
    }

    Ok(CalibrationChoice::Feedback {
        slope: coeff,
        offset: feedback.gsics_offset_count as f64 * coeff,
    })
}

/// pi * d^2 / E for solar band `band_id` on day of year `doy`, where d is
/// the earth-sun distance in astronomical units.
pub fn reflectance_factor(info: &SatelliteInfo, band_id: u8, doy: f64) -> SeviriResult<f64> {
    let irradiance = info.irradiance[band_id as usize - 1];
    if irradiance <= 0.0 {
        return Err(SeviriError::InvalidInput(format!(
            "no solar irradiance for band {}",
            band_id
        )));
    }
    Ok(PI / (solar_distance_factor(doy) * irradiance))
}

/// Planck constants of thermal band `band_id`
pub fn planck_coefs(info: &SatelliteInfo, band_id: u8) -> SeviriResult<PlanckCoefs> {
    match band_id {
        4..=11 => Ok(info.planck[band_id as usize - 4]),
        _ => Err(SeviriError::InvalidInput(format!(
            "no brightness temperature constants for band {}",
            band_id
        ))),
    }
}

/// Inverse Planck function. None for non-positive radiance.
pub fn brightness_temperature(coefs: &PlanckCoefs, radiance: f64) -> Option<f64> {
    if radiance <= 0.0 {
        return None;
    }
    let nu = coefs.nu;
    let t = (PLANCK_C2 * nu / (1.0 + nu * nu * nu * PLANCK_C1 / radiance).ln() - coefs.b) / coefs.a;
    t.is_finite().then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn planck_radiance(coefs: &PlanckCoefs, t: f64) -> f64 {
        let nu = coefs.nu;
        PLANCK_C1 * nu.powi(3) / ((PLANCK_C2 * nu / (coefs.a * t + coefs.b)).exp() - 1.0)
    }

    #[test]
    fn test_satellite_lookup() {
        assert_eq!(satellite_index(321).unwrap(), 0);
        assert_eq!(SATELLITES[0].name, "MSG-1");
        assert_eq!(satellite_index(324).unwrap(), 3);
        assert!(matches!(satellite_index(999), Err(SeviriError::Domain(_))));
    }

    #[test]
    fn test_unit_legality() {
        assert!(check_unit(1, Units::Bt).is_err());
        assert!(check_unit(12, Units::Bt).is_err());
        assert!(check_unit(9, Units::Brf).is_err());
        assert!(check_unit(9, Units::Ref).is_err());
        assert!(check_unit(2, Units::Brf).is_ok());
        assert!(check_unit(9, Units::Bt).is_ok());
        for band in 1..=11 {
            assert!(check_unit(band, Units::Rad).is_ok());
            assert!(check_unit(band, Units::Cnt).is_ok());
        }
    }

    #[test]
    fn test_feedback_zero_falls_back_to_vicarious() {
        let info = &SATELLITES[1];
        let mut rad = RadiometricProcessing::default();
        rad.mpef_cal_feedback[0].gsics_cal_coeff = 0.0;
        let jtime = cal_to_julian_day(2010, 6, 1) as f64;

        let choice = resolve_calibration(info, 1, CalibrationMode::Feedback, &rad, jtime).unwrap();
        let gain = vicarious_gain(info, 1, days_since_launch(info, jtime)).unwrap();
        assert_eq!(choice, CalibrationChoice::Vicarious { gain });
        assert_abs_diff_eq!(choice.radiance(300.0), (300.0 - 51.0) * gain);
    }

    #[test]
    fn test_feedback_coefficient_used() {
        let info = &SATELLITES[1];
        let mut rad = RadiometricProcessing::default();
        rad.mpef_cal_feedback[0].gsics_cal_coeff = 1.0;
        rad.mpef_cal_feedback[0].gsics_offset_count = -51.0;

        let choice = resolve_calibration(info, 1, CalibrationMode::Feedback, &rad, 2455000.0).unwrap();
        assert_eq!(choice, CalibrationChoice::Feedback { slope: 1.0, offset: -51.0 });
        assert_abs_diff_eq!(choice.radiance(100.0), 49.0);
    }

    #[test]
    fn test_thermal_band_falls_back_to_nominal() {
        let info = &SATELLITES[0];
        let mut rad = RadiometricProcessing::default();
        rad.level1_5_image_calibration[8].cal_slope = 0.2;
        rad.level1_5_image_calibration[8].cal_offset = -10.0;

        let choice = resolve_calibration(info, 9, CalibrationMode::Feedback, &rad, 2455000.0).unwrap();
        assert_eq!(choice, CalibrationChoice::Nominal { slope: 0.2, offset: -10.0 });
    }

    #[test]
    fn test_brightness_temperature_inverts_planck() {
        for info in SATELLITES.iter() {
            for band in 4..=11 {
                let coefs = planck_coefs(info, band).unwrap();
                let l = planck_radiance(&coefs, 285.0);
                let t = brightness_temperature(&coefs, l).unwrap();
                assert_abs_diff_eq!(t, 285.0, epsilon = 1e-6);
            }
        }
        assert!(brightness_temperature(&SATELLITES[0].planck[0], 0.0).is_none());
    }

    #[test]
    fn test_reflectance_factor() {
        let info = &SATELLITES[0];
        let f = reflectance_factor(info, 1, 80.0).unwrap();
        assert_abs_diff_eq!(f, PI / (solar_distance_factor(80.0) * 65.2296), epsilon = 1e-12);
        assert!(reflectance_factor(info, 12, 80.0).is_ok());
        assert!(reflectance_factor(info, 9, 80.0).is_err());
    }
}
