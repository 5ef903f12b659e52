//! Geostationary pixel <-> latitude/longitude projection.
//!
//! Lines and columns are 1-based on the south-up, east-left grid of the
//! level 1.5 image: line 1 is the southernmost line and column 1 the
//! easternmost column. Angles are in degrees.

use serde::{Deserialize, Serialize};

/// Distance from the earth centre to the satellite (km)
pub const SATELLITE_DISTANCE: f64 = 42164.0;

/// Equatorial radius of the reference ellipsoid (km)
pub const EARTH_EQUATORIAL_RADIUS: f64 = 6378.169;

/// Polar radius of the reference ellipsoid (km)
pub const EARTH_POLAR_RADIUS: f64 = 6356.5838;

// (r_eq / r_pol)^2
const Q_EQ_POL: f64 = 1.006803;
// SATELLITE_DISTANCE^2 - r_eq^2
const Q_DIST: f64 = 1737121856.0;
// (r_pol / r_eq)^2
const Q_POL_EQ: f64 = 0.993243;
// (r_eq^2 - r_pol^2) / r_eq^2
const Q_ECC: f64 = 0.00675701;

const TWO_POW_16: f64 = 65536.0;

/// Column/line scaling factors and offsets of a reference grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavScalingFactors {
    pub cfac: f64,
    pub lfac: f64,
    pub coff: f64,
    pub loff: f64,
}

/// VIS/IR grid (3712 x 3712)
pub const NAV_SCALING_VIR: NavScalingFactors = NavScalingFactors {
    cfac: -781648343.0,
    lfac: -781648343.0,
    coff: 1856.0,
    loff: 1856.0,
};

/// HRV grid (11136 x 11136)
pub const NAV_SCALING_HRV: NavScalingFactors = NavScalingFactors {
    cfac: -2344944937.0,
    lfac: -2344944937.0,
    coff: 5566.0,
    loff: 5566.0,
};

/// Earth model flag of products whose grid is offset by half a pixel
pub const EARTH_MODEL_HALF_PIXEL_OFFSET: u8 = 1;

fn wrap_longitude(lon: f64) -> f64 {
    let mut lon = lon;
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Latitude and longitude of the centre of pixel (`line`, `column`).
///
/// Returns None when the line of sight misses the earth.
pub fn pixel_to_latlon(
    line: u32,
    column: u32,
    sub_lon: f64,
    nav: &NavScalingFactors,
    earth_model: u8,
) -> Option<(f64, f64)> {
    let (mut l, mut c) = (line as f64, column as f64);
    if earth_model == EARTH_MODEL_HALF_PIXEL_OFFSET {
        l -= 0.5;
        c += 0.5;
    }

    let x = (c - nav.coff) * TWO_POW_16 / nav.cfac;
    let y = (l - nav.loff) * TWO_POW_16 / nav.lfac;

    let (sin_x, cos_x) = x.sin_cos();
    let (sin_y, cos_y) = y.sin_cos();

    let a = cos_y * cos_y + Q_EQ_POL * sin_y * sin_y;
    let h = SATELLITE_DISTANCE * cos_x * cos_y;
    let sd2 = h * h - a * Q_DIST;
    if sd2 < 0.0 {
        return None;
    }

    let sn = (h - sd2.sqrt()) / a;
    let s1 = SATELLITE_DISTANCE - sn * cos_x * cos_y;
    let s2 = sn * sin_x * cos_y;
    let s3 = -sn * sin_y;
    let sxy = s1.hypot(s2);

    let lat = (Q_EQ_POL * s3 / sxy).atan().to_degrees();
    let lon = wrap_longitude((s2 / s1).atan().to_degrees() + sub_lon);

    if lat.is_finite() && lon.is_finite() {
        Some((lat, lon))
    } else {
        None
    }
}

/// Nearest 1-based (line, column) of a geodetic point.
///
/// Returns None for points not visible from the satellite.
pub fn latlon_to_pixel(lat: f64, lon: f64, sub_lon: f64, nav: &NavScalingFactors) -> Option<(u32, u32)> {
    let lat = lat.to_radians();
    let dlon = (lon - sub_lon).to_radians();

    let c_lat = (Q_POL_EQ * lat.tan()).atan();
    let cos_c_lat = c_lat.cos();
    let re = EARTH_POLAR_RADIUS / (1.0 - Q_ECC * cos_c_lat * cos_c_lat).sqrt();

    let gx = re * cos_c_lat * dlon.cos();
    if SATELLITE_DISTANCE * gx <= re * re {
        return None;
    }

    let r1 = SATELLITE_DISTANCE - gx;
    let r2 = -re * cos_c_lat * dlon.sin();
    let r3 = re * c_lat.sin();
    let rn = (r1 * r1 + r2 * r2 + r3 * r3).sqrt();

    let x = (-r2 / r1).atan();
    let y = (-r3 / rn).asin();

    let column = nav.coff + (x * nav.cfac / TWO_POW_16).round();
    let line = nav.loff + (y * nav.lfac / TWO_POW_16).round();

    if !(line >= 1.0 && column >= 1.0) {
        return None;
    }

    Some((line as u32, column as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sub_satellite_point() {
        let (lat, lon) = pixel_to_latlon(1856, 1856, 0.0, &NAV_SCALING_VIR, 2).unwrap();
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1e-9);

        let (_, lon) = pixel_to_latlon(1856, 1856, 41.5, &NAV_SCALING_VIR, 2).unwrap();
        assert_abs_diff_eq!(lon, 41.5, epsilon = 1e-9);
    }

    #[test]
    fn test_grid_orientation() {
        // South-up, east-left
        let (lat, _) = pixel_to_latlon(1000, 1856, 0.0, &NAV_SCALING_VIR, 2).unwrap();
        assert!(lat < 0.0);
        let (_, lon) = pixel_to_latlon(1856, 1000, 0.0, &NAV_SCALING_VIR, 2).unwrap();
        assert!(lon > 0.0);
    }

    #[test]
    fn test_space_pixels() {
        assert!(pixel_to_latlon(1, 1, 0.0, &NAV_SCALING_VIR, 2).is_none());
        assert!(pixel_to_latlon(3712, 3712, 0.0, &NAV_SCALING_VIR, 2).is_none());
        assert!(latlon_to_pixel(0.0, 120.0, 0.0, &NAV_SCALING_VIR).is_none());
    }

    #[test]
    fn test_inverse_recovers_pixel() {
        for &(line, column) in &[(1856, 1856), (500, 1800), (3000, 700), (2200, 3100)] {
            let (lat, lon) = pixel_to_latlon(line, column, 9.5, &NAV_SCALING_VIR, 2).unwrap();
            let (l, c) = latlon_to_pixel(lat, lon, 9.5, &NAV_SCALING_VIR).unwrap();
            assert_eq!((l, c), (line, column), "lat = {}, lon = {}", lat, lon);
        }
    }

    #[test]
    fn test_half_pixel_offset_moves_point() {
        let a = pixel_to_latlon(1856, 1856, 0.0, &NAV_SCALING_VIR, 2).unwrap();
        let b = pixel_to_latlon(1856, 1856, 0.0, &NAV_SCALING_VIR, 1).unwrap();
        assert!(b.0 < a.0);
        assert!(b.1 < a.1);
    }

    #[test]
    fn test_hrv_centre() {
        let (lat, lon) = pixel_to_latlon(5566, 5566, 0.0, &NAV_SCALING_HRV, 2).unwrap();
        assert_abs_diff_eq!(lat, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lon, 0.0, epsilon = 1e-9);
    }
}
