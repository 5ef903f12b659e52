//! Julian time helpers, solar position and viewing geometry.
//!
//! Julian times are fractional Julian days (days since -4712-01-01 12:00).
//! Latitudes, longitudes and returned angles are in degrees.

use crate::core::navigation::{EARTH_EQUATORIAL_RADIUS, EARTH_POLAR_RADIUS};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Julian day number of a calendar date. Day 0 is the last day of the
/// previous month.
pub fn cal_to_julian_day(year: i32, month: u32, day: u32) -> i64 {
    let (y, m, d) = (year as i64, month as i64, day as i64);
    let a = (m - 14) / 12;
    d - 32075 + 1461 * (y + 4800 + a) / 4 + 367 * (m - 2 - a * 12) / 12
        - 3 * ((y + 4900 + a) / 100) / 4
}

/// Calendar date of a Julian day number
pub fn julian_day_to_cal(jul: i64) -> Option<NaiveDate> {
    // JDN 1721426 is 0001-01-01, day 1 of the common era
    let days = i32::try_from(jul - 1721425).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

/// Julian time of the CDS epoch, 1958-01-01 00:00
pub fn cds_epoch_julian_day() -> f64 {
    cal_to_julian_day(1958, 1, 1) as f64 - 0.5
}

/// Fractional day of year of a Julian time, 1.0 at January 1 00:00
pub fn day_of_year(jtime: f64) -> Option<f64> {
    let date = julian_day_to_cal((jtime + 0.5).floor() as i64)?;
    Some(jtime - (cal_to_julian_day(date.year(), 1, 0) as f64 - 0.5))
}

/// UTC timestamp of a Julian time
pub fn julian_to_datetime(jtime: f64) -> Option<DateTime<Utc>> {
    let date = julian_day_to_cal((jtime + 0.5).floor() as i64)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let msec = ((jtime + 0.5).fract() * 86_400_000.0).round() as i64;
    Some(DateTime::from_naive_utc_and_offset(
        midnight + Duration::milliseconds(msec),
        Utc,
    ))
}

/// Julian time of a UTC timestamp
pub fn datetime_to_julian(t: &DateTime<Utc>) -> f64 {
    let jul = cal_to_julian_day(t.year(), t.month(), t.day()) as f64 - 0.5;
    let seconds = t.num_seconds_from_midnight() as f64 + t.timestamp_subsec_millis() as f64 / 1e3;
    jul + seconds / 86400.0
}

/// Squared ratio of the mean to the actual earth-sun distance
pub fn solar_distance_factor(day_of_year: f64) -> f64 {
    let g = 2.0 * PI * (day_of_year - 1.0) / 365.0;
    1.000110 + 0.034221 * g.cos() + 0.001280 * g.sin() + 0.000719 * (2.0 * g).cos()
        + 0.000077 * (2.0 * g).sin()
}

/// Solar position seen from a ground point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarGeometry {
    pub cos_zenith: f64,
    pub zenith: f64,
    /// Azimuth from south, positive towards west, in (-180, 180]
    pub azimuth: f64,
    pub distance_factor: f64,
}

fn wrap_pi(a: f64) -> f64 {
    let mut a = a.rem_euclid(2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Solar zenith and azimuth at Julian time `jtime` for (`lat`, `lon`)
pub fn solar_params(jtime: f64, lat: f64, lon: f64) -> SolarGeometry {
    let n = jtime - 2451545.0;

    let mean_longitude = (280.460 + 0.9856474 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .rem_euclid(360.0)
    .to_radians();
    let obliquity = (23.439 - 0.0000004 * n).to_radians();

    let right_ascension = (obliquity.cos() * ecliptic_longitude.sin())
        .atan2(ecliptic_longitude.cos())
        .rem_euclid(2.0 * PI);
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();

    let hour = (jtime + 0.5).rem_euclid(1.0) * 24.0;
    let gmst = (6.697375 + 0.0657098242 * n + hour).rem_euclid(24.0);
    let lmst = (gmst + lon / 15.0).rem_euclid(24.0);
    let hour_angle = wrap_pi((lmst * 15.0).to_radians() - right_ascension);

    let lat = lat.to_radians();
    let cos_zenith = (declination.sin() * lat.sin()
        + declination.cos() * lat.cos() * hour_angle.cos())
    .clamp(-1.0, 1.0);
    let zenith = cos_zenith.acos();

    // Azimuth from north, clockwise
    let azimuth_north = (-declination.cos() * hour_angle.sin())
        .atan2(declination.sin() * lat.cos() - declination.cos() * lat.sin() * hour_angle.cos());

    let r = 1.00014 - 0.01671 * mean_anomaly.cos() - 0.00014 * (2.0 * mean_anomaly).cos();

    SolarGeometry {
        cos_zenith,
        zenith: zenith.to_degrees(),
        azimuth: wrap_pi(azimuth_north - PI).to_degrees(),
        distance_factor: 1.0 / (r * r),
    }
}

/// Satellite zenith and azimuth seen from a ground point at `height` km
/// above the ellipsoid, given the satellite position (km, earth fixed).
///
/// The azimuth is measured from north, clockwise, in (-180, 180].
pub fn viewing_angles(lat: f64, lon: f64, height: f64, x: f64, y: f64, z: f64) -> (f64, f64) {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();

    let e2 = 1.0 - (EARTH_POLAR_RADIUS / EARTH_EQUATORIAL_RADIUS).powi(2);
    let n = EARTH_EQUATORIAL_RADIUS / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    let gx = (n + height) * cos_lat * cos_lon;
    let gy = (n + height) * cos_lat * sin_lon;
    let gz = (n * (1.0 - e2) + height) * sin_lat;

    let (dx, dy, dz) = (x - gx, y - gy, z - gz);
    let range = (dx * dx + dy * dy + dz * dz).sqrt();

    let up = cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz;
    let east = -sin_lon * dx + cos_lon * dy;
    let north = -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz;

    let vza = (up / range).clamp(-1.0, 1.0).acos().to_degrees();
    let vaa = east.atan2(north).to_degrees();

    (vza, vaa)
}

/// Rotate an azimuth in (-180, 180] by 180 degrees into [0, 360)
pub fn wrap_azimuth(azimuth: f64) -> f64 {
    let rotated = azimuth + 180.0;
    if rotated >= 360.0 {
        rotated - 360.0
    } else {
        rotated
    }
}
