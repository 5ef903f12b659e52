//! Satellite position from the orbit polynomial table

use crate::io::header::OrbitCoef;
use crate::types::{SeviriError, SeviriResult};

/// Length of the satellite position descriptor
pub const SATELLITE_POSITION_LENGTH: usize = 127;

const DESCRIPTOR_FIELD_WIDTH: usize = 20;

/// Cartesian satellite position (km, earth fixed) at Julian time `jtime`.
///
/// Uses the first segment whose [start, end] window contains `jtime` and
/// evaluates the constant and linear terms at the window-normalized time.
pub fn satellite_position(jtime: f64, polynomials: &[OrbitCoef]) -> SeviriResult<[f64; 3]> {
    for (i, coef) in polynomials.iter().enumerate() {
        let start = coef.start_time.to_julian();
        let end = coef.end_time.to_julian();

        if jtime < start || jtime > end {
            continue;
        }

        let half = (end - start) / 2.0;
        let t = if half > 0.0 { (jtime - (start + end) / 2.0) / half } else { 0.0 };

        log::debug!("Orbit polynomial segment {} selected, t = {:.6}", i, t);

        return Ok([
            coef.x[0] + coef.x[1] * t,
            coef.y[0] + coef.y[1] * t,
            coef.z[0] + coef.z[1] * t,
        ]);
    }

    log::error!("Julian time {} is outside all {} orbit polynomial windows", jtime, polynomials.len());
    Err(SeviriError::Domain(
        "image time is out of range of supplied orbit polynomials".to_string(),
    ))
}

/// Fixed-width descriptor of the satellite position used for parallax
/// correction: sub-satellite latitude (always 0), sub-satellite longitude,
/// distance from the earth centre, equatorial and north polar radius.
pub fn satellite_position_descriptor(position: &[f64; 3], equatorial_radius: f64, polar_radius: f64) -> String {
    let [x, y, z] = *position;
    let longitude = y.atan2(x).to_degrees();
    let altitude = (x * x + y * y + z * z).sqrt();

    let fields = [0.0, longitude, altitude, equatorial_radius, polar_radius]
        .iter()
        .map(|v| format!("{:>width$.6}", v, width = DESCRIPTOR_FIELD_WIDTH))
        .collect::<Vec<_>>()
        .join(",");

    format!("{:<width$}", fields, width = SATELLITE_POSITION_LENGTH)
}
