use approx::assert_abs_diff_eq;
use seviri::core::geometry::{solar_params, viewing_angles, wrap_azimuth};
use seviri::core::navigation::{latlon_to_pixel, pixel_to_latlon, NAV_SCALING_VIR};
use seviri::core::orbit::satellite_position_descriptor;

#[test]
fn test_pixel_latlon_round_trip_over_disk() {
    let mut checked = 0;
    for line in (100..3700u32).step_by(450) {
        for column in (100..3700u32).step_by(450) {
            let Some((lat, lon)) = pixel_to_latlon(line, column, 9.5, &NAV_SCALING_VIR, 2) else {
                continue;
            };
            let (l, c) = latlon_to_pixel(lat, lon, 9.5, &NAV_SCALING_VIR).expect("visible point should map back");
            assert_eq!((l, c), (line, column), "round trip failed at {}, {} ({}, {})", line, column, lat, lon);
            checked += 1;
        }
    }
    println!("Checked {} disk pixels", checked);
    assert!(checked > 30, "too few pixels on the disk: {}", checked);
}

#[test]
fn test_off_disk_and_hidden_points() {
    assert!(pixel_to_latlon(1, 1, 0.0, &NAV_SCALING_VIR, 2).is_none());
    assert!(pixel_to_latlon(1856, 5, 0.0, &NAV_SCALING_VIR, 2).is_none());
    // Antipode of the sub-satellite point
    assert!(latlon_to_pixel(0.0, 180.0, 0.0, &NAV_SCALING_VIR).is_none());
}

#[test]
fn test_grid_is_south_up_east_left() {
    let (south, _) = pixel_to_latlon(1000, 1856, 0.0, &NAV_SCALING_VIR, 2).unwrap();
    let (north, _) = pixel_to_latlon(2700, 1856, 0.0, &NAV_SCALING_VIR, 2).unwrap();
    assert!(south < 0.0 && north > 0.0, "line 1000 at {}, line 2700 at {}", south, north);

    let (_, east) = pixel_to_latlon(1856, 1000, 0.0, &NAV_SCALING_VIR, 2).unwrap();
    let (_, west) = pixel_to_latlon(1856, 2700, 0.0, &NAV_SCALING_VIR, 2).unwrap();
    assert!(east > 0.0 && west < 0.0, "column 1000 at {}, column 2700 at {}", east, west);
}

#[test]
fn test_viewing_geometry_from_geostationary_orbit() {
    let (vza, _) = viewing_angles(0.0, 0.0, 0.0, 42164.0, 0.0, 0.0);
    assert_abs_diff_eq!(vza, 0.0, epsilon = 1e-6);

    // A point north of the sub-satellite point sees the satellite to the south
    let (vza, vaa) = viewing_angles(45.0, 0.0, 0.0, 42164.0, 0.0, 0.0);
    assert!(vza > 45.0 && vza < 60.0, "vza {}", vza);
    assert_abs_diff_eq!(wrap_azimuth(vaa), 0.0, epsilon = 1e-6);
}

#[test]
fn test_solar_noon_on_the_equator() {
    // 2020-03-20 12:00 UTC, close to the equinox
    let jtime = 2458929.0;
    let sun = solar_params(jtime, 0.0, 0.0);
    println!("zenith {} azimuth {}", sun.zenith, sun.azimuth);
    assert!(sun.zenith < 3.0, "sun should be overhead, zenith {}", sun.zenith);
    assert!(sun.distance_factor > 0.98 && sun.distance_factor < 1.02);
}

#[test]
fn test_descriptor_longitude() {
    let lon = 41.5f64.to_radians();
    let position = [42164.0 * lon.cos(), 42164.0 * lon.sin(), 0.0];
    let descriptor = satellite_position_descriptor(&position, 6378.169, 6356.5838);
    let fields: Vec<f64> = descriptor
        .trim_end()
        .split(',')
        .map(|f| f.trim().parse().unwrap())
        .collect();
    assert_abs_diff_eq!(fields[1], 41.5, epsilon = 1e-6);
    assert_abs_diff_eq!(fields[2], 42164.0, epsilon = 1e-6);
}
