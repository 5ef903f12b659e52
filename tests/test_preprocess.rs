mod common;

use approx::assert_abs_diff_eq;
use common::{centre_product, count_at, native_product, dir_prefix, write_hrit_ancillary, write_hrit_segment, CAL_OFFSET, CAL_SLOPE};
use seviri::core::calibrate::{reflectance_factor, CalibrationChoice, CalibrationMode, SATELLITES};
use seviri::core::geometry::day_of_year;
use seviri::core::orbit::SATELLITE_POSITION_LENGTH;
use seviri::core::preprocess::{read_and_preprocess, PreprocessParams, Preprocessor};
use seviri::io::hrit::HritName;
use seviri::io::native::write_native;
use seviri::types::{Bounds, SeviriError, Units, FILL_VALUE_D, FILL_VALUE_F, FILL_VALUE_US};
use tempfile::TempDir;

fn preprocessor(units: &[Units]) -> Preprocessor {
    Preprocessor::standard().with_units(units)
}

#[test]
fn test_counts_and_geometry() {
    let _ = env_logger::builder().is_test(true).try_init();

    let data = centre_product(&[1, 9]);
    let product = preprocessor(&[Units::Cnt, Units::Cnt]).preprocess(&data).expect("Failed to preprocess");

    assert_eq!((product.n_bands, product.n_lines, product.n_columns), (2, 8, 8));
    assert_eq!(product.fill_value, FILL_VALUE_F);
    assert_eq!(product.satellite, "MSG-3");
    assert_eq!(product.data[[1, 2, 5]], count_at(1, 2, 5) as f32);

    let (start, end) = data.scan_times();
    for i in 0..8 {
        for j in 0..8 {
            assert!(product.lat[[i, j]].abs() < 1.0, "centre latitude out of range: {}", product.lat[[i, j]]);
            assert!(product.lon[[i, j]].abs() < 1.0, "centre longitude out of range: {}", product.lon[[i, j]]);
            assert!(product.vza[[i, j]] >= 0.0 && product.vza[[i, j]] < 1.0);
            assert!(product.saa[[i, j]] >= 0.0 && product.saa[[i, j]] < 360.0);
            assert!(product.time[[i, j]] >= start && product.time[[i, j]] <= end);
        }
    }
    // Later lines are scanned later
    assert!(product.time[[7, 0]] > product.time[[0, 0]]);

    println!("Satellite position: '{}'", product.satellite_position);
    assert_eq!(product.satellite_position.len(), SATELLITE_POSITION_LENGTH);
    assert_abs_diff_eq!(product.mid_scan_time, (start + end) / 2.0, epsilon = 1e-9);
}

#[test]
fn test_zero_count_stays_fill() {
    let mut data = centre_product(&[1]);
    data.image.counts[[0, 0, 0]] = 0;

    let product = preprocessor(&[Units::Rad]).preprocess(&data).expect("Failed to preprocess");
    assert_eq!(product.data[[0, 0, 0]], FILL_VALUE_F);
    assert_abs_diff_eq!(
        product.data[[0, 0, 1]] as f64,
        CAL_SLOPE * count_at(0, 0, 1) as f64 + CAL_OFFSET,
        epsilon = 1e-5
    );
}

#[test]
fn test_reflectance_and_brightness_temperature() {
    let data = centre_product(&[2, 9]);
    let product = preprocessor(&[Units::Ref, Units::Bt]).preprocess(&data).expect("Failed to preprocess");

    let doy = day_of_year(product.mid_scan_time).unwrap();
    let factor = reflectance_factor(&SATELLITES[2], 2, doy).unwrap();
    let radiance = CAL_SLOPE * count_at(0, 4, 4) as f64 + CAL_OFFSET;
    println!("sza at centre {}, reflectance {}", product.sza[[4, 4]], product.data[[0, 4, 4]]);
    assert!(product.sza[[4, 4]] < 40.0, "sun should be high at noon in June");
    assert_abs_diff_eq!(product.data[[0, 4, 4]] as f64, factor * radiance, epsilon = 1e-5);

    let bt = product.data[[1, 4, 4]];
    assert!(bt > 100.0 && bt < 350.0, "unexpected brightness temperature {}", bt);
    // Higher counts are warmer
    assert!(product.data[[1, 7, 7]] > product.data[[1, 0, 0]]);
}

#[test]
fn test_invalid_requests() {
    let data = centre_product(&[1, 9]);

    let err = preprocessor(&[Units::Rad]).preprocess(&data).unwrap_err();
    assert!(matches!(err, SeviriError::InvalidInput(_)), "unit count mismatch: {}", err);

    let err = preprocessor(&[Units::Ref, Units::Ref]).preprocess(&data).unwrap_err();
    assert!(matches!(err, SeviriError::InvalidInput(_)), "reflectance of a thermal band: {}", err);

    let err = preprocessor(&[Units::Bt, Units::Bt]).preprocess(&data).unwrap_err();
    assert!(matches!(err, SeviriError::InvalidInput(_)), "temperature of a solar band: {}", err);

    let mut unknown = data.clone();
    unknown.header.satellite_status.satellite_id = 999;
    let err = preprocessor(&[Units::Cnt, Units::Cnt]).preprocess(&unknown).unwrap_err();
    assert!(matches!(err, SeviriError::Domain(_)));

    let mut stale = data;
    stale.header.satellite_status.orbit_polynomial.clear();
    let err = preprocessor(&[Units::Cnt, Units::Cnt]).preprocess(&stale).unwrap_err();
    assert!(matches!(err, SeviriError::Domain(_)));
}

#[test]
fn test_feedback_falls_back_to_vicarious() {
    let data = centre_product(&[1, 9]);
    let params = PreprocessParams {
        units: vec![Units::Rad, Units::Rad],
        calibration: CalibrationMode::Feedback,
        reuse_buffers: false,
    };
    let product = Preprocessor::new(params).preprocess(&data).expect("Failed to preprocess");

    // No feedback coefficients in the header
    assert!(matches!(product.calibration[0], Some(CalibrationChoice::Vicarious { .. })));
    assert!(matches!(product.calibration[1], Some(CalibrationChoice::Nominal { .. })));
}

#[test]
fn test_reused_buffers_are_reset() {
    let params = PreprocessParams {
        units: vec![Units::Rad],
        reuse_buffers: true,
        ..PreprocessParams::default()
    };
    let preprocessor = Preprocessor::new(params);

    let mut product = preprocessor.preprocess(&centre_product(&[1])).expect("Failed to preprocess");
    let mut data = centre_product(&[1]);
    data.image.counts[[0, 3, 3]] = 0;
    preprocessor.preprocess_into(&data, &mut product).expect("Failed to preprocess again");

    assert_eq!(product.data[[0, 3, 3]], FILL_VALUE_F);
    assert!(product.data[[0, 3, 4]] > 0.0);
}

#[test]
fn test_read_and_preprocess_native_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("product.nat");
    let mut data = native_product(&[3], 1801, 1864, 1801, 1864);
    data.image.counts[[0, 0, 0]] = FILL_VALUE_US;
    write_native(&path, &data).expect("Failed to write native product");

    let product = read_and_preprocess(&path, &[3], &[Units::Brf], &Bounds::ActualImage, CalibrationMode::Nominal)
        .expect("Failed to read and preprocess");

    assert_eq!((product.n_lines, product.n_columns), (64, 64));
    assert_eq!((product.i_line, product.i_column), (1800, 1800));
    assert!(product.lat[[0, 0]] != FILL_VALUE_F);
    assert!(product.time[[0, 0]] != FILL_VALUE_D);
    // Missing sample keeps its geometry but has no data
    assert_eq!(product.data[[0, 0, 0]], FILL_VALUE_F);

    let expected = CAL_SLOPE * count_at(0, 60, 60) as f64 + CAL_OFFSET;
    let brf = product.data[[0, 60, 60]] as f64;
    let sza = (product.sza[[60, 60]] as f64).to_radians();
    let factor = reflectance_factor(&SATELLITES[2], 3, day_of_year(product.mid_scan_time).unwrap()).unwrap();
    assert_abs_diff_eq!(brf, factor * expected / sza.cos(), epsilon = 1e-4);
}

#[test]
fn test_preprocess_hrit_timeslot() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = HritName::new(&dir_prefix(dir.path()), "202006211200", 4).expect("Failed to build name");
    write_hrit_ancillary(&name, 324);
    write_hrit_segment(&name, 10, 4);
    write_hrit_segment(&name, 10, 5);

    let bounds = Bounds::LineColumn { line0: 1852, line1: 1859, column0: 1856, column1: 1863 };
    let product = Preprocessor::standard()
        .with_units(&[Units::Bt])
        .read_and_preprocess_hrit(&name, &[10], &bounds)
        .expect("Failed to preprocess HRIT");

    assert_eq!(product.satellite, "MSG-4");
    assert_eq!((product.i_line, product.i_column), (1852, 1856));
    assert!(product.data.iter().all(|&v| v > 100.0 && v < 400.0), "all window pixels should have a temperature");
}

#[test]
fn test_full_disk_counts_of_small_rectangle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("MSG3-SEVI-MSG15-0100-NA-20200621121243.nat");
    let mut data = centre_product(&[1, 9]);
    data.image.counts[[1, 4, 4]] = FILL_VALUE_US;
    write_native(&path, &data).expect("Failed to write native product");

    let product = read_and_preprocess(
        &path,
        &[1, 9],
        &[Units::Cnt, Units::Cnt],
        &Bounds::FullDisk,
        CalibrationMode::Nominal,
    )
    .expect("Failed to read and preprocess");
    println!(
        "Full disk product: {} x {} from ({}, {})",
        product.n_lines, product.n_columns, product.i_line, product.i_column
    );

    assert_eq!((product.n_bands, product.n_lines, product.n_columns), (2, 3712, 3712));
    assert_eq!((product.i_line, product.i_column), (0, 0));

    for b in 0..2 {
        for l in 0..8 {
            for c in 0..8 {
                let value = product.data[[b, 1856 + l, 1856 + c]];
                if b == 1 && l == 4 && c == 4 {
                    assert_eq!(value, FILL_VALUE_F, "written fill should stay fill");
                } else {
                    assert_eq!(value, count_at(b, l, c) as f32, "band {} line {} column {}", b, l, c);
                }
            }
        }
    }

    for &(l, c) in &[(1855, 1856), (1864, 1860), (1860, 1855), (1860, 1864), (0, 0), (3711, 3711)] {
        assert_eq!(product.data[[0, l, c]], FILL_VALUE_F, "({}, {}) outside the rectangle", l, c);
    }
    let n_valid = product.data.iter().filter(|&&v| v != FILL_VALUE_F).count();
    assert_eq!(n_valid, 2 * 64 - 1);
}

