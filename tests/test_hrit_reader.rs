mod common;

use common::{dir_prefix, hrit_count_at, write_hrit_ancillary, write_hrit_segment};
use seviri::core::preprocess::read_product;
use seviri::io::hrit::{read_hrit, HritName};
use seviri::types::{Bounds, SeviriError, FILL_VALUE_US};
use tempfile::TempDir;

fn timeslot(dir: &TempDir) -> HritName {
    HritName::new(&dir_prefix(dir.path()), "202006211200", 3).expect("Failed to build name")
}

#[test]
fn test_read_first_segment_window() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    write_hrit_ancillary(&name, 323);
    write_hrit_segment(&name, 9, 1);

    let bounds = Bounds::LineColumn { line0: 0, line1: 9, column0: 1856, column1: 1863 };
    let data = read_hrit(&name, &[9], &bounds).expect("Failed to read HRIT timeslot");

    println!("Satellite {}, window {:?}", data.satellite_id(), data.image.counts.dim());
    assert_eq!(data.satellite_id(), 323);
    assert_eq!(data.image.counts.dim(), (1, 10, 8));
    for x in 0..10 {
        for j in 0..8 {
            assert_eq!(data.image.counts[[0, x, j]], hrit_count_at(x, 1856 + j));
        }
    }
    assert!(data.image.packet_headers.is_empty());

    let (start, end) = data.scan_times();
    assert!(end > start, "scan end should follow scan start");
}

#[test]
fn test_missing_segment_leaves_fill() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    write_hrit_ancillary(&name, 323);
    write_hrit_segment(&name, 1, 1);

    // Lines 460..467 straddle segments 1 and 2, only segment 1 exists
    let bounds = Bounds::LineColumn { line0: 460, line1: 467, column0: 0, column1: 3 };
    let data = read_hrit(&name, &[1], &bounds).expect("Failed to read HRIT timeslot");

    assert_eq!(data.image.counts[[0, 3, 2]], hrit_count_at(463, 2));
    assert_eq!(data.image.counts[[0, 4, 2]], FILL_VALUE_US);
    assert_eq!(data.image.counts[[0, 7, 0]], FILL_VALUE_US);
}

#[test]
fn test_read_through_segment_file_name() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    write_hrit_ancillary(&name, 323);
    write_hrit_segment(&name, 4, 5);

    let segment_path = name.segment(4, 5);
    let bounds = Bounds::LineColumn { line0: 1856, line1: 1859, column0: 100, column1: 103 };
    let data = read_product(&segment_path, &[4], &bounds).expect("Failed to read through a segment name");
    assert_eq!(data.image.counts[[0, 0, 0]], hrit_count_at(1856, 100));
}

#[test]
fn test_missing_prologue_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    let err = read_hrit(&name, &[1], &Bounds::FullDisk).unwrap_err();
    assert!(matches!(err, SeviriError::Io(_)));
}

#[test]
fn test_rejects_hrv() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    assert!(matches!(read_hrit(&name, &[12], &Bounds::FullDisk), Err(SeviriError::Unsupported(_))));
}

#[test]
fn test_column_alignment_is_absolute_for_segments() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let name = timeslot(&dir);
    write_hrit_ancillary(&name, 323);
    write_hrit_segment(&name, 1, 1);

    // Segmented products always start at column 0
    let aligned = Bounds::LineColumn { line0: 0, line1: 3, column0: 4, column1: 11 };
    assert!(read_hrit(&name, &[1], &aligned).is_ok());

    let misaligned = Bounds::LineColumn { line0: 0, line1: 3, column0: 2, column1: 9 };
    let err = read_hrit(&name, &[1], &misaligned).unwrap_err();
    assert!(matches!(err, SeviriError::InvalidInput(_)));
}
