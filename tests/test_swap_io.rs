use seviri::io::records::{MarfHeader, PacketHeader, PACKET_HEADER_SIZE};
use seviri::io::swap::{read_record, Record, SwapReader, SwapWriter, Transfer};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use tempfile::NamedTempFile;

#[test]
fn test_preamble_through_file() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = NamedTempFile::new().expect("Failed to create temp file");
    let mut marf = MarfHeader::for_rectangle(&[1, 4, 9], 1, 3712, 1, 3712);
    let mut packet_header = PacketHeader { sequence_count: 0x0102, packet_length: 7, ..PacketHeader::default() };

    {
        let mut io = SwapWriter::new(BufWriter::new(File::create(tmp.path()).unwrap()));
        marf.transfer(&mut io).expect("Failed to write MARF header");
        packet_header.transfer(&mut io).expect("Failed to write packet header");
        io.flush().unwrap();
    }

    let mut io = SwapReader::new(BufReader::new(File::open(tmp.path()).unwrap()));
    let read_marf: MarfHeader = read_record(&mut io).expect("Failed to read MARF header");
    let marf_len = io.position().unwrap();
    let read_header: PacketHeader = read_record(&mut io).expect("Failed to read packet header");

    println!("MARF header is {} bytes", marf_len);
    assert_eq!(read_marf, marf);
    assert_eq!(read_marf.band_position_in_file(9), Some(2));
    assert_eq!(read_marf.band_position_in_file(2), None);
    assert_eq!(read_header, packet_header);
    assert_eq!(io.position().unwrap(), marf_len + PACKET_HEADER_SIZE as u64);
    // Big-endian swapping is back on after the packet header
    assert_eq!(io.swap_bytes(), cfg!(target_endian = "little"));
}

#[test]
fn test_packet_header_is_host_order() {
    let mut header = PacketHeader { sequence_count: 0x0102, ..PacketHeader::default() };
    let mut io = SwapWriter::new(Vec::new());
    header.transfer(&mut io).unwrap();
    let bytes = io.into_inner();

    assert_eq!(bytes.len(), PACKET_HEADER_SIZE);
    // Six single-byte ids, the source unit and cpu ids, then the two destination bytes
    let offset = 6 + 4 + 4 + 2;
    assert_eq!(&bytes[offset..offset + 2], &0x0102u16.to_ne_bytes());
}

#[test]
fn test_mixed_fields_from_cursor() {
    let bytes = vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x2a, 0x3f, 0xf0, 0, 0, 0, 0, 0, 0];
    let mut io = SwapReader::new(Cursor::new(bytes));

    let (mut a, mut b, mut c) = (0u16, 0u32, 0f64);
    io.u16(&mut a).unwrap();
    io.u32(&mut b).unwrap();
    io.f64(&mut c).unwrap();

    assert_eq!((a, b, c), (0x1234, 42, 1.0));
    assert!(io.u8(&mut 0).is_err(), "reading past the end should fail");
}
