//! Byte order detection and the handlers the writer mirrors from its source

extern crate std;

use std::io::Cursor;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler, LittleEndianHandler, BigEndianHandler};
use crate::tiff::errors::TiffError;

/// Classic header in `order`: marker, 42 and the first IFD offset
fn classic_header(order: ByteOrder, first_ifd: u32) -> Vec<u8> {
    let handler = order.create_handler();
    let mut header = order.marker().to_vec();
    handler.write_u16(&mut header, 42).unwrap();
    handler.write_u32(&mut header, first_ifd).unwrap();
    header
}

#[test]
fn test_header_fields_read_back_in_detected_order() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let mut cursor = Cursor::new(classic_header(order, 0x0001_0008));

        let detected = ByteOrder::detect(&mut cursor).unwrap();
        std::assert_eq!(detected, order);

        let handler = detected.create_handler();
        std::assert_eq!(handler.byte_order(), order);
        std::assert_eq!(handler.read_u16(&mut cursor).unwrap(), 42);
        std::assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x0001_0008);
    }
}

#[test]
fn test_unknown_marker_is_rejected() {
    let mut cursor = Cursor::new(b"IM*\0".to_vec());
    std::assert!(matches!(ByteOrder::detect(&mut cursor), Err(TiffError::InvalidByteOrder(0x4D49))));

    let mut short = Cursor::new(vec![0x49]);
    std::assert!(matches!(ByteOrder::detect(&mut short), Err(TiffError::IoError(_))));
}

#[test]
fn test_written_bytes_follow_the_handler_order() {
    let mut little = Vec::new();
    LittleEndianHandler.write_u16(&mut little, 0x1234).unwrap();
    LittleEndianHandler.write_u32(&mut little, 0x12345678).unwrap();
    std::assert_eq!(little, vec![0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);

    let mut big = Vec::new();
    BigEndianHandler.write_u16(&mut big, 0x1234).unwrap();
    BigEndianHandler.write_u64(&mut big, 1).unwrap();
    std::assert_eq!(big, vec![0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn test_inline_values_decode_without_a_reader() {
    // An IFD entry's 4-byte value field holding a SHORT, then a LONG
    let field = [0x00, 0x10, 0x00, 0x00];
    std::assert_eq!(BigEndianHandler.decode_u16(&field), 0x0010);
    std::assert_eq!(LittleEndianHandler.decode_u16(&field), 0x1000);
    std::assert_eq!(BigEndianHandler.decode_u32(&field), 0x0010_0000);
    std::assert_eq!(LittleEndianHandler.decode_u32(&field), 0x0000_1000);

    let offset = 0x0000_0001_0000_0000u64;
    let mut bytes = Vec::new();
    BigEndianHandler.write_u64(&mut bytes, offset).unwrap();
    std::assert_eq!(BigEndianHandler.decode_u64(&bytes), offset);
    std::assert_ne!(LittleEndianHandler.decode_u64(&bytes), offset);
}

#[test]
fn test_bigtiff_offsets_survive_both_orders() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let handler = order.create_handler();
        let mut bytes = Vec::new();
        handler.write_u64(&mut bytes, 0x1234_5678_90AB_CDEF).unwrap();
        std::assert_eq!(bytes.len(), 8);

        let mut cursor = Cursor::new(bytes);
        std::assert_eq!(handler.read_u64(&mut cursor).unwrap(), 0x1234_5678_90AB_CDEF);
    }
}

#[test]
fn test_names_mention_the_marker() {
    std::assert!(ByteOrder::LittleEndian.name().contains("II"));
    std::assert!(ByteOrder::BigEndian.name().contains("MM"));
}
