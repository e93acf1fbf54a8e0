use std::io::Cursor;
use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian, WriteBytesExt};

/// Creates a test buffer with TIFF header and sample data
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    // Sample IFD (at offset 8)
    buffer.write_u16::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u32::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u32::<LittleEndian>(800).unwrap();    // Value (width)

    // Entry 2: ImageLength/Height (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u32::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u32::<LittleEndian>(600).unwrap();    // Value (height)

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u32::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Creates a test buffer with BigTIFF header and sample data
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // BigTIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    // Sample IFD (at offset 16)
    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(1024).unwrap();   // Value (width)

    // Entry 2: ImageLength/Height (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u64::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u64::<LittleEndian>(768).unwrap();    // Value (height)

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Writes a classic IFD entry with an inline SHORT value
fn short_entry<E: Endian>(buffer: &mut Vec<u8>, tag: u16, value: u16) {
    buffer.write_u16::<E>(tag).unwrap();
    buffer.write_u16::<E>(3).unwrap();
    buffer.write_u32::<E>(1).unwrap();
    buffer.write_u16::<E>(value).unwrap();
    buffer.write_u16::<E>(0).unwrap();
}

/// Writes a classic IFD entry with an inline LONG value
fn long_entry<E: Endian>(buffer: &mut Vec<u8>, tag: u16, value: u32) {
    buffer.write_u16::<E>(tag).unwrap();
    buffer.write_u16::<E>(4).unwrap();
    buffer.write_u32::<E>(1).unwrap();
    buffer.write_u32::<E>(value).unwrap();
}

/// A one-strip, 8-bit grey image of `width` x `length` pixels
///
/// Pixel `(x, y)` holds `(x + y * width) as u8`. `byte_counts` controls
/// whether StripByteCounts is written.
pub fn create_grey_strip_tiff<E: Endian>(marker: [u8; 2], width: u32, length: u32, byte_counts: bool) -> Cursor<Vec<u8>> {
    let entry_count: u16 = if byte_counts { 8 } else { 7 };
    let ifd_size = 2 + entry_count as u32 * 12 + 4;
    let data_offset = 8 + ifd_size;

    let mut buffer = Vec::new();
    buffer.extend_from_slice(&marker);
    buffer.write_u16::<E>(42).unwrap();
    buffer.write_u32::<E>(8).unwrap();

    buffer.write_u16::<E>(entry_count).unwrap();
    long_entry::<E>(&mut buffer, 256, width);
    long_entry::<E>(&mut buffer, 257, length);
    short_entry::<E>(&mut buffer, 258, 8);
    short_entry::<E>(&mut buffer, 259, 1);
    short_entry::<E>(&mut buffer, 262, 1);
    long_entry::<E>(&mut buffer, 273, data_offset);
    long_entry::<E>(&mut buffer, 278, length);
    if byte_counts {
        long_entry::<E>(&mut buffer, 279, width * length);
    }
    buffer.write_u32::<E>(0).unwrap();

    buffer.extend((0..width * length).map(|i| i as u8));
    Cursor::new(buffer)
}

pub fn create_big_endian_strip_tiff(width: u32, length: u32) -> Cursor<Vec<u8>> {
    create_grey_strip_tiff::<BigEndian>(*b"MM", width, length, true)
}
