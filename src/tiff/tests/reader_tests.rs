//! Tests for the directory reader and raster opening

extern crate std;

use byteorder::LittleEndian;

use super::test_utils::{
    create_big_endian_strip_tiff, create_grey_strip_tiff, create_test_bigtiff_buffer, create_test_tiff_buffer,
};
use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::TiffError;
use crate::tiff::raster::{SourceRaster, StorageLayout};
use crate::tiff::reader::TiffReader;

#[test]
fn test_read_classic_directory() {
    let mut cursor = create_test_tiff_buffer();
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.ifd_count(), 1);
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((800, 600)));
}

#[test]
fn test_read_bigtiff_directory() {
    let mut cursor = create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    std::assert!(tiff.is_big_tiff);
    std::assert!(reader.is_big_tiff());
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_big_endian_shorts_are_not_shifted() {
    let mut cursor = create_big_endian_strip_tiff(6, 4);
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    std::assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
    let ifd = tiff.main_ifd().unwrap();
    std::assert_eq!(ifd.get_tag_value(258), Some(8));
    std::assert_eq!(ifd.get_tag_value(259), Some(1));
}

#[test]
fn test_open_raster_from_big_endian_stream() {
    let cursor = create_big_endian_strip_tiff(6, 4);
    let mut raster = SourceRaster::from_reader(Box::new(cursor), "memory", 0).unwrap();

    std::assert_eq!((raster.width(), raster.length()), (6, 4));
    std::assert_eq!(raster.layout(), StorageLayout::Strips { rows_per_strip: 4 });
    std::assert_eq!(raster.byte_order().unwrap(), ByteOrder::BigEndian);
    std::assert!(!raster.byte_counts_estimated());

    let pixels = raster.decode_block(0).unwrap();
    std::assert_eq!(pixels, (0..24u8).collect::<Vec<_>>());
}

#[test]
fn test_missing_byte_counts_are_estimated() {
    let cursor = create_grey_strip_tiff::<LittleEndian>(*b"II", 5, 3, false);
    let mut raster = SourceRaster::from_reader(Box::new(cursor), "memory", 0).unwrap();

    std::assert!(raster.byte_counts_estimated());
    std::assert_eq!(raster.block_byte_count(0), 15);
    std::assert_eq!(raster.decode_block(0).unwrap().len(), 15);
}

#[test]
fn test_missing_directory_is_reported() {
    let cursor = create_big_endian_strip_tiff(2, 2);
    let result = SourceRaster::from_reader(Box::new(cursor), "memory", 3);
    std::assert!(matches!(result, Err(TiffError::GenericError(_))));
}
