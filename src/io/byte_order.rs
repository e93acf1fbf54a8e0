//! Byte order handling for TIFF files
//!
//! This module implements the Strategy pattern for handling different
//! byte orders (little-endian vs big-endian) when reading source rasters
//! and writing output rasters in the same order as their source.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use byteorder::ByteOrder as EndianBytes;
use std::io::{Result, Write};

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let byte_order = reader.read_u16::<LittleEndian>()?;
        match byte_order {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II" (Intel)
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM" (Motorola)
            _ => Err(TiffError::InvalidByteOrder(byte_order)),
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// The two marker bytes that open a file in this order
    pub fn marker(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Creates the appropriate handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }
}

/// Trait for byte order handling strategies
pub trait ByteOrderHandler: Send + Sync {
    /// The order this handler reads and writes
    fn byte_order(&self) -> ByteOrder;

    /// Read a u16 value
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    /// Read a u32 value
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// Read a u64 value
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    /// Decode a u16 from the first two bytes of a slice
    fn decode_u16(&self, bytes: &[u8]) -> u16;

    /// Decode a u32 from the first four bytes of a slice
    fn decode_u32(&self, bytes: &[u8]) -> u32;

    /// Decode a u64 from the first eight bytes of a slice
    fn decode_u64(&self, bytes: &[u8]) -> u64;

    /// Write a u16 value
    fn write_u16(&self, writer: &mut dyn Write, value: u16) -> Result<()>;

    /// Write a u32 value
    fn write_u32(&self, writer: &mut dyn Write, value: u32) -> Result<()>;

    /// Write a u64 value
    fn write_u64(&self, writer: &mut dyn Write, value: u64) -> Result<()>;
}

/// Little-endian byte order handler
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn decode_u16(&self, bytes: &[u8]) -> u16 {
        LittleEndian::read_u16(bytes)
    }

    fn decode_u32(&self, bytes: &[u8]) -> u32 {
        LittleEndian::read_u32(bytes)
    }

    fn decode_u64(&self, bytes: &[u8]) -> u64 {
        LittleEndian::read_u64(bytes)
    }

    fn write_u16(&self, writer: &mut dyn Write, value: u16) -> Result<()> {
        writer.write_u16::<LittleEndian>(value)
    }

    fn write_u32(&self, writer: &mut dyn Write, value: u32) -> Result<()> {
        writer.write_u32::<LittleEndian>(value)
    }

    fn write_u64(&self, writer: &mut dyn Write, value: u64) -> Result<()> {
        writer.write_u64::<LittleEndian>(value)
    }
}

/// Big-endian byte order handler
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn decode_u16(&self, bytes: &[u8]) -> u16 {
        BigEndian::read_u16(bytes)
    }

    fn decode_u32(&self, bytes: &[u8]) -> u32 {
        BigEndian::read_u32(bytes)
    }

    fn decode_u64(&self, bytes: &[u8]) -> u64 {
        BigEndian::read_u64(bytes)
    }

    fn write_u16(&self, writer: &mut dyn Write, value: u16) -> Result<()> {
        writer.write_u16::<BigEndian>(value)
    }

    fn write_u32(&self, writer: &mut dyn Write, value: u32) -> Result<()> {
        writer.write_u32::<BigEndian>(value)
    }

    fn write_u64(&self, writer: &mut dyn Write, value: u64) -> Result<()> {
        writer.write_u64::<BigEndian>(value)
    }
}
