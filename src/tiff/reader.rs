//! TIFF file reader implementation
//!
//! This module implements the TIFF/BigTIFF directory reader that uses the
//! Strategy pattern to handle different byte orders.

use log::{debug, info, warn};
use std::io::{Read, Seek, SeekFrom};

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{header, limits};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::utils::tag_utils;

/// Reader for TIFF and BigTIFF directory structures
pub struct TiffReader {
    /// Current byte order handler
    pub(crate) byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    pub(crate) is_big_tiff: bool,
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Returns the byte order handler, with proper error handling for None case
    pub fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Byte order of the last file read
    pub fn byte_order(&self) -> TiffResult<ByteOrder> {
        Ok(self.handler()?.byte_order())
    }

    /// Reads a TIFF file from the given reader
    ///
    /// Detects the byte order, checks for TIFF or BigTIFF and follows the
    /// whole IFD chain.
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order_handler = Some(byte_order.create_handler());

        self.is_big_tiff = self.detect_format(reader)?;

        let first_ifd_offset = if self.is_big_tiff {
            self.handler()?.read_u64(reader)?
        } else {
            self.handler()?.read_u32(reader)? as u64
        };
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = reader.stream_size()?;
        if first_ifd_offset >= file_size || first_ifd_offset < 8 {
            return Err(TiffError::GenericError(format!(
                "Invalid IFD offset: {} (file size: {})", first_ifd_offset, file_size)));
        }

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        info!("Read {}", tiff);
        Ok(tiff)
    }

    /// Checks the version word and, for BigTIFF, the extended header
    fn detect_format(&self, reader: &mut dyn SeekableReader) -> TiffResult<bool> {
        let handler = self.handler()?;
        let version = handler.read_u16(reader)?;

        match version {
            header::TIFF_VERSION => Ok(false),
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(reader)?;
                let reserved = handler.read_u16(reader)?;
                if offset_size != header::BIGTIFF_OFFSET_SIZE || reserved != 0 {
                    return Err(TiffError::InvalidBigTIFFHeader);
                }
                Ok(true)
            }
            _ => Err(TiffError::UnsupportedVersion(version)),
        }
    }

    /// Reads a chain of IFDs starting from the given offset
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < limits::MAX_DIRECTORIES {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = self.read_ifd(reader, ifd_offset, ifds.len())?;

            let next_ifd_offset = if self.is_big_tiff {
                self.handler()?.read_u64(reader)?
            } else {
                self.handler()?.read_u32(reader)? as u64
            };
            debug!("Next IFD offset: {}", next_ifd_offset);

            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            if next_ifd_offset == ifd_offset {
                warn!("IFD at {} points to itself, stopping IFD chain", ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads an IFD and leaves the reader on its next-IFD offset field
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;

        let handler = self.handler()?;
        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} entry count: {}", number, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry
    ///
    /// Single inline integers are decoded from the start of the value field
    /// so a big-endian SHORT does not come out shifted by 16 bits.
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut raw_field = [0u8; 8];
        reader.read_exact(&mut raw_field[..field_len])?;

        let mut entry = IFDEntry::with_raw_field(tag, field_type, count, 0, raw_field);
        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) && count == 1 {
            tag_utils::decode_inline_values(&entry, handler)
                .ok()
                .and_then(|values| values.first().copied())
                .unwrap_or_else(|| self.decode_field(&raw_field))
        } else {
            self.decode_field(&raw_field)
        };

        Ok(entry)
    }

    fn decode_field(&self, raw_field: &[u8; 8]) -> u64 {
        match &self.byte_order_handler {
            Some(handler) if self.is_big_tiff => handler.decode_u64(raw_field),
            Some(handler) => handler.decode_u32(raw_field) as u64,
            None => 0,
        }
    }

    /// Reads a tag's value as a vector of u64
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(TiffError::TagNotFound(tag))?;
        let handler = self.handler()?;

        if entry.is_value_inline(self.is_big_tiff) {
            return tag_utils::decode_inline_values(entry, handler);
        }

        let mut values = Vec::with_capacity(entry.count as usize);
        reader.seek(SeekFrom::Start(entry.value_offset))?;
        tag_utils::read_tag_value_array(reader, entry, handler, &mut values)?;
        Ok(values)
    }

    /// Reads the raw value bytes of an entry in file byte order
    pub fn read_entry_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> TiffResult<Vec<u8>> {
        let len = entry.value_byte_len();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.raw_field[..len].to_vec());
        }

        let mut bytes = vec![0u8; len];
        reader.read_exact_at(entry.value_offset, &mut bytes)?;
        Ok(bytes)
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}
