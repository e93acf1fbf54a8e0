//! Header and directory emission
//!
//! The builder streams pixel blocks straight to disk, so the header is
//! written with a zero first-directory offset and patched once the single
//! directory has been appended after the pixel data.

use std::io::{Seek, SeekFrom, Write};

use log::debug;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::builder::RawTag;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::utils::write_utils;

/// Writes TIFF headers and directories in a given byte order
pub struct DirectoryWriter<'h> {
    handler: &'h dyn ByteOrderHandler,
    is_big_tiff: bool,
}

impl<'h> DirectoryWriter<'h> {
    pub fn new(handler: &'h dyn ByteOrderHandler, is_big_tiff: bool) -> Self {
        DirectoryWriter { handler, is_big_tiff }
    }

    /// Size of the file header
    pub fn header_size(&self) -> u64 {
        if self.is_big_tiff { 16 } else { 8 }
    }

    /// Size of the value field of a directory entry
    pub fn value_field_size(&self) -> usize {
        if self.is_big_tiff { 8 } else { 4 }
    }

    /// Writes the header with a placeholder first-directory offset
    pub fn write_header(&self, writer: &mut dyn Write) -> TiffResult<u64> {
        writer.write_all(&self.handler.byte_order().marker())?;

        if self.is_big_tiff {
            self.handler.write_u16(writer, header::BIG_TIFF_VERSION)?;
            self.handler.write_u16(writer, header::BIGTIFF_OFFSET_SIZE)?;
            self.handler.write_u16(writer, 0)?;
            self.handler.write_u64(writer, 0)?;
        } else {
            self.handler.write_u16(writer, header::TIFF_VERSION)?;
            self.handler.write_u32(writer, 0)?;
        }

        Ok(self.header_size())
    }

    /// Appends one directory at `position`, which must be the current end
    /// of the stream
    ///
    /// Values too large for the entry's value field are written first,
    /// each on a 4-byte boundary, then the directory itself. Returns the
    /// directory offset and the new end of the stream.
    pub fn write_directory(&self, writer: &mut dyn Write, position: u64, tags: &[RawTag]) -> TiffResult<(u64, u64)> {
        let tags = write_utils::get_unique_sorted_tags(tags);
        let field_size = self.value_field_size();

        let mut position = position + write_utils::write_padding(writer, position)?;
        let mut value_offsets = Vec::with_capacity(tags.len());
        for tag in &tags {
            if tag.bytes.len() > field_size {
                value_offsets.push(Some(position));
                writer.write_all(&tag.bytes)?;
                position += tag.bytes.len() as u64;
                position += write_utils::write_padding(writer, position)?;
            } else {
                value_offsets.push(None);
            }
        }

        let directory_offset = position;
        if !self.is_big_tiff && directory_offset > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "directory offset {} does not fit a classic TIFF", directory_offset)));
        }
        debug!("Writing directory with {} entries at offset {}", tags.len(), directory_offset);

        if self.is_big_tiff {
            self.handler.write_u64(writer, tags.len() as u64)?;
        } else {
            self.handler.write_u16(writer, tags.len() as u16)?;
        }

        for (tag, value_offset) in tags.iter().zip(&value_offsets) {
            self.handler.write_u16(writer, tag.tag)?;
            self.handler.write_u16(writer, tag.field_type)?;
            if self.is_big_tiff {
                self.handler.write_u64(writer, tag.count)?;
            } else {
                self.handler.write_u32(writer, tag.count as u32)?;
            }

            match value_offset {
                Some(offset) if self.is_big_tiff => self.handler.write_u64(writer, *offset)?,
                Some(offset) => self.handler.write_u32(writer, *offset as u32)?,
                None => {
                    let mut field = [0u8; 8];
                    field[..tag.bytes.len()].copy_from_slice(&tag.bytes);
                    writer.write_all(&field[..field_size])?;
                }
            }
        }

        if self.is_big_tiff {
            self.handler.write_u64(writer, 0)?;
        } else {
            self.handler.write_u32(writer, 0)?;
        }

        let entry_size = if self.is_big_tiff { 20 } else { 12 };
        let count_size = if self.is_big_tiff { 8 } else { 2 };
        let end = directory_offset + count_size + entry_size * tags.len() as u64 + field_size as u64;
        Ok((directory_offset, end))
    }

    /// Points the header at the first directory
    pub fn patch_first_directory_offset<W: Write + Seek>(&self, writer: &mut W, offset: u64) -> TiffResult<()> {
        let position = if self.is_big_tiff { 8 } else { 4 };
        writer.seek(SeekFrom::Start(position))?;

        if self.is_big_tiff {
            self.handler.write_u64(writer, offset)?;
        } else {
            self.handler.write_u32(writer, offset as u32)?;
        }
        Ok(())
    }
}
