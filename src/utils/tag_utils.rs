//! TIFF tag utilities
//!
//! Name lookups for tags and codes, backed by the table in `tiff_tags.toml`,
//! and helpers for decoding tag value arrays.

use std::collections::HashMap;
use byteorder::ReadBytesExt;
use lazy_static::lazy_static;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::field_types;

lazy_static! {
    static ref TAG_NAMES: TagNameTable = {
        let content = include_str!("../../tiff_tags.toml");
        TagNameTable::from_str(content).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse tag name table: {}", e);
            TagNameTable::default()
        })
    };
}

/// Names for tags and enumerated tag values
#[derive(Debug, Default)]
pub struct TagNameTable {
    pub tags: HashMap<u64, String>,
    pub field_types: HashMap<u64, String>,
    pub compression: HashMap<u64, String>,
    pub photometric: HashMap<u64, String>,
}

impl TagNameTable {
    /// Parse the name table from a TOML string
    pub fn from_str(content: &str) -> TiffResult<Self> {
        let value = content.parse::<toml::Value>()
            .map_err(|e| TiffError::GenericError(format!("Failed to parse TOML: {}", e)))?;

        Ok(TagNameTable {
            tags: Self::section(&value, "tags"),
            field_types: Self::section(&value, "field_types"),
            compression: Self::section(&value, "compression"),
            photometric: Self::section(&value, "photometric"),
        })
    }

    fn section(value: &toml::Value, name: &str) -> HashMap<u64, String> {
        let mut map = HashMap::new();
        if let Some(table) = value.get(name).and_then(|v| v.as_table()) {
            for (key, name) in table {
                if let (Ok(code), Some(name)) = (key.parse::<u64>(), name.as_str()) {
                    map.insert(code, name.to_string());
                }
            }
        }
        map
    }
}

fn lookup(map: &'static HashMap<u64, String>, code: u64) -> &'static str {
    map.get(&code).map(|s| s.as_str()).unwrap_or("Unknown")
}

/// Get the name of a TIFF tag
pub fn get_tag_name(tag: u16) -> &'static str {
    lookup(&TAG_NAMES.tags, tag as u64)
}

/// Get the name of a field type
pub fn get_field_type_name(field_type: u16) -> &'static str {
    lookup(&TAG_NAMES.field_types, field_type as u64)
}

/// Get the name of a compression code
pub fn get_compression_name(code: u64) -> &'static str {
    lookup(&TAG_NAMES.compression, code)
}

/// Get the name of a photometric interpretation
pub fn get_photometric_name(code: u64) -> &'static str {
    lookup(&TAG_NAMES.photometric, code)
}

/// Reads an array of tag values based on the field type
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> TiffResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => reader.read_u8()? as u64,
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG => handler.read_u32(reader)? as u64,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Decodes integer values held inline in an entry's raw value field
pub fn decode_inline_values(entry: &IFDEntry, handler: &dyn ByteOrderHandler) -> TiffResult<Vec<u64>> {
    let size = entry.get_field_type_size();
    let mut values = Vec::with_capacity(entry.count as usize);

    for i in 0..entry.count as usize {
        let bytes = &entry.raw_field[i * size..(i + 1) * size];
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => bytes[0] as u64,
            field_types::SHORT | field_types::SSHORT => handler.decode_u16(bytes) as u64,
            field_types::LONG | field_types::SLONG => handler.decode_u32(bytes) as u64,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.decode_u64(bytes),
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };
        values.push(value);
    }

    Ok(values)
}
