//! Image File Directory (IFD) structures and methods
//!
//! An IFD describes one raster of the container as a list of tag entries.
//! Entries keep both a decoded scalar (for single inline values) and the
//! raw bytes of the value field, so inline arrays can be copied verbatim.

use std::collections::HashMap;
use std::fmt;
use log::{debug, trace};

use crate::tiff::constants::{field_types, tags};
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Index of entries by tag
    tag_map: HashMap<u16, usize>,
}

/// Represents an entry in an Image File Directory (IFD)
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Single inline value, or offset to the values
    pub value_offset: u64,
    /// Raw bytes of the value/offset field as stored in the file
    pub raw_field: [u8; 8],
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        trace!("New IFD entry: tag={} ({}), type={}, count={}, offset/value={}",
               tag, tag_utils::get_tag_name(tag), field_type, count, value_offset);

        Self {
            tag,
            field_type,
            count,
            value_offset,
            raw_field: [0u8; 8],
        }
    }

    /// Creates an entry and keeps the raw value field alongside it
    pub fn with_raw_field(tag: u16, field_type: u16, count: u64, value_offset: u64, raw_field: [u8; 8]) -> Self {
        let mut entry = Self::new(tag, field_type, count, value_offset);
        entry.raw_field = raw_field;
        entry
    }

    /// Get the size in bytes for this entry's field type
    pub fn get_field_type_size(&self) -> usize {
        field_types::size_of(self.field_type)
    }

    /// Total size of the values in bytes
    pub fn value_byte_len(&self) -> usize {
        self.get_field_type_size() * self.count as usize
    }

    /// Determines if the value is stored inline in value_offset
    /// rather than at the offset location
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.value_byte_len() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        let value_display = match self.tag {
            tags::COMPRESSION => format!("{} ({})",
                                         self.value_offset,
                                         tag_utils::get_compression_name(self.value_offset)),
            tags::PHOTOMETRIC_INTERPRETATION => format!("{} ({})",
                                                        self.value_offset,
                                                        tag_utils::get_photometric_name(self.value_offset)),
            _ => self.value_offset.to_string(),
        };

        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                self.field_type, tag_utils::get_field_type_name(self.field_type),
                self.count, value_display)
    }
}

impl IFD {
    /// Creates a new, empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        debug!("Creating new IFD #{} at offset {}", number, offset);

        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry to this IFD, replacing an earlier one with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());

        match self.tag_map.get(&entry.tag) {
            Some(&index) => self.entries[index] = entry,
            None => {
                self.tag_map.insert(entry.tag, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Gets a tag value (value_offset) directly
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag).map(|&index| &self.entries[index])
    }

    /// Gets the dimensions of the image described by this IFD
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Returns number of samples per pixel (default 1 if not specified)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether the raster is stored as tiles
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_OFFSETS)
    }

    /// Gets the number of entries in this IFD
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;

        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }

        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        writeln!(f, "  Tags:")?;
        for entry in &self.entries {
            writeln!(f, "    {}", entry.description())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_tag_replaces_the_entry() {
        let mut ifd = IFD::new(0, 8);
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, 100));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, 50));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::SHORT, 1, 120));

        assert_eq!(ifd.entry_count(), 2);
        assert_eq!(ifd.get_dimensions(), Some((120, 50)));
        assert_eq!(ifd.get_samples_per_pixel(), 1);
        assert!(!ifd.is_tiled());
    }

    #[test]
    fn test_inline_limit_depends_on_the_flavour() {
        let pair = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 2, 0);
        assert!(pair.is_value_inline(false));

        let two_longs = IFDEntry::new(tags::STRIP_OFFSETS, field_types::LONG, 2, 0);
        assert_eq!(two_longs.value_byte_len(), 8);
        assert!(!two_longs.is_value_inline(false));
        assert!(two_longs.is_value_inline(true));
    }
}
