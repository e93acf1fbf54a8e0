//! TIFF writing utilities
//!
//! Helper functions for writing TIFF files to disk, handling alignment
//! and tag ordering.

use std::collections::HashSet;
use std::io::Write;

use crate::tiff::builder::RawTag;
use crate::tiff::errors::TiffResult;

/// Calculate padding required to align to 4-byte boundary
pub fn calculate_padding(data_len: u64) -> usize {
    ((4 - (data_len % 4)) % 4) as usize
}

/// Write padding bytes so that the next write starts 4-byte aligned
///
/// Returns the number of bytes written.
pub fn write_padding(writer: &mut dyn Write, data_len: u64) -> TiffResult<u64> {
    let padding = calculate_padding(data_len);
    if padding > 0 {
        writer.write_all(&[0u8; 4][..padding])?;
    }
    Ok(padding as u64)
}

/// Tags sorted by number with duplicates removed
///
/// Directories must list each tag once in ascending order. When a tag
/// appears more than once the last occurrence wins.
pub fn get_unique_sorted_tags(tags: &[RawTag]) -> Vec<RawTag> {
    let mut unique = Vec::with_capacity(tags.len());
    let mut seen = HashSet::new();

    for tag in tags.iter().rev() {
        if seen.insert(tag.tag) {
            unique.push(tag.clone());
        }
    }

    unique.sort_by_key(|tag| tag.tag);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(number: u16, byte: u8) -> RawTag {
        RawTag { tag: number, field_type: 1, count: 1, bytes: vec![byte] }
    }

    #[test]
    fn test_alignment() {
        assert_eq!(calculate_padding(8), 0);
        assert_eq!(calculate_padding(9), 3);
        assert_eq!(calculate_padding(6), 2);

        let mut out = Vec::new();
        assert_eq!(write_padding(&mut out, 13).unwrap(), 3);
        assert_eq!(out, vec![0, 0, 0]);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let sorted = get_unique_sorted_tags(&[tag(300, 1), tag(256, 2), tag(300, 3)]);
        assert_eq!(sorted.iter().map(|t| t.tag).collect::<Vec<_>>(), vec![256, 300]);
        assert_eq!(sorted[1].bytes, vec![3]);
    }
}
