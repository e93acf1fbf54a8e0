//! File names of mosaic pieces

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::MosaicFormat;

/// Number of decimal digits of `n`
pub fn digit_count(n: u32) -> usize {
    n.max(1).ilog10() as usize + 1
}

/// Path without a `.tif`/`.tiff` suffix
pub fn piece_stem(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "tif" || ext == "tiff" => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Names the piece at 1-based `row` and `column`
///
/// `{stem}_i{row}j{column}.tif`, each index zero-padded to the digits of
/// its axis' piece count.
pub fn piece_path(
    stem: &Path,
    row: u32,
    column: u32,
    vertical_pieces: u32,
    horizontal_pieces: u32,
    format: MosaicFormat,
) -> PathBuf {
    let extension = match format {
        MosaicFormat::Tiff => "tif",
        MosaicFormat::JpegFile => "jpg",
    };
    let suffix = format!(
        "_i{:0rw$}j{:0cw$}.{}",
        row,
        column,
        extension,
        rw = digit_count(vertical_pieces),
        cw = digit_count(horizontal_pieces),
    );

    let mut name = OsString::from(stem.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(32), 2);
        assert_eq!(digit_count(100), 3);
    }

    #[test]
    fn test_indices_are_padded_per_axis() {
        let path = piece_path(Path::new("out/slide_x40_z0"), 3, 12, 32, 16, MosaicFormat::Tiff);
        assert_eq!(path, PathBuf::from("out/slide_x40_z0_i03j12.tif"));

        let path = piece_path(Path::new("crop"), 1, 1, 5, 120, MosaicFormat::JpegFile);
        assert_eq!(path, PathBuf::from("crop_i1j001.jpg"));
    }

    #[test]
    fn test_stem_drops_tiff_suffix_only() {
        assert_eq!(piece_stem(Path::new("a/b.tif")), PathBuf::from("a/b"));
        assert_eq!(piece_stem(Path::new("a/b.TIFF")), PathBuf::from("a/b"));
        assert_eq!(piece_stem(Path::new("a/b.ndpi")), PathBuf::from("a/b.ndpi"));
    }
}
