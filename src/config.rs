//! Split and mosaic settings
//!
//! Settings are plain values handed to the orchestrator and the mosaic
//! emitter. They can be read from a TOML file and are then overridden by
//! command line flags.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::compression::Compression;
use crate::tiff::constants::limits;
use crate::tiff::errors::{TiffError, TiffResult};

/// Margin shared by adjacent mosaic pieces
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Overlap {
    #[default]
    None,
    /// Fixed number of pixels on both axes
    Pixels(u32),
    /// Percentage of the piece dimension on each axis
    Percent(f64),
}

impl Overlap {
    /// Overlap in pixels for a piece dimension, never more than the dimension
    pub fn resolve(&self, piece_dimension: u32) -> u32 {
        let pixels = match *self {
            Overlap::None => 0,
            Overlap::Pixels(pixels) => pixels,
            Overlap::Percent(percent) if percent > 0.0 => {
                (percent * piece_dimension as f64 / 100.0).round() as u32
            }
            Overlap::Percent(_) => 0,
        };
        pixels.min(piece_dimension)
    }
}

impl FromStr for Overlap {
    type Err = TiffError;

    /// `12` is twelve pixels, `5%` or `2.5%` a percentage
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TiffError::GenericError(format!("Invalid overlap '{}'", s));
        match s.strip_suffix('%') {
            Some(percent) => {
                let percent = percent.trim().parse::<f64>().map_err(|_| invalid())?;
                if !(0.0..100.0).contains(&percent) {
                    return Err(invalid());
                }
                Ok(Overlap::Percent(percent))
            }
            None => Ok(Overlap::Pixels(s.parse::<u32>().map_err(|_| invalid())?)),
        }
    }
}

/// When to decompose a crop into pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosaicMode {
    /// Only when a piece size is exceeded or the memory ceiling is hit
    #[default]
    IfNeeded,
    /// Always, even when the crop would fit
    Always,
}

/// Container for mosaic pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosaicFormat {
    #[default]
    Tiff,
    /// Standalone JPEG files
    JpegFile,
}

/// Mosaic decomposition settings
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    /// Memory ceiling per piece in bytes; 0 means unlimited
    pub memory_limit: u64,
    /// Requested piece width; 0 means automatic
    pub piece_width: u32,
    /// Requested piece length; 0 means automatic
    pub piece_length: u32,
    pub overlap: Overlap,
    pub compression: Compression,
    pub output: MosaicFormat,
    pub jpeg_quality: Option<u8>,
    pub mode: MosaicMode,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        MosaicConfig {
            memory_limit: limits::DEFAULT_MEMORY_LIMIT,
            piece_width: 0,
            piece_length: 0,
            overlap: Overlap::None,
            compression: Compression::SameAsSource,
            output: MosaicFormat::Tiff,
            jpeg_quality: None,
            mode: MosaicMode::IfNeeded,
        }
    }
}

impl MosaicConfig {
    /// Whether the pieces end up JPEG-compressed
    pub fn writes_jpeg(&self, source_compression: u16) -> bool {
        self.output == MosaicFormat::JpegFile
            || self.compression.resolve(source_compression) == crate::tiff::constants::compression::JPEG
    }
}

/// Settings for one split run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitConfig {
    pub crop_compression: Compression,
    pub jpeg_quality: Option<u8>,
    pub mosaic: Option<MosaicConfig>,
}

impl SplitConfig {
    /// Reads settings from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> TiffResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        debug!("Loaded configuration from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    /// Reads settings from a TOML document
    ///
    /// A `[mosaic]` section enables mosaic decomposition.
    pub fn from_toml_str(content: &str) -> TiffResult<Self> {
        let value = content.parse::<toml::Value>()
            .map_err(|e| TiffError::GenericError(format!("Failed to parse TOML: {}", e)))?;

        let mut config = SplitConfig::default();
        if let Some(split) = value.get("split") {
            if let Some(name) = get_str(split, "compression")? {
                config.crop_compression = name.parse()?;
            }
            config.jpeg_quality = get_quality(split)?;
        }

        if let Some(section) = value.get("mosaic") {
            let mut mosaic = MosaicConfig::default();
            if let Some(mode) = get_str(section, "mode")? {
                mosaic.mode = match mode {
                    "if-needed" | "if_needed" => MosaicMode::IfNeeded,
                    "always" => MosaicMode::Always,
                    other => return Err(TiffError::GenericError(format!("Unknown mosaic mode '{}'", other))),
                };
            }
            if let Some(mib) = get_u64(section, "memory_mib")? {
                mosaic.memory_limit = mib * 1024 * 1024;
            }
            if let Some(width) = get_u64(section, "width")? {
                mosaic.piece_width = to_u32(width, "width")?;
            }
            if let Some(length) = get_u64(section, "length")? {
                mosaic.piece_length = to_u32(length, "length")?;
            }

            let pixels = get_u64(section, "overlap_pixels")?;
            let percent = section.get("overlap_percent").map(|v| {
                v.as_float().or_else(|| v.as_integer().map(|i| i as f64))
                    .ok_or_else(|| TiffError::GenericError("overlap_percent must be a number".to_string()))
            }).transpose()?;
            mosaic.overlap = match (pixels, percent) {
                (Some(_), Some(_)) => {
                    return Err(TiffError::GenericError(
                        "overlap_pixels and overlap_percent are mutually exclusive".to_string()));
                }
                (Some(pixels), None) => Overlap::Pixels(to_u32(pixels, "overlap_pixels")?),
                (None, Some(percent)) => Overlap::Percent(percent),
                (None, None) => Overlap::None,
            };

            if let Some(name) = get_str(section, "compression")? {
                mosaic.compression = name.parse()?;
            }
            if let Some(format) = get_str(section, "format")? {
                mosaic.output = match format {
                    "tiff" | "tif" => MosaicFormat::Tiff,
                    "jpeg" | "jpg" => MosaicFormat::JpegFile,
                    other => return Err(TiffError::GenericError(format!("Unknown mosaic format '{}'", other))),
                };
            }
            mosaic.jpeg_quality = get_quality(section)?;
            config.mosaic = Some(mosaic);
        }

        Ok(config)
    }
}

fn get_str<'v>(section: &'v toml::Value, key: &str) -> TiffResult<Option<&'v str>> {
    match section.get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some)
            .ok_or_else(|| TiffError::GenericError(format!("'{}' must be a string", key))),
    }
}

fn get_u64(section: &toml::Value, key: &str) -> TiffResult<Option<u64>> {
    match section.get(key) {
        None => Ok(None),
        Some(value) => value.as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| TiffError::GenericError(format!("'{}' must be a non-negative integer", key))),
    }
}

fn get_quality(section: &toml::Value) -> TiffResult<Option<u8>> {
    match get_u64(section, "quality")? {
        None => Ok(None),
        Some(q) if (1..=100).contains(&q) => Ok(Some(q as u8)),
        Some(q) => Err(TiffError::GenericError(format!("quality {} outside 1-100", q))),
    }
}

fn to_u32(value: u64, key: &str) -> TiffResult<u32> {
    u32::try_from(value).map_err(|_| TiffError::GenericError(format!("'{}' is too large", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let config = SplitConfig::from_toml_str(r#"
            [split]
            compression = "lzw"
            quality = 90

            [mosaic]
            mode = "always"
            memory_mib = 16
            width = 2048
            overlap_percent = 5.0
            compression = "jpeg"
            format = "jpeg"
        "#).unwrap();

        assert_eq!(config.crop_compression, Compression::Lzw);
        assert_eq!(config.jpeg_quality, Some(90));
        let mosaic = config.mosaic.unwrap();
        assert_eq!(mosaic.mode, MosaicMode::Always);
        assert_eq!(mosaic.memory_limit, 16 * 1024 * 1024);
        assert_eq!(mosaic.piece_width, 2048);
        assert_eq!(mosaic.piece_length, 0);
        assert_eq!(mosaic.overlap, Overlap::Percent(5.0));
        assert_eq!(mosaic.output, MosaicFormat::JpegFile);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SplitConfig::from_toml_str("").unwrap();
        assert_eq!(config, SplitConfig::default());
        assert!(config.mosaic.is_none());
    }

    #[test]
    fn test_both_overlaps_rejected() {
        let result = SplitConfig::from_toml_str("[mosaic]\noverlap_pixels = 4\noverlap_percent = 2.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_overlap_resolution_is_clamped() {
        assert_eq!(Overlap::Pixels(500).resolve(100), 100);
        assert_eq!(Overlap::Percent(10.0).resolve(255), 26);
        assert_eq!(Overlap::None.resolve(100), 0);
    }

    #[test]
    fn test_overlap_parsing() {
        assert_eq!("16".parse::<Overlap>().unwrap(), Overlap::Pixels(16));
        assert_eq!("2.5%".parse::<Overlap>().unwrap(), Overlap::Percent(2.5));
        assert!("abc".parse::<Overlap>().is_err());
    }
}
