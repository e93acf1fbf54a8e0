//! Choice of output compression

use std::fmt;
use std::str::FromStr;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::factory::CompressionFactory;

/// Compression requested for an output raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Whatever the source raster uses
    #[default]
    SameAsSource,
    None,
    Lzw,
    Jpeg,
    Deflate,
    Zstd,
}

impl Compression {
    /// Resolves to a TIFF compression code given the source's code
    pub fn resolve(&self, source: u16) -> u16 {
        match self {
            Compression::SameAsSource => source,
            Compression::None => compression::NONE,
            Compression::Lzw => compression::LZW,
            Compression::Jpeg => compression::JPEG,
            Compression::Deflate => compression::DEFLATE,
            Compression::Zstd => compression::ZSTD,
        }
    }

    /// Selector for a TIFF compression code
    pub fn from_code(code: u16) -> TiffResult<Self> {
        match code {
            compression::NONE => Ok(Compression::None),
            compression::LZW => Ok(Compression::Lzw),
            compression::JPEG => Ok(Compression::Jpeg),
            compression::DEFLATE | 32946 => Ok(Compression::Deflate),
            compression::ZSTD | 14 => Ok(Compression::Zstd),
            other => Err(TiffError::UnsupportedCompression(other as u64)),
        }
    }
}

impl FromStr for Compression {
    type Err = TiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "same" | "source" | "keep" => Ok(Compression::SameAsSource),
            name => Compression::from_code(CompressionFactory::code_by_name(name)?),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::SameAsSource => "same as source",
            Compression::None => "none",
            Compression::Lzw => "lzw",
            Compression::Jpeg => "jpeg",
            Compression::Deflate => "deflate",
            Compression::Zstd => "zstd",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_as_source_keeps_code() {
        assert_eq!(Compression::SameAsSource.resolve(compression::LZW), compression::LZW);
        assert_eq!(Compression::Jpeg.resolve(compression::LZW), compression::JPEG);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("same".parse::<Compression>().unwrap(), Compression::SameAsSource);
        assert_eq!("ZIP".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!("jpg".parse::<Compression>().unwrap(), Compression::Jpeg);
        assert!("packbits".parse::<Compression>().is_err());
    }
}
