//! Factory for creating compression handlers

use crate::tiff::constants::limits;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::jpeg::JpegHandler;
use super::lzw::LzwHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given compression code
    pub fn create_handler(compression: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match compression {
            1 => Ok(Box::new(UncompressedHandler)),
            5 => Ok(Box::new(LzwHandler)),
            7 => Ok(Box::new(JpegHandler::new(limits::DEFAULT_JPEG_QUALITY))),
            8 | 32946 => Ok(Box::new(AdobeDeflateHandler)),
            14 | 50000 => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(compression))
        }
    }

    /// Create a handler for decoding a source directory
    ///
    /// JPEG directories may share their tables through the JPEGTables tag.
    pub fn create_decoder(compression: u64, jpeg_tables: Option<Vec<u8>>) -> TiffResult<Box<dyn CompressionHandler>> {
        match compression {
            7 => Ok(Box::new(JpegHandler::with_tables(jpeg_tables, limits::DEFAULT_JPEG_QUALITY))),
            _ => Self::create_handler(compression),
        }
    }

    /// Create a handler for encoding output blocks
    pub fn create_encoder(compression: u64, jpeg_quality: u8) -> TiffResult<Box<dyn CompressionHandler>> {
        match compression {
            7 => Ok(Box::new(JpegHandler::new(jpeg_quality))),
            _ => Self::create_handler(compression),
        }
    }

    /// Get a compression code by name
    pub fn code_by_name(name: &str) -> TiffResult<u16> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" | "raw" => Ok(1),
            "lzw" => Ok(5),
            "jpeg" | "jpg" => Ok(7),
            "deflate" | "zip" | "adobe deflate" => Ok(8),
            "zstd" => Ok(50000),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name)))
        }
    }
}
