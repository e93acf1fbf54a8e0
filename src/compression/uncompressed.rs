//! Pass-through handler for uncompressed blocks

use crate::tiff::errors::TiffResult;
use super::handler::{BlockShape, CompressionHandler};

/// Uncompressed data handler (compression code 1)
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn compress_block(&self, data: &[u8], shape: BlockShape) -> TiffResult<Vec<u8>> {
        Ok(data[..data.len().min(shape.byte_len())].to_vec())
    }

    fn supports_random_access(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "Uncompressed"
    }

    fn code(&self) -> u64 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_bytes_pass_through() {
        let shape = BlockShape { width: 4, length: 2, samples_per_pixel: 1, bits_per_sample: 8 };
        let handler = UncompressedHandler;
        assert_eq!(handler.decompress_block(&[1, 2, 3], shape).unwrap(), vec![1, 2, 3]);
        assert_eq!(handler.compress_block(&[7u8; 12], shape).unwrap(), vec![7u8; 8]);
        assert!(handler.block_decoder().is_none());
    }
}
