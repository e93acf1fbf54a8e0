//! Adobe Deflate (zlib) blocks, compression codes 8 and 32946

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::{Compression as DeflateLevel, Decompress, FlushDecompress, Status};
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{BlockDecoder, CompressionHandler, DecodeStep};

/// Zlib-wrapped deflate, the form libtiff writes for both codes
pub struct AdobeDeflateHandler;

/// Inflate state of one block
struct InflateBlock {
    inflater: Decompress,
}

impl BlockDecoder for InflateBlock {
    fn decode_step(&mut self, input: &[u8], output: &mut [u8]) -> TiffResult<DecodeStep> {
        let (in_before, out_before) = (self.inflater.total_in(), self.inflater.total_out());
        let status = self.inflater
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| TiffError::CodecError(format!("Deflate decompression error: {}", e)))?;
        Ok(DecodeStep {
            consumed: (self.inflater.total_in() - in_before) as usize,
            produced: (self.inflater.total_out() - out_before) as usize,
            finished: status == Status::StreamEnd,
        })
    }
}

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| TiffError::CodecError(format!("Deflate decompression error: {}", e)))?;
        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), DeflateLevel::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn block_decoder(&self) -> Option<Box<dyn BlockDecoder>> {
        Some(Box::new(InflateBlock { inflater: Decompress::new(true) }))
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u64 {
        8
    }
}
