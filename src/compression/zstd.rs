//! Zstandard blocks, compression code 50000

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{BlockDecoder, CompressionHandler, DecodeStep};
use log::{debug, warn};
use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};

/// Level used when none is configured, libtiff's default too
const DEFAULT_LEVEL: i32 = 9;

/// Zstandard compression handler
pub struct ZstdHandler {
    level: i32,
}

impl ZstdHandler {
    pub fn new() -> Self {
        ZstdHandler { level: DEFAULT_LEVEL }
    }

    fn codec_error(action: &str, e: std::io::Error) -> TiffError {
        warn!("ZSTD {} error: {}", action, e);
        TiffError::CodecError(format!("ZSTD {} error: {}", action, e))
    }
}

/// Frame decoder kept across the chunks of one block
struct ZstdBlockDecoder {
    decoder: Decoder<'static>,
}

impl BlockDecoder for ZstdBlockDecoder {
    fn decode_step(&mut self, input: &[u8], output: &mut [u8]) -> TiffResult<DecodeStep> {
        let mut source = InBuffer::around(input);
        let mut target = OutBuffer::around(output);
        let remaining = self.decoder
            .run(&mut source, &mut target)
            .map_err(|e| ZstdHandler::codec_error("decompression", e))?;
        Ok(DecodeStep {
            consumed: source.pos(),
            produced: target.pos(),
            finished: remaining == 0,
        })
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        zstd::decode_all(data).map_err(|e| Self::codec_error("decompression", e))
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        debug!("ZSTD compressing {} bytes at level {}", data.len(), self.level);
        zstd::encode_all(data, self.level).map_err(|e| Self::codec_error("compression", e))
    }

    fn block_decoder(&self) -> Option<Box<dyn BlockDecoder>> {
        match Decoder::new() {
            Ok(decoder) => Some(Box::new(ZstdBlockDecoder { decoder })),
            Err(e) => {
                warn!("ZSTD stream decoder unavailable, decoding whole blocks: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        50000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_decoder_matches_whole_decode() {
        let handler = ZstdHandler::new();
        let rows: Vec<u8> = (0..5000u32).map(|i| (i % 13) as u8).collect();
        let encoded = handler.compress(&rows).unwrap();
        assert_eq!(handler.decompress(&encoded).unwrap(), rows);

        let mut decoder = handler.block_decoder().unwrap();
        let mut out = vec![0u8; rows.len()];
        let (mut read, mut written) = (0, 0);
        while written < out.len() {
            let end = (read + 16).min(encoded.len());
            let stop = (written + 500).min(out.len());
            let step = decoder.decode_step(&encoded[read..end], &mut out[written..stop]).unwrap();
            read += step.consumed;
            written += step.produced;
        }
        assert_eq!(out, rows);
    }

    #[test]
    fn test_empty_input_decodes_to_nothing() {
        assert!(ZstdHandler::new().decompress(&[]).unwrap().is_empty());
    }
}
