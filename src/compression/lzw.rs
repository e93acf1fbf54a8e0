//! Handler for LZW compressed data

use log::warn;
use weezl::{decode, encode, BitOrder, LzwStatus};

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{BlockDecoder, CompressionHandler, DecodeStep};

/// TIFF flavour of LZW: MSB-first codes with the early size switch
pub struct LzwHandler;

/// Keeps the code table between chunks of one block
struct LzwBlockDecoder {
    decoder: decode::Decoder,
}

impl BlockDecoder for LzwBlockDecoder {
    fn decode_step(&mut self, input: &[u8], output: &mut [u8]) -> TiffResult<DecodeStep> {
        let result = self.decoder.decode_bytes(input, output);
        let status = result.status
            .map_err(|e| TiffError::CodecError(format!("LZW decompression error: {:?}", e)))?;
        Ok(DecodeStep {
            consumed: result.consumed_in,
            produced: result.consumed_out,
            finished: matches!(status, LzwStatus::Done),
        })
    }
}

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        decode::Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
            .decode(data)
            .map_err(|e| {
                warn!("LZW decompression error: {:?}", e);
                TiffError::CodecError(format!("LZW decompression error: {:?}", e))
            })
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        encode::Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
            .encode(data)
            .map_err(|e| TiffError::CodecError(format!("LZW compression error: {:?}", e)))
    }

    fn block_decoder(&self) -> Option<Box<dyn BlockDecoder>> {
        Some(Box::new(LzwBlockDecoder {
            decoder: decode::Decoder::with_tiff_size_switch(BitOrder::Msb, 8),
        }))
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lzw_restores_repetitive_rows() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 17) as u8).collect();
        let handler = LzwHandler;
        let packed = handler.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(handler.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_block_decoder_resumes_across_chunks() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 251) as u8).collect();
        let packed = LzwHandler.compress(&data).unwrap();
        let mut decoder = LzwHandler.block_decoder().unwrap();

        let mut out = vec![0u8; data.len()];
        let (mut read, mut written) = (0, 0);
        while written < out.len() {
            let end = (read + 100).min(packed.len());
            let stop = (written + 64).min(out.len());
            let step = decoder.decode_step(&packed[read..end], &mut out[written..stop]).unwrap();
            read += step.consumed;
            written += step.produced;
            assert!(step.consumed > 0 || step.produced > 0);
        }
        assert_eq!(out, data);
    }
}
