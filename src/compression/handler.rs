//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Geometry of one encoded block (strip or tile)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    /// Block width in pixels
    pub width: u32,
    /// Block length in rows
    pub length: u32,
    /// Interleaved samples per pixel
    pub samples_per_pixel: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl BlockShape {
    /// Bytes of one decoded row
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.samples_per_pixel as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes of the fully decoded block
    pub fn byte_len(&self) -> usize {
        self.row_bytes() * self.length as usize
    }
}

/// Progress of one [`BlockDecoder::decode_step`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStep {
    /// Input bytes used
    pub consumed: usize,
    /// Output bytes written
    pub produced: usize,
    /// The encoded stream has ended
    pub finished: bool,
}

/// Incremental decoder for one block
///
/// State carries over between calls, so a block can be decoded a few rows
/// at a time from input read in chunks.
pub trait BlockDecoder {
    fn decode_step(&mut self, input: &[u8], output: &mut [u8]) -> TiffResult<DecodeStep>;
}

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress the data
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Compress the data
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Decompress a block whose geometry is known
    ///
    /// Byte-stream codecs ignore the shape; image codecs need it.
    fn decompress_block(&self, data: &[u8], _shape: BlockShape) -> TiffResult<Vec<u8>> {
        self.decompress(data)
    }

    /// Compress a block whose geometry is known
    fn compress_block(&self, data: &[u8], _shape: BlockShape) -> TiffResult<Vec<u8>> {
        self.compress(data)
    }

    /// A fresh incremental decoder, when the codec can decode in pieces
    ///
    /// Codecs that need the whole block at once return `None`.
    fn block_decoder(&self) -> Option<Box<dyn BlockDecoder>> {
        None
    }

    /// Whether any row of a block can be decoded without the rows before it
    ///
    /// Only uncompressed data allows that; every real codec decodes forward.
    fn supports_random_access(&self) -> bool {
        false
    }

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;
}
