//! Chunked decoding of one stored block
//!
//! A `BlockStream` reads the encoded bytes of a strip in fixed-size chunks
//! and hands them to an incremental decoder, so a strip can be consumed a
//! few rows at a time without holding it whole.

use log::trace;

use crate::compression::BlockDecoder;
use crate::io::seekable::SeekableReader;
use crate::tiff::errors::TiffResult;

/// Encoded bytes read from the file per refill
const INPUT_CHUNK: usize = 64 * 1024;

/// Decode position inside one block
pub struct BlockStream {
    index: usize,
    decoder: Box<dyn BlockDecoder>,
    next_offset: u64,
    end_offset: u64,
    input: Vec<u8>,
    input_pos: usize,
    finished: bool,
}

impl BlockStream {
    /// Stream over the `byte_count` encoded bytes at `offset`
    pub fn new(index: usize, decoder: Box<dyn BlockDecoder>, offset: u64, byte_count: u64) -> Self {
        BlockStream {
            index,
            decoder,
            next_offset: offset,
            end_offset: offset.saturating_add(byte_count),
            input: Vec::new(),
            input_pos: 0,
            finished: false,
        }
    }

    /// Block this stream decodes
    pub fn index(&self) -> usize {
        self.index
    }

    /// Decodes into `out` until it is full or the block ends
    ///
    /// Returns the number of bytes written; fewer than `out.len()` means
    /// the encoded data ran out.
    pub fn fill(&mut self, reader: &mut dyn SeekableReader, out: &mut [u8]) -> TiffResult<usize> {
        let mut written = 0;
        while written < out.len() && !self.finished {
            if self.input_pos == self.input.len() {
                self.refill(reader)?;
            }
            let step = self.decoder.decode_step(&self.input[self.input_pos..], &mut out[written..])?;
            self.input_pos += step.consumed;
            written += step.produced;
            self.finished = step.finished;

            if step.consumed == 0 && step.produced == 0 && !self.finished && !self.refill(reader)? {
                break;
            }
        }
        Ok(written)
    }

    /// Appends the next chunk of encoded bytes, `false` at the end of the block
    fn refill(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<bool> {
        if self.next_offset >= self.end_offset {
            return Ok(false);
        }
        self.input.drain(..self.input_pos);
        self.input_pos = 0;

        let len = (self.end_offset - self.next_offset).min(INPUT_CHUNK as u64) as usize;
        let start = self.input.len();
        self.input.resize(start + len, 0);
        reader.read_exact_at(self.next_offset, &mut self.input[start..])?;
        self.next_offset += len as u64;
        trace!("Block {}: read {} encoded bytes, {} left", self.index, len, self.end_offset - self.next_offset);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::compression::{CompressionHandler, LzwHandler};

    #[test]
    fn test_rows_come_out_in_order_from_an_offset() {
        let rows: Vec<u8> = (0..200_000u32).map(|i| (i % 241) as u8).collect();
        let encoded = LzwHandler.compress(&rows).unwrap();
        let mut file = vec![0xAAu8; 10];
        file.extend_from_slice(&encoded);
        let mut reader = Cursor::new(file);

        let decoder = LzwHandler.block_decoder().unwrap();
        let mut stream = BlockStream::new(3, decoder, 10, encoded.len() as u64);
        let mut row = vec![0u8; 1000];
        for n in 0..200 {
            assert_eq!(stream.fill(&mut reader, &mut row).unwrap(), 1000);
            assert_eq!(&row[..], &rows[n * 1000..(n + 1) * 1000]);
        }
        assert_eq!(stream.index(), 3);
    }

    #[test]
    fn test_truncated_payload_comes_up_short() {
        let rows = vec![5u8; 4000];
        let encoded = LzwHandler.compress(&rows).unwrap();
        let mut reader = Cursor::new(encoded.clone());

        let decoder = LzwHandler.block_decoder().unwrap();
        let mut stream = BlockStream::new(0, decoder, 0, (encoded.len() / 2) as u64);
        let mut out = vec![0u8; 4000];
        let written = stream.fill(&mut reader, &mut out).unwrap();
        assert!(written < 4000);
    }
}
