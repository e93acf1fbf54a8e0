//! Random-access byte sources
//!
//! Containers are read block by block from arbitrary offsets, so every
//! source has to seek as well as read.

use std::io::{self, Read, Seek, SeekFrom};

/// A readable, seekable byte source shared across threads
pub trait SeekableReader: Read + Seek + Send + Sync {
    /// Total length of the source; the current position is kept
    fn stream_size(&mut self) -> io::Result<u64> {
        let position = self.stream_position()?;
        let size = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(position))?;
        Ok(size)
    }

    /// Fills `buf` from `offset` onwards
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
    }
}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_stream_size_keeps_position() {
        let mut source = Cursor::new(vec![0u8; 40]);
        source.seek(SeekFrom::Start(12)).unwrap();
        assert_eq!(source.stream_size().unwrap(), 40);
        assert_eq!(source.stream_position().unwrap(), 12);
    }

    #[test]
    fn test_read_exact_at_offset() {
        let mut source = Cursor::new((0u8..32).collect::<Vec<_>>());
        let mut buf = [0u8; 4];
        source.read_exact_at(10, &mut buf).unwrap();
        assert_eq!(buf, [10, 11, 12, 13]);
        assert!(source.read_exact_at(30, &mut buf).is_err());
    }
}
