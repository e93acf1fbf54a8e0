//! Destinations for mosaic pieces
//!
//! A piece goes either into a single-strip TIFF container or into a
//! standalone JPEG file. Both take rows through [`PieceSink`]; each piece
//! gets its own sink, created right before its pixels are copied and
//! closed right after.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::compression::{BlockShape, CompressionHandler, JpegHandler};
use crate::tiff::builder::{OutputLayout, RawTag, TiffBuilder};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::StorageLayout;

/// Something that accepts the rows of one piece
pub trait PieceSink {
    /// Appends `rows` full rows held in `data`
    fn write_rows(&mut self, data: &[u8], rows: u32) -> TiffResult<()>;

    /// Flushes and closes the piece
    fn finish(self) -> TiffResult<PathBuf>
    where
        Self: Sized;

    /// Destination file
    fn path(&self) -> &Path;
}

/// Collects rows until the piece is complete
///
/// A piece handed over in one call is passed through without copying.
struct RowAssembler {
    row_bytes: usize,
    length: u32,
    rows_seen: u32,
    pending: Vec<u8>,
}

impl RowAssembler {
    fn new(row_bytes: usize, length: u32) -> Self {
        RowAssembler { row_bytes, length, rows_seen: 0, pending: Vec::new() }
    }

    fn is_complete(&self) -> bool {
        self.rows_seen == self.length
    }

    fn push<F>(&mut self, data: &[u8], rows: u32, mut complete: F) -> TiffResult<()>
    where
        F: FnMut(&[u8]) -> TiffResult<()>,
    {
        let bytes = rows as usize * self.row_bytes;
        if self.rows_seen + rows > self.length || data.len() < bytes {
            return Err(TiffError::GenericError(format!(
                "{} rows do not fit a piece of {} rows with {} written", rows, self.length, self.rows_seen)));
        }

        if self.rows_seen == 0 && rows == self.length {
            self.rows_seen = rows;
            return complete(&data[..bytes]);
        }

        self.pending.extend_from_slice(&data[..bytes]);
        self.rows_seen += rows;
        if self.is_complete() {
            let image = std::mem::take(&mut self.pending);
            complete(&image)?;
        }
        Ok(())
    }
}

/// A piece written as a TIFF with one strip
pub struct ContainerSink {
    builder: TiffBuilder,
    rows: RowAssembler,
}

impl ContainerSink {
    /// Creates the piece file
    ///
    /// `layout` is forced to a single strip; `tags` are carried verbatim.
    pub fn create(path: &Path, mut layout: OutputLayout, tags: &[RawTag]) -> TiffResult<Self> {
        layout.layout = StorageLayout::Strips { rows_per_strip: layout.length };
        let row_bytes = layout.width as usize * layout.samples_per_pixel as usize * (layout.bits_per_sample as usize / 8);
        let length = layout.length;

        let mut builder = TiffBuilder::create(path, layout)?;
        for tag in tags {
            builder.set_tag(tag.clone());
        }
        Ok(ContainerSink { builder, rows: RowAssembler::new(row_bytes, length) })
    }
}

impl PieceSink for ContainerSink {
    fn write_rows(&mut self, data: &[u8], rows: u32) -> TiffResult<()> {
        let builder = &mut self.builder;
        self.rows.push(data, rows, |strip| builder.write_block(0, strip))
    }

    fn finish(self) -> TiffResult<PathBuf> {
        if !self.rows.is_complete() {
            return Err(TiffError::GenericError(format!(
                "{}: piece closed after {} of {} rows",
                self.builder.path().display(), self.rows.rows_seen, self.rows.length)));
        }
        self.builder.finish()
    }

    fn path(&self) -> &Path {
        self.builder.path()
    }
}

/// A piece written as a standalone JPEG file
pub struct JpegStreamSink {
    path: PathBuf,
    file: BufWriter<File>,
    shape: BlockShape,
    encoder: JpegHandler,
    rows: RowAssembler,
    encoded: Option<Vec<u8>>,
}

impl JpegStreamSink {
    /// Creates the piece file for a `width` x `length` image
    pub fn create(path: &Path, width: u32, length: u32, samples_per_pixel: u16, quality: u8) -> TiffResult<Self> {
        let shape = BlockShape { width, length, samples_per_pixel, bits_per_sample: 8 };
        let file = BufWriter::new(File::create(path)?);
        debug!("Creating JPEG piece {} ({}x{}, quality {})", path.display(), width, length, quality);

        Ok(JpegStreamSink {
            path: path.to_path_buf(),
            file,
            shape,
            encoder: JpegHandler::new(quality),
            rows: RowAssembler::new(shape.row_bytes(), length),
            encoded: None,
        })
    }
}

impl PieceSink for JpegStreamSink {
    fn write_rows(&mut self, data: &[u8], rows: u32) -> TiffResult<()> {
        let (encoder, shape, encoded) = (&self.encoder, self.shape, &mut self.encoded);
        self.rows.push(data, rows, |image| {
            *encoded = Some(encoder.compress_block(image, shape)?);
            Ok(())
        })
    }

    fn finish(mut self) -> TiffResult<PathBuf> {
        let encoded = self.encoded.take().ok_or_else(|| TiffError::GenericError(format!(
            "{}: piece closed after {} of {} rows", self.path.display(), self.rows.rows_seen, self.rows.length)))?;
        self.file.write_all(&encoded)?;
        self.file.flush()?;
        Ok(self.path)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// The sink of one piece
pub enum OutputSink {
    Container(ContainerSink),
    JpegStream(JpegStreamSink),
}

impl PieceSink for OutputSink {
    fn write_rows(&mut self, data: &[u8], rows: u32) -> TiffResult<()> {
        match self {
            OutputSink::Container(sink) => sink.write_rows(data, rows),
            OutputSink::JpegStream(sink) => sink.write_rows(data, rows),
        }
    }

    fn finish(self) -> TiffResult<PathBuf> {
        match self {
            OutputSink::Container(sink) => sink.finish(),
            OutputSink::JpegStream(sink) => sink.finish(),
        }
    }

    fn path(&self) -> &Path {
        match self {
            OutputSink::Container(sink) => sink.path(),
            OutputSink::JpegStream(sink) => sink.path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembler_passes_whole_piece_through() {
        let mut rows = RowAssembler::new(2, 3);
        let mut seen = Vec::new();
        rows.push(&[1, 2, 3, 4, 5, 6], 3, |image| {
            seen = image.to_vec();
            Ok(())
        }).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
        assert!(rows.is_complete());
    }

    #[test]
    fn test_assembler_collects_row_batches() {
        let mut rows = RowAssembler::new(2, 3);
        let mut calls = 0;
        rows.push(&[1, 2], 1, |_| { calls += 1; Ok(()) }).unwrap();
        rows.push(&[3, 4, 5, 6], 2, |image| {
            calls += 1;
            assert_eq!(image, &[1, 2, 3, 4, 5, 6]);
            Ok(())
        }).unwrap();
        assert_eq!(calls, 1);
        assert!(rows.push(&[7, 8], 1, |_| Ok(())).is_err());
    }

    #[test]
    fn test_jpeg_sink_writes_a_jpeg_file() {
        let dir = std::env::temp_dir().join("slidesplit_jpeg_sink");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("piece.jpg");

        let mut sink = JpegStreamSink::create(&path, 16, 8, 3, 80).unwrap();
        sink.write_rows(&vec![128u8; 16 * 8 * 3], 8).unwrap();
        let written = sink.finish().unwrap();

        let bytes = std::fs::read(written).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_incomplete_jpeg_piece_fails() {
        let dir = std::env::temp_dir().join("slidesplit_jpeg_sink_short");
        std::fs::create_dir_all(&dir).unwrap();

        let mut sink = JpegStreamSink::create(&dir.join("short.jpg"), 4, 4, 1, 80).unwrap();
        sink.write_rows(&[0u8; 8], 2).unwrap();
        assert!(sink.finish().is_err());
    }
}
