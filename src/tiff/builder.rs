//! Streaming TIFF construction
//!
//! A `TiffBuilder` writes a single-directory TIFF or BigTIFF file. Pixel
//! blocks go to disk as soon as they are produced, so even rasters far
//! larger than memory only ever hold one block at a time. The directory and
//! any out-of-line tag values follow the pixel data and the header is
//! patched when the builder is finished.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::compression::{BlockShape, CompressionFactory, CompressionHandler};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::builders::writer::DirectoryWriter;
use crate::tiff::constants::{compression, field_types, photometric, planar_config, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::StorageLayout;

/// Payload size from which a classic TIFF can no longer address its data
const BIG_TIFF_THRESHOLD: u64 = 4 * 1024 * 1024 * 1024;

/// A tag value held as raw bytes in the output byte order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    pub bytes: Vec<u8>,
}

impl RawTag {
    pub fn shorts(tag: u16, values: &[u16], handler: &dyn ByteOrderHandler) -> TiffResult<Self> {
        let mut bytes = Vec::with_capacity(values.len() * 2);
        for &value in values {
            handler.write_u16(&mut bytes, value)?;
        }
        Ok(RawTag { tag, field_type: field_types::SHORT, count: values.len() as u64, bytes })
    }

    pub fn longs(tag: u16, values: &[u32], handler: &dyn ByteOrderHandler) -> TiffResult<Self> {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for &value in values {
            handler.write_u32(&mut bytes, value)?;
        }
        Ok(RawTag { tag, field_type: field_types::LONG, count: values.len() as u64, bytes })
    }

    pub fn long8s(tag: u16, values: &[u64], handler: &dyn ByteOrderHandler) -> TiffResult<Self> {
        let mut bytes = Vec::with_capacity(values.len() * 8);
        for &value in values {
            handler.write_u64(&mut bytes, value)?;
        }
        Ok(RawTag { tag, field_type: field_types::LONG8, count: values.len() as u64, bytes })
    }

    /// NUL-terminated ASCII value
    pub fn ascii(tag: u16, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        RawTag { tag, field_type: field_types::ASCII, count: bytes.len() as u64, bytes }
    }
}

/// Geometry and encoding of a raster about to be written
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub width: u32,
    pub length: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub layout: StorageLayout,
    pub compression: u16,
    pub photometric: u16,
    pub jpeg_quality: u8,
    pub byte_order: ByteOrder,
    pub big_tiff: bool,
}

impl OutputLayout {
    /// Number of strips or tiles
    pub fn block_count(&self) -> usize {
        match self.layout {
            StorageLayout::Strips { rows_per_strip } => self.length.div_ceil(rows_per_strip.max(1)) as usize,
            StorageLayout::Tiles { tile_width, tile_length } => {
                (self.width.div_ceil(tile_width) * self.length.div_ceil(tile_length)) as usize
            }
        }
    }

    /// Decoded geometry of block `index`; only the last strip is short
    pub fn block_shape(&self, index: usize) -> BlockShape {
        let (width, length) = match self.layout {
            StorageLayout::Tiles { tile_width, tile_length } => (tile_width, tile_length),
            StorageLayout::Strips { rows_per_strip } => {
                let first_row = index as u32 * rows_per_strip;
                (self.width, rows_per_strip.min(self.length.saturating_sub(first_row)))
            }
        };
        BlockShape {
            width,
            length,
            samples_per_pixel: self.samples_per_pixel,
            bits_per_sample: self.bits_per_sample,
        }
    }

    /// Size of the pixel payload before compression
    pub fn uncompressed_size(&self) -> u64 {
        self.width as u64 * self.length as u64
            * self.samples_per_pixel as u64 * (self.bits_per_sample as u64 / 8)
    }

    /// Whether the file must be written as BigTIFF
    pub fn needs_big_tiff(&self) -> bool {
        self.big_tiff || self.uncompressed_size() >= BIG_TIFF_THRESHOLD
    }
}

/// Builder for a single-directory TIFF file
pub struct TiffBuilder {
    path: PathBuf,
    writer: BufWriter<File>,
    handler: Box<dyn ByteOrderHandler>,
    output: OutputLayout,
    is_big_tiff: bool,
    encoder: Box<dyn CompressionHandler>,
    tags: Vec<RawTag>,
    offsets: Vec<Option<u64>>,
    byte_counts: Vec<u64>,
    position: u64,
}

impl TiffBuilder {
    /// Creates `path` and writes the file header
    pub fn create(path: impl AsRef<Path>, output: OutputLayout) -> TiffResult<Self> {
        let path = path.as_ref().to_path_buf();
        let is_big_tiff = output.needs_big_tiff();
        let handler = output.byte_order.create_handler();
        let encoder = CompressionFactory::create_encoder(output.compression as u64, output.jpeg_quality)?;

        info!("Creating {} ({}x{}, {:?}, {}, {}{})",
              path.display(), output.width, output.length, output.layout, encoder.name(),
              output.byte_order.name(), if is_big_tiff { ", BigTIFF" } else { "" });

        let file = File::create(&path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        let position = DirectoryWriter::new(handler.as_ref(), is_big_tiff).write_header(&mut writer)?;

        let block_count = output.block_count();
        Ok(TiffBuilder {
            path,
            writer,
            handler,
            output,
            is_big_tiff,
            encoder,
            tags: Vec::new(),
            offsets: vec![None; block_count],
            byte_counts: vec![0; block_count],
            position,
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raster being written
    pub fn output(&self) -> &OutputLayout {
        &self.output
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Byte order handler of the output, for building tag values
    pub fn handler(&self) -> &dyn ByteOrderHandler {
        self.handler.as_ref()
    }

    /// Adds a tag; a later tag with the same number replaces earlier ones
    pub fn set_tag(&mut self, tag: RawTag) {
        self.tags.retain(|t| t.tag != tag.tag);
        self.tags.push(tag);
    }

    /// Whether a tag has been set explicitly
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tags.iter().any(|t| t.tag == tag)
    }

    /// Encodes decoded pixels of block `index` and appends them
    ///
    /// `data` must hold at least `block_shape(index).byte_len()` bytes.
    pub fn write_block(&mut self, index: usize, data: &[u8]) -> TiffResult<()> {
        let shape = self.output.block_shape(index);
        if data.len() < shape.byte_len() {
            return Err(TiffError::GenericError(format!(
                "{}: block {} needs {} bytes, got {}", self.path.display(), index, shape.byte_len(), data.len())));
        }
        let encoded = self.encoder.compress_block(&data[..shape.byte_len()], shape)?;
        self.write_raw_block(index, &encoded)
    }

    /// Appends an already-encoded block as is
    pub fn write_raw_block(&mut self, index: usize, data: &[u8]) -> TiffResult<()> {
        if index >= self.offsets.len() {
            return Err(TiffError::GenericError(format!(
                "{}: block {} out of range ({} blocks)", self.path.display(), index, self.offsets.len())));
        }
        if !self.is_big_tiff && self.position + data.len() as u64 > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "{}: classic TIFF cannot address data beyond 4 GiB", self.path.display())));
        }

        self.writer.write_all(data)?;
        self.offsets[index] = Some(self.position);
        self.byte_counts[index] = data.len() as u64;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Writes the directory, patches the header and closes the file
    pub fn finish(mut self) -> TiffResult<PathBuf> {
        let mut offsets = Vec::with_capacity(self.offsets.len());
        for (index, offset) in self.offsets.iter().enumerate() {
            offsets.push(offset.ok_or_else(|| TiffError::GenericError(format!(
                "{}: block {} was never written", self.path.display(), index)))?);
        }

        let structural = self.structural_tags(&offsets)?;
        let mut all_tags = std::mem::take(&mut self.tags);
        all_tags.extend(structural);

        let directory_writer = DirectoryWriter::new(self.handler.as_ref(), self.is_big_tiff);
        let (directory_offset, end) = directory_writer.write_directory(&mut self.writer, self.position, &all_tags)?;
        directory_writer.patch_first_directory_offset(&mut self.writer, directory_offset)?;
        self.writer.flush()?;

        debug!("{}: {} blocks, directory at {}, {} bytes", self.path.display(), offsets.len(), directory_offset, end);
        Ok(self.path)
    }

    /// Tags that describe the pixel layout; they override copied tags
    fn structural_tags(&self, offsets: &[u64]) -> TiffResult<Vec<RawTag>> {
        let handler = self.handler.as_ref();
        let output = &self.output;
        let mut structural = vec![
            RawTag::longs(tags::IMAGE_WIDTH, &[output.width], handler)?,
            RawTag::longs(tags::IMAGE_LENGTH, &[output.length], handler)?,
            RawTag::shorts(tags::BITS_PER_SAMPLE, &vec![output.bits_per_sample; output.samples_per_pixel as usize], handler)?,
            RawTag::shorts(tags::COMPRESSION, &[output.compression], handler)?,
            RawTag::shorts(tags::PHOTOMETRIC_INTERPRETATION, &[output.photometric], handler)?,
            RawTag::shorts(tags::SAMPLES_PER_PIXEL, &[output.samples_per_pixel], handler)?,
            RawTag::shorts(tags::PLANAR_CONFIGURATION, &[planar_config::CHUNKY], handler)?,
        ];

        let (offsets_tag, counts_tag) = match output.layout {
            StorageLayout::Strips { rows_per_strip } => {
                structural.push(RawTag::longs(tags::ROWS_PER_STRIP, &[rows_per_strip], handler)?);
                (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
            }
            StorageLayout::Tiles { tile_width, tile_length } => {
                structural.push(RawTag::longs(tags::TILE_WIDTH, &[tile_width], handler)?);
                structural.push(RawTag::longs(tags::TILE_LENGTH, &[tile_length], handler)?);
                (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
            }
        };

        if self.is_big_tiff {
            structural.push(RawTag::long8s(offsets_tag, offsets, handler)?);
            structural.push(RawTag::long8s(counts_tag, &self.byte_counts, handler)?);
        } else {
            let narrow = |values: &[u64]| values.iter().map(|&v| v as u32).collect::<Vec<u32>>();
            structural.push(RawTag::longs(offsets_tag, &narrow(offsets), handler)?);
            structural.push(RawTag::longs(counts_tag, &narrow(&self.byte_counts), handler)?);
        }

        if output.compression == compression::JPEG
            && output.photometric == photometric::YCBCR
            && !self.has_tag(tags::YCBCR_SUBSAMPLING)
        {
            structural.push(RawTag::shorts(tags::YCBCR_SUBSAMPLING, &[1, 1], handler)?);
        }

        Ok(structural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::raster::SourceRaster;

    fn gray_layout(width: u32, length: u32, layout: StorageLayout, byte_order: ByteOrder) -> OutputLayout {
        OutputLayout {
            width,
            length,
            samples_per_pixel: 1,
            bits_per_sample: 8,
            layout,
            compression: compression::NONE,
            photometric: photometric::BLACK_IS_ZERO,
            jpeg_quality: 75,
            byte_order,
            big_tiff: false,
        }
    }

    #[test]
    fn test_strip_file_reads_back() {
        let dir = std::env::temp_dir().join("slidesplit_builder_strips");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("strips.tif");

        let layout = gray_layout(5, 3, StorageLayout::Strips { rows_per_strip: 2 }, ByteOrder::BigEndian);
        let mut builder = TiffBuilder::create(&path, layout).unwrap();
        builder.set_tag(RawTag::ascii(tags::SOFTWARE, "slidesplit"));
        builder.write_block(0, &(0..10).collect::<Vec<u8>>()).unwrap();
        builder.write_block(1, &(10..15).collect::<Vec<u8>>()).unwrap();
        builder.finish().unwrap();

        let mut raster = SourceRaster::open(&path, 0).unwrap();
        assert_eq!((raster.width(), raster.length()), (5, 3));
        assert_eq!(raster.byte_order().unwrap(), ByteOrder::BigEndian);
        assert_eq!(raster.decode_block(1).unwrap(), (10..15).collect::<Vec<u8>>());
        assert!(raster.ifd().has_tag(tags::SOFTWARE));
    }

    #[test]
    fn test_unwritten_block_fails_finish() {
        let dir = std::env::temp_dir().join("slidesplit_builder_missing");
        std::fs::create_dir_all(&dir).unwrap();

        let layout = gray_layout(4, 4, StorageLayout::Tiles { tile_width: 16, tile_length: 16 }, ByteOrder::LittleEndian);
        let builder = TiffBuilder::create(dir.join("missing.tif"), layout).unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_big_tiff_threshold() {
        let mut layout = gray_layout(65536, 65536, StorageLayout::Strips { rows_per_strip: 1 }, ByteOrder::LittleEndian);
        assert!(layout.needs_big_tiff());
        layout.width = 1024;
        assert!(!layout.needs_big_tiff());
    }
}
