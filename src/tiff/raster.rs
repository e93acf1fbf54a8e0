//! Read-only handle on one directory of a TIFF container
//!
//! A `SourceRaster` owns the file reader, the parsed directory and the
//! decoder for its compression. It validates the layout constraints the
//! copy engine relies on when it is opened, and carries the sequential
//! decode cursor shared by every copy that reads from it.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::compression::{jpeg, BlockShape, CompressionFactory, CompressionHandler};
use crate::extractor::strip_reader::SequentialCursor;
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::block_stream::BlockStream;
use crate::tiff::builder::RawTag;
use crate::tiff::constants::{compression, photometric, planar_config, predictor, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// How pixel blocks are laid out in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    /// Full-width horizontal bands
    Strips { rows_per_strip: u32 },
    /// Fixed-size rectangular blocks
    Tiles { tile_width: u32, tile_length: u32 },
}

/// One decodable raster of a container, opened for reading
pub struct SourceRaster {
    label: String,
    path: Option<PathBuf>,
    reader: Box<dyn SeekableReader>,
    tiff_reader: TiffReader,
    ifd: IFD,
    directory_count: usize,
    file_size: u64,
    width: u32,
    length: u32,
    samples_per_pixel: u16,
    bits_per_sample: u16,
    compression: u16,
    photometric: u16,
    predictor: u16,
    planar_config: u16,
    layout: StorageLayout,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    byte_counts_estimated: bool,
    jpeg_tables: Option<Vec<u8>>,
    decoder: Box<dyn CompressionHandler>,
    decode_limit: u64,
    pub(crate) cursor: SequentialCursor,
}

impl SourceRaster {
    /// Opens directory `directory` of the file at `path`
    pub fn open(path: impl AsRef<Path>, directory: usize) -> TiffResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::with_capacity(1024 * 1024, file);

        let mut raster = Self::from_reader(Box::new(reader), &path.display().to_string(), directory)?;
        raster.path = Some(path.to_path_buf());
        Ok(raster)
    }

    /// Opens directory `directory` from an arbitrary seekable stream
    pub fn from_reader(mut reader: Box<dyn SeekableReader>, label: &str, directory: usize) -> TiffResult<Self> {
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(reader.as_mut())?;
        let directory_count = tiff.ifd_count();
        let ifd = tiff.into_directory(directory, label)?;
        let file_size = reader.stream_size()?;

        let (width, length) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let (width, length) = (width as u32, length as u32);
        if width == 0 || length == 0 {
            return Err(TiffError::MissingDimensions);
        }

        let samples_per_pixel = ifd.get_samples_per_pixel() as u16;
        let bits_per_sample = Self::read_bits_per_sample(&tiff_reader, reader.as_mut(), &ifd, samples_per_pixel)?;
        let planar_config = ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64) as u16;
        if planar_config != planar_config::CHUNKY && samples_per_pixel > 1 {
            return Err(TiffError::UnsupportedPlanarConfig(planar_config));
        }

        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64) as u16;
        let default_photometric = if samples_per_pixel >= 3 { photometric::RGB } else { photometric::BLACK_IS_ZERO };
        let photometric = ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION)
            .map(|v| v as u16)
            .unwrap_or(default_photometric);
        let predictor = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;

        let jpeg_tables = match ifd.get_entry(tags::JPEG_TABLES) {
            Some(entry) if compression == compression::JPEG => Some(tiff_reader.read_entry_bytes(reader.as_mut(), entry)?),
            _ => None,
        };
        let decoder = CompressionFactory::create_decoder(compression as u64, jpeg_tables.clone())?;

        let (layout, offsets_tag, counts_tag) = if ifd.is_tiled() {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).ok_or(TiffError::TagNotFound(tags::TILE_WIDTH))? as u32;
            let tile_length = ifd.get_tag_value(tags::TILE_LENGTH).ok_or(TiffError::TagNotFound(tags::TILE_LENGTH))? as u32;
            if tile_width == 0 || tile_length == 0 {
                return Err(TiffError::GenericError(format!("{}: zero tile size", label)));
            }
            (StorageLayout::Tiles { tile_width, tile_length }, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP)
                .map(|v| v.min(length as u64) as u32)
                .unwrap_or(length)
                .max(1);
            (StorageLayout::Strips { rows_per_strip }, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        let offsets = tiff_reader.read_tag_values(reader.as_mut(), &ifd, offsets_tag)?;

        let mut raster = SourceRaster {
            label: label.to_string(),
            path: None,
            reader,
            tiff_reader,
            ifd,
            directory_count,
            file_size,
            width,
            length,
            samples_per_pixel,
            bits_per_sample,
            compression,
            photometric,
            predictor,
            planar_config,
            layout,
            offsets,
            byte_counts: Vec::new(),
            byte_counts_estimated: false,
            jpeg_tables,
            decoder,
            decode_limit: 0,
            cursor: SequentialCursor::default(),
        };

        if raster.offsets.len() < raster.block_count() {
            return Err(TiffError::GenericError(format!(
                "{}: {} block offsets for {} blocks", label, raster.offsets.len(), raster.block_count())));
        }

        raster.byte_counts = match raster.tiff_reader.read_tag_values(raster.reader.as_mut(), &raster.ifd, counts_tag) {
            Ok(counts) if counts.len() >= raster.block_count() => counts,
            _ => {
                warn!("{}: block byte counts missing, estimating them from the offsets", label);
                raster.byte_counts_estimated = true;
                raster.estimate_byte_counts()
            }
        };

        info!("Opened {} directory {}: {}x{}, {} x {}-bit samples, compression {}, {:?}",
              raster.label, directory, width, length, samples_per_pixel, bits_per_sample,
              raster.decoder.name(), raster.layout);
        Ok(raster)
    }

    fn read_bits_per_sample(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
        samples_per_pixel: u16,
    ) -> TiffResult<u16> {
        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?
        } else {
            vec![1]
        };
        let first = bits.first().copied().unwrap_or(1) as u16;

        if first == 0 || first % 8 != 0 || bits.iter().any(|&b| b as u16 != first) {
            return Err(TiffError::UnsupportedSampleDepth(first));
        }
        if bits.len() > 1 && bits.len() != samples_per_pixel as usize {
            debug!("BitsPerSample has {} values for {} samples", bits.len(), samples_per_pixel);
        }
        Ok(first)
    }

    /// Guesses block sizes when the byte count table is absent
    ///
    /// Uncompressed blocks have their nominal size; compressed blocks are
    /// assumed to run up to the next block (or the end of the file).
    fn estimate_byte_counts(&self) -> Vec<u64> {
        let count = self.block_count();
        if self.compression == compression::NONE {
            return (0..count).map(|i| self.block_shape(i).byte_len() as u64).collect();
        }

        let mut sorted: Vec<u64> = self.offsets[..count].to_vec();
        sorted.sort_unstable();
        self.offsets[..count].iter().map(|&offset| {
            let end = sorted.iter().copied().find(|&o| o > offset).unwrap_or(self.file_size);
            end.saturating_sub(offset)
        }).collect()
    }

    /// Identifier used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Path of the underlying file, when opened from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The parsed directory
    pub fn ifd(&self) -> &IFD {
        &self.ifd
    }

    /// Number of directories in the container
    pub fn directory_count(&self) -> usize {
        self.directory_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn compression(&self) -> u16 {
        self.compression
    }

    pub fn photometric(&self) -> u16 {
        self.photometric
    }

    pub fn predictor(&self) -> u16 {
        self.predictor
    }

    pub fn planar_config(&self) -> u16 {
        self.planar_config
    }

    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    pub fn is_tiled(&self) -> bool {
        matches!(self.layout, StorageLayout::Tiles { .. })
    }

    pub fn is_big_tiff(&self) -> bool {
        self.tiff_reader.is_big_tiff()
    }

    pub fn byte_order(&self) -> TiffResult<ByteOrder> {
        self.tiff_reader.byte_order()
    }

    /// JPEGTables stream of a JPEG directory
    pub fn jpeg_tables(&self) -> Option<&[u8]> {
        self.jpeg_tables.as_deref()
    }

    /// Whether the byte counts were estimated rather than read
    pub fn byte_counts_estimated(&self) -> bool {
        self.byte_counts_estimated
    }

    /// Whether rows can be decoded in any order
    pub fn supports_random_access(&self) -> bool {
        self.decoder.supports_random_access()
    }

    /// Bytes of one pixel
    pub fn pixel_bytes(&self) -> usize {
        self.samples_per_pixel as usize * (self.bits_per_sample as usize / 8)
    }

    /// Bytes of one full-width scanline
    pub fn scanline_bytes(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Number of strips or tiles
    pub fn block_count(&self) -> usize {
        match self.layout {
            StorageLayout::Strips { rows_per_strip } => self.length.div_ceil(rows_per_strip) as usize,
            StorageLayout::Tiles { .. } => (self.tiles_across() * self.tiles_down()) as usize,
        }
    }

    /// Tile columns (1 for strip layouts)
    pub fn tiles_across(&self) -> u32 {
        match self.layout {
            StorageLayout::Tiles { tile_width, .. } => self.width.div_ceil(tile_width),
            StorageLayout::Strips { .. } => 1,
        }
    }

    /// Tile rows (strip count for strip layouts)
    pub fn tiles_down(&self) -> u32 {
        match self.layout {
            StorageLayout::Tiles { tile_length, .. } => self.length.div_ceil(tile_length),
            StorageLayout::Strips { rows_per_strip } => self.length.div_ceil(rows_per_strip),
        }
    }

    /// Decoded geometry of block `index`
    ///
    /// Tiles are always full size; the last strip only holds the rows that
    /// remain.
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

    /// Stored byte count of block `index`
    pub fn block_byte_count(&self, index: usize) -> u64 {
        self.byte_counts.get(index).copied().unwrap_or(0)
    }

    /// Reads the still-encoded payload of block `index`
    pub fn read_raw_block(&mut self, index: usize) -> TiffResult<Vec<u8>> {
        let mut data = Vec::new();
        self.read_raw_block_into(index, &mut data)?;
        Ok(data)
    }

    /// Reads the still-encoded payload of block `index` into `data`
    ///
    /// `data` is resized to the block's byte count; a buffer reserved up
    /// front is reused without reallocating.
    pub fn read_raw_block_into(&mut self, index: usize, data: &mut Vec<u8>) -> TiffResult<()> {
        let (offset, byte_count) = self.block_extent(index)?;
        data.clear();
        data.resize(byte_count as usize, 0);
        self.reader.read_exact_at(offset, data)?;
        Ok(())
    }

    /// File offset and stored length of block `index`
    fn block_extent(&self, index: usize) -> TiffResult<(u64, u64)> {
        let offset = *self.offsets.get(index).ok_or_else(|| {
            TiffError::GenericError(format!("{}: block {} out of range", self.label, index))
        })?;
        let byte_count = self.block_byte_count(index);
        if offset.saturating_add(byte_count) > self.file_size {
            return Err(TiffError::GenericError(format!(
                "{}: block {} at {}+{} runs past the end of the file", self.label, index, offset, byte_count)));
        }
        Ok((offset, byte_count))
    }

    /// Largest stored block, in bytes
    pub fn max_block_byte_count(&self) -> u64 {
        self.byte_counts.iter().take(self.block_count()).copied().max().unwrap_or(0)
    }

    /// Ceiling for buffers that hold a whole decoded strip, 0 for none
    ///
    /// The mosaic sets its memory limit here. Strips whose codec cannot
    /// decode incrementally are refused when they exceed it.
    pub fn set_decode_limit(&mut self, limit: u64) {
        self.decode_limit = limit;
    }

    /// Fails with `AllocationFailed` unless `bytes` can be held at once
    pub fn check_decode_budget(&self, bytes: usize) -> TiffResult<()> {
        if self.decode_limit > 0 && bytes as u64 > self.decode_limit {
            warn!("{}: decoding a block needs {} bytes, above the limit of {}", self.label, bytes, self.decode_limit);
            return Err(TiffError::AllocationFailed(bytes));
        }
        let mut reserved: Vec<u8> = Vec::new();
        reserved.try_reserve_exact(bytes).map_err(|_| TiffError::AllocationFailed(bytes))
    }

    /// Reads and fully decodes block `index`
    ///
    /// The result is exactly `block_shape(index).byte_len()` bytes with any
    /// horizontal predictor undone.
    pub fn decode_block(&mut self, index: usize) -> TiffResult<Vec<u8>> {
        let shape = self.block_shape(index);
        let raw = self.read_raw_block(index)?;
        let mut data = self.decoder.decompress_block(&raw, shape).map_err(|e| {
            TiffError::CodecError(format!("{}: block {}: {}", self.label, index, e))
        })?;
        self.fit_to_shape(index, &mut data, shape.byte_len())?;

        if self.predictor == predictor::HORIZONTAL_DIFFERENCING {
            undo_horizontal_predictor(&mut data, shape, self.byte_order()?)?;
        }
        Ok(data)
    }

    /// Cuts decoded data to `expected` bytes, failing when it is short
    ///
    /// Only uncompressed blocks with estimated byte counts are zero-filled.
    fn fit_to_shape(&self, index: usize, data: &mut Vec<u8>, expected: usize) -> TiffResult<()> {
        if data.len() < expected {
            if !self.lenient_short_blocks() {
                return Err(TiffError::CodecError(format!(
                    "{}: block {} decoded to {} of {} bytes", self.label, index, data.len(), expected)));
            }
            warn!("{}: block {} holds {} of {} bytes, zero-filling", self.label, index, data.len(), expected);
            data.resize(expected, 0);
        }
        data.truncate(expected);
        Ok(())
    }

    fn lenient_short_blocks(&self) -> bool {
        self.compression == compression::NONE && self.byte_counts_estimated
    }

    /// Starts decoding strip or tile `index` a few rows at a time
    ///
    /// `None` when the codec only decodes whole blocks.
    pub fn start_block_stream(&self, index: usize) -> TiffResult<Option<BlockStream>> {
        let decoder = match self.decoder.block_decoder() {
            Some(decoder) => decoder,
            None => return Ok(None),
        };
        let (offset, byte_count) = self.block_extent(index)?;
        debug!("{}: streaming block {} ({} encoded bytes)", self.label, index, byte_count);
        Ok(Some(BlockStream::new(index, decoder, offset, byte_count)))
    }

    /// Decodes the next whole rows of `stream` into `out`
    ///
    /// `out` must be a multiple of the block's row size.
    pub fn read_stream_rows(&mut self, stream: &mut BlockStream, out: &mut [u8]) -> TiffResult<()> {
        let index = stream.index();
        let written = stream.fill(self.reader.as_mut(), out).map_err(|e| {
            TiffError::CodecError(format!("{}: block {}: {}", self.label, index, e))
        })?;
        if written < out.len() {
            return Err(TiffError::CodecError(format!(
                "{}: block {} ended {} bytes early", self.label, index, out.len() - written)));
        }
        self.undo_predictor_rows(index, out)
    }

    /// Reads scanline `row` of an uncompressed strip raster straight from the file
    pub fn read_uncompressed_row(&mut self, row: u32, out: &mut [u8]) -> TiffResult<()> {
        let rows_per_strip = match self.layout {
            StorageLayout::Strips { rows_per_strip } => rows_per_strip,
            StorageLayout::Tiles { .. } => {
                return Err(TiffError::Unsupported(format!("{}: row reads need strips", self.label)));
            }
        };
        let strip = (row / rows_per_strip) as usize;
        let (offset, byte_count) = self.block_extent(strip)?;
        let scanline = self.scanline_bytes();
        let start = (row % rows_per_strip) as u64 * scanline as u64;

        let available = byte_count.saturating_sub(start).min(scanline as u64) as usize;
        if available < scanline && !self.lenient_short_blocks() {
            return Err(TiffError::CodecError(format!(
                "{}: strip {} holds {} bytes, row {} needs {}", self.label, strip, byte_count, row, start + scanline as u64)));
        }
        self.reader.read_exact_at(offset + start, &mut out[..available])?;
        out[available..scanline].fill(0);
        self.undo_predictor_rows(strip, &mut out[..scanline])
    }

    fn undo_predictor_rows(&self, index: usize, rows: &mut [u8]) -> TiffResult<()> {
        if self.predictor != predictor::HORIZONTAL_DIFFERENCING {
            return Ok(());
        }
        let block = self.block_shape(index);
        let row_bytes = block.row_bytes().max(1);
        let shape = BlockShape { length: (rows.len() / row_bytes) as u32, ..block };
        undo_horizontal_predictor(rows, shape, self.byte_order()?)
    }

    /// Descriptive attributes to carry to an output raster, in file order
    pub fn descriptive_tags(&mut self) -> TiffResult<Vec<RawTag>> {
        let mut copied = Vec::new();
        for &tag in tags::DESCRIPTIVE {
            if let Some(raw) = self.raw_tag(tag)? {
                copied.push(raw);
            }
        }
        Ok(copied)
    }

    /// Value bytes of `tag` exactly as stored, if the directory has it
    pub fn raw_tag(&mut self, tag: u16) -> TiffResult<Option<RawTag>> {
        let entry = match self.ifd.get_entry(tag) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        let bytes = self.tiff_reader.read_entry_bytes(self.reader.as_mut(), &entry)?;
        Ok(Some(RawTag {
            tag,
            field_type: entry.field_type,
            count: entry.count,
            bytes,
        }))
    }

    /// Estimated JPEG quality of a JPEG-compressed directory
    pub fn jpeg_quality(&mut self) -> Option<u8> {
        if self.compression != compression::JPEG {
            return None;
        }
        if let Some(quality) = self.jpeg_tables.as_deref().and_then(jpeg::estimate_quality) {
            return Some(quality);
        }
        self.read_raw_block(0).ok().and_then(|block| jpeg::estimate_quality(&block))
    }
}

/// Reverses horizontal differencing on every row of a decoded block
fn undo_horizontal_predictor(data: &mut [u8], shape: BlockShape, byte_order: ByteOrder) -> TiffResult<()> {
    let samples = shape.samples_per_pixel as usize;
    let row_bytes = shape.row_bytes();

    match shape.bits_per_sample {
        8 => {
            for row in data.chunks_mut(row_bytes) {
                for i in samples..row.len() {
                    row[i] = row[i].wrapping_add(row[i - samples]);
                }
            }
        }
        16 => {
            let read = |b: &[u8]| match byte_order {
                ByteOrder::LittleEndian => u16::from_le_bytes([b[0], b[1]]),
                ByteOrder::BigEndian => u16::from_be_bytes([b[0], b[1]]),
            };
            let write = |v: u16| match byte_order {
                ByteOrder::LittleEndian => v.to_le_bytes(),
                ByteOrder::BigEndian => v.to_be_bytes(),
            };
            for row in data.chunks_mut(row_bytes) {
                for i in (samples * 2..row.len() - row.len() % 2).step_by(2) {
                    let value = read(&row[i..]).wrapping_add(read(&row[i - samples * 2..]));
                    row[i..i + 2].copy_from_slice(&write(value));
                }
            }
        }
        bits => {
            return Err(TiffError::Unsupported(format!("horizontal predictor on {}-bit samples", bits)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predictor_accumulates_per_sample() {
        let shape = BlockShape { width: 3, length: 1, samples_per_pixel: 2, bits_per_sample: 8 };
        let mut data = vec![10, 20, 1, 2, 1, 2];
        undo_horizontal_predictor(&mut data, shape, ByteOrder::LittleEndian).unwrap();
        assert_eq!(data, vec![10, 20, 11, 22, 12, 24]);
    }

    #[test]
    fn test_predictor_on_sixteen_bit_big_endian() {
        let shape = BlockShape { width: 2, length: 2, samples_per_pixel: 1, bits_per_sample: 16 };
        let mut data = vec![0x01, 0x00, 0x00, 0x05, 0x00, 0x02, 0x00, 0x03];
        undo_horizontal_predictor(&mut data, shape, ByteOrder::BigEndian).unwrap();
        assert_eq!(data, vec![0x01, 0x00, 0x01, 0x05, 0x00, 0x02, 0x00, 0x05]);
    }
}
