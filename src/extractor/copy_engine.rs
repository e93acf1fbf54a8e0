//! Pixel movement between source rasters, output rasters and buffers
//!
//! The engine knows nothing about mosaics or memory budgets. Each strategy
//! reads from a [`SourceRaster`] and writes either into a [`TiffBuilder`]
//! or into a caller-supplied buffer:
//!
//! * raw tile copy and raw strip copy move compressed payloads verbatim
//! * strips to tiles decodes scanlines and re-tiles them in 128x256 blocks
//! * strips to strips decodes scanlines and clips them to a rectangle
//! * window copies assemble a rectangle of a tiled or stripped source into
//!   one contiguous buffer
//!
//! Scanline reads always go through [`StripReader`], which keeps forward-only
//! codecs on their sequential cursor.

use log::{debug, info};

use crate::extractor::buffer_copy::{copy_rows, pixel_span};
use crate::extractor::region::Region;
use crate::extractor::strip_reader::StripReader;
use crate::extractor::tile_reader::TileReader;
use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::{compression, limits};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{SourceRaster, StorageLayout};
use crate::utils::progress::ProgressTracker;

/// Result of preparing the raw strip copy
#[derive(Debug)]
pub enum FastPath {
    /// Buffer large enough for the largest strip
    Ready(Vec<u8>),
    /// The fast path cannot be used; the reason is logged by the caller
    Fallback(String),
}

/// Stateless collection of copy strategies
pub struct RasterCopyEngine;

impl RasterCopyEngine {
    /// Copies every compressed tile payload unchanged
    ///
    /// The builder must use the source's tile geometry and compression.
    pub fn copy_tiles_raw(source: &mut SourceRaster, builder: &mut TiffBuilder) -> TiffResult<()> {
        if source.byte_counts_estimated() {
            return Err(TiffError::MissingByteCounts("TileByteCounts"));
        }

        let count = source.block_count();
        info!("{}: copying {} tiles verbatim", source.label(), count);
        let progress = ProgressTracker::new(count as u64, "Copying tiles");
        let mut payload = Vec::new();
        for index in 0..count {
            source.read_raw_block_into(index, &mut payload)?;
            builder.write_raw_block(index, &payload)?;
            progress.increment(1);
        }
        progress.finish();
        Ok(())
    }

    /// Checks whether strips can be copied verbatim and reserves the buffer
    ///
    /// Estimated byte counts or a failed reservation send the caller to
    /// a decoding strategy instead.
    pub fn prepare_strip_fast_path(source: &SourceRaster) -> FastPath {
        if source.byte_counts_estimated() {
            return FastPath::Fallback("strip byte counts were estimated".to_string());
        }

        let largest = source.max_block_byte_count() as usize;
        let mut buffer = Vec::new();
        match buffer.try_reserve_exact(largest) {
            Ok(()) => FastPath::Ready(buffer),
            Err(_) => FastPath::Fallback(format!("cannot allocate {} bytes for one strip", largest)),
        }
    }

    /// Copies every compressed strip payload unchanged
    ///
    /// The builder must use the source's rows per strip and compression.
    pub fn copy_strips_raw(source: &mut SourceRaster, builder: &mut TiffBuilder, mut buffer: Vec<u8>) -> TiffResult<()> {
        let count = source.block_count();
        info!("{}: copying {} strips verbatim", source.label(), count);
        for index in 0..count {
            source.read_raw_block_into(index, &mut buffer)?;
            builder.write_raw_block(index, &buffer)?;
        }
        Ok(())
    }

    /// Decodes scanlines of `region` and writes them as tiles
    ///
    /// Rows above the region are decoded and discarded when the source codec
    /// is forward-only. Partial tiles at the right and bottom edges are
    /// zero-padded.
    pub fn copy_strips_to_tiles(source: &mut SourceRaster, region: Region, builder: &mut TiffBuilder) -> TiffResult<()> {
        let (tile_width, tile_length) = match builder.output().layout {
            StorageLayout::Tiles { tile_width, tile_length } => (tile_width, tile_length),
            StorageLayout::Strips { .. } => {
                return Err(TiffError::GenericError("strip to tile copy needs a tiled output".to_string()));
            }
        };

        let pixel_bytes = source.pixel_bytes();
        let region_row_bytes = region.width as usize * pixel_bytes;
        let tile_row_bytes = tile_width as usize * pixel_bytes;
        let tiles_across = region.width.div_ceil(tile_width);
        let tiles_down = region.height.div_ceil(tile_length);
        debug!("{}: re-tiling {} into {}x{} tiles of {}x{}",
               source.label(), region, tiles_across, tiles_down, tile_width, tile_length);

        let mut band = allocate(tile_length as usize * region_row_bytes)?;
        let mut tile = allocate(tile_length as usize * tile_row_bytes)?;
        let mut scanline = allocate(source.scanline_bytes())?;
        let (span_start, _) = pixel_span(region.x, region.width, pixel_bytes);

        let mut reader = StripReader::new(source)?;
        reader.seek_row(region.y)?;

        let progress = ProgressTracker::new(tiles_down as u64, "Re-tiling");
        for tile_row in 0..tiles_down {
            let first = tile_row * tile_length;
            let rows = tile_length.min(region.height - first);

            for r in 0..rows {
                reader.read_scanline(region.y + first + r, &mut scanline)?;
                let dst = r as usize * region_row_bytes;
                band[dst..dst + region_row_bytes]
                    .copy_from_slice(&scanline[span_start..span_start + region_row_bytes]);
            }

            for tile_col in 0..tiles_across {
                let cols = tile_width.min(region.width - tile_col * tile_width);
                let copy_bytes = cols as usize * pixel_bytes;
                let src_start = (tile_col * tile_width) as usize * pixel_bytes;

                tile.fill(0);
                copy_rows(
                    &mut tile,
                    &band[src_start..],
                    rows as usize,
                    copy_bytes,
                    tile_row_bytes - copy_bytes,
                    region_row_bytes - copy_bytes,
                );
                builder.write_block((tile_row * tiles_across + tile_col) as usize, &tile)?;
            }
            progress.increment(1);
        }
        progress.finish();
        Ok(())
    }

    /// Decodes scanlines of `region` and writes them as clipped strips
    pub fn copy_strips_to_strips(source: &mut SourceRaster, region: Region, builder: &mut TiffBuilder) -> TiffResult<()> {
        let rows_per_strip = match builder.output().layout {
            StorageLayout::Strips { rows_per_strip } => rows_per_strip,
            StorageLayout::Tiles { .. } => {
                return Err(TiffError::GenericError("strip copy needs a strip-organised output".to_string()));
            }
        };

        let pixel_bytes = source.pixel_bytes();
        let (span_start, row_bytes) = pixel_span(region.x, region.width, pixel_bytes);
        let mut strip = allocate(rows_per_strip as usize * row_bytes)?;
        let mut scanline = allocate(source.scanline_bytes())?;
        debug!("{}: clipping {} into strips of {} rows", source.label(), region, rows_per_strip);

        let mut reader = StripReader::new(source)?;
        reader.seek_row(region.y)?;

        let strips = region.height.div_ceil(rows_per_strip);
        for index in 0..strips {
            let first = index * rows_per_strip;
            let rows = rows_per_strip.min(region.height - first);
            for r in 0..rows {
                reader.read_scanline(region.y + first + r, &mut scanline)?;
                let dst = r as usize * row_bytes;
                strip[dst..dst + row_bytes].copy_from_slice(&scanline[span_start..span_start + row_bytes]);
            }
            builder.write_block(index as usize, &strip[..rows as usize * row_bytes])?;
        }
        Ok(())
    }

    /// Fills `buffer` with the pixels of `window`, row after row
    ///
    /// `buffer` must hold `window.width * window.height` pixels. Strip
    /// sources are read through the shared sequential cursor, so a window
    /// that starts above the cursor forces a drain and restart first.
    pub fn copy_window(source: &mut SourceRaster, window: Region, buffer: &mut [u8]) -> TiffResult<()> {
        let needed = window.width as usize * window.height as usize * source.pixel_bytes();
        if buffer.len() < needed {
            return Err(TiffError::GenericError(format!(
                "window {} needs {} bytes, buffer holds {}", window, needed, buffer.len())));
        }
        if window.end_x() > source.width() || window.end_y() > source.length() {
            return Err(TiffError::InvalidRegion(format!(
                "{}: window {} outside a {}x{} raster", source.label(), window, source.width(), source.length())));
        }

        if source.is_tiled() {
            Self::copy_tiles_to_buffer(source, window, buffer)
        } else {
            Self::copy_strips_to_buffer(source, window, buffer)
        }
    }

    fn copy_strips_to_buffer(source: &mut SourceRaster, window: Region, buffer: &mut [u8]) -> TiffResult<()> {
        let (span_start, row_bytes) = pixel_span(window.x, window.width, source.pixel_bytes());
        let mut scanline = allocate(source.scanline_bytes())?;

        let mut reader = StripReader::new(source)?;
        reader.seek_row(window.y)?;

        for r in 0..window.height {
            reader.read_scanline(window.y + r, &mut scanline)?;
            let dst = r as usize * row_bytes;
            buffer[dst..dst + row_bytes].copy_from_slice(&scanline[span_start..span_start + row_bytes]);
        }
        Ok(())
    }

    /// Stitches the sub-rectangles of every tile touching `window`
    fn copy_tiles_to_buffer(source: &mut SourceRaster, window: Region, buffer: &mut [u8]) -> TiffResult<()> {
        let pixel_bytes = source.pixel_bytes();
        let dst_row_bytes = window.width as usize * pixel_bytes;

        let mut reader = TileReader::new(source)?;
        let (tile_width, tile_length) = (reader.tile_width(), reader.tile_length());
        let tile_row_bytes = tile_width as usize * pixel_bytes;

        let first_col = window.x / tile_width;
        let last_col = (window.end_x() - 1) / tile_width;
        let first_row = window.y / tile_length;
        let last_row = (window.end_y() - 1) / tile_length;

        for tile_row in first_row..=last_row {
            let tile_y = tile_row * tile_length;
            let y0 = window.y.max(tile_y);
            let y1 = window.end_y().min(tile_y + tile_length);

            for tile_col in first_col..=last_col {
                let tile_x = tile_col * tile_width;
                let x0 = window.x.max(tile_x);
                let x1 = window.end_x().min(tile_x + tile_width);
                let copy_bytes = (x1 - x0) as usize * pixel_bytes;

                let tile = reader.read_tile(tile_col, tile_row)?;
                let src = (y0 - tile_y) as usize * tile_row_bytes + (x0 - tile_x) as usize * pixel_bytes;
                let dst = (y0 - window.y) as usize * dst_row_bytes + (x0 - window.x) as usize * pixel_bytes;
                copy_rows(
                    &mut buffer[dst..],
                    &tile[src..],
                    (y1 - y0) as usize,
                    copy_bytes,
                    dst_row_bytes - copy_bytes,
                    tile_row_bytes - copy_bytes,
                );
            }
        }
        Ok(())
    }

    /// Rows per strip for a clipped strip output
    ///
    /// About 8 KiB per strip; JPEG strips are a multiple of 16 rows unless
    /// one strip covers the whole image.
    pub fn rows_per_strip(row_bytes: usize, length: u32, output_compression: u16) -> u32 {
        let mut rows = (limits::STRIP_TARGET_BYTES / row_bytes.max(1)).max(1) as u32;
        if output_compression == compression::JPEG {
            rows = rows.div_ceil(limits::JPEG_ROW_GRANULE) * limits::JPEG_ROW_GRANULE;
        }
        if rows >= length {
            rows = length;
        }
        rows.max(1)
    }
}

/// Zeroed buffer, reporting allocation failure as an error
pub(crate) fn allocate(len: usize) -> TiffResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| TiffError::AllocationFailed(len))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_strip_targets_eight_kib() {
        assert_eq!(RasterCopyEngine::rows_per_strip(1000, 500, compression::NONE), 8);
        assert_eq!(RasterCopyEngine::rows_per_strip(20000, 500, compression::LZW), 1);
    }

    #[test]
    fn test_jpeg_rows_per_strip_is_multiple_of_sixteen() {
        assert_eq!(RasterCopyEngine::rows_per_strip(1000, 500, compression::JPEG), 16);
        assert_eq!(RasterCopyEngine::rows_per_strip(100, 500, compression::JPEG), 96);
    }

    #[test]
    fn test_short_images_get_one_strip() {
        assert_eq!(RasterCopyEngine::rows_per_strip(100, 10, compression::JPEG), 10);
    }

    #[test]
    fn test_allocate_zeroes() {
        assert_eq!(allocate(4).unwrap(), vec![0u8; 4]);
    }
}
