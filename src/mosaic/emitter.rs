//! Mosaic decomposition of a cropped raster
//!
//! The emitter decides whether a raster needs splitting, plans the piece
//! grid, reserves one piece buffer (shrinking the pieces when the
//! reservation fails) and then fills and writes every piece in turn.
//!
//! Pieces are visited column by column, top to bottom inside a column.
//! For strip sources that keeps scanline reads ascending within a column;
//! moving to the next column drains the decoder and restarts it at row 0.

use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::{MosaicConfig, MosaicFormat, MosaicMode};
use crate::extractor::{check_jpeg_encodable, output_photometric, resolve_jpeg_quality, RasterCopyEngine, Region};
use crate::tiff::builder::OutputLayout;
use crate::tiff::constants::{compression, limits};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{SourceRaster, StorageLayout};
use crate::utils::progress::ProgressTracker;

use super::geometry::{shrink_until_fits, EdgeLocks, GeometryPlanner, PieceGeometry};
use super::naming;
use super::sink::{ContainerSink, JpegStreamSink, OutputSink, PieceSink};

/// Source of piece buffers
pub trait BufferAllocator {
    /// A zeroed buffer of `len` bytes, or `None` when memory is short
    fn allocate(&self, len: usize) -> Option<Vec<u8>>;
}

/// Allocates from the global heap without aborting on failure
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).ok()?;
        buffer.resize(len, 0);
        Some(buffer)
    }
}

/// What a mosaic run produced
#[derive(Debug)]
pub struct MosaicReport {
    pub geometry: PieceGeometry,
    /// Pieces written successfully
    pub written: Vec<PathBuf>,
    /// Pieces that failed, with the reason
    pub failed: Vec<(PathBuf, TiffError)>,
}

#[derive(Debug)]
pub enum MosaicOutcome {
    /// The raster already satisfies the limits
    Skipped,
    Done(MosaicReport),
}

/// Splits rasters into pieces according to a [`MosaicConfig`]
pub struct MosaicEmitter<'c, A: BufferAllocator = SystemAllocator> {
    config: &'c MosaicConfig,
    allocator: A,
}

impl<'c> MosaicEmitter<'c, SystemAllocator> {
    pub fn new(config: &'c MosaicConfig) -> Self {
        MosaicEmitter { config, allocator: SystemAllocator }
    }
}

impl<'c, A: BufferAllocator> MosaicEmitter<'c, A> {
    /// Uses `allocator` for the piece buffer
    pub fn with_allocator(config: &'c MosaicConfig, allocator: A) -> Self {
        MosaicEmitter { config, allocator }
    }

    fn planner(&self, source: &SourceRaster) -> GeometryPlanner {
        GeometryPlanner::new(
            source.width(),
            source.length(),
            source.samples_per_pixel(),
            source.bits_per_sample(),
            self.config.overlap,
        )
    }

    fn edge_cap(&self, source: &SourceRaster) -> Option<u32> {
        if self.config.writes_jpeg(source.compression()) {
            Some(limits::JPEG_MAX_DIMENSION)
        } else {
            None
        }
    }

    /// Whether `source` has to be split at all
    pub fn needs_decomposition(&self, source: &SourceRaster) -> bool {
        if self.config.mode == MosaicMode::Always {
            return true;
        }

        let planner = self.planner(source);
        let whole = planner.geometry(source.width(), source.length());
        let width_ok = self.config.piece_width == 0 || source.width() <= self.config.piece_width;
        let length_ok = self.config.piece_length == 0 || source.length() <= self.config.piece_length;

        !(width_ok && length_ok && planner.satisfies(&whole, self.config.memory_limit, self.edge_cap(source)))
    }

    /// Plans the piece grid for `source`
    pub fn plan(&self, source: &SourceRaster) -> TiffResult<PieceGeometry> {
        if let Some(cap) = self.edge_cap(source) {
            if self.config.piece_width >= cap || self.config.piece_length >= cap {
                return Err(TiffError::GeometryInfeasible(format!(
                    "{}: requested piece size {}x{} is too large for JPEG output",
                    source.label(), self.config.piece_width, self.config.piece_length)));
            }
        }

        let (geometry, _) = self.planner(source).plan(
            self.config.piece_width,
            self.config.piece_length,
            self.config.memory_limit,
            self.edge_cap(source),
        )?;
        Ok(geometry)
    }

    /// Reserves the piece buffer, halving the pieces while it fails
    fn allocate_buffer(&self, source: &SourceRaster, geometry: PieceGeometry) -> TiffResult<(PieceGeometry, Vec<u8>)> {
        let planner = self.planner(source);
        let mut buffer = None;

        let shrunk = shrink_until_fits(
            geometry.piece_width,
            geometry.piece_length,
            EdgeLocks::none(),
            |w, l| {
                let size = usize::try_from(planner.geometry(w, l).allocation_size)
                    .map_err(|_| TiffError::AllocationFailed(usize::MAX))?;
                buffer = self.allocator.allocate(size);
                Ok(buffer.is_some())
            },
            |_, _| TiffError::AllocationFailed(geometry.allocation_size as usize),
        )?;

        let geometry = planner.geometry(shrunk.width, shrunk.length);
        if shrunk.steps > 0 {
            warn!("{}: piece buffer reduced to {} after {} halvings", source.label(), geometry, shrunk.steps);
        }
        match buffer {
            Some(buffer) => Ok((geometry, buffer)),
            None => Err(TiffError::AllocationFailed(geometry.allocation_size as usize)),
        }
    }

    /// Splits `source` into pieces named after `stem`
    ///
    /// A failed piece is recorded in the report and the run continues with
    /// the next one.
    pub fn emit(&self, source: &mut SourceRaster, stem: &Path) -> TiffResult<MosaicOutcome> {
        let output_compression = match self.config.output {
            MosaicFormat::JpegFile => compression::JPEG,
            MosaicFormat::Tiff => self.config.compression.resolve(source.compression()),
        };
        if !self.needs_decomposition(source) {
            info!("{}: fits the mosaic limits, no pieces needed", source.label());
            return Ok(MosaicOutcome::Skipped);
        }
        if output_compression == compression::JPEG {
            check_jpeg_encodable(source)?;
        }
        source.set_decode_limit(self.config.memory_limit);

        let planned = self.plan(source)?;
        let (geometry, mut buffer) = self.allocate_buffer(source, planned)?;
        info!("{}: making mosaic of {}", source.label(), geometry);

        let quality = resolve_jpeg_quality(self.config.jpeg_quality, source);
        let tags = source.descriptive_tags()?;
        let layout = OutputLayout {
            width: 0,
            length: 0,
            samples_per_pixel: source.samples_per_pixel(),
            bits_per_sample: source.bits_per_sample(),
            layout: StorageLayout::Strips { rows_per_strip: 1 },
            compression: output_compression,
            photometric: output_photometric(source.photometric(), source.samples_per_pixel(), output_compression),
            jpeg_quality: quality,
            byte_order: source.byte_order()?,
            big_tiff: source.is_big_tiff(),
        };

        let mut report = MosaicReport { geometry, written: Vec::new(), failed: Vec::new() };
        let progress = ProgressTracker::new(geometry.piece_count() as u64, "Writing pieces");

        for column in 0..geometry.horizontal_pieces {
            progress.set_message(&format!("column {}/{}", column + 1, geometry.horizontal_pieces));
            for row in 0..geometry.vertical_pieces {
                let window = piece_window(source.width(), source.length(), &geometry, column, row);
                let path = naming::piece_path(
                    stem, row + 1, column + 1,
                    geometry.vertical_pieces, geometry.horizontal_pieces, self.config.output,
                );

                let piece_layout = OutputLayout { width: window.width, length: window.height, ..layout.clone() };
                match self.write_piece(source, window, &path, piece_layout, &tags, &mut buffer) {
                    Ok(written) => report.written.push(written),
                    Err(e) => {
                        error!("{}: piece {} failed: {}", source.label(), path.display(), e);
                        report.failed.push((path, e));
                    }
                }
                progress.increment(1);
            }
        }
        progress.finish();

        info!("{}: wrote {} of {} pieces", source.label(), report.written.len(), geometry.piece_count());
        Ok(MosaicOutcome::Done(report))
    }

    fn write_piece(
        &self,
        source: &mut SourceRaster,
        window: Region,
        path: &Path,
        layout: OutputLayout,
        tags: &[crate::tiff::builder::RawTag],
        buffer: &mut [u8],
    ) -> TiffResult<PathBuf> {
        let mut sink = match self.config.output {
            MosaicFormat::Tiff => OutputSink::Container(ContainerSink::create(path, layout, tags)?),
            MosaicFormat::JpegFile => OutputSink::JpegStream(JpegStreamSink::create(
                path, window.width, window.height, layout.samples_per_pixel, layout.jpeg_quality)?),
        };

        let bytes = window.width as usize * window.height as usize * source.pixel_bytes();
        RasterCopyEngine::copy_window(source, window, &mut buffer[..bytes])?;
        sink.write_rows(&buffer[..bytes], window.height)?;
        sink.finish()
    }
}

/// Source rectangle of the piece in `column`, `row`, overlaps included
///
/// The left and top overlaps shrink at the raster's edge; the right and
/// bottom ones are cut by the raster's extent.
pub fn piece_window(width: u32, length: u32, geometry: &PieceGeometry, column: u32, row: u32) -> Region {
    let x = column * geometry.piece_width;
    let y = row * geometry.piece_length;

    let left = x.min(geometry.horizontal_overlap);
    let top = y.min(geometry.vertical_overlap);
    let right_extent = (geometry.piece_width + geometry.horizontal_overlap).min(width - x);
    let bottom_extent = (geometry.piece_length + geometry.vertical_overlap).min(length - y);

    Region::new(x - left, y - top, left + right_extent, top + bottom_extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overlap;

    #[test]
    fn test_windows_cover_raster_without_overlap() {
        let planner = GeometryPlanner::new(100, 70, 1, 8, Overlap::None);
        let geometry = planner.geometry(40, 30);
        let mut covered = vec![0u8; 100 * 70];

        for column in 0..geometry.horizontal_pieces {
            for row in 0..geometry.vertical_pieces {
                let w = piece_window(100, 70, &geometry, column, row);
                for y in w.y..w.end_y() {
                    for x in w.x..w.end_x() {
                        covered[(y * 100 + x) as usize] += 1;
                    }
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_windows_with_overlap_fit_allocation() {
        let planner = GeometryPlanner::new(100, 100, 1, 8, Overlap::Pixels(5));
        let geometry = planner.geometry(30, 50);

        assert_eq!(piece_window(100, 100, &geometry, 0, 0), Region::new(0, 0, 35, 55));
        assert_eq!(piece_window(100, 100, &geometry, 1, 1), Region::new(25, 45, 40, 55));
        assert_eq!(piece_window(100, 100, &geometry, 3, 0), Region::new(85, 0, 15, 55));

        for column in 0..geometry.horizontal_pieces {
            for row in 0..geometry.vertical_pieces {
                let w = piece_window(100, 100, &geometry, column, row);
                assert!((w.width as u64 * w.height as u64) <= geometry.allocation_size);
            }
        }
    }

    struct FailingAbove(usize);

    impl BufferAllocator for FailingAbove {
        fn allocate(&self, len: usize) -> Option<Vec<u8>> {
            if len > self.0 { None } else { Some(vec![0; len]) }
        }
    }

    #[test]
    fn test_system_allocator_zeroes() {
        assert_eq!(SystemAllocator.allocate(3), Some(vec![0, 0, 0]));
        assert!(FailingAbove(2).allocate(3).is_none());
    }
}
