//! Copy strategy selection for single crop requests
//!
//! The orchestrator is the only caller of the raw and re-tiling strategies
//! of [`RasterCopyEngine`]. It picks one per request from the source
//! layout, the crop rectangle and the output compression:
//!
//! | source | crop    | compression | strategy                     |
//! |--------|---------|-------------|------------------------------|
//! | tiles  | any     | same        | raw tile copy (crop ignored) |
//! | strips | none    | same        | raw strip copy               |
//! | strips | >= 65500 on an axis | any | strips to 128x256 tiles  |
//! | strips | other   | any         | strips to clipped strips     |

use std::path::Path;

use log::{info, warn};

use crate::compression::Compression;
use crate::tiff::builder::{OutputLayout, TiffBuilder};
use crate::tiff::constants::{compression, limits, photometric, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{SourceRaster, StorageLayout};

use super::copy_engine::{FastPath, RasterCopyEngine};
use super::output_raster::OutputRaster;
use super::region::{CropRectangle, Region};

/// The four ways a crop can be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Compressed tiles copied verbatim
    TilesRaw,
    /// Compressed strips copied verbatim
    StripsRaw,
    /// Scanlines decoded and re-encoded as tiles
    StripsToTiles,
    /// Scanlines decoded, clipped and re-encoded as strips
    StripsToStrips,
}

/// Produces one cropped output raster per request
pub struct CropOrchestrator {
    compression: Compression,
    jpeg_quality: Option<u8>,
}

impl CropOrchestrator {
    /// Create an orchestrator writing `compression` outputs
    ///
    /// # Arguments
    /// * `compression` - Output compression, or the source's
    /// * `jpeg_quality` - Quality for JPEG outputs; estimated from a JPEG
    ///   source or defaulted when `None`
    pub fn new(compression: Compression, jpeg_quality: Option<u8>) -> Self {
        CropOrchestrator { compression, jpeg_quality }
    }

    /// Picks the copy strategy for a crop of `source`
    ///
    /// `region` is `None` when no crop was requested. Strips fall back from
    /// the raw copy whenever the compression changes.
    pub fn select_strategy(source: &SourceRaster, region: Option<Region>, output_compression: u16) -> CopyStrategy {
        if source.is_tiled() {
            return CopyStrategy::TilesRaw;
        }
        if region.is_none() && output_compression == source.compression() {
            return CopyStrategy::StripsRaw;
        }
        Self::decoding_strategy(region.unwrap_or_else(|| Region::full(source.width(), source.length())))
    }

    fn decoding_strategy(region: Region) -> CopyStrategy {
        if region.width >= limits::MAX_STRIP_DIMENSION || region.height >= limits::MAX_STRIP_DIMENSION {
            CopyStrategy::StripsToTiles
        } else {
            CopyStrategy::StripsToStrips
        }
    }

    /// Writes the crop of `source` to `output_path` and closes it
    ///
    /// # Arguments
    /// * `source` - Raster to read; its sequential cursor is advanced
    /// * `crop` - Rectangle to extract, or the "no crop" sentinel
    /// * `output_path` - File to create
    ///
    /// # Returns
    /// The output in its `Closed` state
    pub fn crop(&self, source: &mut SourceRaster, crop: CropRectangle, output_path: &Path) -> TiffResult<OutputRaster> {
        let output_compression = self.compression.resolve(source.compression());
        let mut region = crop.resolve(source.width(), source.length())?;
        let mut strategy = Self::select_strategy(source, region, output_compression);

        if strategy == CopyStrategy::TilesRaw {
            if let Some(ignored) = region.take() {
                warn!("{}: tiled sources are copied whole, crop {} is ignored", source.label(), ignored);
            }
            if output_compression != source.compression() {
                return Err(TiffError::Unsupported(format!(
                    "{}: tiled sources can only be copied with their own compression ({})",
                    source.label(), source.compression())));
            }
            if source.byte_counts_estimated() {
                return Err(TiffError::MissingByteCounts("TileByteCounts"));
            }
        }

        let mut strip_buffer = None;
        if strategy == CopyStrategy::StripsRaw {
            match RasterCopyEngine::prepare_strip_fast_path(source) {
                FastPath::Ready(buffer) => strip_buffer = Some(buffer),
                FastPath::Fallback(reason) => {
                    warn!("{}: raw strip copy unavailable ({}), decoding instead", source.label(), reason);
                    strategy = Self::decoding_strategy(Region::full(source.width(), source.length()));
                }
            }
        }

        let region = region.unwrap_or_else(|| Region::full(source.width(), source.length()));
        let raw = matches!(strategy, CopyStrategy::TilesRaw | CopyStrategy::StripsRaw);
        if !raw && output_compression == compression::JPEG {
            check_jpeg_encodable(source)?;
        }

        let layout = match strategy {
            CopyStrategy::TilesRaw | CopyStrategy::StripsRaw => source.layout(),
            CopyStrategy::StripsToTiles => StorageLayout::Tiles {
                tile_width: limits::RETILE_WIDTH,
                tile_length: limits::RETILE_LENGTH,
            },
            CopyStrategy::StripsToStrips => StorageLayout::Strips {
                rows_per_strip: RasterCopyEngine::rows_per_strip(
                    region.width as usize * source.pixel_bytes(), region.height, output_compression),
            },
        };

        let output = OutputLayout {
            width: region.width,
            length: region.height,
            samples_per_pixel: source.samples_per_pixel(),
            bits_per_sample: source.bits_per_sample(),
            layout,
            compression: output_compression,
            photometric: if raw {
                source.photometric()
            } else {
                output_photometric(source.photometric(), source.samples_per_pixel(), output_compression)
            },
            jpeg_quality: resolve_jpeg_quality(self.jpeg_quality, source),
            byte_order: source.byte_order()?,
            big_tiff: source.is_big_tiff(),
        };

        info!("{}: {} -> {} using {:?}", source.label(), region, output_path.display(), strategy);
        let mut builder = TiffBuilder::create(output_path, output)?;
        for tag in source.descriptive_tags()? {
            builder.set_tag(tag);
        }
        if raw {
            for tag in [tags::JPEG_TABLES, tags::PREDICTOR, tags::YCBCR_SUBSAMPLING] {
                if let Some(value) = source.raw_tag(tag)? {
                    builder.set_tag(value);
                }
            }
        }

        match (strategy, strip_buffer) {
            (CopyStrategy::TilesRaw, _) => RasterCopyEngine::copy_tiles_raw(source, &mut builder)?,
            (CopyStrategy::StripsRaw, Some(buffer)) => RasterCopyEngine::copy_strips_raw(source, &mut builder, buffer)?,
            (CopyStrategy::StripsRaw, None) => {
                return Err(TiffError::GenericError("raw strip copy without a buffer".to_string()));
            }
            (CopyStrategy::StripsToTiles, _) => RasterCopyEngine::copy_strips_to_tiles(source, region, &mut builder)?,
            (CopyStrategy::StripsToStrips, _) => RasterCopyEngine::copy_strips_to_strips(source, region, &mut builder)?,
        }

        OutputRaster::Writing(builder).close()
    }
}

/// Photometric interpretation of a re-encoded output
pub fn output_photometric(source_photometric: u16, samples_per_pixel: u16, output_compression: u16) -> u16 {
    match (output_compression, samples_per_pixel) {
        (compression::JPEG, 3) => photometric::YCBCR,
        (compression::JPEG, _) => source_photometric,
        (_, spp) if spp >= 3 => photometric::RGB,
        _ => source_photometric,
    }
}

/// JPEG quality for outputs of `source`
///
/// An explicit request wins, then the estimate from a JPEG source's
/// quantisation tables, then the fixed default.
pub fn resolve_jpeg_quality(requested: Option<u8>, source: &mut SourceRaster) -> u8 {
    if let Some(quality) = requested {
        return quality.clamp(1, 100);
    }
    source.jpeg_quality().unwrap_or(limits::DEFAULT_JPEG_QUALITY)
}

/// Fails early when the encoder could not take the source's pixels
pub fn check_jpeg_encodable(source: &SourceRaster) -> TiffResult<()> {
    let spp = source.samples_per_pixel();
    if source.bits_per_sample() != 8 || !(spp == 1 || spp == 3) {
        return Err(TiffError::Unsupported(format!(
            "{}: JPEG output needs 8-bit samples with 1 or 3 samples per pixel, got {} x {}-bit",
            source.label(), spp, source.bits_per_sample())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photometric_rules() {
        assert_eq!(output_photometric(photometric::RGB, 3, compression::JPEG), photometric::YCBCR);
        assert_eq!(output_photometric(photometric::BLACK_IS_ZERO, 1, compression::JPEG), photometric::BLACK_IS_ZERO);
        assert_eq!(output_photometric(photometric::YCBCR, 3, compression::LZW), photometric::RGB);
        assert_eq!(output_photometric(photometric::BLACK_IS_ZERO, 1, compression::NONE), photometric::BLACK_IS_ZERO);
    }

    #[test]
    fn test_large_regions_are_retiled() {
        assert_eq!(CropOrchestrator::decoding_strategy(Region::new(0, 0, 65500, 10)), CopyStrategy::StripsToTiles);
        assert_eq!(CropOrchestrator::decoding_strategy(Region::new(0, 0, 10, 65500)), CopyStrategy::StripsToTiles);
        assert_eq!(CropOrchestrator::decoding_strategy(Region::new(0, 0, 65499, 65499)), CopyStrategy::StripsToStrips);
    }
}
