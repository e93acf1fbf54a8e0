use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::SplitConfig;
use crate::extractor::{CropOrchestrator, CropRectangle, OutputRaster};
use crate::mosaic::naming::{digit_count, piece_stem};
use crate::mosaic::{MosaicEmitter, MosaicOutcome};
use crate::tiff::errors::TiffResult;
use crate::tiff::raster::{SourceRaster, StorageLayout};
use crate::utils::tag_utils::get_compression_name;

/// What one split of one raster produced
#[derive(Debug)]
pub struct SplitReport {
    /// Directory the crop was taken from
    pub directory: usize,
    /// The cropped raster
    pub crop: PathBuf,
    /// Mosaic result, `None` when no mosaic was configured or planning failed
    pub mosaic: Option<MosaicOutcome>,
}

/// Layout summary of one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySummary {
    pub index: usize,
    pub width: u32,
    pub length: u32,
    pub layout: StorageLayout,
    pub compression: u16,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub big_tiff: bool,
}

impl std::fmt::Display for DirectorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = match self.layout {
            StorageLayout::Strips { rows_per_strip } => format!("strips of {} rows", rows_per_strip),
            StorageLayout::Tiles { tile_width, tile_length } => format!("tiles of {}x{}", tile_width, tile_length),
        };
        write!(f, "#{}: {}x{}, {}, {} ({}), {} x {}-bit{}",
               self.index, self.width, self.length, layout,
               get_compression_name(self.compression as u64), self.compression,
               self.samples_per_pixel, self.bits_per_sample,
               if self.big_tiff { ", BigTIFF" } else { "" })
    }
}

/// Main interface to the library
///
/// Crops rasters out of a container and, when a mosaic is configured,
/// splits every crop into pieces.
pub struct SlideSplitter {
    config: SplitConfig,
}

impl SlideSplitter {
    pub fn new(config: SplitConfig) -> Self {
        SlideSplitter { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Lists the directories of `input`
    pub fn analyze(&self, input: impl AsRef<Path>) -> TiffResult<Vec<DirectorySummary>> {
        let input = input.as_ref();
        let count = SourceRaster::open(input, 0)?.directory_count();

        let mut summaries = Vec::with_capacity(count);
        for index in 0..count {
            match SourceRaster::open(input, index) {
                Ok(raster) => summaries.push(DirectorySummary {
                    index,
                    width: raster.width(),
                    length: raster.length(),
                    layout: raster.layout(),
                    compression: raster.compression(),
                    samples_per_pixel: raster.samples_per_pixel(),
                    bits_per_sample: raster.bits_per_sample(),
                    big_tiff: raster.is_big_tiff(),
                }),
                Err(e) if e.is_recoverable() => warn!("{}: directory {} skipped: {}", input.display(), index, e),
                Err(e) => return Err(e),
            }
        }
        Ok(summaries)
    }

    /// Crops directory `directory` of `input` into `output`, then runs the mosaic
    ///
    /// A mosaic failure that only concerns this raster is logged and the
    /// crop is still reported.
    pub fn split_directory(
        &self,
        input: impl AsRef<Path>,
        directory: usize,
        crop: CropRectangle,
        output: impl AsRef<Path>,
    ) -> TiffResult<SplitReport> {
        let output = output.as_ref();
        let mut source = SourceRaster::open(input, directory)?;

        let orchestrator = CropOrchestrator::new(self.config.crop_compression, self.config.jpeg_quality);
        let closed = orchestrator.crop(&mut source, crop, output)?;
        let crop_path = closed.path().map(Path::to_path_buf).unwrap_or_else(|| output.to_path_buf());
        info!("{}: wrote crop {}", source.label(), crop_path.display());

        let mosaic = match &self.config.mosaic {
            None => None,
            Some(mosaic_config) => {
                let mut reopened = closed.reopen()?;
                let raster = reopened.raster_mut()?;
                match MosaicEmitter::new(mosaic_config).emit(raster, &piece_stem(&crop_path)) {
                    Ok(outcome) => Some(outcome),
                    Err(e) if e.is_recoverable() => {
                        error!("{}: mosaic skipped: {}", crop_path.display(), e);
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(SplitReport { directory, crop: crop_path, mosaic })
    }

    /// Splits every directory of `input`
    ///
    /// Outputs are named `{stem}_{index}.tif` after `output`. Rasters that
    /// fail with a recoverable error are skipped.
    pub fn split_all(
        &self,
        input: impl AsRef<Path>,
        crop: CropRectangle,
        output: impl AsRef<Path>,
    ) -> TiffResult<Vec<SplitReport>> {
        let input = input.as_ref();
        let count = SourceRaster::open(input, 0)?.directory_count();
        let stem = piece_stem(output.as_ref());

        let mut reports = Vec::new();
        for directory in 0..count {
            let path = numbered_path(&stem, directory, count);
            match self.split_directory(input, directory, crop, &path) {
                Ok(report) => reports.push(report),
                Err(e) if e.is_recoverable() => {
                    error!("{}: directory {} skipped: {}", input.display(), directory, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    /// Crops each of `regions` from one directory
    ///
    /// Used with the scanned-zone rectangles of a slide: outputs are named
    /// `{stem}_{n}.tif` with 1-based `n`.
    pub fn split_regions(
        &self,
        input: impl AsRef<Path>,
        directory: usize,
        regions: &[CropRectangle],
        output: impl AsRef<Path>,
    ) -> TiffResult<Vec<SplitReport>> {
        let input = input.as_ref();
        let stem = piece_stem(output.as_ref());

        let mut reports = Vec::new();
        for (index, region) in regions.iter().enumerate() {
            let path = numbered_path(&stem, index + 1, regions.len() + 1);
            match self.split_directory(input, directory, *region, &path) {
                Ok(report) => reports.push(report),
                Err(e) if e.is_recoverable() => error!("{}: region {} skipped: {}", input.display(), region, e),
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    /// Opens the crop written at `path` for reading
    pub fn reopen(path: impl AsRef<Path>) -> TiffResult<SourceRaster> {
        OutputRaster::Closed(path.as_ref().to_path_buf()).reopen()?.into_raster()
    }
}

/// `{stem}_{n}.tif`, zero-padded to the digits of `upper`
fn numbered_path(stem: &Path, n: usize, upper: usize) -> PathBuf {
    let width = digit_count(u32::try_from(upper.saturating_sub(1)).unwrap_or(u32::MAX));
    let mut name = stem.as_os_str().to_os_string();
    name.push(format!("_{:0width$}.tif", n, width = width));
    PathBuf::from(name)
}

impl From<SplitConfig> for SlideSplitter {
    fn from(config: SplitConfig) -> Self {
        SlideSplitter::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_paths_are_padded() {
        assert_eq!(numbered_path(Path::new("/tmp/out"), 3, 12), PathBuf::from("/tmp/out_03.tif"));
        assert_eq!(numbered_path(Path::new("out"), 0, 1), PathBuf::from("out_0.tif"));
    }
}
