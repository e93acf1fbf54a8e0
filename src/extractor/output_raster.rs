//! Lifecycle of a crop result
//!
//! A crop is written through a streaming builder, closed, and reopened as a
//! fresh [`SourceRaster`] before anything reads it back. Reading the file
//! while its builder is still open is refused: the directory only exists
//! once the builder has finished.

use std::path::{Path, PathBuf};

use log::debug;

use crate::tiff::builder::TiffBuilder;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::SourceRaster;

/// A crop output in one of its three states
pub enum OutputRaster {
    /// Pixel data is still being written
    Writing(TiffBuilder),
    /// The file is complete on disk
    Closed(PathBuf),
    /// The file has been opened again for reading
    Reopened(SourceRaster),
}

impl OutputRaster {
    /// Finishes the builder; closing a closed or reopened raster is a no-op
    pub fn close(self) -> TiffResult<Self> {
        match self {
            OutputRaster::Writing(builder) => Ok(OutputRaster::Closed(builder.finish()?)),
            other => Ok(other),
        }
    }

    /// Opens the closed file for reading
    pub fn reopen(self) -> TiffResult<Self> {
        match self {
            OutputRaster::Writing(builder) => Err(TiffError::GenericError(format!(
                "{}: cannot reopen a raster that is still being written", builder.path().display()))),
            OutputRaster::Closed(path) => {
                debug!("Reopening {} for reading", path.display());
                Ok(OutputRaster::Reopened(SourceRaster::open(&path, 0)?))
            }
            reopened => Ok(reopened),
        }
    }

    /// Path of the output file
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputRaster::Writing(builder) => Some(builder.path()),
            OutputRaster::Closed(path) => Some(path),
            OutputRaster::Reopened(raster) => raster.path(),
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            OutputRaster::Writing(_) => "writing",
            OutputRaster::Closed(_) => "closed",
            OutputRaster::Reopened(_) => "reopened",
        }
    }

    /// The reopened raster
    pub fn raster_mut(&mut self) -> TiffResult<&mut SourceRaster> {
        match self {
            OutputRaster::Reopened(raster) => Ok(raster),
            other => Err(TiffError::GenericError(format!(
                "output raster is {}, reopen it before reading", other.state_name()))),
        }
    }

    pub fn into_raster(self) -> TiffResult<SourceRaster> {
        match self {
            OutputRaster::Reopened(raster) => Ok(raster),
            other => Err(TiffError::GenericError(format!(
                "output raster is {}, reopen it before reading", other.state_name()))),
        }
    }
}
