pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod mosaic;
pub mod config;
pub mod commands;
pub mod api;

pub use crate::api::{DirectorySummary, SlideSplitter, SplitReport};

pub use config::{MosaicConfig, MosaicFormat, MosaicMode, Overlap, SplitConfig};
pub use compression::Compression;
pub use extractor::{CropOrchestrator, CropRectangle, OutputRaster, RasterCopyEngine, Region};
pub use mosaic::{GeometryPlanner, MosaicEmitter, MosaicOutcome, MosaicReport, PieceGeometry};
pub use tiff::{SourceRaster, TiffBuilder, TiffError, TiffResult};
