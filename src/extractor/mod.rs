//! Pixel extraction from source rasters
//!
//! Readers that respect each codec's access pattern, the copy strategies
//! built on them, and the orchestrator that chooses a strategy per crop.

mod region;
mod buffer_copy;
mod extractor_strategy;
mod output_raster;
pub mod copy_engine;
pub mod strip_reader;
pub mod tile_reader;

// Public exports
pub use region::{CropRectangle, Region};
pub use buffer_copy::copy_rows;
pub use copy_engine::{FastPath, RasterCopyEngine};
pub use extractor_strategy::{CopyStrategy, CropOrchestrator, output_photometric, resolve_jpeg_quality, check_jpeg_encodable};
pub use output_raster::OutputRaster;
pub use strip_reader::{SequentialCursor, StripReader};
pub use tile_reader::TileReader;
