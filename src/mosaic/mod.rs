//! Mosaic decomposition
//!
//! Splits a reopened crop into pieces that each fit a memory ceiling and
//! optional piece dimensions.

mod emitter;
mod geometry;
pub mod naming;
mod sink;

pub use emitter::{piece_window, BufferAllocator, MosaicEmitter, MosaicOutcome, MosaicReport, SystemAllocator};
pub use geometry::{shrink_until_fits, EdgeLocks, GeometryPlanner, PieceGeometry, Shrunk};
pub use sink::{ContainerSink, JpegStreamSink, OutputSink, PieceSink};
