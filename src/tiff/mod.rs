//! TIFF file format module
//!
//! This module provides structures and functions for reading TIFF and
//! BigTIFF directories, opening one of them as a decodable raster and
//! writing new rasters in either flavour.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod raster;
pub mod block_stream;
pub mod builder;
mod builders;
pub mod constants;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use raster::{SourceRaster, StorageLayout};
pub use builder::{OutputLayout, RawTag, TiffBuilder};
