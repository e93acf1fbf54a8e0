//! Low-level pieces used by the TiffBuilder

pub mod writer;
