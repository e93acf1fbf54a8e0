//! Byte-level access to containers: endianness and random-access sources

pub mod seekable;
pub mod byte_order;
