//! Block codecs for strips and tiles
//!
//! Handlers share one trait. Byte-stream codecs work on any buffer, the
//! JPEG handler needs the block shape.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod lzw;
mod zstd;
pub mod jpeg;
mod selector;

pub use handler::{BlockDecoder, BlockShape, CompressionHandler, DecodeStep};
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use jpeg::JpegHandler;
pub use lzw::LzwHandler;
pub use zstd::ZstdHandler;
pub use selector::Compression;

