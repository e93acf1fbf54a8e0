//! Custom error types for raster splitting

use std::fmt;
use std::io;

/// Errors raised while reading, copying or writing rasters
#[derive(Debug)]
pub enum TiffError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Image dimensions not found
    MissingDimensions,
    /// Samples are not stored interleaved
    UnsupportedPlanarConfig(u16),
    /// Bits per sample is not a whole number of bytes
    UnsupportedSampleDepth(u16),
    /// Operation not available for this raster or codec
    Unsupported(String),
    /// Block byte counts are absent and no fallback exists
    MissingByteCounts(&'static str),
    /// A forward-only codec was asked for a row other than the next one
    NoRandomAccess { requested: u32, next: u32 },
    /// A buffer of the given size could not be reserved
    AllocationFailed(usize),
    /// No piece size satisfies the memory ceiling or edge cap
    GeometryInfeasible(String),
    /// Crop rectangle does not intersect the raster
    InvalidRegion(String),
    /// Codec failure while encoding or decoding a block
    CodecError(String),
    /// Generic error with message
    GenericError(String),
}

impl TiffError {
    /// Whether the failure only concerns the current piece or raster
    ///
    /// Resource exhaustion, geometry and unsupported-input failures are
    /// reported and skipped; the caller can move on to the next raster.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TiffError::AllocationFailed(_)
                | TiffError::GeometryInfeasible(_)
                | TiffError::UnsupportedPlanarConfig(_)
                | TiffError::UnsupportedSampleDepth(_)
                | TiffError::UnsupportedCompression(_)
                | TiffError::Unsupported(_)
                | TiffError::MissingByteCounts(_)
                | TiffError::InvalidRegion(_)
        )
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiffError::IoError(e) => write!(f, "I/O error: {}", e),
            TiffError::InvalidHeader => write!(f, "Invalid TIFF header"),
            TiffError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            TiffError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            TiffError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            TiffError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            TiffError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            TiffError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            TiffError::MissingDimensions => write!(f, "Image dimensions not found"),
            TiffError::UnsupportedPlanarConfig(p) => {
                write!(f, "Unsupported planar configuration {} (only contiguous samples are handled)", p)
            }
            TiffError::UnsupportedSampleDepth(b) => {
                write!(f, "Unsupported sample depth: {} bits is not a multiple of 8", b)
            }
            TiffError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            TiffError::MissingByteCounts(what) => write!(f, "Missing byte counts for {}", what),
            TiffError::NoRandomAccess { requested, next } => write!(
                f,
                "Codec cannot seek: requested row {} but the next decodable row is {}",
                requested, next
            ),
            TiffError::AllocationFailed(size) => write!(f, "Unable to allocate {} bytes", size),
            TiffError::GeometryInfeasible(msg) => write!(f, "No feasible piece size: {}", msg),
            TiffError::InvalidRegion(msg) => write!(f, "Invalid region: {}", msg),
            TiffError::CodecError(msg) => write!(f, "Codec error: {}", msg),
            TiffError::GenericError(msg) => write!(f, "TIFF error: {}", msg),
        }
    }
}

impl std::error::Error for TiffError {}

impl From<io::Error> for TiffError {
    fn from(error: io::Error) -> Self {
        TiffError::IoError(error)
    }
}

/// Result type for TIFF operations
pub type TiffResult<T> = Result<T, TiffError>;

impl From<String> for TiffError {
    fn from(msg: String) -> Self {
        TiffError::GenericError(msg)
    }
}
