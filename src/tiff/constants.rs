//! TIFF format constants
//!
//! Tag numbers, field types and code values used by the reader, the
//! writer and the copy engine, plus the fixed limits of the splitter.

/// TIFF header constants
pub mod header {
    /// Standard TIFF version number (42)
    pub const TIFF_VERSION: u16 = 42;
    /// BigTIFF version number (43)
    pub const BIG_TIFF_VERSION: u16 = 43;
    /// BigTIFF offset size (8 bytes)
    pub const BIGTIFF_OFFSET_SIZE: u16 = 8;
}

/// Field types from TIFF 6.0 and BigTIFF
pub mod field_types {
    pub const BYTE: u16 = 1;       // 8-bit unsigned integer
    pub const ASCII: u16 = 2;      // 8-bit byte containing ASCII character
    pub const SHORT: u16 = 3;      // 16-bit unsigned integer
    pub const LONG: u16 = 4;       // 32-bit unsigned integer
    pub const RATIONAL: u16 = 5;   // Two LONGs: numerator and denominator
    pub const SBYTE: u16 = 6;      // 8-bit signed integer
    pub const UNDEFINED: u16 = 7;  // 8-bit byte with unspecified format
    pub const SSHORT: u16 = 8;     // 16-bit signed integer
    pub const SLONG: u16 = 9;      // 32-bit signed integer
    pub const SRATIONAL: u16 = 10; // Two SLONGs: numerator and denominator
    pub const FLOAT: u16 = 11;     // Single precision IEEE floating point
    pub const DOUBLE: u16 = 12;    // Double precision IEEE floating point
    pub const LONG8: u16 = 16;     // BigTIFF 64-bit unsigned integer
    pub const SLONG8: u16 = 17;    // BigTIFF 64-bit signed integer
    pub const IFD8: u16 = 18;      // BigTIFF 64-bit IFD offset

    /// Size in bytes of one value of the given field type
    pub fn size_of(field_type: u16) -> usize {
        match field_type {
            BYTE | ASCII | SBYTE | UNDEFINED => 1,
            SHORT | SSHORT => 2,
            LONG | SLONG | FLOAT => 4,
            RATIONAL | SRATIONAL | DOUBLE | LONG8 | SLONG8 | IFD8 => 8,
            _ => 1,
        }
    }
}

/// Standard TIFF tags
pub mod tags {
    // Structure
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const STRIP_OFFSETS: u16 = 273;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const ROWS_PER_STRIP: u16 = 278;
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    pub const PLANAR_CONFIGURATION: u16 = 284;
    pub const PREDICTOR: u16 = 317;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const JPEG_TABLES: u16 = 347;
    pub const YCBCR_SUBSAMPLING: u16 = 530;

    // Descriptive
    pub const THRESHHOLDING: u16 = 263;
    pub const FILL_ORDER: u16 = 266;
    pub const DOCUMENT_NAME: u16 = 269;
    pub const IMAGE_DESCRIPTION: u16 = 270;
    pub const MAKE: u16 = 271;
    pub const MODEL: u16 = 272;
    pub const ORIENTATION: u16 = 274;
    pub const MIN_SAMPLE_VALUE: u16 = 280;
    pub const MAX_SAMPLE_VALUE: u16 = 281;
    pub const X_RESOLUTION: u16 = 282;
    pub const Y_RESOLUTION: u16 = 283;
    pub const PAGE_NAME: u16 = 285;
    pub const X_POSITION: u16 = 286;
    pub const Y_POSITION: u16 = 287;
    pub const RESOLUTION_UNIT: u16 = 296;
    pub const PAGE_NUMBER: u16 = 297;
    pub const SOFTWARE: u16 = 305;
    pub const DATE_TIME: u16 = 306;
    pub const ARTIST: u16 = 315;
    pub const HOST_COMPUTER: u16 = 316;
    pub const COLOR_MAP: u16 = 320;
    pub const EXTRA_SAMPLES: u16 = 338;
    pub const SAMPLE_FORMAT: u16 = 339;

    /// Attributes carried verbatim from a source raster to every output
    pub const DESCRIPTIVE: &[u16] = &[
        NEW_SUBFILE_TYPE,
        PHOTOMETRIC_INTERPRETATION,
        THRESHHOLDING,
        FILL_ORDER,
        DOCUMENT_NAME,
        IMAGE_DESCRIPTION,
        MAKE,
        MODEL,
        ORIENTATION,
        MIN_SAMPLE_VALUE,
        MAX_SAMPLE_VALUE,
        X_RESOLUTION,
        Y_RESOLUTION,
        PAGE_NAME,
        X_POSITION,
        Y_POSITION,
        RESOLUTION_UNIT,
        PAGE_NUMBER,
        SOFTWARE,
        DATE_TIME,
        ARTIST,
        HOST_COMPUTER,
        COLOR_MAP,
        EXTRA_SAMPLES,
        SAMPLE_FORMAT,
    ];
}

/// Compression types
pub mod compression {
    pub const NONE: u16 = 1;
    pub const LZW: u16 = 5;
    pub const JPEG: u16 = 7;
    pub const DEFLATE: u16 = 8;
    pub const ZSTD: u16 = 50000;
}

/// Photometric interpretation values
pub mod photometric {
    pub const BLACK_IS_ZERO: u16 = 1;
    pub const RGB: u16 = 2;
    pub const YCBCR: u16 = 6;
}

/// Planar configuration values
pub mod planar_config {
    pub const CHUNKY: u16 = 1;            // Components stored interleaved (RGBRGBRGB)
    pub const PLANAR: u16 = 2;            // Components stored separately (RRR...GGG...BBB)
}

/// Predictor values
pub mod predictor {
    pub const NONE: u16 = 1;
    pub const HORIZONTAL_DIFFERENCING: u16 = 2;
}

/// Fixed limits of the splitter
pub mod limits {
    /// Largest edge a single strip or a JPEG stream can carry
    pub const MAX_STRIP_DIMENSION: u32 = 65500;
    /// Largest edge of a standalone JPEG piece
    pub const JPEG_MAX_DIMENSION: u32 = 65500;
    /// Output tile width of the strip to tile copy
    pub const RETILE_WIDTH: u32 = 128;
    /// Output tile length of the strip to tile copy
    pub const RETILE_LENGTH: u32 = 256;
    /// Target size of one output strip when re-encoding
    pub const STRIP_TARGET_BYTES: usize = 8192;
    /// JPEG blocks are 16 rows tall with 2x2 chroma subsampling
    pub const JPEG_ROW_GRANULE: u32 = 16;
    /// JPEG quality used when neither the user nor the source gives one
    pub const DEFAULT_JPEG_QUALITY: u8 = 75;
    /// Default memory ceiling per mosaic piece
    pub const DEFAULT_MEMORY_LIMIT: u64 = 1024 * 1024 * 1024;
    /// Longest IFD chain followed before giving up
    pub const MAX_DIRECTORIES: usize = 10_000;
}
