//! Handler for JPEG compressed blocks
//!
//! Decoding goes through the `image` crate. Abbreviated JPEG-in-TIFF blocks
//! are completed by splicing the directory's JPEGTables stream in front of
//! them. Encoded blocks are always self-contained.

use std::borrow::Cow;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat, ImageReader};
use log::{debug, trace};

use crate::tiff::constants::limits;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::{BlockShape, CompressionHandler};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;

/// IJG reference luminance quantisation table
const STD_LUMINANCE_QUANT: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// JPEG compression handler (compression code 7)
pub struct JpegHandler {
    /// Shared tables stream from the source directory, if any
    tables: Option<Vec<u8>>,
    /// Encoder quality, 1-100
    quality: u8,
}

impl JpegHandler {
    /// Create a handler encoding at the given quality
    pub fn new(quality: u8) -> Self {
        JpegHandler {
            tables: None,
            quality: quality.clamp(1, 100),
        }
    }

    /// Create a handler that completes abbreviated blocks with `tables`
    pub fn with_tables(tables: Option<Vec<u8>>, quality: u8) -> Self {
        JpegHandler {
            tables: tables.filter(|t| t.len() > 4 && t.starts_with(&SOI)),
            quality: quality.clamp(1, 100),
        }
    }

    /// Encoder quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Tables stream minus its EOI, followed by the block minus its SOI
    fn complete_stream<'d>(&self, data: &'d [u8]) -> Cow<'d, [u8]> {
        match &self.tables {
            Some(tables) if data.starts_with(&SOI) => {
                let head = if tables.ends_with(&EOI) { &tables[..tables.len() - 2] } else { &tables[..] };
                let mut stream = Vec::with_capacity(head.len() + data.len());
                stream.extend_from_slice(head);
                stream.extend_from_slice(&data[2..]);
                Cow::Owned(stream)
            }
            _ => Cow::Borrowed(data),
        }
    }

    fn decode_image(&self, data: &[u8]) -> TiffResult<image::DynamicImage> {
        let stream = self.complete_stream(data);
        let reader = ImageReader::with_format(Cursor::new(stream.as_ref()), ImageFormat::Jpeg);
        reader.decode()
            .map_err(|e| TiffError::CodecError(format!("JPEG decompression error: {}", e)))
    }
}

impl CompressionHandler for JpegHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let decoded = self.decode_image(data)?;
        Ok(match decoded.color().channel_count() {
            1 => decoded.into_luma8().into_raw(),
            _ => decoded.into_rgb8().into_raw(),
        })
    }

    fn compress(&self, _data: &[u8]) -> TiffResult<Vec<u8>> {
        Err(TiffError::Unsupported("JPEG encoding needs the block geometry".to_string()))
    }

    /// Decodes into exactly `shape`, cropping or zero-padding the decoded
    /// image when the encoder stored a different block size.
    fn decompress_block(&self, data: &[u8], shape: BlockShape) -> TiffResult<Vec<u8>> {
        let decoded = self.decode_image(data)?;
        let (width, length) = (decoded.width() as usize, decoded.height() as usize);
        let pixels = match shape.samples_per_pixel {
            1 => decoded.into_luma8().into_raw(),
            3 => decoded.into_rgb8().into_raw(),
            spp => return Err(TiffError::Unsupported(format!("JPEG data with {} samples per pixel", spp))),
        };

        let pixel_bytes = shape.samples_per_pixel as usize;
        if width == shape.width as usize && length == shape.length as usize {
            return Ok(pixels);
        }

        trace!("JPEG block decoded as {}x{}, expected {}x{}", width, length, shape.width, shape.length);
        let mut block = vec![0u8; shape.byte_len()];
        let copy_bytes = width.min(shape.width as usize) * pixel_bytes;
        for row in 0..length.min(shape.length as usize) {
            let src = row * width * pixel_bytes;
            let dst = row * shape.row_bytes();
            block[dst..dst + copy_bytes].copy_from_slice(&pixels[src..src + copy_bytes]);
        }
        Ok(block)
    }

    fn compress_block(&self, data: &[u8], shape: BlockShape) -> TiffResult<Vec<u8>> {
        if shape.bits_per_sample != 8 {
            return Err(TiffError::Unsupported(format!(
                "JPEG needs 8 bits per sample, got {}", shape.bits_per_sample)));
        }
        let color = match shape.samples_per_pixel {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            spp => return Err(TiffError::Unsupported(format!(
                "JPEG needs 1 or 3 samples per pixel, got {}", spp))),
        };
        if shape.width > limits::JPEG_MAX_DIMENSION || shape.length > limits::JPEG_MAX_DIMENSION {
            return Err(TiffError::Unsupported(format!(
                "{}x{} exceeds the JPEG edge limit of {}", shape.width, shape.length, limits::JPEG_MAX_DIMENSION)));
        }

        let mut encoded = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, self.quality);
            encoder.encode(&data[..shape.byte_len()], shape.width, shape.length, color)
                .map_err(|e| TiffError::CodecError(format!("JPEG compression error: {}", e)))?;
        }

        debug!("JPEG encoded {}x{} block into {} bytes", shape.width, shape.length, encoded.len());
        Ok(encoded)
    }

    fn name(&self) -> &'static str {
        "JPEG"
    }

    fn code(&self) -> u64 {
        7
    }
}

/// Estimates the IJG quality an encoder used, from its luminance table
///
/// `stream` may be a full JPEG stream or a tables-only stream. Returns
/// `None` when no 8-bit table 0 is found before the scan data.
pub fn estimate_quality(stream: &[u8]) -> Option<u8> {
    let table = find_luminance_table(stream)?;
    let sum: u64 = table.iter().map(|&v| v as u64).sum();
    let reference: u64 = STD_LUMINANCE_QUANT.iter().map(|&v| v as u64).sum();

    let scale = sum as f64 * 100.0 / reference as f64;
    let quality = if scale <= 100.0 {
        (200.0 - scale) / 2.0
    } else {
        5000.0 / scale
    };

    Some(quality.round().clamp(1.0, 100.0) as u8)
}

fn find_luminance_table(stream: &[u8]) -> Option<[u16; 64]> {
    let mut pos = 0usize;

    while pos + 4 <= stream.len() {
        if stream[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = stream[pos + 1];
        match marker {
            0xD8 | 0x01 | 0xFF | 0xD0..=0xD7 => {
                pos += if marker == 0xFF { 1 } else { 2 };
                continue;
            }
            SOS | 0xD9 => return None,
            _ => {}
        }

        let segment_len = u16::from_be_bytes([stream[pos + 2], stream[pos + 3]]) as usize;
        let body_end = (pos + 2 + segment_len).min(stream.len());
        if marker == DQT {
            let mut cursor = pos + 4;
            while cursor < body_end {
                let precision = stream[cursor] >> 4;
                let id = stream[cursor] & 0x0F;
                let entry_size = if precision == 0 { 1 } else { 2 };
                let end = cursor + 1 + 64 * entry_size;
                if end > body_end {
                    return None;
                }
                if id == 0 {
                    let mut table = [0u16; 64];
                    for (i, value) in table.iter_mut().enumerate() {
                        let at = cursor + 1 + i * entry_size;
                        *value = if entry_size == 1 {
                            stream[at] as u16
                        } else {
                            u16::from_be_bytes([stream[at], stream[at + 1]])
                        };
                    }
                    return Some(table);
                }
                cursor = end;
            }
        }
        pos = pos + 2 + segment_len;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, length: u32, samples: u16) -> Vec<u8> {
        let mut data = Vec::new();
        for y in 0..length {
            for x in 0..width {
                for s in 0..samples as u32 {
                    data.push(((x * 4 + y * 2 + s * 40) % 256) as u8);
                }
            }
        }
        data
    }

    #[test]
    fn test_encode_then_decode_keeps_geometry() {
        let shape = BlockShape { width: 48, length: 32, samples_per_pixel: 3, bits_per_sample: 8 };
        let handler = JpegHandler::new(90);
        let encoded = handler.compress_block(&gradient(48, 32, 3), shape).unwrap();
        assert!(encoded.starts_with(&SOI));

        let decoded = handler.decompress_block(&encoded, shape).unwrap();
        assert_eq!(decoded.len(), shape.byte_len());
    }

    #[test]
    fn test_decode_pads_to_requested_shape() {
        let stored = BlockShape { width: 16, length: 8, samples_per_pixel: 1, bits_per_sample: 8 };
        let handler = JpegHandler::new(95);
        let encoded = handler.compress_block(&vec![200u8; stored.byte_len()], stored).unwrap();

        let wanted = BlockShape { length: 16, ..stored };
        let decoded = handler.decompress_block(&encoded, wanted).unwrap();
        assert_eq!(decoded.len(), wanted.byte_len());
        assert!(decoded[..stored.byte_len()].iter().all(|&v| (v as i32 - 200).abs() <= 3));
        assert!(decoded[stored.byte_len()..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rejects_sixteen_bit_samples() {
        let shape = BlockShape { width: 8, length: 8, samples_per_pixel: 1, bits_per_sample: 16 };
        let result = JpegHandler::new(75).compress_block(&vec![0u8; 128], shape);
        assert!(matches!(result, Err(TiffError::Unsupported(_))));
    }

    #[test]
    fn test_quality_estimate_tracks_encoder_setting() {
        let shape = BlockShape { width: 32, length: 32, samples_per_pixel: 1, bits_per_sample: 8 };
        for quality in [50u8, 75, 90] {
            let encoded = JpegHandler::new(quality)
                .compress_block(&gradient(32, 32, 1), shape)
                .unwrap();
            let estimate = estimate_quality(&encoded).unwrap() as i32;
            assert!((estimate - quality as i32).abs() <= 3, "quality {} estimated as {}", quality, estimate);
        }
    }

    #[test]
    fn test_tables_are_spliced_before_abbreviated_block() {
        let handler = JpegHandler::with_tables(Some(vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xD9]), 75);
        let stream = handler.complete_stream(&[0xFF, 0xD8, 0xFF, 0xDA, 0xFF, 0xD9]);
        assert_eq!(stream.as_ref(), &[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xDA, 0xFF, 0xD9]);
    }
}
