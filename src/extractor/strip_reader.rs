//! Scanline access to strip-organised rasters
//!
//! Strips decode forward only, so a raster keeps a cursor on the next row
//! its codec can produce. Reading any other row is refused unless the raster
//! is uncompressed; callers reposition with [`StripReader::seek_row`], which
//! drains the current pass to the end when the target lies behind the
//! cursor and then decodes (and discards) the rows up to the target.
//!
//! Compressed strips are decoded one scanline at a time through a
//! [`BlockStream`]. Only codecs without an incremental decoder (JPEG) hold a
//! whole decoded strip, and only within the raster's decode limit.

use log::{debug, trace};

use crate::tiff::block_stream::BlockStream;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{SourceRaster, StorageLayout};

/// The strip the cursor is inside
enum ActiveStrip {
    /// Incremental decoder positioned on the next row
    Streaming(BlockStream),
    /// Whole strip from a codec that cannot decode in pieces
    Decoded(usize, Vec<u8>),
}

impl ActiveStrip {
    fn index(&self) -> usize {
        match self {
            ActiveStrip::Streaming(stream) => stream.index(),
            ActiveStrip::Decoded(index, _) => *index,
        }
    }
}

/// Decode position of a forward-only codec
#[derive(Default)]
pub struct SequentialCursor {
    /// Next row the codec will deliver
    next_row: u32,
    strip: Option<ActiveStrip>,
}

impl std::fmt::Debug for SequentialCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialCursor")
            .field("next_row", &self.next_row)
            .field("strip", &self.strip.as_ref().map(ActiveStrip::index))
            .finish()
    }
}

impl SequentialCursor {
    /// Next row a sequential read may ask for
    pub fn next_row(&self) -> u32 {
        self.next_row
    }
}

/// Reads full scanlines from a strip-organised raster
pub struct StripReader<'r> {
    raster: &'r mut SourceRaster,
    rows_per_strip: u32,
}

impl<'r> StripReader<'r> {
    /// Create a strip reader over `raster`
    pub fn new(raster: &'r mut SourceRaster) -> TiffResult<Self> {
        let rows_per_strip = match raster.layout() {
            StorageLayout::Strips { rows_per_strip } => rows_per_strip,
            StorageLayout::Tiles { .. } => {
                return Err(TiffError::Unsupported(format!(
                    "{}: scanline access needs a strip-organised raster", raster.label())));
            }
        };
        Ok(StripReader { raster, rows_per_strip })
    }

    /// The raster being read
    pub fn raster(&self) -> &SourceRaster {
        &*self.raster
    }

    /// Next row the codec will deliver
    pub fn next_row(&self) -> u32 {
        self.raster.cursor.next_row
    }

    /// Decodes scanline `row` into `out`
    ///
    /// `out` must hold at least one full scanline. After the last row the
    /// cursor wraps to 0, which is how a drained pass restarts.
    pub fn read_scanline(&mut self, row: u32, out: &mut [u8]) -> TiffResult<()> {
        let length = self.raster.length();
        if row >= length {
            return Err(TiffError::InvalidRegion(format!(
                "{}: row {} outside a raster of {} rows", self.raster.label(), row, length)));
        }

        let next = self.raster.cursor.next_row;
        if row != next && !self.raster.supports_random_access() {
            return Err(TiffError::NoRandomAccess { requested: row, next });
        }

        let scanline = self.raster.scanline_bytes();
        if self.raster.supports_random_access() {
            self.raster.read_uncompressed_row(row, &mut out[..scanline])?;
        } else if let Err(e) = self.read_next_row(row, &mut out[..scanline]) {
            // The pass is broken; the next read restarts from row 0
            self.raster.cursor = SequentialCursor::default();
            return Err(e);
        }

        self.raster.cursor.next_row = if row + 1 == length {
            self.raster.cursor.strip = None;
            0
        } else {
            row + 1
        };
        Ok(())
    }

    /// Decodes `row`, which is the cursor's next row, of a compressed strip
    fn read_next_row(&mut self, row: u32, out: &mut [u8]) -> TiffResult<()> {
        let strip = (row / self.rows_per_strip) as usize;
        let mut active = match self.raster.cursor.strip.take() {
            Some(active) if active.index() == strip => active,
            _ => self.open_strip(strip)?,
        };

        match &mut active {
            ActiveStrip::Streaming(stream) => self.raster.read_stream_rows(stream, out)?,
            ActiveStrip::Decoded(_, data) => {
                let start = (row - strip as u32 * self.rows_per_strip) as usize * out.len();
                out.copy_from_slice(&data[start..start + out.len()]);
            }
        }
        self.raster.cursor.strip = Some(active);
        Ok(())
    }

    fn open_strip(&mut self, strip: usize) -> TiffResult<ActiveStrip> {
        if let Some(stream) = self.raster.start_block_stream(strip)? {
            trace!("{}: streaming strip {}", self.raster.label(), strip);
            return Ok(ActiveStrip::Streaming(stream));
        }

        let bytes = self.raster.block_shape(strip).byte_len();
        self.raster.check_decode_budget(bytes)?;
        trace!("{}: decoding strip {} whole ({} bytes)", self.raster.label(), strip, bytes);
        Ok(ActiveStrip::Decoded(strip, self.raster.decode_block(strip)?))
    }

    /// Positions the cursor so that the next read may start at `row`
    pub fn seek_row(&mut self, row: u32) -> TiffResult<()> {
        if self.raster.supports_random_access() {
            return Ok(());
        }

        let mut scratch = vec![0u8; self.raster.scanline_bytes()];
        if row < self.next_row() {
            debug!("{}: row {} is behind the cursor at {}, draining to restart",
                   self.raster.label(), row, self.next_row());
            self.drain(&mut scratch)?;
        }

        while self.next_row() < row {
            let next = self.next_row();
            self.read_scanline(next, &mut scratch)?;
        }
        Ok(())
    }

    /// Decodes and discards every remaining row of the current pass
    fn drain(&mut self, scratch: &mut [u8]) -> TiffResult<()> {
        if self.next_row() == 0 {
            return Ok(());
        }
        loop {
            let next = self.next_row();
            self.read_scanline(next, scratch)?;
            if self.next_row() == 0 {
                return Ok(());
            }
        }
    }
}
