//! Tile access for tile-organised rasters
//!
//! Every tile is an independent codec stream, so tiles can be read in any
//! order. The reader keeps the last decoded tile because window copies
//! often touch the same tile for consecutive output rows.

use log::trace;

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::{SourceRaster, StorageLayout};

/// Reads decoded tiles from a tile-organised raster
pub struct TileReader<'r> {
    raster: &'r mut SourceRaster,
    tile_width: u32,
    tile_length: u32,
    cached: Option<(usize, Vec<u8>)>,
}

impl<'r> TileReader<'r> {
    /// Create a tile reader over `raster`
    pub fn new(raster: &'r mut SourceRaster) -> TiffResult<Self> {
        let (tile_width, tile_length) = match raster.layout() {
            StorageLayout::Tiles { tile_width, tile_length } => (tile_width, tile_length),
            StorageLayout::Strips { .. } => {
                return Err(TiffError::Unsupported(format!(
                    "{}: tile access needs a tile-organised raster", raster.label())));
            }
        };
        Ok(TileReader { raster, tile_width, tile_length, cached: None })
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_length(&self) -> u32 {
        self.tile_length
    }

    /// Decoded bytes of the tile in column `col`, row `row` of the tile grid
    pub fn read_tile(&mut self, col: u32, row: u32) -> TiffResult<&[u8]> {
        if col >= self.raster.tiles_across() || row >= self.raster.tiles_down() {
            return Err(TiffError::InvalidRegion(format!(
                "{}: tile ({}, {}) outside a {}x{} grid",
                self.raster.label(), col, row, self.raster.tiles_across(), self.raster.tiles_down())));
        }

        let index = (row * self.raster.tiles_across() + col) as usize;
        let hit = matches!(&self.cached, Some((cached, _)) if *cached == index);
        if !hit {
            trace!("{}: decoding tile {} ({}, {})", self.raster.label(), index, col, row);
            let data = self.raster.decode_block(index)?;
            self.cached = Some((index, data));
        }

        match &self.cached {
            Some((_, data)) => Ok(data.as_slice()),
            None => Err(TiffError::GenericError("tile cache empty after decode".to_string())),
        }
    }
}
