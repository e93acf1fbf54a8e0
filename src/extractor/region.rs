//! Pixel rectangles: crop requests and resolved copy windows
//!
//! Coordinates are in pixels with (0,0) at the top-left corner of the raster.

use std::fmt;
use std::str::FromStr;

use crate::tiff::errors::{TiffError, TiffResult};

/// A resolved rectangle inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// X-coordinate of the top-left corner (pixels from left)
    pub x: u32,
    /// Y-coordinate of the top-left corner (pixels from top)
    pub y: u32,
    /// Width of the region in pixels
    pub width: u32,
    /// Height of the region in pixels
    pub height: u32,
}

impl Region {
    /// Create a new region
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region { x, y, width, height }
    }

    /// The whole of a `width` x `height` raster
    pub fn full(width: u32, height: u32) -> Self {
        Region { x: 0, y: 0, width, height }
    }

    /// Get the rightmost X coordinate (exclusive)
    pub fn end_x(&self) -> u32 {
        self.x + self.width
    }

    /// Get the bottommost Y coordinate (exclusive)
    pub fn end_y(&self) -> u32 {
        self.y + self.height
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A crop request as handed over by the caller
///
/// A height of zero is the "no crop" sentinel: the source is copied whole
/// and no clipping logic runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRectangle {
    pub xmin: u32,
    pub ymin: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRectangle {
    /// A crop of `width` x `height` pixels starting at (`xmin`, `ymin`)
    pub fn new(xmin: u32, ymin: u32, width: u32, height: u32) -> Self {
        CropRectangle { xmin, ymin, width, height }
    }

    /// The "no crop" sentinel
    pub fn no_crop() -> Self {
        CropRectangle { xmin: 0, ymin: 0, width: 0, height: 0 }
    }

    /// Whether this is the "no crop" sentinel
    pub fn is_no_crop(&self) -> bool {
        self.height == 0
    }

    /// Clamps the request to a `width` x `length` raster
    ///
    /// Returns `None` for the sentinel. A rectangle starting outside the
    /// raster, or of zero width, is an error.
    pub fn resolve(&self, width: u32, length: u32) -> TiffResult<Option<Region>> {
        if self.is_no_crop() {
            return Ok(None);
        }
        if self.xmin >= width || self.ymin >= length || self.width == 0 {
            return Err(TiffError::InvalidRegion(format!(
                "{} does not intersect a {}x{} raster", self, width, length)));
        }

        let clamped_width = self.width.min(width - self.xmin);
        let clamped_height = self.height.min(length - self.ymin);
        Ok(Some(Region::new(self.xmin, self.ymin, clamped_width, clamped_height)))
    }
}

impl fmt::Display for CropRectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_crop() {
            write!(f, "no crop")
        } else {
            write!(f, "{}x{}+{}+{}", self.width, self.height, self.xmin, self.ymin)
        }
    }
}

impl FromStr for CropRectangle {
    type Err = TiffError;

    /// Parses `x,y,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 4 {
            return Err(TiffError::InvalidRegion(format!(
                "expected x,y,width,height but got '{}'", s)));
        }

        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse::<u32>()
                .map_err(|_| TiffError::InvalidRegion(format!("'{}' is not a pixel count", part)))?;
        }
        Ok(CropRectangle::new(values[0], values[1], values[2], values[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_resolves_to_none() {
        assert_eq!(CropRectangle::no_crop().resolve(100, 50).unwrap(), None);
        assert_eq!(CropRectangle::new(5, 5, 10, 0).resolve(100, 50).unwrap(), None);
    }

    #[test]
    fn test_crop_is_clamped_to_raster() {
        let region = CropRectangle::new(90, 40, 50, 50).resolve(100, 50).unwrap().unwrap();
        assert_eq!(region, Region::new(90, 40, 10, 10));
    }

    #[test]
    fn test_crop_outside_raster_is_rejected() {
        assert!(CropRectangle::new(100, 0, 5, 5).resolve(100, 50).is_err());
    }

    #[test]
    fn test_parse() {
        let crop: CropRectangle = "1, 2,30,40".parse().unwrap();
        assert_eq!(crop, CropRectangle::new(1, 2, 30, 40));
        assert!("1,2,3".parse::<CropRectangle>().is_err());
    }
}
