//! Parsed directory chain of one file

use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use std::fmt;

/// Every directory of a TIFF or BigTIFF file, in chain order
#[derive(Debug)]
pub struct TIFF {
    pub ifds: Vec<IFD>,
    pub is_big_tiff: bool,
    pub byte_order: ByteOrder,
}

impl TIFF {
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
            byte_order,
        }
    }

    /// The full-resolution directory of a slide
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// Consumes the chain and keeps directory `index`
    ///
    /// `label` names the file in the error.
    pub fn into_directory(self, index: usize, label: &str) -> TiffResult<IFD> {
        let count = self.ifds.len();
        self.ifds.into_iter().nth(index).ok_or_else(|| {
            TiffError::GenericError(format!("{}: directory {} not found ({} available)", label, index, count))
        })
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}, {} directories",
               if self.is_big_tiff { "BigTIFF" } else { "TIFF" },
               self.byte_order.name(),
               self.ifds.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_names_the_file() {
        let mut tiff = TIFF::new(false, ByteOrder::LittleEndian);
        tiff.ifds.push(IFD::new(0, 8));
        assert_eq!(tiff.to_string(), "TIFF Little Endian (II), 1 directories");

        match tiff.into_directory(2, "slide.tif") {
            Err(TiffError::GenericError(msg)) => assert_eq!(msg, "slide.tif: directory 2 not found (1 available)"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
