//! Piece sizing for mosaic decomposition
//!
//! Pure arithmetic: nothing here touches a raster. The planner turns a
//! source size, a pixel depth and an overlap setting into piece sizes,
//! overlaps, piece counts and memory estimates, and searches for a piece
//! size that satisfies a predicate by halving edges.

use std::fmt;

use log::{debug, trace};

use crate::config::Overlap;
use crate::tiff::errors::{TiffError, TiffResult};

/// Derived layout of a mosaic grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceGeometry {
    /// Piece width before overlap
    pub piece_width: u32,
    /// Piece length before overlap
    pub piece_length: u32,
    pub horizontal_overlap: u32,
    pub vertical_overlap: u32,
    pub horizontal_pieces: u32,
    pub vertical_pieces: u32,
    /// Memory estimate used against the ceiling (3-sample pixels count as 4)
    pub estimated_memory: u64,
    /// Bytes needed for the largest piece including its overlaps
    pub allocation_size: u64,
}

impl PieceGeometry {
    /// Total number of pieces in the grid
    pub fn piece_count(&self) -> u32 {
        self.horizontal_pieces * self.vertical_pieces
    }

    /// Widest piece including overlaps
    pub fn max_width_with_overlap(&self) -> u32 {
        self.piece_width + self.horizontal_overlap * overlap_factor(self.horizontal_pieces)
    }

    /// Longest piece including overlaps
    pub fn max_length_with_overlap(&self) -> u32 {
        self.piece_length + self.vertical_overlap * overlap_factor(self.vertical_pieces)
    }
}

impl fmt::Display for PieceGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} pieces of {}x{} (overlap {}/{}), {} bytes each",
               self.horizontal_pieces, self.vertical_pieces, self.piece_width, self.piece_length,
               self.horizontal_overlap, self.vertical_overlap, self.estimated_memory)
    }
}

/// Edges that must not be halved because the caller fixed them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeLocks {
    pub width: bool,
    pub length: bool,
}

impl EdgeLocks {
    pub fn none() -> Self {
        EdgeLocks::default()
    }
}

/// Outcome of a successful [`shrink_until_fits`] search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shrunk {
    pub width: u32,
    pub length: u32,
    /// Number of halvings performed
    pub steps: u32,
}

/// Halves a piece size until `fits` accepts it
///
/// Each step halves the longer edge when it is even and unlocked, or else
/// the other edge under the same conditions. Every step strictly shrinks an
/// edge, so the search ends after at most `log2(width) + log2(length)`
/// steps. When neither edge can be halved, `exhausted` builds the error.
pub fn shrink_until_fits<F, X>(
    width: u32,
    length: u32,
    locks: EdgeLocks,
    mut fits: F,
    exhausted: X,
) -> TiffResult<Shrunk>
where
    F: FnMut(u32, u32) -> TiffResult<bool>,
    X: FnOnce(u32, u32) -> TiffError,
{
    let (mut width, mut length) = (width, length);
    let mut steps = 0;

    loop {
        if fits(width, length)? {
            return Ok(Shrunk { width, length, steps });
        }

        let width_halvable = !locks.width && width >= 2 && width % 2 == 0;
        let length_halvable = !locks.length && length >= 2 && length % 2 == 0;
        let prefer_length = length > width;

        match (prefer_length, width_halvable, length_halvable) {
            (true, _, true) | (false, false, true) => length /= 2,
            (false, true, _) | (true, true, false) => width /= 2,
            _ => return Err(exhausted(width, length)),
        }
        steps += 1;
        trace!("Halved piece to {}x{} (step {})", width, length, steps);
    }
}

/// Overlaps each piece can carry: none alone, one for a pair, two inside
fn overlap_factor(pieces: u32) -> u32 {
    if pieces >= 3 { 2 } else { pieces.saturating_sub(1) }
}

/// Computes piece geometries for one source raster
#[derive(Debug, Clone, Copy)]
pub struct GeometryPlanner {
    width: u32,
    length: u32,
    samples_per_pixel: u16,
    bits_per_sample: u16,
    overlap: Overlap,
}

impl GeometryPlanner {
    pub fn new(width: u32, length: u32, samples_per_pixel: u16, bits_per_sample: u16, overlap: Overlap) -> Self {
        GeometryPlanner { width, length, samples_per_pixel, bits_per_sample, overlap }
    }

    /// Geometry for pieces of `piece_width` x `piece_length`
    ///
    /// Piece sizes larger than the source are clamped to it.
    pub fn geometry(&self, piece_width: u32, piece_length: u32) -> PieceGeometry {
        let piece_width = piece_width.clamp(1, self.width.max(1));
        let piece_length = piece_length.clamp(1, self.length.max(1));

        let horizontal_overlap = self.overlap.resolve(piece_width);
        let vertical_overlap = self.overlap.resolve(piece_length);
        let horizontal_pieces = self.width.div_ceil(piece_width);
        let vertical_pieces = self.length.div_ceil(piece_length);

        let full_width = (piece_width + horizontal_overlap * overlap_factor(horizontal_pieces)) as u64;
        let full_length = (piece_length + vertical_overlap * overlap_factor(vertical_pieces)) as u64;
        let bytes_per_sample = (self.bits_per_sample / 8) as u64;
        let estimate_samples = if self.samples_per_pixel == 3 { 4 } else { self.samples_per_pixel as u64 };

        PieceGeometry {
            piece_width,
            piece_length,
            horizontal_overlap,
            vertical_overlap,
            horizontal_pieces,
            vertical_pieces,
            estimated_memory: full_width * full_length * bytes_per_sample * estimate_samples,
            allocation_size: full_width * full_length * bytes_per_sample * self.samples_per_pixel as u64,
        }
    }

    /// Plans pieces for a memory ceiling and optional edge cap
    ///
    /// # Arguments
    /// * `requested_width` / `requested_length` - Fixed piece edges, 0 for automatic
    /// * `memory_limit` - Ceiling for the estimated memory, 0 for unlimited
    /// * `edge_cap` - Largest allowed edge including overlap, if any
    ///
    /// The halving search only runs when at least one edge is automatic;
    /// requested edges are never changed. Fully requested pieces ignore the
    /// memory ceiling but must respect the edge cap.
    pub fn plan(
        &self,
        requested_width: u32,
        requested_length: u32,
        memory_limit: u64,
        edge_cap: Option<u32>,
    ) -> TiffResult<(PieceGeometry, u32)> {
        let start_width = if requested_width > 0 { requested_width } else { self.width };
        let start_length = if requested_length > 0 { requested_length } else { self.length };

        if requested_width > 0 && requested_length > 0 {
            let geometry = self.geometry(start_width, start_length);
            if !self.satisfies(&geometry, 0, edge_cap) {
                return Err(TiffError::GeometryInfeasible(format!(
                    "requested {}x{} pieces exceed the {} pixel edge limit",
                    start_width, start_length, edge_cap.unwrap_or(0))));
            }
            return Ok((geometry, 0));
        }

        let locks = EdgeLocks { width: requested_width > 0, length: requested_length > 0 };
        let shrunk = shrink_until_fits(
            start_width.min(self.width),
            start_length.min(self.length),
            locks,
            |w, l| Ok(self.satisfies(&self.geometry(w, l), memory_limit, edge_cap)),
            |w, l| TiffError::GeometryInfeasible(format!(
                "no piece size fits {} bytes for a {}x{} raster (stopped at {}x{})",
                memory_limit, self.width, self.length, w, l)),
        )?;

        let geometry = self.geometry(shrunk.width, shrunk.length);
        debug!("Planned {} after {} halvings", geometry, shrunk.steps);
        Ok((geometry, shrunk.steps))
    }

    /// Whether a geometry respects the ceiling and the edge cap
    pub fn satisfies(&self, geometry: &PieceGeometry, memory_limit: u64, edge_cap: Option<u32>) -> bool {
        let within_memory = memory_limit == 0 || geometry.estimated_memory <= memory_limit;
        let within_cap = edge_cap.map_or(true, |cap| {
            geometry.max_width_with_overlap() <= cap && geometry.max_length_with_overlap() <= cap
        });
        within_memory && within_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_rgb_ceiling_scenario() {
        let planner = GeometryPlanner::new(10000, 8000, 3, 8, Overlap::None);
        let (geometry, steps) = planner.plan(0, 0, MIB, None).unwrap();

        assert_eq!((geometry.piece_width, geometry.piece_length), (625, 250));
        assert_eq!((geometry.horizontal_pieces, geometry.vertical_pieces), (16, 32));
        assert_eq!(geometry.estimated_memory, 625 * 250 * 4);
        assert!(geometry.estimated_memory <= MIB);
        assert_eq!(geometry.allocation_size, 625 * 250 * 3);
        assert_eq!(steps, 9);

        assert_eq!(geometry.piece_width * geometry.horizontal_pieces, 10000);
        assert_eq!(geometry.piece_length * geometry.vertical_pieces, 8000);
    }

    #[test]
    fn test_halving_terminates_on_odd_edges() {
        let planner = GeometryPlanner::new(1001, 999, 1, 8, Overlap::None);
        let result = planner.plan(0, 0, 100, None);
        assert!(matches!(result, Err(TiffError::GeometryInfeasible(_))));
    }

    #[test]
    fn test_step_count_is_bounded() {
        for (width, length) in [(4096u32, 4096u32), (10000, 8000), (1 << 16, 3), (6, 1 << 12)] {
            let bound = width.ilog2() + length.ilog2();
            let planner = GeometryPlanner::new(width, length, 1, 8, Overlap::None);
            match planner.plan(0, 0, 1, None) {
                Ok((_, steps)) => assert!(steps <= bound),
                Err(TiffError::GeometryInfeasible(_)) => {}
                Err(e) => panic!("unexpected error {}", e),
            }
        }
    }

    #[test]
    fn test_locked_edge_is_kept() {
        let planner = GeometryPlanner::new(4096, 4096, 1, 8, Overlap::None);
        let (geometry, _) = planner.plan(4096, 0, 4096 * 64, None).unwrap();
        assert_eq!(geometry.piece_width, 4096);
        assert_eq!(geometry.piece_length, 64);
    }

    #[test]
    fn test_overlap_memory_factor() {
        let planner = GeometryPlanner::new(300, 100, 1, 8, Overlap::Pixels(10));
        assert_eq!(planner.geometry(100, 100).estimated_memory, 120 * 100);
        assert_eq!(planner.geometry(150, 100).estimated_memory, 160 * 100);
        assert_eq!(planner.geometry(300, 100).estimated_memory, 300 * 100);
    }

    #[test]
    fn test_overlap_never_exceeds_piece() {
        let planner = GeometryPlanner::new(1000, 1000, 1, 8, Overlap::Pixels(400));
        let geometry = planner.geometry(125, 250);
        assert!(geometry.horizontal_overlap <= geometry.piece_width);
        assert!(geometry.vertical_overlap <= geometry.piece_length);
    }

    #[test]
    fn test_edge_cap_forces_halving() {
        let planner = GeometryPlanner::new(140000, 1000, 3, 8, Overlap::None);
        let (geometry, _) = planner.plan(0, 0, 0, Some(65500)).unwrap();
        assert_eq!(geometry.piece_width, 35000);
        assert_eq!(geometry.horizontal_pieces, 4);
    }

    #[test]
    fn test_requested_pieces_respect_edge_cap() {
        let planner = GeometryPlanner::new(140000, 1000, 1, 8, Overlap::Pixels(10));
        assert!(matches!(
            planner.plan(70000, 500, 0, Some(65500)),
            Err(TiffError::GeometryInfeasible(_))
        ));
        // The overlap counts against the cap too
        assert!(planner.plan(65495, 500, 0, Some(65500)).is_err());

        let (geometry, steps) = planner.plan(70000, 500, 0, None).unwrap();
        assert_eq!((geometry.piece_width, steps), (70000, 0));
        assert!(planner.plan(65000, 500, 0, Some(65500)).is_ok());
    }

    #[test]
    fn test_shrink_reports_exhaustion() {
        let result = shrink_until_fits(
            8, 8, EdgeLocks::none(),
            |_, _| Ok(false),
            |w, l| TiffError::AllocationFailed((w * l) as usize),
        );
        assert!(matches!(result, Err(TiffError::AllocationFailed(1))));
    }
}
