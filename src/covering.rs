//! Cell coverings of query regions.

use s2::cellid::CellID;

use crate::geometry::{self, LatLngRect};
use crate::range::GeohashRange;

/// An over-approximate set of S2 cells covering a query region.
///
/// The covering may include area outside the region; the exact
/// geometric filter removes the resulting false positives after the
/// range scans.
#[derive(Debug, Clone)]
pub struct Covering {
    cells: Vec<CellID>,
}

impl Covering {
    /// Wrap an explicit cell set.
    pub fn new(cells: Vec<CellID>) -> Self {
        Self { cells }
    }

    /// Cover a lat/lng rectangle.
    pub fn of_rect(rect: &LatLngRect) -> Self {
        Self::new(geometry::covering_cells(rect))
    }

    /// Number of cells in the covering.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Decompose the covering into geohash ranges that each map to a
    /// single hash key of `hash_key_length` digits.
    ///
    /// Each cell contributes its native geohash span, split at hash
    /// key boundaries; per-cell sub-ranges are ascending, order across
    /// cells is unspecified.
    pub fn geohash_ranges(&self, hash_key_length: usize) -> Vec<GeohashRange> {
        let mut ranges = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            let outer = geometry::cell_geohash_range(*cell);
            ranges.extend(outer.try_split(hash_key_length));
        }
        ranges
    }
}
