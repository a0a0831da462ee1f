//! Entries of the sub-shape index table.

use bop_kernel_geom::Aabb3;
use bop_kernel_topo::{Shape, ShapeKind};
use serde::{Deserialize, Serialize};

/// Indices contributed by one argument: `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    /// First index.
    pub start: usize,
    /// One past the last index.
    pub end: usize,
}

impl IndexRange {
    /// True if `index` belongs to the range.
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True if the argument contributed no new index.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached data for one indexed sub-shape.
#[derive(Debug, Clone)]
pub struct ShapeInfo {
    /// The sub-shape (Forward orientation).
    pub shape: Shape,
    /// Its kind.
    pub kind: ShapeKind,
    /// Bounding box, empty until the filler sets it.
    pub bbox: Aabb3,
    /// Indices of the direct sub-shapes.
    pub sub_shapes: Vec<usize>,
    /// Tolerance of the sub-shape.
    pub tolerance: f64,
}
