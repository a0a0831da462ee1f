//! Paves, pave blocks and common blocks.

use serde::{Deserialize, Serialize};

/// A vertex bound to a parameter on an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pave {
    /// Curve parameter.
    pub parameter: f64,
    /// Vertex index.
    pub vertex: usize,
}

impl Pave {
    /// Create a pave.
    pub fn new(parameter: f64, vertex: usize) -> Self {
        Self { parameter, vertex }
    }
}

/// The part of an edge between two consecutive paves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaveBlock {
    /// Edge index.
    pub edge: usize,
    /// Pave at the lower parameter.
    pub pave1: Pave,
    /// Pave at the higher parameter.
    pub pave2: Pave,
    /// Common block this block belongs to.
    pub common_block: Option<usize>,
}

impl PaveBlock {
    /// Parameter halfway between the two paves.
    pub fn mid_parameter(&self) -> f64 {
        0.5 * (self.pave1.parameter + self.pave2.parameter)
    }

    /// Parameter range of the block.
    pub fn range(&self) -> (f64, f64) {
        (self.pave1.parameter, self.pave2.parameter)
    }

    /// Vertex pair with the smaller index first.
    pub fn vertex_pair(&self) -> (usize, usize) {
        let (a, b) = (self.pave1.vertex, self.pave2.vertex);
        (a.min(b), a.max(b))
    }

    /// True if the block spans its whole edge.
    pub fn is_whole_edge(&self, first: f64, last: f64) -> bool {
        self.pave1.parameter == first && self.pave2.parameter == last
    }
}

/// Geometrically coincident pave blocks of different edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonBlock {
    /// Member pave block ids, ascending.
    pub pave_blocks: Vec<usize>,
    /// Faces the shared segment lies on.
    pub faces: Vec<usize>,
}

/// Per-face results of the intersection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceInfo {
    /// Vertices lying strictly inside the face.
    pub vertices_in: Vec<usize>,
    /// Pave blocks of other edges lying in the face.
    pub blocks_in: Vec<usize>,
    /// Pave blocks of section edges produced on the face.
    pub blocks_sc: Vec<usize>,
}

pub(crate) fn push_unique(list: &mut Vec<usize>, value: usize) {
    if !list.contains(&value) {
        list.push(value);
    }
}
