//! Interference records: one per discovered geometric coincidence.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::PassKey;

/// Dimensions of the two participants of an interference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterferenceKind {
    /// Vertex / vertex.
    VertexVertex,
    /// Vertex / edge.
    VertexEdge,
    /// Edge / edge.
    EdgeEdge,
    /// Vertex / face.
    VertexFace,
    /// Edge / face.
    EdgeFace,
    /// Face / face.
    FaceFace,
}

impl InterferenceKind {
    /// All kinds, in the order the filler processes them.
    pub const ALL: [InterferenceKind; 6] = [
        InterferenceKind::VertexVertex,
        InterferenceKind::VertexEdge,
        InterferenceKind::EdgeEdge,
        InterferenceKind::VertexFace,
        InterferenceKind::EdgeFace,
        InterferenceKind::FaceFace,
    ];

    /// Short tag used in dumps.
    pub fn tag(self) -> &'static str {
        match self {
            InterferenceKind::VertexVertex => "VV",
            InterferenceKind::VertexEdge => "VE",
            InterferenceKind::EdgeEdge => "EE",
            InterferenceKind::VertexFace => "VF",
            InterferenceKind::EdgeFace => "EF",
            InterferenceKind::FaceFace => "FF",
        }
    }
}

/// Location of a coincidence on one participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// Curve parameter of a point.
    Point(f64),
    /// Curve parameter range of an overlap.
    Range(f64, f64),
    /// Surface parameters of a point.
    Uv(f64, f64),
}

/// Shape of the coincidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Coincidence {
    /// The participants meet at a point.
    Point,
    /// The participants share a curve portion.
    Overlap,
    /// Two faces lie on the same surface.
    Coplanar,
    /// Two faces cross along section edges (their shape indices).
    Sections(Vec<usize>),
}

/// One interference between two indexed sub-shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interference {
    /// Dimensions of the participants.
    pub kind: InterferenceKind,
    /// Deduplication key over the participants.
    pub key: PassKey,
    /// Participant indices, in discovery order.
    pub indices: (usize, usize),
    /// Per-participant locations, in the order of `indices`.
    pub params: SmallVec<[Param; 2]>,
    /// Shape of the coincidence.
    pub coincidence: Coincidence,
    /// Tolerance reached by the computation.
    pub tolerance: f64,
    /// Vertex representing the coincidence point, if any.
    pub vertex: Option<usize>,
    /// Set when a later merge made this record obsolete.
    pub superseded: bool,
}

impl Interference {
    /// A record between `i` and `j` with no locations and no vertex.
    pub fn new(
        kind: InterferenceKind,
        i: usize,
        j: usize,
        coincidence: Coincidence,
        tolerance: f64,
    ) -> Self {
        Self {
            kind,
            key: PassKey::from_pair(i, j),
            indices: (i, j),
            params: SmallVec::new(),
            coincidence,
            tolerance,
            vertex: None,
            superseded: false,
        }
    }

    /// Attach per-participant locations.
    pub fn with_params(mut self, p1: Param, p2: Param) -> Self {
        self.params = SmallVec::from_buf([p1, p2]);
        self
    }

    /// Attach a location for the first participant only.
    pub fn with_param(mut self, p: Param) -> Self {
        self.params = SmallVec::new();
        self.params.push(p);
        self
    }

    /// Attach the representing vertex.
    pub fn with_vertex(mut self, vertex: usize) -> Self {
        self.vertex = Some(vertex);
        self
    }

    /// Location on participant `index`, if recorded.
    pub fn param_of(&self, index: usize) -> Option<Param> {
        if self.indices.0 == index {
            self.params.first().copied()
        } else if self.indices.1 == index {
            self.params.get(1).copied()
        } else {
            None
        }
    }

    /// The participant that is not `index`.
    pub fn other(&self, index: usize) -> Option<usize> {
        if self.indices.0 == index {
            Some(self.indices.1)
        } else if self.indices.1 == index {
            Some(self.indices.0)
        } else {
            None
        }
    }

    /// Merge a re-discovery of the same coincidence into this record.
    pub(crate) fn merge(&mut self, other: &Interference) {
        self.tolerance = self.tolerance.max(other.tolerance);
        if self.vertex.is_none() {
            self.vertex = other.vertex;
        }
        if let (Coincidence::Sections(mine), Coincidence::Sections(theirs)) =
            (&mut self.coincidence, &other.coincidence)
        {
            for s in theirs {
                if !mine.contains(s) {
                    mine.push(*s);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_lookup_by_participant() {
        let rec = Interference::new(InterferenceKind::EdgeEdge, 4, 9, Coincidence::Point, 1e-7)
            .with_params(Param::Point(0.25), Param::Point(0.75));
        assert_eq!(rec.param_of(4), Some(Param::Point(0.25)));
        assert_eq!(rec.param_of(9), Some(Param::Point(0.75)));
        assert_eq!(rec.param_of(1), None);
        assert_eq!(rec.other(9), Some(4));
    }

    #[test]
    fn test_merge_keeps_existing_vertex() {
        let mut a = Interference::new(InterferenceKind::VertexEdge, 1, 2, Coincidence::Point, 1e-7)
            .with_vertex(1);
        let b = Interference::new(InterferenceKind::VertexEdge, 2, 1, Coincidence::Point, 1e-5)
            .with_vertex(7);
        a.merge(&b);
        assert_eq!(a.vertex, Some(1));
        assert_eq!(a.tolerance, 1e-5);
    }

    #[test]
    fn test_merge_unions_sections() {
        let mut a = Interference::new(
            InterferenceKind::FaceFace,
            1,
            2,
            Coincidence::Sections(vec![10]),
            1e-7,
        );
        let b = Interference::new(
            InterferenceKind::FaceFace,
            1,
            2,
            Coincidence::Sections(vec![10, 11]),
            1e-7,
        );
        a.merge(&b);
        assert_eq!(a.coincidence, Coincidence::Sections(vec![10, 11]));
    }
}
