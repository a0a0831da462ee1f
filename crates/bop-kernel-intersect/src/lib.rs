#![warn(missing_docs)]

//! Geometric primitive provider for the BOP kernel.
//!
//! The Boolean engine never touches curve or surface math directly. It asks
//! a [`GeometryProvider`] for bounding boxes, pairwise intersections and
//! point classification, and works purely with the parameters and points
//! that come back. [`LinearProvider`] implements the trait for straight
//! edges on planar faces, which covers polyhedral B-Reps.

mod error;
mod linear;
mod polygon;

pub use error::{IntersectError, Result};
pub use linear::LinearProvider;

use bop_kernel_geom::Aabb3;
use bop_kernel_math::{Point2, Point3};
use bop_kernel_topo::Shape;
use serde::{Deserialize, Serialize};

/// Position of a point relative to a face or solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Strictly inside.
    In,
    /// On the boundary, within tolerance.
    On,
    /// Strictly outside.
    Out,
    /// Could not be decided.
    Unknown,
}

/// One solution of an edge/edge intersection.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeEdgeHit {
    /// The edges cross or touch at a single point.
    Point {
        /// Parameter on the first edge.
        t1: f64,
        /// Parameter on the second edge.
        t2: f64,
        /// Intersection point.
        point: Point3,
        /// Achieved distance between the two curves at the solution.
        distance: f64,
    },
    /// The edges run together over a parameter range on each.
    Overlap {
        /// Range on the first edge, ascending.
        range1: (f64, f64),
        /// Range on the second edge, ascending.
        range2: (f64, f64),
    },
}

/// One solution of an edge/face intersection.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFaceHit {
    /// The edge pierces the face interior.
    Point {
        /// Parameter on the edge.
        t: f64,
        /// Surface parameters on the face.
        uv: Point2,
        /// Intersection point.
        point: Point3,
        /// Achieved distance between edge and surface.
        distance: f64,
    },
    /// A portion of the edge lies on the face.
    Overlap {
        /// Range on the edge, ascending.
        range: (f64, f64),
    },
}

/// A straight piece of a face/face intersection curve, clipped to both faces.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSegment {
    /// First point of the piece.
    pub start: Point3,
    /// Last point of the piece.
    pub end: Point3,
    /// Tolerance reached by the computation.
    pub tolerance: f64,
}

/// Result of a face/face intersection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceFaceHit {
    /// Section curve pieces common to both faces.
    pub sections: Vec<SectionSegment>,
    /// The two faces lie on the same surface.
    pub coplanar: bool,
}

impl FaceFaceHit {
    /// True if the faces neither cross nor coincide.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && !self.coplanar
    }
}

/// Curve/surface capability consumed by the Pave Filler and the Builder.
///
/// Every `tol` argument is the combined proximity gap of the operands
/// (their tolerances plus the fuzzy value). Implementations are shared
/// across worker threads and must not keep mutable state.
pub trait GeometryProvider: Send + Sync {
    /// Bounding box of a vertex, edge or face, enlarged by its tolerance.
    fn bounding_box(&self, shape: &Shape) -> Aabb3;

    /// Point on an edge at parameter `t`.
    fn evaluate(&self, edge: &Shape, t: f64) -> Result<Point3>;

    /// Parameter and distance of a vertex lying on an edge, if within `tol`.
    fn vertex_on_edge(&self, vertex: &Shape, edge: &Shape, tol: f64) -> Result<Option<(f64, f64)>>;

    /// Surface parameters and distance of a vertex lying strictly inside a face.
    fn vertex_in_face(&self, vertex: &Shape, face: &Shape, tol: f64)
        -> Result<Option<(Point2, f64)>>;

    /// Intersect two edges.
    fn intersect_edges(&self, e1: &Shape, e2: &Shape, tol: f64) -> Result<Vec<EdgeEdgeHit>>;

    /// Intersect an edge with a face.
    ///
    /// Crossings on the face boundary are not reported; they are found by
    /// the edge/edge and vertex/edge passes.
    fn intersect_edge_face(&self, edge: &Shape, face: &Shape, tol: f64)
        -> Result<Vec<EdgeFaceHit>>;

    /// Intersect two faces.
    fn intersect_faces(&self, f1: &Shape, f2: &Shape, tol: f64) -> Result<FaceFaceHit>;

    /// Classify a point against a face (boundary within `tol` is `On`).
    fn classify_point_in_face(&self, point: &Point3, face: &Shape, tol: f64) -> Result<State>;

    /// Classify a point against a solid (boundary within `tol` is `On`).
    fn classify_point_in_solid(&self, point: &Point3, solid: &Shape, tol: f64) -> Result<State>;

    /// The `index`-th interior sample point of a face, best candidates first.
    ///
    /// Returns `None` once the candidates are exhausted.
    fn sample_point_in_face(&self, face: &Shape, index: usize) -> Option<Point3>;
}
