#![warn(missing_docs)]

//! B-rep shape model for the BOP kernel.
//!
//! Shapes are immutable, reference-counted trees: a [`Shape`] is a handle
//! to shared topology plus an [`Orientation`]. Two handles to the same
//! underlying topology are "the same" shape regardless of orientation,
//! which is what lets faces share edges and edges share vertices.
//!
//! ```
//! use bop_kernel_math::Point3;
//! use bop_kernel_topo::{make_box, ShapeKind};
//!
//! let cube = make_box(Point3::origin(), 1.0, 1.0, 1.0);
//! assert_eq!(cube.sub_shapes(ShapeKind::Vertex).len(), 8);
//! assert_eq!(cube.sub_shapes(ShapeKind::Edge).len(), 12);
//! assert!((bop_kernel_topo::volume(&cube) - 1.0).abs() < 1e-12);
//! ```

mod explore;
mod primitives;
mod props;
mod shape;

pub use explore::map_ancestors;
pub use primitives::{make_box, make_polygon_face, make_polyhedron};
pub use props::{face_area, face_area_vector, signed_volume, volume};
pub use shape::{Shape, ShapeId};

use serde::{Deserialize, Serialize};

/// Kind of a topological shape, ordered from the most complex to the simplest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Arbitrary group of shapes.
    Compound,
    /// Volume bounded by shells.
    Solid,
    /// Connected set of faces.
    Shell,
    /// Bounded portion of a surface.
    Face,
    /// Connected sequence of edges.
    Wire,
    /// Bounded portion of a curve.
    Edge,
    /// Point with a tolerance.
    Vertex,
}

impl ShapeKind {
    /// Topological dimension of the kind, `None` for compounds.
    pub fn dimension(self) -> Option<u8> {
        match self {
            ShapeKind::Vertex => Some(0),
            ShapeKind::Edge | ShapeKind::Wire => Some(1),
            ShapeKind::Face | ShapeKind::Shell => Some(2),
            ShapeKind::Solid => Some(3),
            ShapeKind::Compound => None,
        }
    }

    /// Kinds that carry geometry and are tracked by history.
    pub fn is_history_kind(self) -> bool {
        matches!(
            self,
            ShapeKind::Vertex | ShapeKind::Edge | ShapeKind::Face | ShapeKind::Solid
        )
    }
}

/// Orientation of a shape relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Same sense as the underlying geometry.
    Forward,
    /// Opposite sense.
    Reversed,
    /// Embedded inside the parent, material on both sides.
    Internal,
    /// Touching the parent from outside, no material on either side.
    External,
}

impl Orientation {
    /// Swap Forward and Reversed; Internal and External are unchanged.
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
            other => other,
        }
    }

    /// Orientation of a child seen through a parent with orientation `self`.
    pub fn compose(self, child: Orientation) -> Self {
        match self {
            Orientation::Forward => child,
            Orientation::Reversed => child.reversed(),
            Orientation::Internal => Orientation::Internal,
            Orientation::External => Orientation::External,
        }
    }

    /// +1 for Forward, -1 for Reversed, 0 otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Orientation::Forward => 1.0,
            Orientation::Reversed => -1.0,
            _ => 0.0,
        }
    }
}
