#![warn(missing_docs)]

//! Intersection data structure for the BOP kernel.
//!
//! [`IntersectionDs`] is the shared state between the intersection phase
//! and the building phase of a Boolean operation. It indexes every
//! sub-shape of every argument, stores one [`Interference`] per discovered
//! coincidence (deduplicated through [`PassKey`]), and cuts edges into
//! [`PaveBlock`]s at the vertices found on them.
//!
//! ```
//! use bop_kernel_ds::IntersectionDs;
//! use bop_kernel_math::Point3;
//! use bop_kernel_topo::make_box;
//!
//! let mut ds = IntersectionDs::new();
//! ds.init(&[make_box(Point3::origin(), 1.0, 1.0, 1.0)]).unwrap();
//! assert_eq!(ds.nb_shapes(), 34);
//! ```

mod ds;
mod error;
mod interference;
mod pass_key;
mod pave;
mod shape_info;
mod union_find;

pub use ds::{DsSummary, IntersectionDs, ShapeSummary};
pub use error::{DsError, Result};
pub use interference::{Coincidence, Interference, InterferenceKind, Param};
pub use pass_key::PassKey;
pub use pave::{CommonBlock, FaceInfo, Pave, PaveBlock};
pub use shape_info::{IndexRange, ShapeInfo};
pub use union_find::UnionFind;
