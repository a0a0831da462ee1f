#![warn(missing_docs)]

//! Boolean operation algorithms of the BOP kernel.
//!
//! A Boolean operation runs in two phases:
//! 1. **Pave filling**: [`PaveFiller`] intersects every pair of
//!    sub-shapes of different arguments and records the results in an
//!    [`IntersectionDs`](bop_kernel_ds::IntersectionDs).
//! 2. **Building**: [`Builder`] splits edges, faces and solids along the
//!    recorded intersections, classifies the split pieces and assembles the
//!    result of a [`BooleanOp`], with a [`History`] of every source shape.
//!
//! Splitting faces and solids goes through the [`AreaBuilder`] stages,
//! implemented by [`BuilderWire`], [`BuilderFace`] and [`BuilderSolid`].

mod builder;
mod error;
mod filler;
mod history;
mod options;

pub use builder::{
    AreaBuilder, BooleanOp, BuildOutput, Builder, BuilderFace, BuilderSolid, BuilderWire, Images,
};
pub use error::{BopError, BopWarning, Report, Result};
pub use filler::PaveFiller;
pub use history::{History, ShapeState};
pub use options::{BopOptions, ClassificationPolicy};
