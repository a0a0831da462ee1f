//! Error types for the intersection data structure.

use thiserror::Error;

use crate::{InterferenceKind, PassKey};

/// Consistency violations in the intersection data structure.
///
/// Every variant is fatal for the Boolean operation in progress.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DsError {
    /// A key already recorded under another interference kind.
    #[error("interference {key:?} already recorded as {existing:?}, got {new:?}")]
    KindCollision {
        /// Colliding key.
        key: PassKey,
        /// Kind of the stored record.
        existing: InterferenceKind,
        /// Kind of the rejected record.
        new: InterferenceKind,
    },

    /// Two vertices claim one parameter, or one vertex claims two parameters.
    #[error("inconsistent pave on edge {edge}: vertex {vertex} at t={parameter} conflicts with vertex {existing}")]
    InconsistentPave {
        /// Edge index.
        edge: usize,
        /// Parameter of the rejected pave.
        parameter: f64,
        /// Vertex of the rejected pave.
        vertex: usize,
        /// Vertex of the pave already in place.
        existing: usize,
    },

    /// Index outside the shape table.
    #[error("unknown shape index {0}")]
    UnknownIndex(usize),

    /// Pave operation on a shape that is not an edge.
    #[error("shape {0} is not an edge")]
    NotAnEdge(usize),

    /// Mutation after the structure was closed.
    #[error("intersection data structure is closed")]
    Closed,
}

/// Result type for data structure operations.
pub type Result<T> = std::result::Result<T, DsError>;
