//! Errors, warnings and the report that collects them.

use bop_kernel_ds::DsError;
use bop_kernel_topo::ShapeKind;
use thiserror::Error;

/// Fatal failures of a Boolean operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BopError {
    /// No argument was given.
    #[error("no arguments")]
    EmptyArguments,

    /// An argument container has no content where content is required.
    #[error("argument {index} is an empty {kind:?}")]
    NullShape {
        /// Position of the argument.
        index: usize,
        /// Its kind.
        kind: ShapeKind,
    },

    /// The argument set cannot be processed.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Merging vertices would grow a tolerance beyond the configured limit.
    #[error("tolerance of merged vertex grows by {growth:.3e}, limit {limit:.3e}")]
    ToleranceConflict {
        /// Growth over the largest member tolerance.
        growth: f64,
        /// Configured limit.
        limit: f64,
    },

    /// Split edges of a face do not close into loops.
    #[error("split edges of face {face} do not form closed wires")]
    WireNotClosed {
        /// Index of the face in the intersection data structure.
        face: usize,
    },

    /// Split faces of a solid do not close into shells.
    #[error("split faces of solid {solid} do not form closed shells")]
    ShellNotClosed {
        /// Index of the solid in the intersection data structure.
        solid: usize,
    },

    /// Consistency violation in the intersection data structure.
    #[error(transparent)]
    Ds(#[from] DsError),
}

/// Result type for Boolean operations.
pub type Result<T> = std::result::Result<T, BopError>;

/// Non-fatal problems met during a Boolean operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BopWarning {
    /// The provider could not intersect a pair; the pair was skipped.
    IntersectionFailed {
        /// Index of the first sub-shape.
        first: usize,
        /// Index of the second sub-shape.
        second: usize,
        /// Provider message.
        reason: String,
    },
    /// A vertex merge grew a tolerance beyond the configured limit.
    ToleranceConflict {
        /// Index of the merged vertex.
        vertex: usize,
        /// Growth over the largest member tolerance.
        growth: f64,
    },
    /// Sample points of a piece disagreed; the state was picked by priority.
    AmbiguousClassification {
        /// Index of the argument classified against.
        argument: usize,
    },
    /// A hole loop or shell fits in no outer boundary and was dropped.
    UnclassifiedHole {
        /// Index of the face or solid being rebuilt.
        shape: usize,
    },
}

/// Diagnostics collected by the filler and the builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Non-fatal problems, in order of discovery.
    pub warnings: Vec<BopWarning>,
    /// Fatal problems; a non-empty list means the operation failed.
    pub errors: Vec<BopError>,
}

impl Report {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warn(&mut self, warning: BopWarning) {
        self.warnings.push(warning);
    }

    /// Record an error.
    pub fn fail(&mut self, error: BopError) {
        self.errors.push(error);
    }

    /// True if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True if any warning was recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Append everything from `other`.
    pub fn merge(&mut self, other: Report) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.errors.clear();
    }
}
