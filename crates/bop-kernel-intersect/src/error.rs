//! Error types for the geometry provider.

use thiserror::Error;

/// Reasons a pairwise intersection or classification produced no result.
///
/// Both variants are local failures: the caller logs them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntersectError {
    /// The provider cannot handle this curve or surface type.
    #[error("unsupported geometry: {0}")]
    Unsupported(&'static str),

    /// The configuration is numerically singular (degenerate curve, every
    /// probe ray grazing the boundary, ...).
    #[error("numerically singular configuration: {0}")]
    Singular(&'static str),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, IntersectError>;
