//! Error types for block store operations.

use thiserror::Error;

/// Error type for block-sparse storage operations.
#[derive(Debug, Error)]
pub enum BlockError {
    /// No dense block is materialized for the requested sector.
    #[error("no block materialized for sector {sector:?}")]
    BlockNotFound { sector: Vec<usize> },

    /// A block's shape does not match the per-leg sector dimensions.
    #[error("block shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A sector tuple has the wrong arity or an index past the sector table.
    #[error("sector {sector:?} out of bounds for sector counts {counts:?}")]
    SectorOutOfBounds {
        sector: Vec<usize>,
        counts: Vec<usize>,
    },

    /// The two trace axes do not carry identical sector dimension tables.
    #[error("axes {a} and {b} have incompatible sector dimension tables for trace")]
    IncompatibleTraceAxes { a: usize, b: usize },

    /// Axis order is not a permutation of `0..rank`.
    #[error("invalid axis permutation {perm:?} for rank {rank}")]
    InvalidPermutation { perm: Vec<usize>, rank: usize },

    /// A per-leg sector table is empty or contains a zero dimension.
    #[error("leg {leg} has an empty or zero-dimension sector table")]
    InvalidSectorTable { leg: usize },

    /// Truncation target must keep at least one sector.
    #[error("cannot truncate leg {leg} to {new_dim} sectors")]
    InvalidTruncation { leg: usize, new_dim: usize },
}

/// Result type for block store operations.
pub type Result<T> = std::result::Result<T, BlockError>;
