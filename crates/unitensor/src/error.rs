//! Error types for labeled tensor operations.

use unitensor_blocks::BlockError;

use crate::device::Device;
use crate::label::Label;

#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    #[error("duplicate label {label}")]
    DuplicateLabel { label: Label },

    #[error("expected {expected} labels, got {got}")]
    LabelCountMismatch { expected: usize, got: usize },

    #[error("no leg labeled {label}")]
    UnknownLabel { label: Label },

    #[error("leg position {position} out of bounds for rank {rank}")]
    LegOutOfBounds { position: usize, rank: usize },

    #[error("row rank {row_rank} exceeds tensor rank {rank}")]
    InvalidRowRank { row_rank: usize, rank: usize },

    #[error("locator has {got} indices but tensor has rank {expected}")]
    LocatorArity { expected: usize, got: usize },

    #[error("locator index {index} out of bounds for leg {leg} of dimension {dim}")]
    LocatorOutOfBounds { leg: usize, index: usize, dim: usize },

    #[error("element lies in a structurally zero sector")]
    ElementNotMaterialized,

    #[error("no backend registered for device {device}")]
    UnsupportedDevice { device: Device },

    #[error(transparent)]
    Block(#[from] BlockError),
}

pub type Result<T> = std::result::Result<T, TensorError>;
