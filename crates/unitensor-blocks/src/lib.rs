//! Block-sparse dense storage for labeled symmetric tensors.
//!
//! The crate provides three layers:
//!
//! - [`dtype`]: the closed element-type enumeration [`Dtype`], the tagged
//!   scalar [`AnyElem`] with the documented lossy cast rule, and the
//!   [`Elem`] trait tying dtype tags to concrete Rust scalars.
//! - [`dense`]: [`DenseData`], a dtype-erased dense multi-dimensional
//!   buffer with row-major indexing, axis permutation, and element-wise
//!   kernels.
//! - [`store`]: [`BlockStore`], a sparse map from sector index tuples to
//!   dense blocks with lazy axis permutation.

pub mod dense;
pub mod dtype;
pub mod error;
pub mod store;

pub use dense::{invert_permutation, linear_to_multi, multi_to_linear, DenseData, ElemVec};
pub use dtype::{AnyElem, Dtype, Elem};
pub use error::{BlockError, Result};
pub use store::BlockStore;
