//! Labeled block-sparse tensors.
//!
//! A [`UniTensor`] couples a duplicate-free table of leg labels with a
//! sparse sector-to-block store ([`unitensor_blocks::BlockStore`]). Legs
//! can be addressed by position or by label through [`Leg`], permutation is
//! lazy until [`UniTensor::contiguous_`], and per-element access goes
//! through existence-aware handles ([`ElementRef`], [`ElementMut`]) that
//! distinguish structurally zero elements from stored zeros.
//!
//! ```
//! use unitensor::{Dtype, UniTensor};
//!
//! let mut t = UniTensor::dense(["i", "j"], &[2, 3], Dtype::Double).unwrap();
//! t.at_mut(&[1, 2]).unwrap().set_value(5.0).unwrap();
//! t.permute_(["j", "i"]).unwrap();
//! assert_eq!(t.at(&[2, 1]).unwrap().value().unwrap().to_f64(), 5.0);
//! ```

pub mod device;
pub mod element;
pub mod error;
pub mod label;
pub mod tensor;

pub use device::Device;
pub use element::{ElementMut, ElementRef};
pub use error::{Result, TensorError};
pub use label::{Label, LabelTable, Leg};
pub use tensor::UniTensor;

pub use unitensor_blocks::{AnyElem, BlockError, BlockStore, DenseData, Dtype, Elem};
