//! Dense sub-block storage.
//!
//! A [`DenseData`] is one dense sub-array of a block-sparse tensor: a shape
//! plus a typed, contiguous row-major buffer. The buffer is an [`ElemVec`]
//! (one `Vec` variant per dtype); axis permutation is delegated to mdarray
//! views over the raw buffer.

use mdarray::{Dense, DenseMapping, DynRank, Shape, View};
use num_complex::{Complex32, Complex64};

use crate::dtype::{AnyElem, Dtype, Elem};
use crate::error::BlockError;

/// Typed dense buffer, one variant per dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemVec {
    Bool(Vec<bool>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ComplexFloat(Vec<Complex32>),
    ComplexDouble(Vec<Complex64>),
}

/// Dispatch a read-only body over the typed buffer.
///
/// Each arm monomorphizes the body with `$v` bound to the `Vec<T>` of that
/// variant; the body typically goes through [`Elem`] methods.
macro_rules! dispatch {
    ($ev:expr, $v:ident => $body:expr) => {
        match $ev {
            ElemVec::Bool($v) => $body,
            ElemVec::Int16($v) => $body,
            ElemVec::Uint16($v) => $body,
            ElemVec::Int32($v) => $body,
            ElemVec::Uint32($v) => $body,
            ElemVec::Int64($v) => $body,
            ElemVec::Uint64($v) => $body,
            ElemVec::Float($v) => $body,
            ElemVec::Double($v) => $body,
            ElemVec::ComplexFloat($v) => $body,
            ElemVec::ComplexDouble($v) => $body,
        }
    };
}

/// Like `dispatch!` but rewraps the body's result in the same variant.
macro_rules! dispatch_rewrap {
    ($ev:expr, $v:ident => $body:expr) => {
        match $ev {
            ElemVec::Bool($v) => ElemVec::Bool($body),
            ElemVec::Int16($v) => ElemVec::Int16($body),
            ElemVec::Uint16($v) => ElemVec::Uint16($body),
            ElemVec::Int32($v) => ElemVec::Int32($body),
            ElemVec::Uint32($v) => ElemVec::Uint32($body),
            ElemVec::Int64($v) => ElemVec::Int64($body),
            ElemVec::Uint64($v) => ElemVec::Uint64($body),
            ElemVec::Float($v) => ElemVec::Float($body),
            ElemVec::Double($v) => ElemVec::Double($body),
            ElemVec::ComplexFloat($v) => ElemVec::ComplexFloat($body),
            ElemVec::ComplexDouble($v) => ElemVec::ComplexDouble($body),
        }
    };
}

/// Dispatch over two buffers that are known to share a dtype.
macro_rules! dispatch_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr) => {
        match ($a, $b) {
            (ElemVec::Bool($x), ElemVec::Bool($y)) => $body,
            (ElemVec::Int16($x), ElemVec::Int16($y)) => $body,
            (ElemVec::Uint16($x), ElemVec::Uint16($y)) => $body,
            (ElemVec::Int32($x), ElemVec::Int32($y)) => $body,
            (ElemVec::Uint32($x), ElemVec::Uint32($y)) => $body,
            (ElemVec::Int64($x), ElemVec::Int64($y)) => $body,
            (ElemVec::Uint64($x), ElemVec::Uint64($y)) => $body,
            (ElemVec::Float($x), ElemVec::Float($y)) => $body,
            (ElemVec::Double($x), ElemVec::Double($y)) => $body,
            (ElemVec::ComplexFloat($x), ElemVec::ComplexFloat($y)) => $body,
            (ElemVec::ComplexDouble($x), ElemVec::ComplexDouble($y)) => $body,
            _ => unreachable!("dtype mismatch between buffers"),
        }
    };
}

impl ElemVec {
    fn dtype(&self) -> Dtype {
        match self {
            ElemVec::Bool(_) => Dtype::Bool,
            ElemVec::Int16(_) => Dtype::Int16,
            ElemVec::Uint16(_) => Dtype::Uint16,
            ElemVec::Int32(_) => Dtype::Int32,
            ElemVec::Uint32(_) => Dtype::Uint32,
            ElemVec::Int64(_) => Dtype::Int64,
            ElemVec::Uint64(_) => Dtype::Uint64,
            ElemVec::Float(_) => Dtype::Float,
            ElemVec::Double(_) => Dtype::Double,
            ElemVec::ComplexFloat(_) => Dtype::ComplexFloat,
            ElemVec::ComplexDouble(_) => Dtype::ComplexDouble,
        }
    }

    fn zeros(dtype: Dtype, len: usize) -> ElemVec {
        match dtype {
            Dtype::Bool => ElemVec::Bool(vec![false; len]),
            Dtype::Int16 => ElemVec::Int16(vec![0; len]),
            Dtype::Uint16 => ElemVec::Uint16(vec![0; len]),
            Dtype::Int32 => ElemVec::Int32(vec![0; len]),
            Dtype::Uint32 => ElemVec::Uint32(vec![0; len]),
            Dtype::Int64 => ElemVec::Int64(vec![0; len]),
            Dtype::Uint64 => ElemVec::Uint64(vec![0; len]),
            Dtype::Float => ElemVec::Float(vec![0.0; len]),
            Dtype::Double => ElemVec::Double(vec![0.0; len]),
            Dtype::ComplexFloat => ElemVec::ComplexFloat(vec![Complex32::default(); len]),
            Dtype::ComplexDouble => ElemVec::ComplexDouble(vec![Complex64::default(); len]),
        }
    }

    fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }
}

/// Convert a multi-dimensional index to a linear index (row-major).
pub fn multi_to_linear(idx: &[usize], shape: &[usize]) -> usize {
    let mut linear = 0;
    let mut stride = 1;
    for i in (0..idx.len()).rev() {
        linear += idx[i] * stride;
        stride *= shape[i];
    }
    linear
}

/// Convert a linear index to a multi-dimensional index (row-major).
pub fn linear_to_multi(mut linear: usize, shape: &[usize]) -> Vec<usize> {
    let mut idx = vec![0; shape.len()];
    for i in (0..shape.len()).rev() {
        idx[i] = linear % shape[i];
        linear /= shape[i];
    }
    idx
}

/// Invert a permutation: `inv[perm[i]] == i`.
pub fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

/// Permute a row-major buffer through an mdarray view.
///
/// `perm[i]` names the source axis placed at destination axis `i`.
fn permute_vec<T: Clone>(data: &[T], dims: &[usize], perm: &[usize]) -> Vec<T> {
    assert_eq!(
        perm.len(),
        dims.len(),
        "permutation length must match dimensions length"
    );
    if dims.len() < 2 {
        return data.to_vec();
    }
    let shape = DynRank::from_dims(dims);
    let mapping = DenseMapping::new(shape);
    let view: View<'_, T, DynRank, Dense> = unsafe { View::new_unchecked(data.as_ptr(), mapping) };
    view.into_permuted(perm).to_tensor().into_vec()
}

/// One dense sub-block: a shape plus a typed row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseData {
    dims: Vec<usize>,
    data: ElemVec,
}

impl DenseData {
    /// Create a zero-filled block of the given dtype and shape.
    pub fn zeros(dtype: Dtype, dims: &[usize]) -> Self {
        let len = dims.iter().product();
        Self {
            dims: dims.to_vec(),
            data: ElemVec::zeros(dtype, len),
        }
    }

    /// Create a block from an owned typed vector.
    ///
    /// Fails with `ShapeMismatch` if the data length does not match the
    /// shape product.
    pub fn from_vec<T: Elem>(dims: &[usize], data: Vec<T>) -> Result<Self, BlockError> {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(BlockError::ShapeMismatch {
                expected: dims.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            dims: dims.to_vec(),
            data: T::wrap_vec(data),
        })
    }

    /// Convenience constructor for `Double` blocks.
    pub fn from_f64(dims: &[usize], data: Vec<f64>) -> Result<Self, BlockError> {
        Self::from_vec(dims, data)
    }

    /// Convenience constructor for `ComplexDouble` blocks.
    pub fn from_c64(dims: &[usize], data: Vec<Complex64>) -> Result<Self, BlockError> {
        Self::from_vec(dims, data)
    }

    /// The dtype of the stored elements.
    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// The shape of this block.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The rank (number of axes).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the block holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an element by linear offset.
    pub fn get_linear(&self, i: usize) -> AnyElem {
        dispatch!(&self.data, v => v[i].to_any())
    }

    /// Write an element by linear offset, casting to the block dtype.
    pub fn set_linear(&mut self, i: usize, value: AnyElem) {
        dispatch!(&mut self.data, v => v[i] = Elem::from_any(value))
    }

    /// Read an element by multi-dimensional index.
    pub fn get(&self, idx: &[usize]) -> AnyElem {
        self.get_linear(multi_to_linear(idx, &self.dims))
    }

    /// Write an element by multi-dimensional index, casting to the block dtype.
    pub fn set(&mut self, idx: &[usize], value: AnyElem) {
        self.set_linear(multi_to_linear(idx, &self.dims), value)
    }

    /// Permute axes, returning a new owned block.
    ///
    /// `perm[i]` names the source axis placed at destination axis `i`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        let dims: Vec<usize> = perm.iter().map(|&p| self.dims[p]).collect();
        let data = dispatch_rewrap!(&self.data, v => permute_vec(v, &self.dims, perm));
        Self { dims, data }
    }

    /// Cast every element to the target dtype under the documented rule.
    ///
    /// Same-dtype casts return a plain clone.
    pub fn cast(&self, dtype: Dtype) -> Self {
        if dtype == self.dtype() {
            return self.clone();
        }
        fn cast_all<T: Elem>(src: &DenseData) -> Vec<T> {
            (0..src.len()).map(|i| T::from_any(src.get_linear(i))).collect()
        }
        let data = match dtype {
            Dtype::Bool => ElemVec::Bool(cast_all(self)),
            Dtype::Int16 => ElemVec::Int16(cast_all(self)),
            Dtype::Uint16 => ElemVec::Uint16(cast_all(self)),
            Dtype::Int32 => ElemVec::Int32(cast_all(self)),
            Dtype::Uint32 => ElemVec::Uint32(cast_all(self)),
            Dtype::Int64 => ElemVec::Int64(cast_all(self)),
            Dtype::Uint64 => ElemVec::Uint64(cast_all(self)),
            Dtype::Float => ElemVec::Float(cast_all(self)),
            Dtype::Double => ElemVec::Double(cast_all(self)),
            Dtype::ComplexFloat => ElemVec::ComplexFloat(cast_all(self)),
            Dtype::ComplexDouble => ElemVec::ComplexDouble(cast_all(self)),
        };
        Self {
            dims: self.dims.clone(),
            data,
        }
    }

    /// Conjugate every element in place (identity for real dtypes).
    pub fn conj_in_place(&mut self) {
        dispatch!(&mut self.data, v => {
            for x in v.iter_mut() {
                *x = Elem::conj(*x);
            }
        })
    }

    /// Raise every element to the power `p` in place.
    pub fn powf_in_place(&mut self, p: f64) {
        dispatch!(&mut self.data, v => {
            for x in v.iter_mut() {
                *x = Elem::powf(*x, p);
            }
        })
    }

    /// Scale every element by a real factor in place.
    pub fn scale_in_place(&mut self, s: f64) {
        dispatch!(&mut self.data, v => {
            for x in v.iter_mut() {
                *x = Elem::scale(*x, s);
            }
        })
    }

    /// Sum of squared moduli over all elements.
    pub fn norm_sq(&self) -> f64 {
        dispatch!(&self.data, v => v.iter().map(|x| Elem::abs_sq(*x)).sum())
    }

    /// Element-wise accumulate. Caller guarantees matching dtype and shape.
    pub fn add_assign(&mut self, other: &DenseData) {
        debug_assert_eq!(self.dims, other.dims);
        dispatch_pair!(&mut self.data, &other.data, a, b => {
            for (x, y) in a.iter_mut().zip(b.iter()) {
                *x = Elem::add(*x, *y);
            }
        })
    }

    /// Sum the diagonal over axis pair `(a, b)`, reducing the rank by two.
    ///
    /// Requires `dims[a] == dims[b]`; a rank-2 block traces down to a
    /// rank-0 (single-element) block.
    pub fn trace_pair(&self, a: usize, b: usize) -> Self {
        debug_assert_ne!(a, b);
        debug_assert_eq!(self.dims[a], self.dims[b]);
        let new_dims: Vec<usize> = self
            .dims
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != a && *i != b)
            .map(|(_, &d)| d)
            .collect();
        let new_len: usize = new_dims.iter().product();
        let d = self.dims[a];
        let mut out = DenseData::zeros(self.dtype(), &new_dims);
        for lin in 0..new_len {
            let partial = linear_to_multi(lin, &new_dims);
            let mut full = vec![0; self.dims.len()];
            let mut src = partial.iter();
            for (axis, slot) in full.iter_mut().enumerate() {
                if axis != a && axis != b {
                    *slot = *src.next().unwrap();
                }
            }
            let mut acc = out.get_linear(lin);
            for k in 0..d {
                full[a] = k;
                full[b] = k;
                let term = self.get(&full);
                acc = add_any(acc, term);
            }
            out.set_linear(lin, acc);
        }
        out
    }
}

/// Add two dynamic scalars of the same dtype.
fn add_any(a: AnyElem, b: AnyElem) -> AnyElem {
    debug_assert_eq!(a.dtype(), b.dtype());
    match (a, b) {
        (AnyElem::Bool(x), AnyElem::Bool(y)) => AnyElem::Bool(Elem::add(x, y)),
        (AnyElem::Int16(x), AnyElem::Int16(y)) => AnyElem::Int16(Elem::add(x, y)),
        (AnyElem::Uint16(x), AnyElem::Uint16(y)) => AnyElem::Uint16(Elem::add(x, y)),
        (AnyElem::Int32(x), AnyElem::Int32(y)) => AnyElem::Int32(Elem::add(x, y)),
        (AnyElem::Uint32(x), AnyElem::Uint32(y)) => AnyElem::Uint32(Elem::add(x, y)),
        (AnyElem::Int64(x), AnyElem::Int64(y)) => AnyElem::Int64(Elem::add(x, y)),
        (AnyElem::Uint64(x), AnyElem::Uint64(y)) => AnyElem::Uint64(Elem::add(x, y)),
        (AnyElem::Float(x), AnyElem::Float(y)) => AnyElem::Float(Elem::add(x, y)),
        (AnyElem::Double(x), AnyElem::Double(y)) => AnyElem::Double(Elem::add(x, y)),
        (AnyElem::ComplexFloat(x), AnyElem::ComplexFloat(y)) => AnyElem::ComplexFloat(Elem::add(x, y)),
        (AnyElem::ComplexDouble(x), AnyElem::ComplexDouble(y)) => {
            AnyElem::ComplexDouble(Elem::add(x, y))
        }
        _ => unreachable!("dtype mismatch in scalar addition"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_multi_to_linear() {
        // 2x3 array: [[0,1,2], [3,4,5]]
        let shape = vec![2, 3];
        assert_eq!(multi_to_linear(&[0, 0], &shape), 0);
        assert_eq!(multi_to_linear(&[0, 2], &shape), 2);
        assert_eq!(multi_to_linear(&[1, 0], &shape), 3);
        assert_eq!(multi_to_linear(&[1, 2], &shape), 5);
    }

    #[test]
    fn test_linear_to_multi() {
        let shape = vec![2, 3];
        assert_eq!(linear_to_multi(0, &shape), vec![0, 0]);
        assert_eq!(linear_to_multi(2, &shape), vec![0, 2]);
        assert_eq!(linear_to_multi(5, &shape), vec![1, 2]);
    }

    #[test]
    fn test_invert_permutation() {
        assert_eq!(invert_permutation(&[2, 0, 1]), vec![1, 2, 0]);
        assert_eq!(invert_permutation(&[0, 1]), vec![0, 1]);
    }

    #[test]
    fn test_zeros_and_element_round_trip() {
        let mut block = DenseData::zeros(Dtype::Double, &[2, 3]);
        assert_eq!(block.len(), 6);
        assert_eq!(block.get(&[1, 2]), AnyElem::Double(0.0));
        block.set(&[1, 2], AnyElem::Double(4.5));
        assert_eq!(block.get(&[1, 2]), AnyElem::Double(4.5));
        // Writes cast to the block dtype
        block.set(&[0, 0], AnyElem::Int32(3));
        assert_eq!(block.get(&[0, 0]), AnyElem::Double(3.0));
    }

    #[test]
    fn test_permute_2d() {
        // [[1, 2, 3], [4, 5, 6]] -> transpose -> [[1, 4], [2, 5], [3, 6]]
        let block = DenseData::from_f64(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = block.permute(&[1, 0]);
        assert_eq!(t.dims(), &[3, 2]);
        assert_eq!(t.get(&[0, 1]), AnyElem::Double(4.0));
        assert_eq!(t.get(&[2, 0]), AnyElem::Double(3.0));
    }

    #[test]
    fn test_permute_3d() {
        let data: Vec<f64> = (0..24).map(|x| x as f64).collect();
        let block = DenseData::from_f64(&[2, 3, 4], data).unwrap();
        let p = block.permute(&[2, 0, 1]);
        assert_eq!(p.dims(), &[4, 2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(p.get(&[k, i, j]), block.get(&[i, j, k]));
                }
            }
        }
    }

    #[test]
    fn test_cast_block() {
        let block = DenseData::from_f64(&[2], vec![1.7, -2.4]).unwrap();
        let ints = block.cast(Dtype::Int32);
        assert_eq!(ints.dtype(), Dtype::Int32);
        assert_eq!(ints.get(&[0]), AnyElem::Int32(1));
        assert_eq!(ints.get(&[1]), AnyElem::Int32(-2));
        let complex = block.cast(Dtype::ComplexDouble);
        assert_eq!(
            complex.get(&[0]),
            AnyElem::ComplexDouble(Complex64::new(1.7, 0.0))
        );
    }

    #[test]
    fn test_trace_pair_matrix() {
        // trace of [[1, 2], [3, 4]] = 5
        let block = DenseData::from_f64(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let t = block.trace_pair(0, 1);
        assert_eq!(t.rank(), 0);
        assert_eq!(t.get_linear(0), AnyElem::Double(5.0));
    }

    #[test]
    fn test_trace_pair_3d() {
        // T[i, j, k], trace over (0, 2): out[j] = sum_i T[i, j, i]
        let data: Vec<f64> = (0..12).map(|x| x as f64).collect();
        let block = DenseData::from_f64(&[2, 3, 2], data).unwrap();
        let t = block.trace_pair(0, 2);
        assert_eq!(t.dims(), &[3]);
        for j in 0..3 {
            let expected = block.get(&[0, j, 0]).to_f64() + block.get(&[1, j, 1]).to_f64();
            assert_relative_eq!(t.get(&[j]).to_f64(), expected);
        }
    }

    #[test]
    fn test_norm_and_scale() {
        let mut block = DenseData::from_f64(&[2], vec![3.0, 4.0]).unwrap();
        assert_relative_eq!(block.norm_sq(), 25.0);
        block.scale_in_place(1.0 / 5.0);
        assert_relative_eq!(block.norm_sq(), 1.0);
    }

    #[test]
    fn test_conj_complex() {
        let mut block =
            DenseData::from_c64(&[1], vec![Complex64::new(1.0, 2.0)]).unwrap();
        block.conj_in_place();
        assert_eq!(
            block.get(&[0]),
            AnyElem::ComplexDouble(Complex64::new(1.0, -2.0))
        );
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = DenseData::from_f64(&[2, 2], vec![1.0]).unwrap_err();
        assert!(matches!(err, BlockError::ShapeMismatch { .. }));
    }
}
