//! The labeled block-sparse tensor.

use std::sync::Arc;

use unitensor_blocks::{AnyElem, BlockStore, DenseData, Dtype};

use crate::device::Device;
use crate::element::{ElementMut, ElementRef};
use crate::error::{Result, TensorError};
use crate::label::{Label, LabelTable, Leg};

/// A tensor whose legs carry labels and whose storage is block-sparse.
///
/// Blocks are shared between tensors through an `Arc` and copied on first
/// write, so dtype-identity casts and same-device moves are cheap. The
/// `row_rank` splits the legs into a row group (`0..row_rank`) and a column
/// group for operations that view the tensor as a matrix.
#[derive(Debug, Clone)]
pub struct UniTensor {
    name: String,
    labels: LabelTable,
    row_rank: usize,
    device: Device,
    tagged: bool,
    blocks: Arc<BlockStore>,
}

impl UniTensor {
    /// Create an empty block-sparse tensor.
    ///
    /// `sectors[l]` lists the sector dimensions of leg `l`; no blocks are
    /// materialized. One label per leg, all distinct.
    pub fn new<L: Into<Label>>(
        labels: impl IntoIterator<Item = L>,
        sectors: Vec<Vec<usize>>,
        dtype: Dtype,
        device: Device,
        row_rank: usize,
    ) -> Result<Self> {
        if !device.is_registered() {
            return Err(TensorError::UnsupportedDevice { device });
        }
        let labels = LabelTable::new(labels)?;
        if labels.len() != sectors.len() {
            return Err(TensorError::LabelCountMismatch {
                expected: sectors.len(),
                got: labels.len(),
            });
        }
        if row_rank > labels.len() {
            return Err(TensorError::InvalidRowRank {
                row_rank,
                rank: labels.len(),
            });
        }
        let blocks = BlockStore::new(dtype, sectors)?;
        Ok(Self {
            name: String::new(),
            labels,
            row_rank,
            device,
            tagged: false,
            blocks: Arc::new(blocks),
        })
    }

    /// Create a dense tensor: one sector per leg covering the full
    /// dimension, with its single block materialized to zeros.
    pub fn dense<L: Into<Label>>(
        labels: impl IntoIterator<Item = L>,
        dims: &[usize],
        dtype: Dtype,
    ) -> Result<Self> {
        let sectors = dims.iter().map(|&d| vec![d]).collect();
        let mut tensor = Self::new(labels, sectors, dtype, Device::Cpu, 0)?;
        let key = vec![0; dims.len()];
        Arc::make_mut(&mut tensor.blocks).set(&key, DenseData::zeros(dtype, dims))?;
        Ok(tensor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn labels(&self) -> &[Label] {
        self.labels.labels()
    }

    pub fn rank(&self) -> usize {
        self.labels.len()
    }

    pub fn row_rank(&self) -> usize {
        self.row_rank
    }

    pub fn dtype(&self) -> Dtype {
        self.blocks.dtype()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// Mark the tensor's legs as directionally tagged.
    pub fn tag(&mut self) -> &mut Self {
        self.tagged = true;
        self
    }

    /// Per-leg total dimensions.
    pub fn shape(&self) -> Vec<usize> {
        self.blocks.shape()
    }

    /// Sector dimension table of one leg.
    pub fn sector_dims(&self, leg: impl Into<Leg>) -> Result<&[usize]> {
        let pos = self.labels.resolve(leg.into())?;
        Ok(self.blocks.sector_dims(pos))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.num_blocks()
    }

    pub fn is_contiguous(&self) -> bool {
        self.blocks.is_contiguous()
    }

    /// Whether two tensors share the same block storage.
    pub fn shares_blocks(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks)
    }

    /// The Frobenius norm over all materialized blocks.
    pub fn norm(&self) -> f64 {
        self.blocks.norm_sq().sqrt()
    }

    /// Rename one leg.
    pub fn set_label(&mut self, leg: impl Into<Leg>, new: impl Into<Label>) -> Result<&mut Self> {
        let pos = self.labels.resolve(leg.into())?;
        self.labels.set_label(pos, new.into())?;
        Ok(self)
    }

    /// Replace all labels at once.
    pub fn set_labels<L: Into<Label>>(
        &mut self,
        labels: impl IntoIterator<Item = L>,
    ) -> Result<&mut Self> {
        self.labels.set_labels(labels)?;
        Ok(self)
    }

    /// Move the row/column split.
    pub fn set_rowrank(&mut self, row_rank: usize) -> Result<&mut Self> {
        if row_rank > self.rank() {
            return Err(TensorError::InvalidRowRank {
                row_rank,
                rank: self.rank(),
            });
        }
        self.row_rank = row_rank;
        Ok(self)
    }

    /// Convert to another dtype. Casting to the current dtype shares the
    /// existing blocks instead of copying.
    pub fn astype(&self, dtype: Dtype) -> Self {
        if dtype == self.dtype() {
            return self.clone();
        }
        let mut out = self.clone();
        out.blocks = Arc::new(self.blocks.cast(dtype));
        out
    }

    /// Move to another device. Moving to the current device shares the
    /// existing blocks.
    pub fn to(&self, device: Device) -> Result<Self> {
        if !device.is_registered() {
            return Err(TensorError::UnsupportedDevice { device });
        }
        if device == self.device {
            return Ok(self.clone());
        }
        let mut out = self.clone();
        out.blocks = Arc::new((*self.blocks).clone());
        out.device = device;
        Ok(out)
    }

    /// A contiguous copy, or a cheap clone if already contiguous.
    pub fn contiguous(&self) -> Self {
        let mut out = self.clone();
        out.contiguous_();
        out
    }

    /// Replay any pending leg permutation onto the block buffers.
    pub fn contiguous_(&mut self) -> &mut Self {
        if !self.is_contiguous() {
            Arc::make_mut(&mut self.blocks).make_contiguous();
        }
        self
    }

    /// Reorder legs. `order` names every leg exactly once, by label or
    /// position; block buffers move lazily.
    pub fn permute_<G: Into<Leg>>(
        &mut self,
        order: impl IntoIterator<Item = G>,
    ) -> Result<&mut Self> {
        let perm: Vec<usize> = order
            .into_iter()
            .map(|leg| self.labels.resolve(leg.into()))
            .collect::<Result<_>>()?;
        Arc::make_mut(&mut self.blocks).transpose(&perm)?;
        self.labels.permute(&perm);
        Ok(self)
    }

    /// Swap the row and column leg groups.
    pub fn transpose_(&mut self) -> &mut Self {
        let rank = self.rank();
        let perm: Vec<usize> = (self.row_rank..rank).chain(0..self.row_rank).collect();
        // A row-group rotation is always a valid permutation.
        Arc::make_mut(&mut self.blocks)
            .transpose(&perm)
            .unwrap_or_else(|_| unreachable!());
        self.labels.permute(&perm);
        self.row_rank = rank - self.row_rank;
        self
    }

    /// Conjugate every materialized element.
    pub fn conj_(&mut self) -> &mut Self {
        Arc::make_mut(&mut self.blocks).conj_in_place();
        self
    }

    /// Conjugate transpose.
    pub fn dagger_(&mut self) -> &mut Self {
        self.conj_();
        self.transpose_()
    }

    /// Raise every materialized element to the power `p`.
    pub fn pow_(&mut self, p: f64) -> &mut Self {
        Arc::make_mut(&mut self.blocks).powf_in_place(p);
        self
    }

    /// Scale to unit Frobenius norm. Normalizing a tensor of norm zero
    /// divides by zero, leaving non-finite float elements.
    pub fn normalize_(&mut self) -> &mut Self {
        let norm = self.norm();
        Arc::make_mut(&mut self.blocks).scale_in_place(1.0 / norm);
        self
    }

    /// Sum the diagonal over two legs with identical sector tables,
    /// reducing the rank by two.
    pub fn trace_(&mut self, a: impl Into<Leg>, b: impl Into<Leg>) -> Result<&mut Self> {
        let pa = self.labels.resolve(a.into())?;
        let pb = self.labels.resolve(b.into())?;
        Arc::make_mut(&mut self.blocks).trace(pa, pb)?;
        let (lo, hi) = if pa < pb { (pa, pb) } else { (pb, pa) };
        self.labels.remove_positions(&[lo, hi]);
        let removed_in_row = [lo, hi].iter().filter(|&&p| p < self.row_rank).count();
        self.row_rank -= removed_in_row;
        Ok(self)
    }

    /// Keep only the first `new_dim` sectors along one leg, dropping every
    /// block outside of them.
    pub fn truncate_(&mut self, leg: impl Into<Leg>, new_dim: usize) -> Result<&mut Self> {
        let pos = self.labels.resolve(leg.into())?;
        Arc::make_mut(&mut self.blocks).truncate(pos, new_dim)?;
        Ok(self)
    }

    /// Check whether a sector's block is materialized.
    pub fn block_exists(&self, sector: &[usize]) -> bool {
        self.blocks.exists(sector)
    }

    /// Fetch a sector's block in logical axis order.
    pub fn get_block(&self, sector: &[usize]) -> Result<DenseData> {
        Ok(self.blocks.get(sector)?.into_owned())
    }

    /// Materialize or overwrite a sector's block. The block is cast to the
    /// tensor dtype and validated against the sector's dense shape.
    pub fn put_block(&mut self, sector: &[usize], block: DenseData) -> Result<&mut Self> {
        Arc::make_mut(&mut self.blocks).set(sector, block)?;
        Ok(self)
    }

    fn locate(&self, locator: &[usize]) -> Result<(Vec<usize>, Vec<usize>)> {
        if locator.len() != self.rank() {
            return Err(TensorError::LocatorArity {
                expected: self.rank(),
                got: locator.len(),
            });
        }
        let shape = self.shape();
        for (leg, (&i, &dim)) in locator.iter().zip(&shape).enumerate() {
            if i >= dim {
                return Err(TensorError::LocatorOutOfBounds {
                    leg,
                    index: i,
                    dim,
                });
            }
        }
        // Bounds were checked above, so resolution cannot fail.
        self.blocks
            .locate(locator)
            .ok_or(TensorError::LocatorArity {
                expected: self.rank(),
                got: locator.len(),
            })
    }

    /// A read handle to the element at `locator` (one index per leg).
    pub fn at(&self, locator: &[usize]) -> Result<ElementRef<'_>> {
        let (sector, inner) = self.locate(locator)?;
        Ok(ElementRef::new(&self.blocks, sector, inner))
    }

    /// A write handle to the element at `locator`.
    pub fn at_mut(&mut self, locator: &[usize]) -> Result<ElementMut<'_>> {
        let (sector, inner) = self.locate(locator)?;
        Ok(ElementMut::new(
            Arc::make_mut(&mut self.blocks),
            sector,
            inner,
        ))
    }

    /// Convenience scalar read, `None` for structurally zero elements.
    pub fn elem(&self, locator: &[usize]) -> Result<Option<AnyElem>> {
        Ok(self.at(locator)?.value_if_exists())
    }

    /// Rename a leg through the historical `(old, new, by_label)` calling
    /// convention, where `old` is a numeric label when `by_label` is set
    /// and a position otherwise.
    pub fn set_label_legacy(
        &mut self,
        old: i64,
        new: impl Into<Label>,
        by_label: bool,
    ) -> Result<&mut Self> {
        let leg = if by_label {
            Leg::Label(old.into())
        } else {
            Leg::Position(old as usize)
        };
        self.set_label(leg, new)
    }

    /// `trace_` through the historical `(a, b, by_label)` convention.
    pub fn trace_legacy_(&mut self, a: i64, b: i64, by_label: bool) -> Result<&mut Self> {
        if by_label {
            self.trace_(Leg::Label(a.into()), Leg::Label(b.into()))
        } else {
            self.trace_(a as usize, b as usize)
        }
    }

    /// `truncate_` through the historical `(leg, dim, by_label)` convention.
    pub fn truncate_legacy_(&mut self, leg: i64, new_dim: usize, by_label: bool) -> Result<&mut Self> {
        if by_label {
            self.truncate_(Leg::Label(leg.into()), new_dim)
        } else {
            self.truncate_(leg as usize, new_dim)
        }
    }
}
