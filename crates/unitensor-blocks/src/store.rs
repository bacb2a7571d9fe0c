//! Sparse sector-to-block storage.
//!
//! A [`BlockStore`] maps symmetry-sector index tuples to dense sub-blocks.
//! Each leg carries a sector dimension table; absent entries are structurally
//! zero, which is distinct from a materialized block full of zeros.
//!
//! Axis permutation is lazy: `transpose` rewrites sector keys and the leg
//! tables but leaves every dense buffer in its original axis order, tracked
//! by a store-wide layout permutation. `make_contiguous` replays the layout
//! onto the buffers and resets it to the identity; `is_contiguous` is derived
//! from the layout being the identity.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::dense::{invert_permutation, multi_to_linear, DenseData};
use crate::dtype::{AnyElem, Dtype};
use crate::error::{BlockError, Result};

/// Sparse mapping from sector index tuples to dense sub-blocks.
#[derive(Debug, Clone)]
pub struct BlockStore {
    dtype: Dtype,
    /// Per-leg sector dimension tables, in logical leg order.
    /// `sectors[l][s]` is the dense dimension of sector `s` along leg `l`.
    sectors: Vec<Vec<usize>>,
    /// `layout[l]` is the storage axis currently holding logical axis `l`.
    layout: Vec<usize>,
    /// Blocks keyed by logical sector tuple; buffer axes follow `layout`.
    blocks: HashMap<Vec<usize>, DenseData>,
}

impl BlockStore {
    /// Create an empty store with the given per-leg sector tables.
    ///
    /// Every leg must have at least one sector and no zero dimensions.
    pub fn new(dtype: Dtype, sectors: Vec<Vec<usize>>) -> Result<Self> {
        for (leg, table) in sectors.iter().enumerate() {
            if table.is_empty() || table.iter().any(|&d| d == 0) {
                return Err(BlockError::InvalidSectorTable { leg });
            }
        }
        let layout = (0..sectors.len()).collect();
        Ok(Self {
            dtype,
            sectors,
            layout,
            blocks: HashMap::new(),
        })
    }

    /// The element type of every block in this store.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// The number of legs.
    pub fn rank(&self) -> usize {
        self.sectors.len()
    }

    /// The sector dimension table of one leg.
    pub fn sector_dims(&self, leg: usize) -> &[usize] {
        &self.sectors[leg]
    }

    /// The number of sectors along each leg.
    pub fn sector_counts(&self) -> Vec<usize> {
        self.sectors.iter().map(|t| t.len()).collect()
    }

    /// The total dimension of one leg (sum of its sector dimensions).
    pub fn leg_dim(&self, leg: usize) -> usize {
        self.sectors[leg].iter().sum()
    }

    /// The total shape (per-leg dimension sums).
    pub fn shape(&self) -> Vec<usize> {
        (0..self.rank()).map(|l| self.leg_dim(l)).collect()
    }

    /// The number of materialized blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the buffer axis order matches the logical leg order.
    pub fn is_contiguous(&self) -> bool {
        self.layout.iter().enumerate().all(|(i, &a)| i == a)
    }

    /// Iterate over materialized sector keys.
    pub fn sectors_iter(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.blocks.keys()
    }

    fn validate_sector(&self, sector: &[usize]) -> Result<()> {
        let counts = self.sector_counts();
        if sector.len() != counts.len() || sector.iter().zip(&counts).any(|(&s, &c)| s >= c) {
            return Err(BlockError::SectorOutOfBounds {
                sector: sector.to_vec(),
                counts,
            });
        }
        Ok(())
    }

    /// The dense shape a block for this sector must have, in logical order.
    pub fn block_shape(&self, sector: &[usize]) -> Result<Vec<usize>> {
        self.validate_sector(sector)?;
        Ok(sector
            .iter()
            .zip(&self.sectors)
            .map(|(&s, table)| table[s])
            .collect())
    }

    /// Check whether a dense block is materialized for a sector.
    pub fn exists(&self, sector: &[usize]) -> bool {
        self.blocks.contains_key(sector)
    }

    /// Fetch the block for a sector, in logical axis order.
    ///
    /// When the store is non-contiguous this permutes a copy; otherwise it
    /// borrows the stored block.
    pub fn get(&self, sector: &[usize]) -> Result<Cow<'_, DenseData>> {
        self.validate_sector(sector)?;
        let block = self.blocks.get(sector).ok_or(BlockError::BlockNotFound {
            sector: sector.to_vec(),
        })?;
        if self.is_contiguous() {
            Ok(Cow::Borrowed(block))
        } else {
            Ok(Cow::Owned(block.permute(&self.layout)))
        }
    }

    /// Materialize or overwrite the block for a sector.
    ///
    /// The block shape is validated against the per-leg sector dimensions
    /// (in logical order); its elements are cast to the store dtype under
    /// the documented rule.
    pub fn set(&mut self, sector: &[usize], block: DenseData) -> Result<()> {
        let expected = self.block_shape(sector)?;
        if block.dims() != expected.as_slice() {
            return Err(BlockError::ShapeMismatch {
                expected,
                actual: block.dims().to_vec(),
            });
        }
        let mut block = block.cast(self.dtype);
        if !self.is_contiguous() {
            // Store in the layout the existing buffers use.
            block = block.permute(&invert_permutation(&self.layout));
        }
        self.blocks.insert(sector.to_vec(), block);
        Ok(())
    }

    /// Remove the block for a sector, returning it in logical axis order.
    pub fn remove(&mut self, sector: &[usize]) -> Option<DenseData> {
        let block = self.blocks.remove(sector)?;
        if self.is_contiguous() {
            Some(block)
        } else {
            Some(block.permute(&self.layout))
        }
    }

    /// Read one element. `inner` is the within-block index in logical order.
    ///
    /// Returns `None` if the sector is not materialized.
    pub fn element(&self, sector: &[usize], inner: &[usize]) -> Option<AnyElem> {
        let block = self.blocks.get(sector)?;
        let mut storage_idx = vec![0; inner.len()];
        for (l, &i) in inner.iter().enumerate() {
            storage_idx[self.layout[l]] = i;
        }
        let lin = multi_to_linear(&storage_idx, block.dims());
        Some(block.get_linear(lin))
    }

    /// Write one element, casting to the store dtype.
    ///
    /// Returns `false` (and writes nothing) if the sector is absent.
    pub fn set_element(&mut self, sector: &[usize], inner: &[usize], value: AnyElem) -> bool {
        let layout = self.layout.clone();
        let Some(block) = self.blocks.get_mut(sector) else {
            return false;
        };
        let mut storage_idx = vec![0; inner.len()];
        for (l, &i) in inner.iter().enumerate() {
            storage_idx[layout[l]] = i;
        }
        let lin = multi_to_linear(&storage_idx, block.dims());
        block.set_linear(lin, value);
        true
    }

    /// Resolve per-leg element indices to a sector tuple plus within-block
    /// index. Returns `None` if the locator has the wrong arity or any
    /// index is out of range for its leg.
    pub fn locate(&self, locator: &[usize]) -> Option<(Vec<usize>, Vec<usize>)> {
        if locator.len() != self.rank() {
            return None;
        }
        let mut sector = Vec::with_capacity(self.rank());
        let mut inner = Vec::with_capacity(self.rank());
        for (leg, &i) in locator.iter().enumerate() {
            let mut rest = i;
            let mut found = None;
            for (s, &dim) in self.sectors[leg].iter().enumerate() {
                if rest < dim {
                    found = Some((s, rest));
                    break;
                }
                rest -= dim;
            }
            let (s, offset) = found?;
            sector.push(s);
            inner.push(offset);
        }
        Some((sector, inner))
    }

    /// Permute legs. `perm[i]` names the old logical axis placed at `i`.
    ///
    /// Sector keys and leg tables change eagerly; dense buffers do not move
    /// until `make_contiguous`.
    pub fn transpose(&mut self, perm: &[usize]) -> Result<()> {
        let rank = self.rank();
        let mut seen = vec![false; rank];
        if perm.len() != rank || perm.iter().any(|&p| p >= rank || std::mem::replace(&mut seen[p], true)) {
            return Err(BlockError::InvalidPermutation {
                perm: perm.to_vec(),
                rank,
            });
        }
        self.sectors = perm.iter().map(|&p| self.sectors[p].clone()).collect();
        self.layout = perm.iter().map(|&p| self.layout[p]).collect();
        let rekeyed = self
            .blocks
            .drain()
            .map(|(key, block)| {
                let new_key: Vec<usize> = perm.iter().map(|&p| key[p]).collect();
                (new_key, block)
            })
            .collect();
        self.blocks = rekeyed;
        Ok(())
    }

    /// Replay the pending layout onto every dense buffer.
    ///
    /// No-op when the store is already contiguous.
    pub fn make_contiguous(&mut self) {
        if self.is_contiguous() {
            return;
        }
        for block in self.blocks.values_mut() {
            *block = block.permute(&self.layout);
        }
        self.layout = (0..self.rank()).collect();
    }

    /// Sum the diagonal over legs `a` and `b`, reducing the rank by two.
    ///
    /// The two legs must carry identical sector dimension tables. Only
    /// diagonal sector pairs (`key[a] == key[b]`) contribute; sectors that
    /// collide after the rank reduction merge by summation.
    pub fn trace(&mut self, a: usize, b: usize) -> Result<()> {
        let rank = self.rank();
        if a >= rank || b >= rank || a == b || self.sectors[a] != self.sectors[b] {
            return Err(BlockError::IncompatibleTraceAxes { a, b });
        }
        self.make_contiguous();
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let mut new_blocks: HashMap<Vec<usize>, DenseData> = HashMap::new();
        for (key, block) in self.blocks.drain() {
            if key[a] != key[b] {
                continue;
            }
            let reduced = block.trace_pair(a, b);
            let mut new_key = key;
            new_key.remove(hi);
            new_key.remove(lo);
            match new_blocks.get_mut(&new_key) {
                Some(existing) => existing.add_assign(&reduced),
                None => {
                    new_blocks.insert(new_key, reduced);
                }
            }
        }
        self.blocks = new_blocks;
        self.sectors.remove(hi);
        self.sectors.remove(lo);
        self.layout = (0..self.sectors.len()).collect();
        Ok(())
    }

    /// Keep only the first `new_dim` sectors along one leg.
    ///
    /// Blocks whose sector index along `leg` is `>= new_dim` are dropped and
    /// the leg's dimension table is cut down; the operation is irreversible.
    /// A `new_dim` at or past the current sector count is a no-op.
    pub fn truncate(&mut self, leg: usize, new_dim: usize) -> Result<()> {
        if leg >= self.rank() || new_dim == 0 {
            return Err(BlockError::InvalidTruncation { leg, new_dim });
        }
        if new_dim >= self.sectors[leg].len() {
            return Ok(());
        }
        self.blocks.retain(|key, _| key[leg] < new_dim);
        self.sectors[leg].truncate(new_dim);
        Ok(())
    }

    /// Cast every block to the target dtype, returning a new store.
    pub fn cast(&self, dtype: Dtype) -> Self {
        let blocks = self
            .blocks
            .iter()
            .map(|(key, block)| (key.clone(), block.cast(dtype)))
            .collect();
        Self {
            dtype,
            sectors: self.sectors.clone(),
            layout: self.layout.clone(),
            blocks,
        }
    }

    /// Conjugate every materialized element in place.
    pub fn conj_in_place(&mut self) {
        for block in self.blocks.values_mut() {
            block.conj_in_place();
        }
    }

    /// Raise every materialized element to the power `p` in place.
    pub fn powf_in_place(&mut self, p: f64) {
        for block in self.blocks.values_mut() {
            block.powf_in_place(p);
        }
    }

    /// Scale every materialized element by a real factor in place.
    pub fn scale_in_place(&mut self, s: f64) {
        for block in self.blocks.values_mut() {
            block.scale_in_place(s);
        }
    }

    /// Sum of squared moduli over all materialized elements.
    pub fn norm_sq(&self) -> f64 {
        self.blocks.values().map(|b| b.norm_sq()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn counting_block(dims: &[usize], start: f64) -> DenseData {
        let len: usize = dims.iter().product();
        DenseData::from_f64(dims, (0..len).map(|i| start + i as f64).collect()).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_tables() {
        assert!(matches!(
            BlockStore::new(Dtype::Double, vec![vec![2], vec![]]),
            Err(BlockError::InvalidSectorTable { leg: 1 })
        ));
        assert!(matches!(
            BlockStore::new(Dtype::Double, vec![vec![2, 0]]),
            Err(BlockError::InvalidSectorTable { leg: 0 })
        ));
    }

    #[test]
    fn test_shape_and_counts() {
        let store = BlockStore::new(Dtype::Double, vec![vec![2, 3], vec![4]]).unwrap();
        assert_eq!(store.rank(), 2);
        assert_eq!(store.shape(), vec![5, 4]);
        assert_eq!(store.sector_counts(), vec![2, 1]);
        assert_eq!(store.block_shape(&[1, 0]).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_set_get_exists() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2, 3], vec![2, 3]]).unwrap();
        assert!(!store.exists(&[0, 0]));
        store.set(&[0, 0], counting_block(&[2, 2], 1.0)).unwrap();
        assert!(store.exists(&[0, 0]));
        assert_eq!(store.num_blocks(), 1);
        let block = store.get(&[0, 0]).unwrap();
        assert_eq!(block.dims(), &[2, 2]);
        // Absent sector: structurally zero, not an all-zero block
        assert!(matches!(
            store.get(&[1, 1]).unwrap_err(),
            BlockError::BlockNotFound { .. }
        ));
    }

    #[test]
    fn test_set_shape_validation() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2, 3], vec![2, 3]]).unwrap();
        let err = store.set(&[0, 1], counting_block(&[2, 2], 0.0)).unwrap_err();
        assert!(matches!(
            err,
            BlockError::ShapeMismatch { expected, actual }
                if expected == vec![2, 3] && actual == vec![2, 2]
        ));
        // Failed set must not materialize anything
        assert!(!store.exists(&[0, 1]));
    }

    #[test]
    fn test_set_out_of_bounds_sector() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2, 3]]).unwrap();
        assert!(matches!(
            store.set(&[2], counting_block(&[2], 0.0)).unwrap_err(),
            BlockError::SectorOutOfBounds { .. }
        ));
        assert!(matches!(
            store.set(&[0, 0], counting_block(&[2], 0.0)).unwrap_err(),
            BlockError::SectorOutOfBounds { .. }
        ));
    }

    #[test]
    fn test_set_casts_to_store_dtype() {
        let mut store = BlockStore::new(Dtype::Int32, vec![vec![2]]).unwrap();
        store
            .set(&[0], DenseData::from_f64(&[2], vec![1.9, -2.9]).unwrap())
            .unwrap();
        let block = store.get(&[0]).unwrap();
        assert_eq!(block.dtype(), Dtype::Int32);
        assert_eq!(block.get(&[0]), AnyElem::Int32(1));
    }

    #[test]
    fn test_transpose_is_lazy() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![3]]).unwrap();
        store.set(&[0, 0], counting_block(&[2, 3], 0.0)).unwrap();
        assert!(store.is_contiguous());
        store.transpose(&[1, 0]).unwrap();
        assert!(!store.is_contiguous());
        assert_eq!(store.shape(), vec![3, 2]);
        // Logical view is transposed even though buffers did not move
        let block = store.get(&[0, 0]).unwrap();
        assert_eq!(block.dims(), &[3, 2]);
        assert_eq!(block.get(&[2, 1]).to_f64(), 5.0);
        // Element access agrees with the logical view
        assert_eq!(store.element(&[0, 0], &[2, 1]).unwrap().to_f64(), 5.0);
    }

    #[test]
    fn test_make_contiguous() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![3]]).unwrap();
        store.set(&[0, 0], counting_block(&[2, 3], 0.0)).unwrap();
        store.transpose(&[1, 0]).unwrap();
        let before = store.get(&[0, 0]).unwrap().into_owned();
        store.make_contiguous();
        assert!(store.is_contiguous());
        let after = store.get(&[0, 0]).unwrap();
        assert_eq!(*after, before);
        // Second call is a no-op
        store.make_contiguous();
        assert!(store.is_contiguous());
    }

    #[test]
    fn test_set_into_noncontiguous_store() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![3]]).unwrap();
        store.transpose(&[1, 0]).unwrap();
        // Shape after transpose is [3, 2]; set expects logical order
        store.set(&[0, 0], counting_block(&[3, 2], 0.0)).unwrap();
        assert_eq!(store.get(&[0, 0]).unwrap().get(&[2, 1]).to_f64(), 5.0);
        store.make_contiguous();
        assert_eq!(store.get(&[0, 0]).unwrap().get(&[2, 1]).to_f64(), 5.0);
    }

    #[test]
    fn test_transpose_invalid_permutation() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![3]]).unwrap();
        assert!(matches!(
            store.transpose(&[0, 0]).unwrap_err(),
            BlockError::InvalidPermutation { .. }
        ));
        assert!(matches!(
            store.transpose(&[0]).unwrap_err(),
            BlockError::InvalidPermutation { .. }
        ));
    }

    #[test]
    fn test_trace_requires_matching_tables() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![3]]).unwrap();
        assert!(matches!(
            store.trace(0, 1).unwrap_err(),
            BlockError::IncompatibleTraceAxes { a: 0, b: 1 }
        ));
    }

    #[test]
    fn test_trace_matrix() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2], vec![2]]).unwrap();
        store
            .set(
                &[0, 0],
                DenseData::from_f64(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            )
            .unwrap();
        store.trace(0, 1).unwrap();
        assert_eq!(store.rank(), 0);
        assert_eq!(store.num_blocks(), 1);
        let scalar = store.get(&[]).unwrap();
        assert_relative_eq!(scalar.get_linear(0).to_f64(), 5.0);
    }

    #[test]
    fn test_trace_drops_off_diagonal_sectors() {
        let mut store =
            BlockStore::new(Dtype::Double, vec![vec![1, 1], vec![1, 1], vec![2]]).unwrap();
        store.set(&[0, 0, 0], counting_block(&[1, 1, 2], 1.0)).unwrap();
        store.set(&[0, 1, 0], counting_block(&[1, 1, 2], 10.0)).unwrap();
        store.set(&[1, 1, 0], counting_block(&[1, 1, 2], 100.0)).unwrap();
        store.trace(0, 1).unwrap();
        assert_eq!(store.rank(), 1);
        // Both diagonal sectors collapse onto key [0] and merge by summation
        assert_eq!(store.num_blocks(), 1);
        let merged = store.get(&[0]).unwrap();
        assert_relative_eq!(merged.get(&[0]).to_f64(), 101.0);
        assert_relative_eq!(merged.get(&[1]).to_f64(), 103.0);
    }

    #[test]
    fn test_truncate_drops_sectors() {
        let mut store =
            BlockStore::new(Dtype::Double, vec![vec![1, 1, 1, 1], vec![2]]).unwrap();
        for s in 0..4 {
            store.set(&[s, 0], counting_block(&[1, 2], s as f64)).unwrap();
        }
        assert_eq!(store.leg_dim(0), 4);
        store.truncate(0, 2).unwrap();
        assert_eq!(store.leg_dim(0), 2);
        assert_eq!(store.sector_dims(0), &[1, 1]);
        assert_eq!(store.num_blocks(), 2);
        assert!(store.exists(&[1, 0]));
        assert!(!store.exists(&[2, 0]));
        // Truncating past the current count is a no-op
        store.truncate(0, 10).unwrap();
        assert_eq!(store.leg_dim(0), 2);
    }

    #[test]
    fn test_locate_across_sector_boundaries() {
        let store = BlockStore::new(Dtype::Double, vec![vec![2, 3], vec![1, 1]]).unwrap();
        assert_eq!(store.locate(&[1, 0]).unwrap(), (vec![0, 0], vec![1, 0]));
        assert_eq!(store.locate(&[2, 1]).unwrap(), (vec![1, 1], vec![0, 0]));
        assert_eq!(store.locate(&[4, 1]).unwrap(), (vec![1, 1], vec![2, 0]));
        assert!(store.locate(&[5, 0]).is_none());
    }

    #[test]
    fn test_locate_rejects_wrong_arity() {
        let store = BlockStore::new(Dtype::Double, vec![vec![2, 3], vec![1, 1]]).unwrap();
        assert!(store.locate(&[1]).is_none());
        assert!(store.locate(&[1, 0, 0]).is_none());
    }

    #[test]
    fn test_cast_store() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![2]]).unwrap();
        store.set(&[0], counting_block(&[2], 1.5)).unwrap();
        let cast = store.cast(Dtype::ComplexDouble);
        assert_eq!(cast.dtype(), Dtype::ComplexDouble);
        assert_eq!(cast.get(&[0]).unwrap().dtype(), Dtype::ComplexDouble);
        assert_relative_eq!(cast.get(&[0]).unwrap().get(&[0]).to_f64(), 1.5);
    }

    #[test]
    fn test_norm_over_blocks() {
        let mut store = BlockStore::new(Dtype::Double, vec![vec![1, 1]]).unwrap();
        store.set(&[0], DenseData::from_f64(&[1], vec![3.0]).unwrap()).unwrap();
        store.set(&[1], DenseData::from_f64(&[1], vec![4.0]).unwrap()).unwrap();
        assert_relative_eq!(store.norm_sq(), 25.0);
        store.scale_in_place(0.2);
        assert_relative_eq!(store.norm_sq(), 1.0);
    }
}
