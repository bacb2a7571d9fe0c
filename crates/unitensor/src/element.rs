//! Per-element access handles.
//!
//! An element handle pins one logical element of a tensor: a sector tuple
//! plus a within-block index. Whether the element's sector was materialized
//! is captured when the handle is created; a sector appearing or vanishing
//! afterwards does not retroactively change an existing handle's `exists`
//! answer.

use unitensor_blocks::{AnyElem, BlockStore};

use crate::error::{Result, TensorError};

/// Read-only handle to one element.
#[derive(Debug)]
pub struct ElementRef<'a> {
    store: &'a BlockStore,
    sector: Vec<usize>,
    inner: Vec<usize>,
    exists: bool,
}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(store: &'a BlockStore, sector: Vec<usize>, inner: Vec<usize>) -> Self {
        let exists = store.exists(&sector);
        Self {
            store,
            sector,
            inner,
            exists,
        }
    }

    /// Whether the element's sector was materialized when the handle was
    /// created.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The sector tuple this element falls in.
    pub fn sector(&self) -> &[usize] {
        &self.sector
    }

    /// Read the value, failing on structurally zero elements.
    pub fn value(&self) -> Result<AnyElem> {
        if !self.exists {
            return Err(TensorError::ElementNotMaterialized);
        }
        self.store
            .element(&self.sector, &self.inner)
            .ok_or(TensorError::ElementNotMaterialized)
    }

    /// Read the value, or `None` for structurally zero elements.
    pub fn value_if_exists(&self) -> Option<AnyElem> {
        if self.exists {
            self.store.element(&self.sector, &self.inner)
        } else {
            None
        }
    }
}

/// Mutable handle to one element.
#[derive(Debug)]
pub struct ElementMut<'a> {
    store: &'a mut BlockStore,
    sector: Vec<usize>,
    inner: Vec<usize>,
    exists: bool,
}

impl<'a> ElementMut<'a> {
    pub(crate) fn new(store: &'a mut BlockStore, sector: Vec<usize>, inner: Vec<usize>) -> Self {
        let exists = store.exists(&sector);
        Self {
            store,
            sector,
            inner,
            exists,
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn sector(&self) -> &[usize] {
        &self.sector
    }

    pub fn value(&self) -> Result<AnyElem> {
        if !self.exists {
            return Err(TensorError::ElementNotMaterialized);
        }
        self.store
            .element(&self.sector, &self.inner)
            .ok_or(TensorError::ElementNotMaterialized)
    }

    pub fn value_if_exists(&self) -> Option<AnyElem> {
        if self.exists {
            self.store.element(&self.sector, &self.inner)
        } else {
            None
        }
    }

    /// Write the value, casting to the tensor dtype. Fails on structurally
    /// zero elements rather than materializing a block.
    pub fn set_value(&mut self, value: impl Into<AnyElem>) -> Result<()> {
        if !self.exists || !self.store.set_element(&self.sector, &self.inner, value.into()) {
            return Err(TensorError::ElementNotMaterialized);
        }
        Ok(())
    }

    /// Write the value if the element is materialized; silently do nothing
    /// otherwise.
    pub fn set_value_if_exists(&mut self, value: impl Into<AnyElem>) {
        if self.exists {
            self.store.set_element(&self.sector, &self.inner, value.into());
        }
    }
}
