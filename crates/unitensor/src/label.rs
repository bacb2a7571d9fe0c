//! Leg labels and the per-tensor label table.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, TensorError};

/// A leg label, either textual or numeric.
///
/// Numeric labels exist for compatibility with index-convention code that
/// numbers bonds; new code should prefer text labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Text(String),
    Num(i64),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(s) => write!(f, "{s}"),
            Label::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_owned())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

impl From<i64> for Label {
    fn from(n: i64) -> Self {
        Label::Num(n)
    }
}

impl From<i32> for Label {
    fn from(n: i32) -> Self {
        Label::Num(n as i64)
    }
}

/// A way of naming one leg: by position or by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leg {
    Position(usize),
    Label(Label),
}

impl From<usize> for Leg {
    fn from(p: usize) -> Self {
        Leg::Position(p)
    }
}

impl From<&str> for Leg {
    fn from(s: &str) -> Self {
        Leg::Label(s.into())
    }
}

impl From<Label> for Leg {
    fn from(l: Label) -> Self {
        Leg::Label(l)
    }
}

/// Ordered, duplicate-free leg labels with reverse lookup.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<Label>,
    positions: HashMap<Label, usize>,
}

impl LabelTable {
    /// Build a table, rejecting duplicate labels.
    pub fn new<L: Into<Label>>(labels: impl IntoIterator<Item = L>) -> Result<Self> {
        let labels: Vec<Label> = labels.into_iter().map(Into::into).collect();
        let mut positions = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if positions.insert(label.clone(), i).is_some() {
                return Err(TensorError::DuplicateLabel {
                    label: label.clone(),
                });
            }
        }
        Ok(Self { labels, positions })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The position of a label, if present.
    pub fn position(&self, label: &Label) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Resolve a leg reference to a position.
    pub fn resolve(&self, leg: Leg) -> Result<usize> {
        match leg {
            Leg::Position(p) => {
                if p < self.len() {
                    Ok(p)
                } else {
                    Err(TensorError::LegOutOfBounds {
                        position: p,
                        rank: self.len(),
                    })
                }
            }
            Leg::Label(label) => self
                .position(&label)
                .ok_or(TensorError::UnknownLabel { label }),
        }
    }

    /// Rename the leg at `position`. Renaming a leg to its current label is
    /// a no-op; any other collision leaves the table unchanged.
    pub fn set_label(&mut self, position: usize, new: Label) -> Result<()> {
        if position >= self.len() {
            return Err(TensorError::LegOutOfBounds {
                position,
                rank: self.len(),
            });
        }
        let old = self.labels[position].clone();
        if old == new {
            return Ok(());
        }
        if self.positions.contains_key(&new) {
            return Err(TensorError::DuplicateLabel { label: new });
        }
        self.positions.remove(&old);
        self.positions.insert(new.clone(), position);
        self.labels[position] = new;
        Ok(())
    }

    /// Replace the whole label set atomically.
    pub fn set_labels<L: Into<Label>>(&mut self, labels: impl IntoIterator<Item = L>) -> Result<()> {
        let labels: Vec<Label> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.len() {
            return Err(TensorError::LabelCountMismatch {
                expected: self.len(),
                got: labels.len(),
            });
        }
        let replacement = LabelTable::new(labels)?;
        *self = replacement;
        Ok(())
    }

    /// Reorder labels. `perm[i]` names the old position placed at `i`.
    pub fn permute(&mut self, perm: &[usize]) {
        debug_assert_eq!(perm.len(), self.len());
        self.labels = perm.iter().map(|&p| self.labels[p].clone()).collect();
        self.positions = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
    }

    /// Drop the labels at the given positions (ascending, distinct).
    pub fn remove_positions(&mut self, positions: &[usize]) {
        for &p in positions.iter().rev() {
            self.labels.remove(p);
        }
        self.positions = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
    }
}
