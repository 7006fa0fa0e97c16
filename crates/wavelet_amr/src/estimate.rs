//! Wavelet error estimator.
//!
//! For every leaf, the estimate of a field is the round-trip error
//!
//! ```text
//! |value(cell) - prolong(restrict(parent), orthant(cell))|
//! ```
//!
//! Restriction runs bottom-up over the whole tree first ([`Pyramid`]), then
//! each leaf is compared against the top-down reconstruction from its parent.
//! The estimate vanishes for locally affine data and grows with the local
//! roughness of the field.

use std::collections::HashMap;

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::transfer::{self, LevelValues};
use crate::tree::{CellId, CellTree, FieldSet, Values};

/// Restricted values on every internal level, paired with the leaf values of
/// the tree they were computed from.
pub struct Pyramid<'a, const D: usize> {
  tree: &'a CellTree<D>,
  restricted: HashMap<CellId<D>, Values>,
}

impl<'a, const D: usize> Pyramid<'a, D> {
  /// Average leaves upward, finest level first. The tree is not modified.
  pub fn restrict(tree: &'a CellTree<D>) -> Self {
    Self {
      tree,
      restricted: tree.restricted_values(),
    }
  }

  pub fn tree(&self) -> &'a CellTree<D> {
    self.tree
  }

  /// Round-trip error of `field` on `cell`.
  ///
  /// Zero for the root, which has no parent to compare against.
  pub fn estimate(&self, field: usize, cell: &CellId<D>) -> f64 {
    let Some(parent) = cell.parent() else {
      return 0.0;
    };
    let Some(actual) = self.tree.value(cell, field) else {
      return 0.0;
    };
    let Some(parent_value) = self.level_values(&parent).map(|v| v[field]) else {
      return 0.0;
    };
    let predicted = transfer::prolong_field(self, &parent, parent_value, cell.orthant(), field);
    (actual - predicted).abs()
  }
}

impl<const D: usize> LevelValues<D> for Pyramid<'_, D> {
  fn level_values(&self, id: &CellId<D>) -> Option<&[f64]> {
    let mut cur = *id;
    loop {
      if let Some(values) = self.restricted.get(&cur) {
        return Some(values.as_slice());
      }
      if let Some(cell) = self.tree.get(&cur) {
        return Some(cell.values());
      }
      cur = cur.parent()?;
    }
  }
}

/// Per-leaf estimates for every tracked field.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimates<const D: usize> {
  leaves: Vec<CellId<D>>,
  values: Vec<Values>,
}

impl<const D: usize> Estimates<D> {
  /// Leaves in tree order.
  pub fn leaves(&self) -> &[CellId<D>] {
    &self.leaves
  }

  /// `(leaf, estimates)` pairs; estimates follow the field set order.
  pub fn iter(&self) -> impl Iterator<Item = (CellId<D>, &[f64])> {
    self
      .leaves
      .iter()
      .copied()
      .zip(self.values.iter().map(|v| v.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.leaves.len()
  }

  pub fn is_empty(&self) -> bool {
    self.leaves.is_empty()
  }

  /// Largest estimate of the `k`-th tracked field.
  pub fn max(&self, k: usize) -> f64 {
    self
      .values
      .iter()
      .filter_map(|v| v.get(k).copied())
      .fold(0.0, f64::max)
  }
}

/// Estimate every tracked field on every leaf.
///
/// Read-only on the tree; leaves are processed on rayon's pool.
pub fn estimate_leaves<const D: usize>(tree: &CellTree<D>, fields: &FieldSet) -> Estimates<D> {
  let pyramid = Pyramid::restrict(tree);
  let leaves = tree.leaf_ids();
  let indices: SmallVec<[usize; 4]> = fields.iter().map(|f| f.index).collect();
  let values: Vec<Values> = leaves
    .par_iter()
    .map(|id| indices.iter().map(|&k| pyramid.estimate(k, id)).collect())
    .collect();
  Estimates { leaves, values }
}

#[cfg(test)]
#[path = "estimate_test.rs"]
mod estimate_test;
