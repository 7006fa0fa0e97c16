//! Mesh mutator: applies a refinement request to the tree.
//!
//! # Scheduling
//!
//! 1. Internal records are refreshed so prolongation sees current coarse data
//! 2. Splits run coarsest first, each cascading to keep 2:1 balance
//! 3. Merges run finest first, grouped by parent
//!
//! Operations the tree refuses are skipped and counted; the mesh is always
//! left consistent.

use std::collections::BTreeSet;

use crate::plan::{Decision, RefinementRequest};
use crate::tree::{AdaptConfig, CellId, CellTree};

/// What an `apply` actually did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppliedCounts {
  /// Cells split, balance cascades included.
  pub split_count: usize,
  /// Parents whose children were merged.
  pub coarsen_count: usize,
  /// Sibling groups whose merge was refused.
  pub blocked_coarsens: usize,
}

impl AppliedCounts {
  /// Total number of topology changes.
  #[inline]
  pub fn total(&self) -> usize {
    self.split_count + self.coarsen_count
  }
}

/// Apply `request` to `tree`.
pub fn apply<const D: usize>(
  tree: &mut CellTree<D>,
  request: &RefinementRequest<D>,
  config: &AdaptConfig,
) -> AppliedCounts {
  let bounds = config.bounds;
  let mut counts = AppliedCounts::default();
  tree.restrict_all();

  let mut splits: Vec<CellId<D>> = request.cells(Decision::Split).collect();
  splits.sort();
  for id in splits {
    // Already split by an earlier cascade.
    if !tree.is_leaf(&id) {
      continue;
    }
    match tree.split(id, &bounds) {
      Ok(count) => counts.split_count += count,
      Err(err) => tracing::debug!(%id, %err, "split skipped"),
    }
  }

  let parents: BTreeSet<CellId<D>> = request
    .cells(Decision::Coarsen)
    .filter_map(|id| id.parent())
    .collect();
  for parent in parents.into_iter().rev() {
    match tree.merge(parent, &bounds) {
      Ok(()) => counts.coarsen_count += 1,
      Err(err) => {
        tracing::debug!(%parent, %err, "merge blocked");
        counts.blocked_coarsens += 1;
      }
    }
  }

  counts
}

#[cfg(test)]
#[path = "mutate_test.rs"]
mod mutate_test;
