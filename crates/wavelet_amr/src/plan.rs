//! Refinement planner: estimates and tolerances to per-leaf decisions.
//!
//! # Phases
//!
//! 1. **Classify**: split where any tracked estimate exceeds its threshold
//!    (below `max_level`), coarsen candidate where every estimate is below
//!    `threshold * coarsen_ratio` (above `min_level`)
//! 2. **Propagate splits**: a coarser face neighbor of a split leaf must split
//!    too, so the request already respects 2:1 balance
//! 3. **Split priority**: no candidate next to a split leaf may coarsen
//! 4. **Sibling agreement**: a parent collapses only when all its children
//!    are leaves and all of them are candidates
//!
//! The plan depends only on the tree and the configuration.

use std::collections::{BTreeSet, HashMap};

use crate::estimate::{estimate_leaves, Estimates};
use crate::tree::{faces, AdaptConfig, CellId, CellTree, FieldSet};

/// What to do with a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
  Keep,
  Split,
  Coarsen,
}

/// One decision per leaf, in tree order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefinementRequest<const D: usize> {
  decisions: Vec<(CellId<D>, Decision)>,
}

impl<const D: usize> RefinementRequest<D> {
  pub fn iter(&self) -> impl Iterator<Item = (CellId<D>, Decision)> + '_ {
    self.decisions.iter().copied()
  }

  pub fn len(&self) -> usize {
    self.decisions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.decisions.is_empty()
  }

  /// Decision for one leaf. None if the cell was not a leaf when planned.
  pub fn decision(&self, id: &CellId<D>) -> Option<Decision> {
    self
      .decisions
      .iter()
      .find(|(cell, _)| cell == id)
      .map(|(_, d)| *d)
  }

  /// Leaves marked with `decision`, in tree order.
  pub fn cells(&self, decision: Decision) -> impl Iterator<Item = CellId<D>> + '_ {
    self
      .decisions
      .iter()
      .filter(move |(_, d)| *d == decision)
      .map(|(id, _)| *id)
  }

  pub fn count(&self, decision: Decision) -> usize {
    self.cells(decision).count()
  }

  /// Whether applying the request would change nothing.
  pub fn is_all_keep(&self) -> bool {
    self.decisions.iter().all(|(_, d)| *d == Decision::Keep)
  }
}

impl<const D: usize> FromIterator<(CellId<D>, Decision)> for RefinementRequest<D> {
  fn from_iter<I: IntoIterator<Item = (CellId<D>, Decision)>>(iter: I) -> Self {
    Self {
      decisions: iter.into_iter().collect(),
    }
  }
}

/// Estimate every leaf and plan.
pub fn plan<const D: usize>(
  tree: &CellTree<D>,
  fields: &FieldSet,
  config: &AdaptConfig,
) -> RefinementRequest<D> {
  let estimates = estimate_leaves(tree, fields);
  plan_from_estimates(tree, fields, config, &estimates)
}

/// Plan from precomputed estimates (which must come from `tree`).
pub fn plan_from_estimates<const D: usize>(
  tree: &CellTree<D>,
  fields: &FieldSet,
  config: &AdaptConfig,
  estimates: &Estimates<D>,
) -> RefinementRequest<D> {
  let bounds = config.bounds;
  let mut decisions: HashMap<CellId<D>, Decision> = HashMap::with_capacity(estimates.len());

  // Phase 1: Classify
  for (id, leaf_estimates) in estimates.iter() {
    let decision = if fields.is_empty() {
      Decision::Keep
    } else if fields
      .iter()
      .zip(leaf_estimates)
      .any(|(field, &e)| e > field.threshold)
    {
      if id.level < bounds.max_level {
        Decision::Split
      } else {
        Decision::Keep
      }
    } else if id.level > bounds.min_level
      && fields
        .iter()
        .zip(leaf_estimates)
        .all(|(field, &e)| e < field.threshold * config.coarsen_ratio)
    {
      Decision::Coarsen
    } else {
      Decision::Keep
    };
    decisions.insert(id, decision);
  }

  // Phase 2: Propagate splits to coarser neighbors
  let mut pending: Vec<CellId<D>> = estimates
    .leaves()
    .iter()
    .copied()
    .filter(|id| decisions.get(id) == Some(&Decision::Split))
    .collect();
  while let Some(id) = pending.pop() {
    for (axis, positive) in faces::<D>() {
      if let Some(coarse) = tree.coarser_neighbor(&id, axis, positive) {
        if let Some(decision) = decisions.get_mut(&coarse) {
          if *decision != Decision::Split {
            *decision = Decision::Split;
            pending.push(coarse);
          }
        }
      }
    }
  }

  // Phase 3: Split has priority over coarsen
  let splits: Vec<CellId<D>> = decisions
    .iter()
    .filter(|(_, d)| **d == Decision::Split)
    .map(|(id, _)| *id)
    .collect();
  for id in splits {
    for (axis, positive) in faces::<D>() {
      for neighbor in tree.adjacent_leaves(&id, axis, positive) {
        if let Some(decision) = decisions.get_mut(&neighbor) {
          if *decision == Decision::Coarsen {
            *decision = Decision::Keep;
          }
        }
      }
    }
  }

  // Phase 4: Sibling agreement
  let parents: BTreeSet<CellId<D>> = decisions
    .iter()
    .filter(|(_, d)| **d == Decision::Coarsen)
    .filter_map(|(id, _)| id.parent())
    .collect();
  for parent in parents {
    let children = parent.children();
    let agreed = children
      .iter()
      .all(|child| decisions.get(child) == Some(&Decision::Coarsen));
    if !agreed {
      for child in &children {
        if let Some(decision) = decisions.get_mut(child) {
          if *decision == Decision::Coarsen {
            *decision = Decision::Keep;
          }
        }
      }
    }
  }

  let decisions = estimates
    .leaves()
    .iter()
    .map(|id| (*id, decisions.get(id).copied().unwrap_or(Decision::Keep)))
    .collect();
  RefinementRequest { decisions }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
