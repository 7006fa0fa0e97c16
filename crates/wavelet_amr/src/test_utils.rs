//! Test utilities shared by the estimator, planner, mutator and cycle tests.
//!
//! Provides tree fixtures and analytic field samplers.

use std::collections::BTreeMap;

use crate::tree::{CellId, CellTree, DomainConfig, FieldLayout, FieldSet};

// =============================================================================
// Fixtures
// =============================================================================

/// Single-field layout named `h`.
pub fn layout_h() -> FieldLayout {
  FieldLayout::new(["h"]).unwrap()
}

/// Uniform 2-D tree on the unit square.
pub fn unit_tree(level: u32) -> CellTree<2> {
  CellTree::new(DomainConfig::unit(level), layout_h()).unwrap()
}

/// Track `h` with the given tolerance.
pub fn track_h(tree: &CellTree<2>, threshold: f64) -> FieldSet {
  let thresholds: BTreeMap<String, f64> = [("h".to_string(), threshold)].into();
  FieldSet::new(tree.layout(), &["h"], &thresholds).unwrap()
}

// =============================================================================
// Samplers
// =============================================================================

/// Write `f(center)` into field 0 of every leaf.
pub fn fill<F: Fn([f64; 2]) -> f64>(tree: &mut CellTree<2>, f: F) {
  let centers: Vec<(CellId<2>, [f64; 2])> = tree
    .leaf_ids()
    .into_iter()
    .map(|id| (id, tree.cell_center(&id)))
    .collect();
  for (id, center) in centers {
    if let Some(values) = tree.leaf_values_mut(&id) {
      values[0] = f(center);
    }
  }
}

/// Affine field used to check exactness.
pub fn affine([x, y]: [f64; 2]) -> f64 {
  0.3 + 2.0 * x - 1.5 * y
}

/// Set one leaf to `value`, every other leaf to zero.
pub fn spike(tree: &mut CellTree<2>, target: CellId<2>, value: f64) {
  tree.for_each_leaf_mut(|id, values| {
    values[0] = if id == target { value } else { 0.0 };
  });
}
