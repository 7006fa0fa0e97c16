use super::*;
use crate::test_utils::{affine, fill, unit_tree};

fn layout() -> FieldLayout {
  FieldLayout::new(["h"]).unwrap()
}

fn uniform_tree(level: u32) -> CellTree<2> {
  CellTree::new(DomainConfig::unit(level), layout()).unwrap()
}

fn fill_constant(tree: &mut CellTree<2>, value: f64) {
  tree.for_each_leaf_mut(|_, values| values[0] = value);
}

// =========================================================================
// Construction and traversal
// =========================================================================

/// A tree created at level l has 4^l leaves and every ancestor stored.
#[test]
fn test_new_uniform_tree() {
  let tree = uniform_tree(3);
  assert_eq!(tree.leaf_count(), 64);
  assert_eq!(tree.len(), 1 + 4 + 16 + 64);
  assert!(tree.get(&CellId::root()).is_some_and(|c| !c.is_leaf()));
  assert!(tree.leaves().all(|(id, _)| id.level == 3));
  assert!(tree.is_balanced());
}

/// Level 0 gives a single leaf root.
#[test]
fn test_new_root_only() {
  let tree = uniform_tree(0);
  assert_eq!(tree.leaf_count(), 1);
  assert!(tree.is_leaf(&CellId::root()));
  assert_eq!(tree.depth(), 0);
}

/// The leaf sequence is deterministic, restartable and finite.
#[test]
fn test_leaves_deterministic_order() {
  let tree = uniform_tree(2);
  let first: Vec<_> = tree.leaf_ids();
  let second: Vec<_> = tree.leaf_ids();

  assert_eq!(first, second, "Traversal must restart identically");
  assert_eq!(first.len(), tree.leaf_count());
  // Depth-first orthant order: the first four leaves are the children of L1[0, 0].
  assert_eq!(first[0], CellId::new(2, [0, 0]));
  assert_eq!(first[1], CellId::new(2, [1, 0]));
  assert_eq!(first[2], CellId::new(2, [0, 1]));
  assert_eq!(first[3], CellId::new(2, [1, 1]));
  assert_eq!(first[4], CellId::new(2, [2, 0]));
}

/// leaf_at finds the containing leaf, including on the far boundary.
#[test]
fn test_leaf_at() {
  let mut tree = CellTree::new(
    DomainConfig {
      origin: [-0.5, -0.5],
      size: 1.0,
      initial_level: 2,
    },
    layout(),
  )
  .unwrap();

  assert_eq!(tree.leaf_at([-0.5, -0.5]), Some(CellId::new(2, [0, 0])));
  assert_eq!(tree.leaf_at([0.1, -0.2]), Some(CellId::new(2, [2, 1])));
  assert_eq!(tree.leaf_at([0.5, 0.5]), Some(CellId::new(2, [3, 3])));
  assert_eq!(tree.leaf_at([0.6, 0.0]), None, "Outside the domain");

  let bounds = LevelBounds::new(0, 5);
  tree.split(CellId::new(2, [2, 1]), &bounds).unwrap();
  assert_eq!(tree.leaf_at([0.1, -0.2]), Some(CellId::new(3, [4, 2])));
}

/// for_each_leaf_mut writes are visible through the read API.
#[test]
fn test_for_each_leaf_mut() {
  let mut tree = uniform_tree(2);
  tree.for_each_leaf_mut(|id, values| values[0] = id.coords[0] as f64);
  assert_eq!(tree.value(&CellId::new(2, [3, 1]), 0), Some(3.0));

  let mut sum = 0.0;
  tree.for_each_leaf(|_, cell| sum += cell.value(0));
  assert_eq!(sum, 4.0 * (0.0 + 1.0 + 2.0 + 3.0));
}

// =========================================================================
// Split
// =========================================================================

/// Splitting a leaf creates 2^D leaf children and turns the cell internal.
#[test]
fn test_split_creates_children() {
  let mut tree = uniform_tree(1);
  fill_constant(&mut tree, 2.0);
  let bounds = LevelBounds::new(0, 4);

  let target = CellId::new(1, [0, 0]);
  let count = tree.split(target, &bounds).unwrap();

  assert_eq!(count, 1);
  assert_eq!(tree.leaf_count(), 4 - 1 + 4);
  assert!(!tree.is_leaf(&target));
  for child in target.children() {
    assert!(tree.is_leaf(&child));
    assert_eq!(tree.value(&child, 0), Some(2.0), "Constant prolongs exactly");
  }
}

/// Splitting an internal cell or a cell at max_level fails without change.
#[test]
fn test_split_rejections_leave_tree_unchanged() {
  let mut tree = uniform_tree(2);
  let bounds = LevelBounds::new(0, 2);
  let before = tree.leaf_ids();

  let err = tree.split(CellId::new(1, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::NotLeaf));

  let err = tree.split(CellId::new(2, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::AtMaxLevel));

  let err = tree.split(CellId::new(5, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::MissingCell));

  assert_eq!(tree.leaf_ids(), before);
}

/// Splitting next to a coarser leaf splits that leaf first.
#[test]
fn test_split_cascades_for_balance() {
  let mut tree = uniform_tree(1);
  let bounds = LevelBounds::new(0, 6);

  // L1[0,0] -> L2, then L2[1,1] -> L3 touches L1[1,0] and L1[0,1].
  tree.split(CellId::new(1, [0, 0]), &bounds).unwrap();
  let count = tree.split(CellId::new(2, [1, 1]), &bounds).unwrap();

  assert_eq!(count, 3, "Two coarser neighbors plus the cell itself");
  assert!(!tree.is_leaf(&CellId::new(1, [1, 0])));
  assert!(!tree.is_leaf(&CellId::new(1, [0, 1])));
  assert!(tree.is_leaf(&CellId::new(1, [1, 1])), "Diagonal is not a face neighbor");
  assert!(tree.is_balanced());
}

/// Leaf writes after an earlier split are seen by the slopes of a later one:
/// an affine field is reproduced next to an internal neighbor.
#[test]
fn test_split_after_leaf_writes_exact_for_affine() {
  let mut tree = unit_tree(2);
  let bounds = LevelBounds::new(0, 4);
  tree.split(CellId::new(2, [1, 1]), &bounds).unwrap();
  fill(&mut tree, affine);

  let target = CellId::new(2, [2, 1]);
  tree.split(target, &bounds).unwrap();

  for child in target.children() {
    let expected = affine(tree.cell_center(&child));
    let got = tree.value(&child, 0).unwrap();
    assert!(
      (got - expected).abs() < 1e-12,
      "{}: {} vs {}",
      child,
      got,
      expected
    );
  }
  assert!((tree.value(&CellId::new(3, [4, 2]), 0).unwrap() - 0.95625).abs() < 1e-12);
}

/// Deep cascades stay balanced.
#[test]
fn test_repeated_corner_splits_balanced() {
  let mut tree = uniform_tree(0);
  let bounds = LevelBounds::new(0, 7);

  // Keep refining the leaf just below-left of the domain center.
  for level in 0..7u32 {
    let target = tree.leaf_at([0.49, 0.49]).unwrap();
    assert_eq!(target.level, level);
    tree.split(target, &bounds).unwrap();
    assert!(tree.is_balanced(), "Unbalanced after level {}", level);
  }
  assert_eq!(tree.depth(), 7);
}

// =========================================================================
// Merge
// =========================================================================

/// Merging sets the parent to the mean of its children.
#[test]
fn test_merge_restricts_mean() {
  let mut tree = uniform_tree(2);
  let parent = CellId::new(1, [1, 1]);
  for (i, child) in parent.children().into_iter().enumerate() {
    tree.leaf_values_mut(&child).unwrap()[0] = i as f64;
  }

  tree.merge(parent, &LevelBounds::new(0, 4)).unwrap();

  assert!(tree.is_leaf(&parent));
  assert_eq!(tree.value(&parent, 0), Some(1.5));
  assert_eq!(tree.leaf_count(), 16 - 4 + 1);
  for child in parent.children() {
    assert!(!tree.contains(&child));
  }
}

/// Split then merge with no field change restores the constant value exactly.
#[test]
fn test_split_merge_round_trip_constant() {
  let mut tree = uniform_tree(2);
  fill_constant(&mut tree, 0.1);
  let bounds = LevelBounds::new(0, 5);
  let target = CellId::new(2, [1, 2]);

  tree.split(target, &bounds).unwrap();
  tree.merge(target, &bounds).unwrap();

  assert_eq!(tree.value(&target, 0), Some(0.1));
  assert_eq!(tree.leaf_count(), 16);
}

/// Merge refusals: leaf, nested children, min level, balance.
#[test]
fn test_merge_rejections() {
  let mut tree = uniform_tree(2);
  let bounds = LevelBounds::new(1, 6);

  let err = tree.merge(CellId::new(2, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::NotInternal));

  let err = tree.merge(CellId::new(0, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::BelowMinLevel));

  tree.split(CellId::new(2, [1, 1]), &bounds).unwrap();
  let err = tree.merge(CellId::new(1, [0, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::NestedChildren));

  // L1[1,0] has children next to L2[1,1], which is now internal.
  let before = tree.leaf_ids();
  let err = tree.merge(CellId::new(1, [1, 0]), &bounds).unwrap_err();
  assert_eq!(err.reason(), Some(InvalidReason::Unbalanced));
  assert_eq!(tree.leaf_ids(), before, "Failed merge must not change the tree");
}

// =========================================================================
// Restriction and neighbors
// =========================================================================

/// restrict_all refreshes internal records from the leaves.
#[test]
fn test_restrict_all() {
  let mut tree = uniform_tree(2);
  tree.for_each_leaf_mut(|id, values| values[0] = (id.coords[0] + 4 * id.coords[1]) as f64);
  tree.restrict_all();

  // Mean of 0..16
  assert_eq!(tree.value(&CellId::root(), 0), Some(7.5));
  // Children of L1[0,0]: 0, 1, 4, 5
  assert_eq!(tree.value(&CellId::new(1, [0, 0]), 0), Some(2.5));
}

/// adjacent_leaves returns coarser, equal or finer leaves against a face.
#[test]
fn test_adjacent_leaves() {
  let mut tree = uniform_tree(2);
  let bounds = LevelBounds::new(0, 4);
  tree.split(CellId::new(2, [2, 1]), &bounds).unwrap();

  let same = tree.adjacent_leaves(&CellId::new(2, [0, 1]), 0, true);
  assert_eq!(same.as_slice(), &[CellId::new(2, [1, 1])]);

  let mut finer = tree.adjacent_leaves(&CellId::new(2, [1, 1]), 0, true);
  finer.sort();
  assert_eq!(finer.as_slice(), &[CellId::new(3, [4, 2]), CellId::new(3, [4, 3])]);

  let coarser = tree.adjacent_leaves(&CellId::new(3, [5, 3]), 1, true);
  assert_eq!(coarser.as_slice(), &[CellId::new(2, [2, 2])]);

  assert!(tree.adjacent_leaves(&CellId::new(2, [0, 0]), 0, false).is_empty());
}

/// 3-D trees split into eight children.
#[test]
fn test_octree_split() {
  let mut tree = CellTree::<3>::new(DomainConfig::unit(1), layout()).unwrap();
  assert_eq!(tree.leaf_count(), 8);
  tree.split(CellId::new(1, [1, 1, 1]), &LevelBounds::new(0, 3)).unwrap();
  assert_eq!(tree.leaf_count(), 15);
  assert!(tree.is_balanced());
}
