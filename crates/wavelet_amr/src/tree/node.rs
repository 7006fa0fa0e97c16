//! CellId - immutable value type representing a position in the cell tree.
//!
//! Cells are identified by their level and their integer coordinates at that
//! level. Level 0 is the root and covers the whole domain; a cell at level `l`
//! has coordinates in `0..2^l` on every axis.

use std::fmt;

use smallvec::SmallVec;

/// Deepest level a cell may reach (coordinates are stored as `i32`).
pub const MAX_TREE_LEVEL: u32 = 30;

/// Cell identifier - immutable value type.
///
/// Coordinates are at the cell's own level, not the finest level, so
/// parent/child relations reduce to shifts.
///
/// Ordering is by level first (coarsest first), then by coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct CellId<const D: usize> {
  /// Refinement level (0 = root, higher = finer).
  pub level: u32,
  /// Grid position at this cell's level.
  pub coords: [i32; D],
}

impl<const D: usize> CellId<D> {
  /// Number of children of an internal cell (2^D).
  pub const CHILDREN: usize = 1 << D;

  /// Create a new cell id at the given level and coordinates.
  pub fn new(level: u32, coords: [i32; D]) -> Self {
    Self { level, coords }
  }

  /// The root cell covering the whole domain.
  pub fn root() -> Self {
    Self {
      level: 0,
      coords: [0; D],
    }
  }

  /// Number of cells along each axis at this cell's level.
  #[inline]
  pub fn extent(&self) -> i32 {
    1 << self.level
  }

  /// Whether the coordinates lie inside the domain at this level.
  #[inline]
  pub fn in_domain(&self) -> bool {
    let extent = self.extent();
    self.coords.iter().all(|&c| (0..extent).contains(&c))
  }

  /// Get child cell (finer detail: level + 1).
  ///
  /// Orthant: bit `a` set means +1 offset along axis `a`.
  ///
  /// Returns None at [`MAX_TREE_LEVEL`] or for an out-of-range orthant.
  pub fn child(&self, orthant: usize) -> Option<Self> {
    if self.level >= MAX_TREE_LEVEL || orthant >= Self::CHILDREN {
      return None;
    }
    let mut coords = self.coords;
    for (axis, c) in coords.iter_mut().enumerate() {
      *c = *c * 2 + ((orthant >> axis) & 1) as i32;
    }
    Some(Self {
      level: self.level + 1,
      coords,
    })
  }

  /// All children in orthant order. Empty at [`MAX_TREE_LEVEL`].
  pub fn children(&self) -> SmallVec<[Self; 8]> {
    (0..Self::CHILDREN)
      .filter_map(|orthant| self.child(orthant))
      .collect()
  }

  /// Get parent cell (coarser: level - 1). None for the root.
  pub fn parent(&self) -> Option<Self> {
    if self.level == 0 {
      return None;
    }
    Some(Self {
      level: self.level - 1,
      coords: self.coords.map(|c| c >> 1),
    })
  }

  /// Ancestor at a coarser (or equal) level.
  pub fn ancestor(&self, level: u32) -> Option<Self> {
    if level > self.level {
      return None;
    }
    let shift = self.level - level;
    Some(Self {
      level,
      coords: self.coords.map(|c| c >> shift),
    })
  }

  /// Position of this cell within its parent.
  #[inline]
  pub fn orthant(&self) -> usize {
    self
      .coords
      .iter()
      .enumerate()
      .fold(0, |acc, (axis, &c)| acc | (((c & 1) as usize) << axis))
  }

  /// Same-level face neighbor along `axis`. None outside the domain.
  pub fn face_neighbor(&self, axis: usize, positive: bool) -> Option<Self> {
    let mut coords = self.coords;
    coords[axis] += if positive { 1 } else { -1 };
    let neighbor = Self {
      level: self.level,
      coords,
    };
    neighbor.in_domain().then_some(neighbor)
  }

  /// Whether `self` is `other` or one of its ancestors.
  pub fn contains(&self, other: &Self) -> bool {
    other.ancestor(self.level) == Some(*self)
  }
}

impl<const D: usize> fmt::Display for CellId<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}{:?}", self.level, self.coords)
  }
}

/// All `(axis, positive)` face directions in dimension `D`.
pub fn faces<const D: usize>() -> impl Iterator<Item = (usize, bool)> {
  (0..D).flat_map(|axis| [(axis, false), (axis, true)])
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
