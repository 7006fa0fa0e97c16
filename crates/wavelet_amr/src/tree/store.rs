//! CellTree - arena of cells keyed by `(level, coords)`.
//!
//! Every cell of the hierarchy is stored, leaves and internal nodes alike;
//! parent/child relations are computed from the ids. Internal records hold a
//! cached restriction of their children, refreshed by [`CellTree::restrict_all`],
//! by merges, and on the parent level before a split prolongs from it. The
//! solver only reads and writes leaf records.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::config::{DomainConfig, LevelBounds};
use super::fields::FieldLayout;
use super::node::{faces, CellId};
use crate::error::{AmrError, ConfigError, InvalidReason};
use crate::transfer::{self, LevelValues};

/// Per-cell field record, one slot per layout field.
pub type Values = SmallVec<[f64; 4]>;

/// Whether a cell is active or has children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
  /// Active cell, participates in computation.
  Leaf,
  /// Has exactly 2^D children; its record is a cached restriction.
  Internal,
}

/// A cell record.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
  kind: CellKind,
  values: Values,
}

impl Cell {
  fn leaf(values: Values) -> Self {
    Self {
      kind: CellKind::Leaf,
      values,
    }
  }

  pub fn kind(&self) -> CellKind {
    self.kind
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.kind == CellKind::Leaf
  }

  #[inline]
  pub fn values(&self) -> &[f64] {
    &self.values
  }

  #[inline]
  pub fn value(&self, field: usize) -> f64 {
    self.values[field]
  }
}

/// Hierarchical grid over a square/cubic domain.
#[derive(Clone, Debug)]
pub struct CellTree<const D: usize> {
  domain: DomainConfig<D>,
  layout: FieldLayout,
  cells: HashMap<CellId<D>, Cell>,
  leaf_count: usize,
}

impl<const D: usize> CellTree<D> {
  /// Create a uniform tree refined to `domain.initial_level`, all values 0.
  pub fn new(domain: DomainConfig<D>, layout: FieldLayout) -> Result<Self, ConfigError> {
    domain.validate()?;
    let width = layout.len();
    let mut cells = HashMap::new();
    let mut level_ids = vec![CellId::root()];
    for _ in 0..domain.initial_level {
      let mut next = Vec::with_capacity(level_ids.len() * CellId::<D>::CHILDREN);
      for id in level_ids {
        cells.insert(
          id,
          Cell {
            kind: CellKind::Internal,
            values: SmallVec::from_elem(0.0, width),
          },
        );
        next.extend(id.children());
      }
      level_ids = next;
    }
    let leaf_count = level_ids.len();
    for id in level_ids {
      cells.insert(id, Cell::leaf(SmallVec::from_elem(0.0, width)));
    }
    Ok(Self {
      domain,
      layout,
      cells,
      leaf_count,
    })
  }

  pub fn domain(&self) -> &DomainConfig<D> {
    &self.domain
  }

  pub fn layout(&self) -> &FieldLayout {
    &self.layout
  }

  /// Number of stored cells (leaves and internal nodes).
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  /// Always false: the root is never removed.
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  pub fn leaf_count(&self) -> usize {
    self.leaf_count
  }

  pub fn get(&self, id: &CellId<D>) -> Option<&Cell> {
    self.cells.get(id)
  }

  pub fn contains(&self, id: &CellId<D>) -> bool {
    self.cells.contains_key(id)
  }

  pub fn is_leaf(&self, id: &CellId<D>) -> bool {
    self.cells.get(id).is_some_and(Cell::is_leaf)
  }

  pub fn value(&self, id: &CellId<D>, field: usize) -> Option<f64> {
    self.cells.get(id).map(|c| c.value(field))
  }

  /// Mutable record of a leaf. None for internal or missing cells.
  pub fn leaf_values_mut(&mut self, id: &CellId<D>) -> Option<&mut [f64]> {
    self
      .cells
      .get_mut(id)
      .filter(|c| c.is_leaf())
      .map(|c| c.values.as_mut_slice())
  }

  /// Side length of cells on `level`.
  pub fn cell_size(&self, level: u32) -> f64 {
    self.domain.cell_size(level)
  }

  /// Volume (area in 2-D) of cells on `level`.
  pub fn cell_volume(&self, level: u32) -> f64 {
    self.domain.cell_volume(level)
  }

  pub fn cell_center(&self, id: &CellId<D>) -> [f64; D] {
    self.domain.cell_center(id)
  }

  // ===========================================================================
  // Traversal
  // ===========================================================================

  /// Leaves in depth-first orthant order. Each call starts a fresh pass.
  pub fn leaves(&self) -> Leaves<'_, D> {
    Leaves {
      tree: self,
      stack: vec![CellId::root()],
    }
  }

  /// Collected leaf ids in traversal order.
  pub fn leaf_ids(&self) -> Vec<CellId<D>> {
    self.leaves().map(|(id, _)| id).collect()
  }

  pub fn for_each_leaf(&self, mut visitor: impl FnMut(CellId<D>, &Cell)) {
    for (id, cell) in self.leaves() {
      visitor(id, cell);
    }
  }

  /// Visit every leaf with write access to its record.
  pub fn for_each_leaf_mut(&mut self, mut visitor: impl FnMut(CellId<D>, &mut [f64])) {
    for id in self.leaf_ids() {
      if let Some(values) = self.leaf_values_mut(&id) {
        visitor(id, values);
      }
    }
  }

  /// Leaf containing a physical point. None outside the domain.
  pub fn leaf_at(&self, point: [f64; D]) -> Option<CellId<D>> {
    let unit = self.domain.normalize(point)?;
    let mut id = CellId::root();
    loop {
      let cell = self.cells.get(&id)?;
      if cell.is_leaf() {
        return Some(id);
      }
      let child_extent = (id.extent() * 2) as f64;
      let mut orthant = 0;
      for axis in 0..D {
        // Points on the far boundary belong to the last cell.
        let index = ((unit[axis] * child_extent) as i32).min(id.extent() * 2 - 1);
        orthant |= ((index & 1) as usize) << axis;
      }
      id = id.child(orthant)?;
    }
  }

  /// Finest level among the leaves.
  pub fn depth(&self) -> u32 {
    self.leaves().map(|(id, _)| id.level).max().unwrap_or(0)
  }

  /// Leaves touching the face of `id` in the given direction: the same-level
  /// neighbor, the coarser leaf covering it, or the finer leaves against the
  /// face.
  pub fn adjacent_leaves(&self, id: &CellId<D>, axis: usize, positive: bool) -> SmallVec<[CellId<D>; 4]> {
    let mut out = SmallVec::new();
    let Some(neighbor) = id.face_neighbor(axis, positive) else {
      return out;
    };
    match self.covering(&neighbor) {
      Some((found, cell)) if found == neighbor && !cell.is_leaf() => {
        // Descend on the side facing `id`.
        let mut stack = vec![neighbor];
        while let Some(cur) = stack.pop() {
          match self.cells.get(&cur) {
            Some(c) if c.is_leaf() => out.push(cur),
            Some(_) => stack.extend(
              cur
                .children()
                .into_iter()
                .filter(|child| ((child.orthant() >> axis) & 1 == 1) != positive),
            ),
            None => {}
          }
        }
      }
      Some((found, _)) => out.push(found),
      None => {}
    }
    out
  }

  /// Leaf strictly coarser than `id` across the given face, if any.
  pub fn coarser_neighbor(&self, id: &CellId<D>, axis: usize, positive: bool) -> Option<CellId<D>> {
    let neighbor = id.face_neighbor(axis, positive)?;
    match self.covering(&neighbor) {
      Some((found, _)) if found.level < id.level => Some(found),
      _ => None,
    }
  }

  /// The cell `id` if stored, otherwise its nearest stored ancestor.
  fn covering(&self, id: &CellId<D>) -> Option<(CellId<D>, &Cell)> {
    let mut cur = *id;
    loop {
      if let Some(cell) = self.cells.get(&cur) {
        return Some((cur, cell));
      }
      cur = cur.parent()?;
    }
  }

  /// Whether face-adjacent leaves differ by at most one level.
  ///
  /// Checking only the coarser side of every leaf covers every pair.
  pub fn is_balanced(&self) -> bool {
    self.leaves().all(|(id, _)| {
      faces::<D>().all(|(axis, positive)| {
        self
          .coarser_neighbor(&id, axis, positive)
          .map_or(true, |coarse| coarse.level + 1 >= id.level)
      })
    })
  }

  // ===========================================================================
  // Mutation
  // ===========================================================================

  /// Split a leaf into 2^D children initialized by prolongation.
  ///
  /// Coarser face neighbors are split first (recursively) so the result is
  /// 2:1 balanced. Returns the number of cells split, cascade included.
  pub fn split(&mut self, id: CellId<D>, bounds: &LevelBounds) -> Result<usize, AmrError> {
    let cell = self
      .cells
      .get(&id)
      .ok_or_else(|| AmrError::invalid(id, InvalidReason::MissingCell))?;
    if !cell.is_leaf() {
      return Err(AmrError::invalid(id, InvalidReason::NotLeaf));
    }
    if id.level >= bounds.max_level || id.child(0).is_none() {
      return Err(AmrError::invalid(id, InvalidReason::AtMaxLevel));
    }
    Ok(self.split_balanced(id))
  }

  fn split_balanced(&mut self, id: CellId<D>) -> usize {
    let mut count = 0;
    for (axis, positive) in faces::<D>() {
      if let Some(coarse) = self.coarser_neighbor(&id, axis, positive) {
        count += self.split_balanced(coarse);
      }
    }
    self.split_leaf(id);
    count + 1
  }

  fn split_leaf(&mut self, id: CellId<D>) {
    let parent_values = match self.cells.get(&id) {
      Some(cell) if cell.is_leaf() => cell.values.clone(),
      _ => return,
    };
    // Leaves may have been written since the last restriction; the slopes
    // read internal neighbors on this level.
    for (axis, positive) in faces::<D>() {
      if let Some(neighbor) = id.face_neighbor(axis, positive) {
        self.refresh_internal(&neighbor);
      }
    }
    let children: SmallVec<[(CellId<D>, Values); 8]> = id
      .children()
      .into_iter()
      .map(|child| {
        let values = transfer::prolong(&*self, &id, &parent_values, child.orthant());
        (child, values)
      })
      .collect();
    let added = children.len();
    for (child, values) in children {
      self.cells.insert(child, Cell::leaf(values));
    }
    if let Some(cell) = self.cells.get_mut(&id) {
      cell.kind = CellKind::Internal;
    }
    self.leaf_count += added - 1;
  }

  /// Recompute the record of an internal cell from the leaves below it.
  /// Leaves and missing cells are left alone.
  fn refresh_internal(&mut self, id: &CellId<D>) {
    if !self.cells.get(id).is_some_and(|c| !c.is_leaf()) {
      return;
    }
    if let Some(values) = self.subtree_restriction(id) {
      if let Some(cell) = self.cells.get_mut(id) {
        cell.values = values;
      }
    }
  }

  fn subtree_restriction(&self, id: &CellId<D>) -> Option<Values> {
    let cell = self.cells.get(id)?;
    if cell.is_leaf() {
      return Some(cell.values.clone());
    }
    let children: SmallVec<[Values; 8]> = id
      .children()
      .iter()
      .filter_map(|child| self.subtree_restriction(child))
      .collect();
    Some(transfer::restrict(
      children.iter().map(|v| v.as_slice()),
      self.layout.len(),
    ))
  }

  /// Collapse the children of an internal cell, restricting their values.
  pub fn merge(&mut self, parent: CellId<D>, bounds: &LevelBounds) -> Result<(), AmrError> {
    let cell = self
      .cells
      .get(&parent)
      .ok_or_else(|| AmrError::invalid(parent, InvalidReason::MissingCell))?;
    if cell.is_leaf() {
      return Err(AmrError::invalid(parent, InvalidReason::NotInternal));
    }
    if parent.level < bounds.min_level {
      return Err(AmrError::invalid(parent, InvalidReason::BelowMinLevel));
    }
    let children = parent.children();
    if !children.iter().all(|child| self.is_leaf(child)) {
      return Err(AmrError::invalid(parent, InvalidReason::NestedChildren));
    }
    // An internal neighbor of a child would sit two levels finer than the
    // merged cell.
    for child in &children {
      for (axis, positive) in faces::<D>() {
        let Some(neighbor) = child.face_neighbor(axis, positive) else {
          continue;
        };
        if parent.contains(&neighbor) {
          continue;
        }
        if self.cells.get(&neighbor).is_some_and(|c| !c.is_leaf()) {
          return Err(AmrError::invalid(parent, InvalidReason::Unbalanced));
        }
      }
    }

    let width = self.layout.len();
    let values = transfer::restrict(
      children
        .iter()
        .filter_map(|child| self.cells.get(child))
        .map(Cell::values),
      width,
    );
    for child in &children {
      self.cells.remove(child);
    }
    if let Some(cell) = self.cells.get_mut(&parent) {
      cell.kind = CellKind::Leaf;
      cell.values = values;
    }
    self.leaf_count -= children.len() - 1;
    Ok(())
  }

  /// Restricted records of every internal cell, computed bottom-up without
  /// touching the tree.
  pub fn restricted_values(&self) -> HashMap<CellId<D>, Values> {
    let mut internal: Vec<CellId<D>> = self
      .cells
      .iter()
      .filter(|(_, c)| !c.is_leaf())
      .map(|(id, _)| *id)
      .collect();
    internal.sort_by(|a, b| b.cmp(a));

    let width = self.layout.len();
    let mut out: HashMap<CellId<D>, Values> = HashMap::with_capacity(internal.len());
    for id in internal {
      let children = id.children();
      let values = transfer::restrict(
        children.iter().filter_map(|child| {
          out
            .get(child)
            .map(|v| v.as_slice())
            .or_else(|| self.cells.get(child).map(Cell::values))
        }),
        width,
      );
      out.insert(id, values);
    }
    out
  }

  /// Refresh every internal record from the leaves, finest level first.
  pub fn restrict_all(&mut self) {
    for (id, values) in self.restricted_values() {
      if let Some(cell) = self.cells.get_mut(&id) {
        cell.values = values;
      }
    }
  }
}

impl<const D: usize> LevelValues<D> for CellTree<D> {
  fn level_values(&self, id: &CellId<D>) -> Option<&[f64]> {
    self.covering(id).map(|(_, cell)| cell.values())
  }
}

/// Depth-first iterator over leaves.
pub struct Leaves<'a, const D: usize> {
  tree: &'a CellTree<D>,
  stack: Vec<CellId<D>>,
}

impl<'a, const D: usize> Iterator for Leaves<'a, D> {
  type Item = (CellId<D>, &'a Cell);

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(id) = self.stack.pop() {
      let Some(cell) = self.tree.cells.get(&id) else {
        continue;
      };
      if cell.is_leaf() {
        return Some((id, cell));
      }
      // Reverse so orthant 0 is visited first.
      self.stack.extend(id.children().into_iter().rev());
    }
    None
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
