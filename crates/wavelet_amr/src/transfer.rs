//! Inter-level transfer operators.
//!
//! Restriction is the arithmetic mean of the children. Prolongation is a
//! linear reconstruction from the parent value and the slopes measured
//! against the parent's face neighbors on the parent level:
//!
//! ```text
//! child = p + sum_a s_a * g_a / 4      s_a = +1 / -1 from orthant bit a
//! g_a   = (p+ - p-) / 2                both neighbors inside the domain
//!       = p+ - p  |  p - p-            one-sided at the boundary
//!       = 0                            no neighbor on either side
//! ```
//!
//! Both operators are exact for affine data, and the restriction of a
//! prolongation gives back the parent value.

use smallvec::SmallVec;

use crate::tree::{CellId, Values};

/// Read access to field records on any level of the hierarchy.
pub trait LevelValues<const D: usize> {
  /// Record of the cell `id`, or of its nearest existing ancestor when the
  /// region is covered by a coarser leaf.
  fn level_values(&self, id: &CellId<D>) -> Option<&[f64]>;
}

/// Mean of the children records, per field.
///
/// Accumulates offsets from the first child so that equal children restrict
/// to exactly their common value.
pub fn restrict<'a, I>(children: I, width: usize) -> Values
where
  I: IntoIterator<Item = &'a [f64]>,
{
  let mut children = children.into_iter();
  let Some(first) = children.next() else {
    return SmallVec::from_elem(0.0, width);
  };
  let mut offset: Values = SmallVec::from_elem(0.0, width);
  let mut count = 1usize;
  for child in children {
    for ((acc, v), base) in offset.iter_mut().zip(child).zip(first) {
      *acc += v - base;
    }
    count += 1;
  }
  first
    .iter()
    .zip(&offset)
    .map(|(base, acc)| base + acc / count as f64)
    .collect()
}

/// Slope of `field` across one parent cell along `axis`.
fn slope<const D: usize, S: LevelValues<D>>(
  source: &S,
  parent: &CellId<D>,
  parent_value: f64,
  axis: usize,
  field: usize,
) -> f64 {
  let sample = |positive: bool| {
    parent
      .face_neighbor(axis, positive)
      .and_then(|n| source.level_values(&n))
      .map(|values| values[field])
  };
  match (sample(false), sample(true)) {
    (Some(minus), Some(plus)) => 0.5 * (plus - minus),
    (None, Some(plus)) => plus - parent_value,
    (Some(minus), None) => parent_value - minus,
    (None, None) => 0.0,
  }
}

/// Prolong one field of `parent` to the child in `orthant`.
pub fn prolong_field<const D: usize, S: LevelValues<D>>(
  source: &S,
  parent: &CellId<D>,
  parent_value: f64,
  orthant: usize,
  field: usize,
) -> f64 {
  let mut value = parent_value;
  for axis in 0..D {
    let sign = if (orthant >> axis) & 1 == 1 { 1.0 } else { -1.0 };
    value += sign * 0.25 * slope(source, parent, parent_value, axis, field);
  }
  value
}

/// Prolong every field of `parent` to the child in `orthant`.
pub fn prolong<const D: usize, S: LevelValues<D>>(
  source: &S,
  parent: &CellId<D>,
  parent_values: &[f64],
  orthant: usize,
) -> Values {
  parent_values
    .iter()
    .enumerate()
    .map(|(field, &p)| prolong_field(source, parent, p, orthant, field))
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  /// Flat map of records keyed by id, for exercising the operators alone.
  struct MapSource(HashMap<CellId<2>, Values>);

  impl LevelValues<2> for MapSource {
    fn level_values(&self, id: &CellId<2>) -> Option<&[f64]> {
      self.0.get(id).map(|v| v.as_slice())
    }
  }

  fn record(v: f64) -> Values {
    SmallVec::from_elem(v, 1)
  }

  #[test]
  fn test_restrict_mean() {
    let a = [1.0, 10.0];
    let b = [3.0, 20.0];
    let out = restrict([&a[..], &b[..]], 2);
    assert_eq!(out.as_slice(), &[2.0, 15.0]);
  }

  /// Without neighbors, prolongation is injection.
  #[test]
  fn test_prolong_isolated_is_injection() {
    let source = MapSource(HashMap::new());
    let root = CellId::<2>::root();
    for orthant in 0..4 {
      let v = prolong(&source, &root, &[2.5], orthant);
      assert_eq!(v.as_slice(), &[2.5]);
    }
  }

  /// f(x, y) = 2x + 3y sampled at cell centers is reproduced exactly.
  #[test]
  fn test_prolong_exact_for_affine() {
    let f = |x: f64, y: f64| 2.0 * x + 3.0 * y;
    let h = 0.25; // level 2 on the unit square
    let center = |id: &CellId<2>| {
      (
        (id.coords[0] as f64 + 0.5) * h,
        (id.coords[1] as f64 + 0.5) * h,
      )
    };

    let mut map = HashMap::new();
    for i in 0..4 {
      for j in 0..4 {
        let id = CellId::new(2, [i, j]);
        let (x, y) = center(&id);
        map.insert(id, record(f(x, y)));
      }
    }
    let source = MapSource(map);

    // Interior and boundary parents alike.
    for parent in [CellId::new(2, [1, 2]), CellId::new(2, [0, 3])] {
      let (px, py) = center(&parent);
      for orthant in 0..4 {
        let child = parent.child(orthant).unwrap();
        let (cx, cy) = (
          (child.coords[0] as f64 + 0.5) * h / 2.0,
          (child.coords[1] as f64 + 0.5) * h / 2.0,
        );
        let v = prolong_field(&source, &parent, f(px, py), orthant, 0);
        assert!(
          (v - f(cx, cy)).abs() < 1e-12,
          "parent {} orthant {}: {} vs {}",
          parent,
          orthant,
          v,
          f(cx, cy)
        );
      }
    }
  }

  /// Restricting the prolonged children gives back the parent value.
  #[test]
  fn test_restrict_of_prolong_recovers_parent() {
    let mut map = HashMap::new();
    map.insert(CellId::new(1, [0, 0]), record(1.0));
    map.insert(CellId::new(1, [1, 0]), record(4.0));
    map.insert(CellId::new(1, [0, 1]), record(-2.0));
    map.insert(CellId::new(1, [1, 1]), record(0.5));
    let source = MapSource(map);

    let parent = CellId::new(1, [1, 0]);
    let children: Vec<Values> = (0..4)
      .map(|o| prolong(&source, &parent, &[4.0], o))
      .collect();
    let back = restrict(children.iter().map(|c| c.as_slice()), 1);
    assert!((back[0] - 4.0).abs() < 1e-12);
  }
}
