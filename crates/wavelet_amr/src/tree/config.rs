//! Configuration for the domain geometry and for adaptation.
//!
//! Both are plain values passed explicitly into every call; nothing here is
//! held in process-wide state.

use super::node::{CellId, MAX_TREE_LEVEL};
use crate::error::ConfigError;

/// Domain geometry: a cube of side `size` anchored at `origin`.
#[derive(Clone, Debug, PartialEq)]
pub struct DomainConfig<const D: usize> {
  /// Minimum corner of the domain.
  pub origin: [f64; D],
  /// Side length of the (square/cubic) domain.
  pub size: f64,
  /// Level of the uniform grid the tree starts with.
  pub initial_level: u32,
}

impl<const D: usize> DomainConfig<D> {
  /// Unit domain at the origin with the given initial level.
  pub fn unit(initial_level: u32) -> Self {
    Self {
      origin: [0.0; D],
      size: 1.0,
      initial_level,
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.size.is_finite() || self.size <= 0.0 {
      return Err(ConfigError::InvalidDomain(self.size));
    }
    if self.initial_level > MAX_TREE_LEVEL {
      return Err(ConfigError::LevelOutOfRange {
        level: self.initial_level,
        min: 0,
        max: MAX_TREE_LEVEL,
      });
    }
    Ok(())
  }

  /// Cell side length at the given level.
  /// cell_size = size / 2^level
  #[inline]
  pub fn cell_size(&self, level: u32) -> f64 {
    self.size / (1u64 << level) as f64
  }

  /// Cell volume (area in 2-D) at the given level.
  #[inline]
  pub fn cell_volume(&self, level: u32) -> f64 {
    self.cell_size(level).powi(D as i32)
  }

  /// Minimum corner of a cell.
  #[inline]
  pub fn cell_min(&self, id: &CellId<D>) -> [f64; D] {
    let h = self.cell_size(id.level);
    std::array::from_fn(|axis| self.origin[axis] + id.coords[axis] as f64 * h)
  }

  /// Center of a cell.
  #[inline]
  pub fn cell_center(&self, id: &CellId<D>) -> [f64; D] {
    let h = self.cell_size(id.level);
    let min = self.cell_min(id);
    min.map(|m| m + 0.5 * h)
  }

  /// Point in domain-normalized coordinates (`[0, 1]` per axis inside).
  pub(crate) fn normalize(&self, point: [f64; D]) -> Option<[f64; D]> {
    let mut out = [0.0; D];
    for axis in 0..D {
      let t = (point[axis] - self.origin[axis]) / self.size;
      if !(0.0..=1.0).contains(&t) {
        return None;
      }
      out[axis] = t;
    }
    Some(out)
  }
}

/// Minimum and maximum leaf level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelBounds {
  /// Coarsest level leaves may be merged to.
  pub min_level: u32,
  /// Finest level leaves may be split to.
  pub max_level: u32,
}

impl LevelBounds {
  pub fn new(min_level: u32, max_level: u32) -> Self {
    Self {
      min_level,
      max_level,
    }
  }

  #[inline]
  pub fn contains(&self, level: u32) -> bool {
    (self.min_level..=self.max_level).contains(&level)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.min_level > self.max_level {
      return Err(ConfigError::InvertedLevels {
        min: self.min_level,
        max: self.max_level,
      });
    }
    if self.max_level > MAX_TREE_LEVEL {
      return Err(ConfigError::LevelOutOfRange {
        level: self.max_level,
        min: 0,
        max: MAX_TREE_LEVEL,
      });
    }
    Ok(())
  }

  /// Check that a starting level lies within the bounds.
  pub fn check_level(&self, level: u32) -> Result<(), ConfigError> {
    if self.contains(level) {
      Ok(())
    } else {
      Err(ConfigError::LevelOutOfRange {
        level,
        min: self.min_level,
        max: self.max_level,
      })
    }
  }
}

impl Default for LevelBounds {
  fn default() -> Self {
    Self {
      min_level: 0,
      max_level: 8,
    }
  }
}

/// Adaptation parameters shared by the planner and the mutator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptConfig {
  /// Leaf level limits.
  pub bounds: LevelBounds,
  /// Hysteresis factor: a leaf may coarsen only when every tracked estimate
  /// is below `threshold * coarsen_ratio`.
  pub coarsen_ratio: f64,
}

impl AdaptConfig {
  /// Default hysteresis factor.
  pub const DEFAULT_COARSEN_RATIO: f64 = 0.5;

  pub fn new(min_level: u32, max_level: u32) -> Self {
    Self {
      bounds: LevelBounds::new(min_level, max_level),
      coarsen_ratio: Self::DEFAULT_COARSEN_RATIO,
    }
  }

  pub fn with_coarsen_ratio(mut self, coarsen_ratio: f64) -> Self {
    self.coarsen_ratio = coarsen_ratio;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.bounds.validate()?;
    if !(0.0..=1.0).contains(&self.coarsen_ratio) {
      return Err(ConfigError::InvalidCoarsenRatio(self.coarsen_ratio));
    }
    Ok(())
  }
}

impl Default for AdaptConfig {
  fn default() -> Self {
    Self {
      bounds: LevelBounds::default(),
      coarsen_ratio: Self::DEFAULT_COARSEN_RATIO,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
