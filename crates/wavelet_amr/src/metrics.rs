//! Mesh and field statistics for drivers.
//!
//! # Usage
//!
//! ```ignore
//! let stats = FieldStats::compute(&tree, h)?;
//! tracing::info!(min = stats.min, max = stats.max, "h");
//!
//! metrics.record(&run_adaptation_cycle(&mut tree, &fields, &config)?);
//! let (lo, hi) = metrics.cycle_times_us.min_max().unwrap_or_default();
//! ```

use std::collections::VecDeque;

use crate::cycle::AdaptStats;
use crate::tree::CellTree;

/// Most recent cycle durations in microseconds, oldest first.
#[derive(Debug, Clone)]
pub struct TimingWindow {
  samples: VecDeque<u64>,
  capacity: usize,
}

impl TimingWindow {
  /// Default number of cycles kept.
  pub const DEFAULT_CAPACITY: usize = 128;

  /// A window keeping at most `capacity` samples. Zero keeps nothing.
  pub fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Record one duration, dropping the oldest when full.
  pub fn push(&mut self, us: u64) {
    if self.capacity == 0 {
      return;
    }
    if self.samples.len() == self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(us);
  }

  /// Number of samples currently held.
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  /// Mean of the held samples, 0 when empty.
  pub fn average(&self) -> f64 {
    if self.samples.is_empty() {
      return 0.0;
    }
    self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
  }

  /// Fastest and slowest held sample.
  pub fn min_max(&self) -> Option<(u64, u64)> {
    self.samples.iter().fold(None, |acc, &us| match acc {
      None => Some((us, us)),
      Some((lo, hi)) => Some((lo.min(us), hi.max(us))),
    })
  }
}

impl Default for TimingWindow {
  fn default() -> Self {
    Self::new(Self::DEFAULT_CAPACITY)
  }
}

/// Leaf count per level (index = level).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelHistogram {
  counts: Vec<usize>,
}

impl LevelHistogram {
  pub fn from_tree<const D: usize>(tree: &CellTree<D>) -> Self {
    let mut counts = Vec::new();
    for (id, _) in tree.leaves() {
      let level = id.level as usize;
      if counts.len() <= level {
        counts.resize(level + 1, 0);
      }
      counts[level] += 1;
    }
    Self { counts }
  }

  /// Leaves on `level`.
  pub fn count(&self, level: u32) -> usize {
    self.counts.get(level as usize).copied().unwrap_or(0)
  }

  pub fn total(&self) -> usize {
    self.counts.iter().sum()
  }

  pub fn coarsest(&self) -> Option<u32> {
    self.counts.iter().position(|&c| c > 0).map(|l| l as u32)
  }

  pub fn finest(&self) -> Option<u32> {
    self.counts.iter().rposition(|&c| c > 0).map(|l| l as u32)
  }

  /// `(level, count)` for every non-empty level, coarsest first.
  pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
    self
      .counts
      .iter()
      .enumerate()
      .filter(|&(_, &c)| c > 0)
      .map(|(l, &c)| (l as u32, c))
  }
}

/// Summary of one field over the leaves, weighted by cell volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
  pub min: f64,
  pub max: f64,
  /// Integral of the field over the domain.
  pub sum: f64,
  /// Total volume of the leaves.
  pub volume: f64,
  pub mean: f64,
  pub stddev: f64,
}

impl FieldStats {
  /// Statistics of layout slot `field`. None if the slot does not exist.
  pub fn compute<const D: usize>(tree: &CellTree<D>, field: usize) -> Option<Self> {
    if field >= tree.layout().len() {
      return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut sum2 = 0.0;
    let mut volume = 0.0;
    for (id, cell) in tree.leaves() {
      let v = cell.value(field);
      let dv = tree.cell_volume(id.level);
      min = min.min(v);
      max = max.max(v);
      sum += dv * v;
      sum2 += dv * v * v;
      volume += dv;
    }
    let mean = sum / volume;
    let stddev = (sum2 / volume - mean * mean).max(0.0).sqrt();
    Some(Self {
      min,
      max,
      sum,
      volume,
      mean,
      stddev,
    })
  }
}

/// Running totals across adaptation cycles.
#[derive(Clone, Debug, Default)]
pub struct CycleMetrics {
  /// Duration of recent cycles in microseconds.
  pub cycle_times_us: TimingWindow,
  pub cycles: usize,
  pub total_splits: usize,
  pub total_coarsens: usize,
  pub total_blocked: usize,
}

impl CycleMetrics {
  pub fn with_window(capacity: usize) -> Self {
    Self {
      cycle_times_us: TimingWindow::new(capacity),
      ..Default::default()
    }
  }

  pub fn record(&mut self, stats: &AdaptStats) {
    self.cycle_times_us.push(stats.elapsed_us);
    self.cycles += 1;
    self.total_splits += stats.split_count;
    self.total_coarsens += stats.coarsen_count;
    self.total_blocked += stats.blocked_coarsens;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::*;
  use crate::tree::{CellId, LevelBounds};

  /// Only the newest samples count towards the summary.
  #[test]
  fn test_timing_window_drops_oldest() {
    let mut window = TimingWindow::new(3);
    for us in [5, 1, 9, 4] {
      window.push(us);
    }
    assert_eq!(window.len(), 3);
    assert_eq!(window.min_max(), Some((1, 9)));
    assert!((window.average() - 14.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn test_timing_window_empty() {
    let window = TimingWindow::default();
    assert!(window.is_empty());
    assert_eq!(window.average(), 0.0);
    assert_eq!(window.min_max(), None);

    let mut disabled = TimingWindow::new(0);
    disabled.push(7);
    assert!(disabled.is_empty());
  }

  #[test]
  fn test_level_histogram() {
    let mut tree = unit_tree(2);
    tree
      .split(CellId::new(2, [0, 0]), &LevelBounds::new(0, 8))
      .unwrap();

    let histogram = LevelHistogram::from_tree(&tree);
    assert_eq!(histogram.count(2), 15);
    assert_eq!(histogram.count(3), 4);
    assert_eq!(histogram.count(7), 0);
    assert_eq!(histogram.total(), tree.leaf_count());
    assert_eq!(histogram.coarsest(), Some(2));
    assert_eq!(histogram.finest(), Some(3));
    assert_eq!(histogram.iter().collect::<Vec<_>>(), vec![(2, 15), (3, 4)]);
  }

  /// Volume weighting makes the mean independent of the refinement.
  #[test]
  fn test_field_stats_volume_weighted() {
    let mut tree = unit_tree(1);
    fill(&mut tree, |[x, _]| if x < 0.5 { 1.0 } else { 3.0 });
    tree
      .split(CellId::new(1, [1, 1]), &LevelBounds::new(0, 8))
      .unwrap();
    fill(&mut tree, |[x, _]| if x < 0.5 { 1.0 } else { 3.0 });

    let stats = FieldStats::compute(&tree, 0).unwrap();
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 3.0);
    assert!((stats.volume - 1.0).abs() < 1e-12);
    assert!((stats.sum - 2.0).abs() < 1e-12);
    assert!((stats.mean - 2.0).abs() < 1e-12);
    assert!((stats.stddev - 1.0).abs() < 1e-12);
    assert_eq!(FieldStats::compute(&tree, 1), None);
  }

  #[test]
  fn test_cycle_metrics_totals() {
    let mut metrics = CycleMetrics::with_window(2);
    for elapsed_us in [10, 20, 30] {
      metrics.record(&AdaptStats {
        split_count: 2,
        coarsen_count: 1,
        blocked_coarsens: 1,
        elapsed_us,
        ..Default::default()
      });
    }
    assert_eq!(metrics.cycles, 3);
    assert_eq!(metrics.total_splits, 6);
    assert_eq!(metrics.total_coarsens, 3);
    assert_eq!(metrics.total_blocked, 3);
    assert_eq!(metrics.cycle_times_us.min_max(), Some((20, 30)));
  }
}
