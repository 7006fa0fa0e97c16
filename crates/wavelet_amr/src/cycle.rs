//! One adaptation cycle: estimate, plan, apply.
//!
//! The cycle is an explicit call made once per simulation iteration; no state
//! survives between cycles except the tree itself.
//!
//! ```text
//! Idle -> Estimating -> Planning -> Applying -> Idle
//! ```

use web_time::Instant;

use crate::error::{AmrError, ConfigError};
use crate::estimate::estimate_leaves;
use crate::mutate::{apply, AppliedCounts};
use crate::plan::plan_from_estimates;
use crate::tree::{AdaptConfig, CellTree, FieldSet};

/// Where a cycle currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AdaptationPhase {
  #[default]
  Idle,
  Estimating,
  Planning,
  Applying,
}

/// Statistics from one adaptation cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdaptStats {
  /// Cells split, balance cascades included.
  pub split_count: usize,
  /// Sibling groups merged.
  pub coarsen_count: usize,
  /// Sibling groups whose merge was refused.
  pub blocked_coarsens: usize,
  pub leaves_before: usize,
  pub leaves_after: usize,
  /// Wall time of the whole cycle in microseconds.
  pub elapsed_us: u64,
}

impl AdaptStats {
  /// Whether the mesh changed.
  #[inline]
  pub fn changed(&self) -> bool {
    self.split_count + self.coarsen_count > 0
  }

  fn record(&mut self, counts: AppliedCounts) {
    self.split_count = counts.split_count;
    self.coarsen_count = counts.coarsen_count;
    self.blocked_coarsens = counts.blocked_coarsens;
  }
}

/// Run one cycle to completion.
pub fn run_adaptation_cycle<const D: usize>(
  tree: &mut CellTree<D>,
  fields: &FieldSet,
  config: &AdaptConfig,
) -> Result<AdaptStats, AmrError> {
  run_adaptation_cycle_observed(tree, fields, config, |_| {})
}

/// Run one cycle, reporting every phase transition to `on_phase`.
///
/// Configuration is checked before any phase starts; a rejected call leaves
/// the tree untouched and reports no phase.
#[tracing::instrument(skip_all, name = "amr::adapt")]
pub fn run_adaptation_cycle_observed<const D: usize>(
  tree: &mut CellTree<D>,
  fields: &FieldSet,
  config: &AdaptConfig,
  mut on_phase: impl FnMut(AdaptationPhase),
) -> Result<AdaptStats, AmrError> {
  config.validate()?;
  if let Some(field) = fields.mismatch(tree.layout()) {
    return Err(ConfigError::LayoutMismatch(field.name.clone()).into());
  }

  let start = Instant::now();
  let mut stats = AdaptStats {
    leaves_before: tree.leaf_count(),
    ..Default::default()
  };

  // Phase 1: Estimate
  let estimates = {
    on_phase(AdaptationPhase::Estimating);
    let _span = tracing::info_span!("estimate").entered();
    estimate_leaves(tree, fields)
  };

  // Phase 2: Plan
  let request = {
    on_phase(AdaptationPhase::Planning);
    let _span = tracing::info_span!("plan").entered();
    plan_from_estimates(tree, fields, config, &estimates)
  };

  // Phase 3: Apply
  {
    on_phase(AdaptationPhase::Applying);
    let _span = tracing::info_span!("apply").entered();
    stats.record(apply(tree, &request, config));
  }

  on_phase(AdaptationPhase::Idle);
  stats.leaves_after = tree.leaf_count();
  stats.elapsed_us = start.elapsed().as_micros() as u64;
  tracing::debug!(
    split = stats.split_count,
    coarsen = stats.coarsen_count,
    blocked = stats.blocked_coarsens,
    leaves = stats.leaves_after,
    "adaptation cycle done"
  );
  Ok(stats)
}

#[cfg(test)]
#[path = "cycle_test.rs"]
mod cycle_test;
