//! Iteration loop: resample the scenario, then adapt, once per iteration.

use anyhow::{Context, Result};
use glam::DVec2;
use wavelet_amr::{
  run_adaptation_cycle, AdaptConfig, AdaptStats, CellTree, CycleMetrics, FieldLayout, FieldSet,
  FieldStats, LevelHistogram,
};

use crate::config::DriverConfig;
use crate::scenario::{self, Scenario};

pub struct Simulation {
  scenario: Box<dyn Scenario>,
  tree: CellTree<2>,
  fields: FieldSet,
  adapt: AdaptConfig,
  stats_every: usize,
  iteration: usize,
  time: f64,
  metrics: CycleMetrics,
}

impl Simulation {
  pub fn new(config: &DriverConfig) -> Result<Self> {
    let scenario = scenario::build(config.scenario);
    let layout = FieldLayout::new(scenario.fields().iter().copied())?;
    let fields = config
      .field_set(&layout)
      .context("Tracked fields do not match the scenario")?;
    let tree = CellTree::new(config.domain_config(), layout)?;
    let mut sim = Self {
      scenario,
      tree,
      fields,
      adapt: config.adapt_config(),
      stats_every: config.stats_every,
      iteration: 0,
      time: 0.0,
      metrics: CycleMetrics::default(),
    };
    sim.resample();
    Ok(sim)
  }

  pub fn tree(&self) -> &CellTree<2> {
    &self.tree
  }

  pub fn time(&self) -> f64 {
    self.time
  }

  pub fn iteration(&self) -> usize {
    self.iteration
  }

  /// Write the scenario at the current time into every leaf.
  fn resample(&mut self) {
    let scenario = &*self.scenario;
    let domain = self.tree.domain().clone();
    let t = self.time;
    self.tree.for_each_leaf_mut(|id, values| {
      let center = DVec2::from_array(domain.cell_center(&id));
      scenario.sample(center, domain.cell_size(id.level), t, values);
    });
  }

  /// Adapt to the initial data until the mesh stops changing.
  ///
  /// Returns the number of passes that changed the mesh.
  pub fn initial_refinement(&mut self) -> Result<usize> {
    let max_passes = (self.adapt.bounds.max_level - self.adapt.bounds.min_level) as usize + 1;
    let mut passes = 0;
    for _ in 0..max_passes {
      let stats = run_adaptation_cycle(&mut self.tree, &self.fields, &self.adapt)?;
      self.resample();
      if !stats.changed() {
        break;
      }
      passes += 1;
      tracing::info!(
        pass = passes,
        split = stats.split_count,
        coarsen = stats.coarsen_count,
        leaves = stats.leaves_after,
        "initial refinement"
      );
    }
    Ok(passes)
  }

  /// Advance one iteration: new time, resample, adapt.
  pub fn step(&mut self) -> Result<AdaptStats> {
    self.iteration += 1;
    self.time += self.scenario.time_step();
    self.resample();
    if self.iteration % self.stats_every == 0 {
      self.log_stats();
    }
    let stats = run_adaptation_cycle(&mut self.tree, &self.fields, &self.adapt)?;
    self.metrics.record(&stats);
    tracing::debug!(
      i = self.iteration,
      split = stats.split_count,
      coarsen = stats.coarsen_count,
      blocked = stats.blocked_coarsens,
      leaves = stats.leaves_after,
      us = stats.elapsed_us,
      "adapt"
    );
    Ok(stats)
  }

  fn log_stats(&self) {
    for field in self.fields.iter() {
      if let Some(s) = FieldStats::compute(&self.tree, field.index) {
        tracing::info!(
          i = self.iteration,
          t = self.time,
          field = %field.name,
          min = s.min,
          max = s.max,
          mean = s.mean,
          "stats"
        );
      }
    }
  }

  /// Log the final mesh and timing summary.
  pub fn summary(&self) {
    let histogram = LevelHistogram::from_tree(&self.tree);
    for (level, count) in histogram.iter() {
      tracing::info!(level, count, "leaves per level");
    }
    let timing = &self.metrics.cycle_times_us;
    let (lo, hi) = timing.min_max().unwrap_or_default();
    tracing::info!(
      i = self.iteration,
      t = self.time,
      leaves = self.tree.leaf_count(),
      splits = self.metrics.total_splits,
      coarsens = self.metrics.total_coarsens,
      blocked = self.metrics.total_blocked,
      avg_us = timing.average(),
      min_us = lo,
      max_us = hi,
      "done"
    );
  }
}

#[cfg(test)]
#[path = "simulation_test.rs"]
mod simulation_test;
