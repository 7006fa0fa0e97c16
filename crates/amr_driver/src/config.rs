//! Configuration parsing for driver runs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use wavelet_amr::{AdaptConfig, DomainConfig, FieldLayout, FieldSet};

const BUMP_PRESET: &str = include_str!("../presets/bump.toml");
const MOVING_CYLINDER_PRESET: &str = include_str!("../presets/moving_cylinder.toml");

/// Which analytic scenario drives the leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ScenarioKind {
  /// Gaussian bump on a shallow-water depth field.
  Bump,
  /// Cylinder moving through a channel at unit speed.
  MovingCylinder,
}

/// Root configuration for a driver run.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
  pub scenario: ScenarioKind,
  /// Number of iterations after the initial refinement.
  #[serde(default = "default_iterations")]
  pub iterations: usize,
  /// Log field statistics every this many iterations.
  #[serde(default = "default_stats_every")]
  pub stats_every: usize,
  pub domain: DomainSection,
  pub adapt: AdaptSection,
}

/// Square domain and starting grid.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainSection {
  pub origin: [f64; 2],
  pub size: f64,
  /// Uniform level the tree starts with (7 = 128 x 128).
  pub initial_level: u32,
}

/// Adaptation parameters and tolerances.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptSection {
  #[serde(default)]
  pub min_level: u32,
  pub max_level: u32,
  #[serde(default = "default_coarsen_ratio")]
  pub coarsen_ratio: f64,
  /// Fields driving refinement. Empty: every field with a threshold.
  #[serde(default)]
  pub tracked: Vec<String>,
  pub thresholds: BTreeMap<String, f64>,
}

fn default_iterations() -> usize {
  1000
}

fn default_stats_every() -> usize {
  1
}

fn default_coarsen_ratio() -> f64 {
  AdaptConfig::DEFAULT_COARSEN_RATIO
}

impl DriverConfig {
  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    Self::from_toml(&content).with_context(|| format!("Invalid config: {}", path.display()))
  }

  /// Built-in configuration reproducing one of the reference runs.
  pub fn preset(kind: ScenarioKind) -> Result<Self> {
    let content = match kind {
      ScenarioKind::Bump => BUMP_PRESET,
      ScenarioKind::MovingCylinder => MOVING_CYLINDER_PRESET,
    };
    Self::from_toml(content).with_context(|| format!("Invalid built-in preset {kind:?}"))
  }

  pub fn from_toml(content: &str) -> Result<Self> {
    let config: DriverConfig = toml::from_str(content).context("Failed to parse config TOML")?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.stats_every == 0 {
      anyhow::bail!("stats_every must be at least 1");
    }
    self.domain_config().validate()?;
    let adapt = self.adapt_config();
    adapt.validate()?;
    adapt
      .bounds
      .check_level(self.domain.initial_level)
      .context("initial_level must lie within [min_level, max_level]")?;
    if self.adapt.thresholds.is_empty() {
      anyhow::bail!("At least one threshold is required in [adapt.thresholds]");
    }
    Ok(())
  }

  pub fn domain_config(&self) -> DomainConfig<2> {
    DomainConfig {
      origin: self.domain.origin,
      size: self.domain.size,
      initial_level: self.domain.initial_level,
    }
  }

  pub fn adapt_config(&self) -> AdaptConfig {
    AdaptConfig::new(self.adapt.min_level, self.adapt.max_level)
      .with_coarsen_ratio(self.adapt.coarsen_ratio)
  }

  /// Resolve the tracked fields against the scenario's layout.
  pub fn field_set(&self, layout: &FieldLayout) -> Result<FieldSet> {
    let fields = if self.adapt.tracked.is_empty() {
      FieldSet::from_thresholds(layout, &self.adapt.thresholds)?
    } else {
      FieldSet::new(layout, self.adapt.tracked.as_slice(), &self.adapt.thresholds)?
    };
    Ok(fields)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
