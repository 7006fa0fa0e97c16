//! Wavelet-adaptive scenario driver.
//!
//! Runs one of the analytic scenarios on an adaptive quadtree: the leaves are
//! resampled every iteration, then one adaptation cycle follows the features.
//!
//! - bump: Gaussian depth perturbation spreading over time
//! - moving_cylinder: solid cylinder translating through fluid at rest

mod config;
mod scenario;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use config::{DriverConfig, ScenarioKind};
use simulation::Simulation;

/// Wavelet-adaptive mesh refinement driver.
#[derive(Parser, Debug)]
#[command(name = "amr_driver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Runs analytic scenarios on a wavelet-adaptive quadtree")]
struct Args {
  /// Path to configuration TOML file.
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Built-in preset used when no config file is given.
  #[arg(short, long, value_enum, default_value = "bump")]
  preset: ScenarioKind,

  /// Override the number of iterations.
  #[arg(short, long)]
  iterations: Option<usize>,

  /// Log level (trace, debug, info, warn, error).
  #[arg(short, long, default_value = "info")]
  log_level: String,
}

fn main() -> Result<()> {
  let args = Args::parse();

  let level = match args.log_level.to_lowercase().as_str() {
    "trace" => Level::TRACE,
    "debug" => Level::DEBUG,
    "info" => Level::INFO,
    "warn" => Level::WARN,
    "error" => Level::ERROR,
    _ => Level::INFO,
  };
  let subscriber = FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .finish();
  tracing::subscriber::set_global_default(subscriber)?;

  let mut config = match &args.config {
    Some(path) => {
      tracing::info!(path = %path.display(), "loading config");
      DriverConfig::load(path)?
    }
    None => DriverConfig::preset(args.preset)?,
  };
  if let Some(iterations) = args.iterations {
    config.iterations = iterations;
  }

  tracing::info!(
    scenario = ?config.scenario,
    iterations = config.iterations,
    initial_level = config.domain.initial_level,
    min_level = config.adapt.min_level,
    max_level = config.adapt.max_level,
    "starting"
  );

  let mut sim = Simulation::new(&config)?;
  let passes = sim.initial_refinement()?;
  tracing::info!(passes, leaves = sim.tree().leaf_count(), "initial mesh ready");

  for _ in 0..config.iterations {
    sim.step()?;
  }
  sim.summary();
  println!("i={} t={}", sim.iteration(), sim.time());

  Ok(())
}
