//! wavelet_amr - Adaptive mesh refinement with wavelet error estimation
//!
//! A hierarchical cell tree (quadtree for `D = 2`, octree for `D = 3`) whose
//! resolution follows the data: leaves where a tracked field is rough are
//! split, leaves where every tracked field is smooth are merged back.
//!
//! # Features
//!
//! - **Cell tree**: arena keyed by `(level, coords)`, 2:1 balanced across
//!   faces, linear prolongation on split and mean restriction on merge
//! - **Wavelet estimator**: per-leaf restrict-then-prolong round-trip error,
//!   computed in parallel
//! - **Planner**: thresholds with hysteresis, level bounds, split propagation
//!   and sibling agreement
//! - **Mutator**: coarsest-first splits, finest-first merges
//!
//! # Example
//!
//! ```ignore
//! use wavelet_amr::{run_adaptation_cycle, AdaptConfig, CellTree, DomainConfig, FieldLayout, FieldSet};
//!
//! let layout = FieldLayout::new(["h"])?;
//! let mut tree = CellTree::new(DomainConfig::<2>::unit(7), layout)?;
//! let fields = FieldSet::from_thresholds(tree.layout(), &[("h".into(), 4e-3)].into())?;
//! let config = AdaptConfig::new(0, 8);
//!
//! // Once per iteration, after the solver updated the leaves:
//! let stats = run_adaptation_cycle(&mut tree, &fields, &config)?;
//! println!("{} splits, {} coarsens", stats.split_count, stats.coarsen_count);
//! ```

pub mod cycle;
pub mod error;
pub mod estimate;
pub mod metrics;
pub mod mutate;
pub mod plan;
pub mod transfer;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used items
pub use cycle::{run_adaptation_cycle, run_adaptation_cycle_observed, AdaptStats, AdaptationPhase};
pub use error::{AmrError, ConfigError, InvalidReason};
pub use estimate::{estimate_leaves, Estimates, Pyramid};
pub use metrics::{CycleMetrics, FieldStats, LevelHistogram, TimingWindow};
pub use mutate::{apply, AppliedCounts};
pub use plan::{plan, plan_from_estimates, Decision, RefinementRequest};
pub use tree::{
  AdaptConfig, Cell, CellId, CellKind, CellTree, DomainConfig, FieldLayout, FieldSet, LevelBounds,
  TrackedField, Values,
};
