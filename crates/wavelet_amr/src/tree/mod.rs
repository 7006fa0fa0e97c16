//! Cell tree module: hierarchical spatial grid in `D` dimensions.
//!
//! The tree is a quadtree for `D = 2` and an octree for `D = 3`. Cells are
//! stored in an arena keyed by [`CellId`] (`level`, `coords`); no links are
//! stored, parent/child relations are computed from the ids.
//!
//! # Level Convention
//!
//! Level 0 = root covering the whole domain, higher level = finer.
//!
//! ```text
//! Cell Size = domain_size / 2^level
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: `CellId` - immutable value type for tree positions
//! - [`config`]: `DomainConfig`, `LevelBounds`, `AdaptConfig`
//! - [`fields`]: `FieldLayout` and the tracked `FieldSet`
//! - [`store`]: `CellTree` - the arena with split/merge

pub mod config;
pub mod fields;
pub mod node;
pub mod store;

// Re-exports
pub use config::{AdaptConfig, DomainConfig, LevelBounds};
pub use fields::{FieldLayout, FieldSet, TrackedField};
pub use node::{faces, CellId, MAX_TREE_LEVEL};
pub use store::{Cell, CellKind, CellTree, Leaves, Values};
