//! Error types for tree operations and configuration.
//!
//! Tree operations are transactional: any error returned by a split or merge
//! leaves the tree exactly as it was.

use thiserror::Error;

use crate::tree::CellId;

/// Why a split or merge was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InvalidReason {
  #[error("cell is not part of the tree")]
  MissingCell,
  #[error("cell is already internal")]
  NotLeaf,
  #[error("cell has no children to merge")]
  NotInternal,
  #[error("cell is already at max_level")]
  AtMaxLevel,
  #[error("merged cell would be below min_level")]
  BelowMinLevel,
  #[error("a child is itself internal")]
  NestedChildren,
  #[error("operation would break 2:1 balance")]
  Unbalanced,
}

/// Malformed configuration, detected once at startup.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
  #[error("no threshold given for tracked field `{0}`")]
  MissingThreshold(String),
  #[error("field `{0}` is not part of the field layout")]
  UnknownField(String),
  #[error("tracked field `{0}` was resolved against a different field layout")]
  LayoutMismatch(String),
  #[error("field `{0}` appears twice in the field layout")]
  DuplicateField(String),
  #[error("field layout must contain at least one field")]
  EmptyLayout,
  #[error("min_level {min} is greater than max_level {max}")]
  InvertedLevels { min: u32, max: u32 },
  #[error("threshold for `{field}` must be finite and positive, got {value}")]
  InvalidThreshold { field: String, value: f64 },
  #[error("coarsen_ratio must be within [0, 1], got {0}")]
  InvalidCoarsenRatio(f64),
  #[error("level {level} is outside the allowed range {min}..={max}")]
  LevelOutOfRange { level: u32, min: u32, max: u32 },
  #[error("domain size must be finite and positive, got {0}")]
  InvalidDomain(f64),
}

/// Errors returned by the adaptation engine.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AmrError {
  /// A split or merge violating level bounds or tree consistency.
  #[error("invalid operation on cell {cell}: {reason}")]
  InvalidOperation { cell: String, reason: InvalidReason },
  #[error(transparent)]
  Configuration(#[from] ConfigError),
}

impl AmrError {
  pub(crate) fn invalid<const D: usize>(cell: CellId<D>, reason: InvalidReason) -> Self {
    Self::InvalidOperation {
      cell: cell.to_string(),
      reason,
    }
  }

  /// The refusal reason, for `InvalidOperation` errors.
  pub fn reason(&self) -> Option<InvalidReason> {
    match self {
      Self::InvalidOperation { reason, .. } => Some(*reason),
      Self::Configuration(_) => None,
    }
  }
}
