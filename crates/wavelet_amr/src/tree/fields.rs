//! Field layout stored per cell and the tracked subset with tolerances.

use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Ordered field names; every cell stores one `f64` per entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
  names: Vec<String>,
}

impl FieldLayout {
  /// Build a layout, rejecting empty or duplicate names.
  pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut out: Vec<String> = Vec::new();
    for name in names {
      let name = name.into();
      if out.contains(&name) {
        return Err(ConfigError::DuplicateField(name));
      }
      out.push(name);
    }
    if out.is_empty() {
      return Err(ConfigError::EmptyLayout);
    }
    Ok(Self { names: out })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

/// A field that drives refinement.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedField {
  pub name: String,
  /// Slot in the cell record.
  pub index: usize,
  /// Refinement tolerance.
  pub threshold: f64,
}

/// Tracked fields with their tolerances, resolved against a layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldSet {
  fields: Vec<TrackedField>,
  layout: Vec<String>,
}

impl FieldSet {
  /// Resolve `tracked` names against `layout`, taking each tolerance from
  /// `thresholds`.
  pub fn new<S: AsRef<str>>(
    layout: &FieldLayout,
    tracked: &[S],
    thresholds: &BTreeMap<String, f64>,
  ) -> Result<Self, ConfigError> {
    let mut fields = Vec::with_capacity(tracked.len());
    for name in tracked {
      let name = name.as_ref();
      let index = layout
        .index_of(name)
        .ok_or_else(|| ConfigError::UnknownField(name.to_string()))?;
      let threshold = *thresholds
        .get(name)
        .ok_or_else(|| ConfigError::MissingThreshold(name.to_string()))?;
      if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ConfigError::InvalidThreshold {
          field: name.to_string(),
          value: threshold,
        });
      }
      fields.push(TrackedField {
        name: name.to_string(),
        index,
        threshold,
      });
    }
    Ok(Self {
      fields,
      layout: layout.names.clone(),
    })
  }

  /// Track every field listed in `thresholds`, in layout order.
  pub fn from_thresholds(
    layout: &FieldLayout,
    thresholds: &BTreeMap<String, f64>,
  ) -> Result<Self, ConfigError> {
    if let Some(unknown) = thresholds.keys().find(|k| layout.index_of(k).is_none()) {
      return Err(ConfigError::UnknownField(unknown.clone()));
    }
    let tracked: Vec<&str> = layout
      .names()
      .filter(|name| thresholds.contains_key(*name))
      .collect();
    Self::new(layout, &tracked, thresholds)
  }

  pub fn iter(&self) -> impl Iterator<Item = &TrackedField> {
    self.fields.iter()
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  /// First tracked field whose slot differs in `layout` from the layout this
  /// set was resolved against.
  pub(crate) fn mismatch(&self, layout: &FieldLayout) -> Option<&TrackedField> {
    if layout.names == self.layout {
      return None;
    }
    self
      .fields
      .iter()
      .find(|f| layout.index_of(&f.name) != Some(f.index))
  }
}
