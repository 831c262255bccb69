//! Owner identity: the scope every persisted row belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The authenticated user whose rows a record belongs to.
///
/// Every per-owner table is keyed by `(owner, …)`; two owners bookmarking the
/// same external post each hold an independent copy.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OwnerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for OwnerId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for OwnerId {
  fn from(s: String) -> Self { Self(s) }
}
