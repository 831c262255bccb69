//! Error types for `stash-sync`.

use stash_core::{OwnerId, source::SourceError};
use thiserror::Error;

use crate::cooldown::CooldownStatus;

#[derive(Debug, Error)]
pub enum SyncError {
  /// The owner's last completed run is too recent.
  #[error("sync cooldown active: {}ms remaining", .0.remaining_ms)]
  Cooldown(CooldownStatus),

  #[error("invalid sync options: {0}")]
  InvalidOptions(&'static str),

  #[error("a sync is already running for {0}")]
  AlreadyRunning(OwnerId),

  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Core(#[from] stash_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SyncError {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
