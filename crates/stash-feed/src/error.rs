//! Error types for `stash-feed`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;
