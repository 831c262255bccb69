//! Error types for `stash-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown media kind: {0:?}")]
  UnknownMediaKind(String),

  #[error("unknown link type: {0:?}")]
  UnknownLinkType(String),

  #[error("unknown run status: {0:?}")]
  UnknownRunStatus(String),

  #[error("unknown trigger type: {0:?}")]
  UnknownTrigger(String),

  #[error("not a post url: {0:?}")]
  InvalidPostUrl(String),

  #[error("tag must not be empty")]
  EmptyTag,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
