//! Error type for `stash-store-sqlite`.

use stash_core::OwnerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] stash_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A tag or read-status row referenced a post the owner does not have.
  #[error("post {post_id} not found for owner {owner}")]
  PostNotFound { owner: OwnerId, post_id: String },

  #[error("sync run not found: {0}")]
  RunNotFound(uuid::Uuid),

  /// A run can be finalised exactly once.
  #[error("sync run {0} is already finalised")]
  RunAlreadyFinished(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
