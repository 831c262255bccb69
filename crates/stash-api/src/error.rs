//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stash_core::source::SourceError;
use stash_feed::FeedError;
use stash_sync::{CooldownStatus, SyncError};
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// Rendered as 429 with the cooldown status as the body.
  #[error("sync cooldown active")]
  Cooldown(CooldownStatus),

  #[error("upstream error: {0}")]
  Upstream(#[source] SourceError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl From<SyncError> for ApiError {
  fn from(e: SyncError) -> Self {
    match e {
      SyncError::Cooldown(status) => Self::Cooldown(status),
      SyncError::AlreadyRunning(_) => Self::Conflict(e.to_string()),
      SyncError::InvalidOptions(_) => Self::BadRequest(e.to_string()),
      SyncError::Core(
        stash_core::Error::InvalidPostUrl(_) | stash_core::Error::EmptyTag,
      ) => Self::BadRequest(e.to_string()),
      SyncError::Core(e) => Self::Store(Box::new(e)),
      SyncError::Source(SourceError::NotFound) => {
        Self::NotFound("post not found at source".into())
      }
      SyncError::Source(e) => Self::Upstream(e),
      SyncError::Store(e) => Self::Store(e),
    }
  }
}

impl From<FeedError> for ApiError {
  fn from(e: FeedError) -> Self {
    match e {
      FeedError::Store(e) => Self::Store(e),
    }
  }
}

impl From<stash_core::Error> for ApiError {
  fn from(e: stash_core::Error) -> Self {
    match e {
      stash_core::Error::InvalidPostUrl(_) | stash_core::Error::EmptyTag => {
        Self::BadRequest(e.to_string())
      }
      e => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Cooldown(status) => {
        return (StatusCode::TOO_MANY_REQUESTS, Json(status)).into_response();
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Upstream(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
      ApiError::Store(e) => {
        error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
