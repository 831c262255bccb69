//! Shared client construction and status mapping.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use stash_core::source::SourceError;

pub(crate) fn client() -> reqwest::Result<Client> {
  Client::builder()
    .timeout(Duration::from_secs(30))
    .user_agent(concat!("stash/", env!("CARGO_PKG_VERSION")))
    .build()
}

pub(crate) fn join(base: &str, path: &str) -> String {
  format!("{}{}", base.trim_end_matches('/'), path)
}

pub(crate) fn transport(e: reqwest::Error) -> SourceError {
  SourceError::Unavailable(e.to_string())
}

/// Map a non-success status onto the collaborator error taxonomy.
pub(crate) async fn check(resp: Response) -> Result<Response, SourceError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let detail = if body.is_empty() {
    status.to_string()
  } else {
    format!("{status}: {}", body.chars().take(200).collect::<String>())
  };
  Err(match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Unauthorized(detail),
    StatusCode::NOT_FOUND => SourceError::NotFound,
    StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited,
    _ => SourceError::Unavailable(detail),
  })
}

pub(crate) async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, SourceError> {
  let bytes = resp.bytes().await.map_err(transport)?;
  serde_json::from_slice(&bytes).map_err(|e| SourceError::Malformed(e.to_string()))
}
