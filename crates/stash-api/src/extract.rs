//! Request extractors for the caller's identity.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use stash_core::OwnerId;

use crate::error::ApiError;

/// Header carrying the authenticated owner id, set by the fronting auth
/// layer.
pub const OWNER_HEADER: &str = "x-stash-owner";

/// The owner every row touched by the request belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub OwnerId);

/// The owner's platform access token, from `Authorization: Bearer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

impl<St: Send + Sync> FromRequestParts<St> for Owner {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    header_str(&parts.headers, OWNER_HEADER)
      .map(|id| Owner(OwnerId::new(id)))
      .ok_or_else(|| ApiError::Unauthorized(format!("missing {OWNER_HEADER} header")))
  }
}

impl<St: Send + Sync> FromRequestParts<St> for BearerToken {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &St,
  ) -> Result<Self, Self::Rejection> {
    header_str(&parts.headers, header::AUTHORIZATION)
      .and_then(|v| v.strip_prefix("Bearer "))
      .map(|token| BearerToken(token.trim().to_owned()))
      .filter(|t| !t.0.is_empty())
      .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))
  }
}
