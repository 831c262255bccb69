//! Handlers for tag endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/posts/:id/tags` | Body: `{"tag":"rust"}`; 201 when new |
//! | `DELETE` | `/posts/:id/tags/:tag` | 404 if the post lacks the tag |
//! | `GET`    | `/tags` | Tags with post counts, most used first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Deserialize;
use stash_core::{
  source::{EnrichmentSource, PostSource},
  store::{BookmarkStore, TagCount, normalize_tag},
};

use crate::{AppState, Store, error::ApiError, extract::Owner, posts::require_post};

// ─── Add ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddBody {
  pub tag: String,
}

/// `POST /posts/:id/tags`
pub async fn add<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Path(post_id): Path<String>,
  Json(body): Json<AddBody>,
) -> Result<StatusCode, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let tag = normalize_tag(&body.tag)?;
  require_post(state.store(), &owner, &post_id).await?;
  let outcome = state
    .store()
    .add_tag(owner, post_id, tag)
    .await
    .map_err(ApiError::store)?;
  Ok(if outcome.is_inserted() { StatusCode::CREATED } else { StatusCode::OK })
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /posts/:id/tags/:tag`
pub async fn remove<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Path((post_id, tag)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let tag = normalize_tag(&tag)?;
  let removed = state
    .store()
    .remove_tag(owner, post_id.clone(), tag.clone())
    .await
    .map_err(ApiError::store)?;
  if removed {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("tag {tag:?} on post {post_id}")))
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /tags`
pub async fn list<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
) -> Result<Json<Vec<TagCount>>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let tags = state
    .store()
    .list_tags(owner)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tags))
}
