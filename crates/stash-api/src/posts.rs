//! Handlers for `/posts` endpoints and owner-wide deletion.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/posts` | Body: `{"url":"https://x.com/<author>/status/<id>"}` |
//! | `PUT`    | `/posts/:id/read` | 404 if the post is not stored |
//! | `DELETE` | `/posts/:id/read` | Idempotent |
//! | `DELETE` | `/data` | Removes every row the owner has |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stash_core::{
  OwnerId,
  source::{EnrichmentSource, PostSource},
  store::{BookmarkStore, OwnerDeletion},
};
use stash_sync::AddOutcome;
use tracing::info;

use crate::{AppState, Store, error::ApiError, extract::Owner};

/// 404 unless `(owner, post_id)` is stored.
pub(crate) async fn require_post<S: Store>(
  store: &S,
  owner: &OwnerId,
  post_id: &str,
) -> Result<(), ApiError> {
  let exists = store
    .post_exists(owner.clone(), post_id.to_owned())
    .await
    .map_err(ApiError::store)?;
  if exists {
    Ok(())
  } else {
    Err(ApiError::NotFound(format!("post {post_id}")))
  }
}

// ─── Add ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddBody {
  pub url: String,
}

/// `POST /posts`: 201 when added, 200 when the owner already had it.
pub async fn add<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Json(body): Json<AddBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let outcome = state.syncer.add_post(owner, &body.url).await?;
  let status = match outcome {
    AddOutcome::Added { .. } => StatusCode::CREATED,
    AddOutcome::AlreadyExists { .. } => StatusCode::OK,
  };
  Ok((status, Json(outcome)))
}

// ─── Read status ─────────────────────────────────────────────────────────────

/// `PUT /posts/:id/read`
pub async fn mark_read<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  require_post(state.store(), &owner, &post_id).await?;
  state
    .store()
    .mark_read(owner, post_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /posts/:id/read`
pub async fn mark_unread<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Path(post_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  state
    .store()
    .mark_unread(owner, post_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete owner ────────────────────────────────────────────────────────────

/// `DELETE /data`
pub async fn delete_all<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
) -> Result<Json<OwnerDeletion>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let deleted = state
    .store()
    .delete_owner(owner.clone())
    .await
    .map_err(ApiError::store)?;
  info!(%owner, posts = deleted.posts, runs = deleted.runs, "owner data deleted");
  Ok(Json(deleted))
}
