//! Handlers for `/sync` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sync/stream` | SSE; `?full=true&max_pages=n`; 429 during cooldown |
//! | `GET`  | `/sync/status` | Cooldown status |
//! | `GET`  | `/sync/runs` | Optional `?limit=n`, newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  response::sse::{Event, Sse},
};
use futures::Stream;
use serde::Deserialize;
use stash_core::{
  run::{SyncRun, TriggerType},
  source::{Credential, EnrichmentSource, PostSource},
  store::BookmarkStore,
};
use stash_sync::{CooldownStatus, SyncOptions};
use tracing::info;

use crate::{
  AppState, Store,
  error::ApiError,
  extract::{BearerToken, Owner},
  sse,
};

const DEFAULT_RUNS: usize = 20;
const MAX_RUNS: usize = 100;

// ─── Stream ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
  #[serde(default)]
  pub full:      bool,
  pub max_pages: Option<u32>,
}

/// `GET /sync/stream[?full=<bool>&max_pages=<n>]`
///
/// Starts a run for the owner and streams its events until the terminal one.
/// The owner id doubles as the platform user id of the credential.
pub async fn stream<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  BearerToken(access_token): BearerToken,
  Query(params): Query<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let credential = Credential {
    user_id: owner.as_str().to_owned(),
    access_token,
  };
  let options = SyncOptions {
    full:      params.full,
    max_pages: params.max_pages,
    trigger:   TriggerType::Manual,
  };

  let handle = state.syncer.start(owner.clone(), credential, options).await?;
  info!(%owner, run_id = %handle.run_id, "streaming sync events");
  Ok(Sse::new(sse::event_stream(handle.events)))
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// `GET /sync/status`
pub async fn status<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
) -> Result<Json<CooldownStatus>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  Ok(Json(state.syncer.cooldown_status(&owner).await?))
}

// ─── Runs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RunsParams {
  pub limit: Option<usize>,
}

/// `GET /sync/runs[?limit=<n>]`
pub async fn runs<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Query(params): Query<RunsParams>,
) -> Result<Json<Vec<SyncRun>>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let limit = params.limit.unwrap_or(DEFAULT_RUNS).clamp(1, MAX_RUNS);
  let runs = state
    .store()
    .list_runs(owner, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(runs))
}
