//! Handler for `/feed`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/feed` | `?limit=&offset=&category=&unread_only=&tag=` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use stash_core::{
  post::Category,
  source::{EnrichmentSource, PostSource},
  store::{FeedQuery, normalize_tag},
};
use stash_feed::FeedPage;

use crate::{AppState, Store, error::ApiError, extract::Owner};

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
  /// Zero or absent means the default page size.
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
  pub category:    Option<Category>,
  #[serde(default)]
  pub unread_only: bool,
  pub tag:         Option<String>,
}

impl FeedParams {
  fn into_query(self) -> Result<FeedQuery, ApiError> {
    Ok(FeedQuery {
      limit:       self.limit.unwrap_or_default(),
      offset:      self.offset.unwrap_or_default(),
      category:    self.category,
      unread_only: self.unread_only,
      tag:         self.tag.as_deref().map(normalize_tag).transpose()?,
    })
  }
}

/// `GET /feed`
pub async fn page<S, P, E>(
  State(state): State<Arc<AppState<S, P, E>>>,
  Owner(owner): Owner,
  Query(params): Query<FeedParams>,
) -> Result<Json<FeedPage>, ApiError>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  let query = params.into_query()?;
  Ok(Json(state.feed.page(owner, query).await?))
}
