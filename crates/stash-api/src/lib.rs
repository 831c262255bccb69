//! JSON REST API and sync event stream for Stash.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`BookmarkStore`] and [`FeedStore`]. Authentication is the caller's
//! responsibility: every route trusts the [`OWNER_HEADER`] set by the
//! fronting auth layer.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", stash_api::api_router(Arc::new(state)))
//! ```

pub mod error;
pub mod extract;
pub mod feed;
pub mod posts;
pub mod sse;
pub mod sync;
pub mod tags;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use stash_core::{
  source::{EnrichmentSource, PostSource},
  store::{BookmarkStore, FeedStore},
};
use stash_feed::FeedAssembler;
use stash_sync::Syncer;

pub use error::ApiError;
pub use extract::{BearerToken, OWNER_HEADER, Owner};

/// A backend serving both the write side and the feed reads.
pub trait Store: BookmarkStore + FeedStore + 'static {}

impl<T: BookmarkStore + FeedStore + 'static> Store for T {}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, P, E> {
  pub syncer: Syncer<S, P, E>,
  pub feed:   FeedAssembler<S>,
}

impl<S, P, E> AppState<S, P, E>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  pub fn new(syncer: Syncer<S, P, E>) -> Self {
    let feed = FeedAssembler::new(Arc::clone(syncer.store()));
    Self { syncer, feed }
  }

  pub fn store(&self) -> &S { self.syncer.store() }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, P, E>(state: Arc<AppState<S, P, E>>) -> Router<()>
where
  S: Store,
  P: PostSource + 'static,
  E: EnrichmentSource + 'static,
{
  Router::new()
    // Sync
    .route("/sync/stream", get(sync::stream::<S, P, E>))
    .route("/sync/status", get(sync::status::<S, P, E>))
    .route("/sync/runs", get(sync::runs::<S, P, E>))
    // Feed
    .route("/feed", get(feed::page::<S, P, E>))
    // Posts
    .route("/posts", post(posts::add::<S, P, E>))
    .route(
      "/posts/{id}/read",
      put(posts::mark_read::<S, P, E>).delete(posts::mark_unread::<S, P, E>),
    )
    // Tags
    .route("/posts/{id}/tags", post(tags::add::<S, P, E>))
    .route("/posts/{id}/tags/{tag}", delete(tags::remove::<S, P, E>))
    .route("/tags", get(tags::list::<S, P, E>))
    // Owner data
    .route("/data", delete(posts::delete_all::<S, P, E>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
