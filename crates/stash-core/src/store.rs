//! The persistence traits and supporting query types.
//!
//! [`BookmarkStore`] is the write side used by the sync engine and the API;
//! [`FeedStore`] holds the batched, owner-scoped reads the feed assembler
//! issues. Both are implemented by storage backends (e.g.
//! `stash-store-sqlite`).
//!
//! Every per-owner table is keyed by `(owner, id)` or `(owner, post_id,
//! sub-key)`. Inserts never overwrite: a duplicate key is reported as
//! [`InsertOutcome::Skipped`], never as an error, and is detected by the
//! store's own uniqueness constraint rather than a read-then-write check.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  OwnerId,
  link::{Link, NewLink},
  media::Media,
  post::{Category, NewPost, Post},
  run::{RunStats, SyncRun, TriggerType},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of an insert-or-skip write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// A row with the same composite key already existed; nothing was written.
  Skipped,
}

impl InsertOutcome {
  pub fn is_inserted(self) -> bool { matches!(self, Self::Inserted) }
}

/// A tag with the number of the owner's posts carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
  pub tag:   String,
  pub count: u32,
}

/// A tag row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub owner:   OwnerId,
  pub post_id: String,
  pub tag:     String,
}

/// Rows removed by [`BookmarkStore::delete_owner`], per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerDeletion {
  pub posts:       u64,
  pub media:       u64,
  pub links:       u64,
  pub tags:        u64,
  pub read_status: u64,
  pub runs:        u64,
}

/// Normalise a free-form tag: trimmed and lowercased; empty tags are
/// rejected.
pub fn normalize_tag(tag: &str) -> crate::Result<String> {
  let tag = tag.trim().to_lowercase();
  if tag.is_empty() {
    Err(crate::Error::EmptyTag)
  } else {
    Ok(tag)
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`FeedStore::list_posts`]. Posts are ordered newest
/// processed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
  pub limit:       usize,
  pub offset:      usize,
  /// Restrict to a stored category.
  pub category:    Option<Category>,
  /// Only posts without a read-status row.
  pub unread_only: bool,
  /// Only posts carrying this tag.
  pub tag:         Option<String>,
}

// ─── Write-side trait ────────────────────────────────────────────────────────

/// Abstraction over the bookmark store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait BookmarkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Posts ─────────────────────────────────────────────────────────────────

  /// Insert a post unless `(owner, post_id)` already exists.
  fn insert_post(
    &self,
    post: NewPost,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Insert a media row unless `(owner, media_id)` already exists.
  fn insert_media(
    &self,
    media: Media,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Insert a link unless the owner already has the same URL on that post.
  fn insert_link(
    &self,
    link: NewLink,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Whether `(owner, post_id)` is stored.
  fn post_exists(
    &self,
    owner: OwnerId,
    post_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    owner: OwnerId,
    post_id: String,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  // ── Tags & read status ────────────────────────────────────────────────────

  fn add_tag(
    &self,
    owner: OwnerId,
    post_id: String,
    tag: String,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Returns `true` when a row was removed.
  fn remove_tag(
    &self,
    owner: OwnerId,
    post_id: String,
    tag: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_tags(
    &self,
    owner: OwnerId,
  ) -> impl Future<Output = Result<Vec<TagCount>, Self::Error>> + Send + '_;

  /// Presence of the row means "read".
  fn mark_read(
    &self,
    owner: OwnerId,
    post_id: String,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  /// Returns `true` when a row was removed.
  fn mark_unread(
    &self,
    owner: OwnerId,
    post_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Runs ──────────────────────────────────────────────────────────────────

  /// Open a run with status `running`.
  fn start_run(
    &self,
    owner: OwnerId,
    trigger: TriggerType,
  ) -> impl Future<Output = Result<SyncRun, Self::Error>> + Send + '_;

  /// Finalise a run as `completed`.
  fn complete_run(
    &self,
    run_id: Uuid,
    stats: RunStats,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Finalise a run as `failed`, keeping the counts reached so far.
  fn fail_run(
    &self,
    run_id: Uuid,
    stats: RunStats,
    message: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The owner's most recently completed run, if any.
  fn latest_completed_run(
    &self,
    owner: OwnerId,
  ) -> impl Future<Output = Result<Option<SyncRun>, Self::Error>> + Send + '_;

  /// The owner's most recent runs, newest first.
  fn list_runs(
    &self,
    owner: OwnerId,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SyncRun>, Self::Error>> + Send + '_;

  // ── Bulk ──────────────────────────────────────────────────────────────────

  /// Remove every row the owner has, in every table. Other owners' rows are
  /// untouched.
  fn delete_owner(
    &self,
    owner: OwnerId,
  ) -> impl Future<Output = Result<OwnerDeletion, Self::Error>> + Send + '_;
}

// ─── Read-side trait ─────────────────────────────────────────────────────────

/// Batched, owner-scoped reads backing the feed. Every `*_for_posts` method is
/// bounded by the id slice it is given.
pub trait FeedStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// A page of the owner's posts.
  fn list_posts(
    &self,
    owner: OwnerId,
    query: FeedQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  fn posts_by_ids(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  fn media_for_posts(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Media>, Self::Error>> + Send + '_;

  /// Links in insertion order.
  fn links_for_posts(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Link>, Self::Error>> + Send + '_;

  fn tags_for_posts(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// The subset of `post_ids` that carry a read-status row.
  fn read_post_ids(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Posts whose `quoted_post_id` is one of `post_ids`.
  fn posts_quoting(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tags_are_trimmed_and_lowercased() {
    assert_eq!(normalize_tag("  Rust ").unwrap(), "rust");
    assert!(matches!(normalize_tag("   "), Err(crate::Error::EmptyTag)));
  }
}
