//! Run-scoped dedup state.
//!
//! A [`RunContext`] is created per run and threaded through the pipeline by
//! `&mut`. Nothing in it is shared between runs, so concurrent runs for
//! different owners never observe each other.

use std::collections::{HashMap, HashSet};

use stash_core::{
  OwnerId, run::RunStats, snapshot::EmbeddedPost, store::BookmarkStore,
};

#[derive(Debug)]
pub struct RunContext {
  pub owner:               OwnerId,
  pub stats:               RunStats,
  /// Enrichment and quote-content fetches that failed after every retry.
  pub enrichment_failures: u32,
  inserted:                HashSet<String>,
  /// Rows written by the quote resolver whose bookmark has not been
  /// processed yet in this run.
  quoted_only:             HashSet<String>,
  /// Quote fetch outcomes; `None` records a fetch that failed.
  quotes:                  HashMap<String, Option<EmbeddedPost>>,
}

impl RunContext {
  pub fn new(owner: OwnerId) -> Self {
    Self {
      owner,
      stats: RunStats::default(),
      enrichment_failures: 0,
      inserted: HashSet::new(),
      quoted_only: HashSet::new(),
      quotes: HashMap::new(),
    }
  }

  /// Whether `post_id` is stored for this owner. The run's own inserts
  /// answer first; the store is queried only for ids this run has not
  /// written.
  pub async fn exists<S: BookmarkStore>(
    &self,
    store: &S,
    post_id: &str,
  ) -> Result<bool, S::Error> {
    if self.inserted.contains(post_id) {
      return Ok(true);
    }
    store.post_exists(self.owner.clone(), post_id.to_owned()).await
  }

  /// Record a post row written by this run.
  pub fn mark_inserted(&mut self, post_id: &str) {
    self.inserted.insert(post_id.to_owned());
  }

  pub fn inserted_count(&self) -> usize { self.inserted.len() }

  /// Record a row the quote resolver wrote on behalf of another item.
  pub(crate) fn mark_quoted_insert(&mut self, post_id: &str) {
    self.mark_inserted(post_id);
    self.quoted_only.insert(post_id.to_owned());
  }

  /// Claim a resolver-written row for the bookmark with the same id. True
  /// at most once per id.
  pub(crate) fn take_quoted_insert(&mut self, post_id: &str) -> bool {
    self.quoted_only.remove(post_id)
  }

  /// The cached outcome of fetching quoted post `post_id`, if this run has
  /// tried already.
  pub(crate) fn resolved_quote(&self, post_id: &str) -> Option<Option<&EmbeddedPost>> {
    self.quotes.get(post_id).map(Option::as_ref)
  }

  pub(crate) fn remember_quote(&mut self, post_id: &str, outcome: Option<EmbeddedPost>) {
    self.quotes.insert(post_id.to_owned(), outcome);
  }
}
