//! [`FeedAssembler`]: page query, batched joins, quote graph.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use stash_core::{
  OwnerId,
  link::{Link, effective_category, select_preview},
  media::Media,
  post::Post,
  snapshot::Snapshot,
  store::{FeedQuery, FeedStore},
};
use tracing::debug;

use crate::{
  FeedError, Result,
  item::{FeedItem, FeedPage, QuoteRef, QuotedPost, QuotedView},
};

/// Page size used when the caller asks for zero items.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page the assembler will serve.
pub const MAX_LIMIT: usize = 100;

fn store_err<E>(e: E) -> FeedError
where
  E: std::error::Error + Send + Sync + 'static,
{
  FeedError::Store(Box::new(e))
}

/// Rows grouped by the post they hang off.
struct Joined {
  media: HashMap<String, Vec<Media>>,
  links: HashMap<String, Vec<Link>>,
}

impl Joined {
  fn new(media: Vec<Media>, links: Vec<Link>) -> Self {
    let mut by_post_media: HashMap<String, Vec<Media>> = HashMap::new();
    for m in media {
      by_post_media.entry(m.post_id.clone()).or_default().push(m);
    }
    let mut by_post_links: HashMap<String, Vec<Link>> = HashMap::new();
    for l in links {
      by_post_links.entry(l.post_id.clone()).or_default().push(l);
    }
    Self { media: by_post_media, links: by_post_links }
  }

  fn take(&mut self, post_id: &str) -> (Vec<Media>, Vec<Link>) {
    (
      self.media.remove(post_id).unwrap_or_default(),
      self.links.remove(post_id).unwrap_or_default(),
    )
  }
}

pub struct FeedAssembler<S> {
  store: Arc<S>,
}

impl<S> Clone for FeedAssembler<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: FeedStore> FeedAssembler<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Assemble one page of `owner`'s feed.
  pub async fn page(&self, owner: OwnerId, query: FeedQuery) -> Result<FeedPage> {
    let limit = match query.limit {
      0 => DEFAULT_LIMIT,
      n => n.min(MAX_LIMIT),
    };

    // One extra row tells us whether another page follows.
    let mut posts = self
      .store
      .list_posts(owner.clone(), FeedQuery { limit: limit + 1, ..query })
      .await
      .map_err(store_err)?;
    let has_more = posts.len() > limit;
    posts.truncate(limit);

    if posts.is_empty() {
      return Ok(FeedPage { items: Vec::new(), has_more });
    }

    let ids: Vec<String> = posts.iter().map(|p| p.post_id.clone()).collect();
    let (media, links, tags, read) = tokio::try_join!(
      self.store.media_for_posts(owner.clone(), ids.clone()),
      self.store.links_for_posts(owner.clone(), ids.clone()),
      self.store.tags_for_posts(owner.clone(), ids.clone()),
      self.store.read_post_ids(owner.clone(), ids.clone()),
    )
    .map_err(store_err)?;

    // Second level: quoted posts outside the page, and the page's quoters.
    let page_ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut missing: Vec<String> = Vec::new();
    for q in posts.iter().filter_map(|p| p.quoted_post_id.as_deref()) {
      if !page_ids.contains(q) && !missing.iter().any(|m| m == q) {
        missing.push(q.to_owned());
      }
    }

    let (outside, quoters) = tokio::try_join!(
      self.store.posts_by_ids(owner.clone(), missing),
      self.store.posts_quoting(owner.clone(), ids.clone()),
    )
    .map_err(store_err)?;

    let outside_ids: Vec<String> = outside.iter().map(|p| p.post_id.clone()).collect();
    let (outside_media, outside_links) = tokio::try_join!(
      self.store.media_for_posts(owner.clone(), outside_ids.clone()),
      self.store.links_for_posts(owner.clone(), outside_ids),
    )
    .map_err(store_err)?;

    debug!(
      %owner,
      items = posts.len(),
      outside_quotes = outside.len(),
      quoters = quoters.len(),
      "assembled feed page"
    );

    let mut joined = Joined::new(media, links);
    let mut outside_joined = Joined::new(outside_media, outside_links);

    let mut tags_by_post: HashMap<String, Vec<String>> = HashMap::new();
    for t in tags {
      tags_by_post.entry(t.post_id).or_default().push(t.tag);
    }
    let read: HashSet<String> = read.into_iter().collect();

    let mut quoted_by: HashMap<String, Vec<QuoteRef>> = HashMap::new();
    for q in &quoters {
      if let Some(target) = &q.quoted_post_id {
        quoted_by.entry(target.clone()).or_default().push(QuoteRef::from(q));
      }
    }

    // Page items first, without quotes, so quoted page posts can be copied.
    let mut items: Vec<FeedItem> = posts
      .into_iter()
      .map(|post| {
        let (media, links) = joined.take(&post.post_id);
        FeedItem {
          effective_category: effective_category(post.category, &links),
          preview: select_preview(&links).cloned(),
          tags: tags_by_post.remove(&post.post_id).unwrap_or_default(),
          is_read: read.contains(&post.post_id),
          quoted: None,
          quoted_by: quoted_by.remove(&post.post_id).unwrap_or_default(),
          media,
          links,
          post,
        }
      })
      .collect();

    let mut stored: HashMap<String, QuotedPost> = outside
      .into_iter()
      .map(|post| {
        let (media, links) = outside_joined.take(&post.post_id);
        (post.post_id.clone(), quoted_post(post, media, links))
      })
      .collect();
    let quoted_in_page: HashSet<&str> = items
      .iter()
      .filter_map(|i| i.post.quoted_post_id.as_deref())
      .filter(|q| page_ids.contains(q))
      .collect();
    for item in items.iter().filter(|i| quoted_in_page.contains(i.post.post_id.as_str())) {
      stored.insert(
        item.post.post_id.clone(),
        quoted_post(item.post.clone(), item.media.clone(), item.links.clone()),
      );
    }

    for item in &mut items {
      item.quoted = quoted_view(&item.post, &stored);
    }

    Ok(FeedPage { items, has_more })
  }
}

fn quoted_post(post: Post, media: Vec<Media>, links: Vec<Link>) -> QuotedPost {
  QuotedPost {
    effective_category: effective_category(post.category, &links),
    preview: select_preview(&links).cloned(),
    post,
    media,
    links,
  }
}

fn quoted_view(post: &Post, stored: &HashMap<String, QuotedPost>) -> Option<QuotedView> {
  if let Some(q) = post.quoted_post_id.as_deref().and_then(|id| stored.get(id)) {
    return Some(QuotedView::Stored(q.clone()));
  }
  match &post.snapshot {
    Snapshot::Quote(embedded) => Some(QuotedView::Snapshot(embedded.clone())),
    _ => None,
  }
}
