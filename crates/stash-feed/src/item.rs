//! The shapes the feed is served in.

use serde::Serialize;
use stash_core::{
  link::Link,
  media::Media,
  post::{Category, Post},
  snapshot::EmbeddedPost,
};

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPage {
  pub items:    Vec<FeedItem>,
  /// Whether another page follows this one.
  pub has_more: bool,
}

/// A post with everything needed to render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
  #[serde(flatten)]
  pub post:               Post,
  pub media:              Vec<Media>,
  /// In insertion order.
  pub links:              Vec<Link>,
  pub tags:               Vec<String>,
  pub is_read:            bool,
  /// `category`, upgraded to `article` when any link targets an article.
  pub effective_category: Category,
  pub preview:            Option<Link>,
  pub quoted:             Option<QuotedView>,
  /// Posts of this owner that quote this one.
  pub quoted_by:          Vec<QuoteRef>,
}

/// The post an item quotes: its own row when the owner has it, otherwise the
/// snapshot taken at ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum QuotedView {
  Stored(QuotedPost),
  Snapshot(EmbeddedPost),
}

/// A stored quoted post, one level deep: its own quote is not expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotedPost {
  #[serde(flatten)]
  pub post:               Post,
  pub media:              Vec<Media>,
  pub links:              Vec<Link>,
  pub effective_category: Category,
  pub preview:            Option<Link>,
}

/// A reverse reference: a post that quotes the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRef {
  pub post_id:     String,
  pub author:      String,
  pub author_name: Option<String>,
  pub text:        String,
}

impl From<&Post> for QuoteRef {
  fn from(p: &Post) -> Self {
    Self {
      post_id:     p.post_id.clone(),
      author:      p.author.clone(),
      author_name: p.author_name.clone(),
      text:        p.text.clone(),
    }
  }
}
