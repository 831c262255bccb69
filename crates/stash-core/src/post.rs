//! Posts: the bookmarked items themselves.
//!
//! A post row is written once and never updated: the store enforces
//! insert-or-skip on `(owner, post_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{OwnerId, media::MediaKind, snapshot::Snapshot};

// ─── Category ────────────────────────────────────────────────────────────────

/// Display category of a post.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  #[default]
  Tweet,
  Photo,
  Video,
  Article,
}

impl Category {
  /// Primary heuristic used for every ingested post before enrichment: an
  /// article link wins, then motion media, then photos.
  pub fn classify<M, U>(media: M, link_urls: U) -> Self
  where
    M: IntoIterator<Item = MediaKind>,
    U: IntoIterator,
    U::Item: AsRef<str>,
  {
    if link_urls
      .into_iter()
      .any(|u| crate::link::is_article_url(u.as_ref()))
    {
      return Self::Article;
    }
    let mut has_photo = false;
    for kind in media {
      if kind.is_motion() {
        return Self::Video;
      }
      has_photo = true;
    }
    if has_photo { Self::Photo } else { Self::Tweet }
  }
}

// ─── Post ────────────────────────────────────────────────────────────────────

/// Input to [`crate::store::BookmarkStore::insert_post`].
/// `processed_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
  pub owner:          OwnerId,
  pub post_id:        String,
  /// Handle of the author, without a leading `@`.
  pub author:         String,
  pub author_name:    Option<String>,
  pub author_avatar:  Option<String>,
  pub text:           String,
  pub source_url:     String,
  pub created_at:     Option<DateTime<Utc>>,
  pub category:       Category,
  pub is_reply:       bool,
  pub is_quote:       bool,
  pub is_retweet:     bool,
  /// Same-owner reference to the quoted post's row.
  pub quoted_post_id: Option<String>,
  pub snapshot:       Snapshot,
  /// The payload the post source returned, kept verbatim.
  pub raw:            Option<serde_json::Value>,
}

impl NewPost {
  /// Convenience constructor with every optional field empty.
  pub fn new(
    owner: OwnerId,
    post_id: impl Into<String>,
    author: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    let post_id = post_id.into();
    let author = author.into();
    Self {
      source_url: status_url(&author, &post_id),
      owner,
      post_id,
      author,
      author_name: None,
      author_avatar: None,
      text: text.into(),
      created_at: None,
      category: Category::default(),
      is_reply: false,
      is_quote: false,
      is_retweet: false,
      quoted_post_id: None,
      snapshot: Snapshot::None,
      raw: None,
    }
  }
}

/// A persisted post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub owner:          OwnerId,
  pub post_id:        String,
  pub author:         String,
  pub author_name:    Option<String>,
  pub author_avatar:  Option<String>,
  pub text:           String,
  pub source_url:     String,
  pub created_at:     Option<DateTime<Utc>>,
  /// Server-assigned timestamp; never changes after creation.
  pub processed_at:   DateTime<Utc>,
  pub category:       Category,
  pub is_reply:       bool,
  pub is_quote:       bool,
  pub is_retweet:     bool,
  pub quoted_post_id: Option<String>,
  pub snapshot:       Snapshot,
  #[serde(skip_serializing)]
  pub raw:            Option<serde_json::Value>,
}

/// Canonical status URL for a post.
pub fn status_url(author: &str, post_id: &str) -> String {
  format!("https://x.com/{author}/status/{post_id}")
}

/// A post address parsed from a status URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAddress {
  pub author:  String,
  pub post_id: String,
}

/// Parse `https://x.com/<author>/status/<id>` (twitter.com, mobile and
/// query-string variants included).
pub fn parse_status_url(url: &str) -> crate::Result<PostAddress> {
  let invalid = || crate::Error::InvalidPostUrl(url.to_owned());

  let rest = url
    .trim()
    .strip_prefix("https://")
    .or_else(|| url.trim().strip_prefix("http://"))
    .ok_or_else(invalid)?;
  let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
  let host = host
    .trim_start_matches("www.")
    .trim_start_matches("mobile.");
  if host != "x.com" && host != "twitter.com" {
    return Err(invalid());
  }

  let path = path.split(['?', '#']).next().unwrap_or_default();
  let mut segments = path.split('/');
  match (segments.next(), segments.next(), segments.next()) {
    (Some(author), Some("status"), Some(id))
      if !author.is_empty()
        && !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit()) =>
    {
      Ok(PostAddress { author: author.to_owned(), post_id: id.to_owned() })
    }
    _ => Err(invalid()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classify_prefers_article_then_motion_then_photo() {
    assert_eq!(
      Category::classify([MediaKind::Photo], ["https://x.com/i/article/1"]),
      Category::Article
    );
    assert_eq!(
      Category::classify([MediaKind::Photo, MediaKind::AnimatedGif], [""; 0]),
      Category::Video
    );
    assert_eq!(Category::classify([MediaKind::Photo], [""; 0]), Category::Photo);
    assert_eq!(
      Category::classify([], ["https://example.com"]),
      Category::Tweet
    );
  }

  #[test]
  fn category_strings_roundtrip() {
    for c in [Category::Tweet, Category::Photo, Category::Video, Category::Article] {
      let s: &'static str = c.into();
      assert_eq!(s.parse::<Category>().unwrap(), c);
    }
  }

  #[test]
  fn parses_status_urls() {
    let addr = parse_status_url("https://x.com/rustlang/status/1234?s=20").unwrap();
    assert_eq!(addr.author, "rustlang");
    assert_eq!(addr.post_id, "1234");

    let addr = parse_status_url("https://mobile.twitter.com/a_b/status/99/photo/1").unwrap();
    assert_eq!(addr.post_id, "99");

    assert!(parse_status_url("https://example.com/a/status/1").is_err());
    assert!(parse_status_url("https://x.com/a/status/abc").is_err());
    assert!(parse_status_url("x.com/a/status/1").is_err());
  }
}
