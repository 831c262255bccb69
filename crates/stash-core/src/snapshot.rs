//! Denormalised snapshots stored alongside a post for fallback rendering.
//!
//! A snapshot is decoded once at the persistence boundary into a typed
//! variant; readers never re-parse the stored text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
  #[default]
  None,
  /// The post quotes another post.
  Quote(EmbeddedPost),
  /// The post is a retweet; retweeted content is never stored as a row.
  Retweet(EmbeddedPost),
  /// The post itself is a long-form article.
  Article(ArticleSummary),
}

impl Snapshot {
  pub fn is_none(&self) -> bool { matches!(self, Self::None) }

  /// The embedded post, for quote and retweet snapshots.
  pub fn embedded(&self) -> Option<&EmbeddedPost> {
    match self {
      Self::Quote(p) | Self::Retweet(p) => Some(p),
      Self::None | Self::Article(_) => None,
    }
  }
}

/// Everything needed to render a referenced post without its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedPost {
  pub post_id:       String,
  pub author:        String,
  pub author_name:   Option<String>,
  pub author_avatar: Option<String>,
  pub text:          String,
  pub url:           Option<String>,
  pub created_at:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub media:         Vec<MediaSummary>,
  pub article:       Option<ArticleSummary>,
  pub external:      Option<ExternalSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
  pub kind:        MediaKind,
  pub url:         String,
  pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
  pub title:           String,
  pub preview_text:    Option<String>,
  pub cover_image_url: Option<String>,
  pub url:             Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSummary {
  pub url:         String,
  pub domain:      Option<String>,
  pub title:       Option<String>,
  pub description: Option<String>,
  pub image_url:   Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snapshot_tags_are_snake_case() {
    let v = serde_json::to_value(Snapshot::None).unwrap();
    assert_eq!(v, serde_json::json!({ "kind": "none" }));

    let article = Snapshot::Article(ArticleSummary {
      title:           "Title".into(),
      preview_text:    None,
      cover_image_url: None,
      url:             None,
    });
    let v = serde_json::to_value(&article).unwrap();
    assert_eq!(v["kind"], "article");
    assert_eq!(v["title"], "Title");
    let back: Snapshot = serde_json::from_value(v).unwrap();
    assert_eq!(back, article);
  }

  #[test]
  fn embedded_is_only_for_quotes_and_retweets() {
    let post = EmbeddedPost {
      post_id:       "9".into(),
      author:        "a".into(),
      author_name:   None,
      author_avatar: None,
      text:          "hi".into(),
      url:           None,
      created_at:    None,
      media:         vec![],
      article:       None,
      external:      None,
    };
    assert!(Snapshot::Retweet(post.clone()).embedded().is_some());
    assert!(Snapshot::Quote(post).embedded().is_some());
    assert!(Snapshot::None.embedded().is_none());
  }
}
