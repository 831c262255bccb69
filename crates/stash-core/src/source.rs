//! Collaborator contracts: the paginated post source and the per-post
//! enrichment source.
//!
//! Implementations live elsewhere (`stash-sources` talks HTTP); the sync
//! engine depends only on these traits.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  article::ArticleContent,
  media::MediaKind,
  post::Category,
  snapshot::{ArticleSummary, EmbeddedPost, ExternalSummary, MediaSummary},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A failure reported by a collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
  /// The credential was rejected.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// The source could not be reached or answered with a server error.
  #[error("source unavailable: {0}")]
  Unavailable(String),

  #[error("rate limited")]
  RateLimited,

  #[error("not found")]
  NotFound,

  /// The source answered but the payload could not be understood.
  #[error("malformed response: {0}")]
  Malformed(String),
}

// ─── Shared payload types ────────────────────────────────────────────────────

/// A reference from one post to another (quote or retweet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
  pub post_id: String,
  /// Author handle when the source knows it.
  pub author:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMedia {
  pub media_id:    String,
  pub kind:        MediaKind,
  pub url:         String,
  pub preview_url: Option<String>,
  pub width:       Option<u32>,
  pub height:      Option<u32>,
  pub duration_ms: Option<u64>,
}

impl RawMedia {
  pub fn summary(&self) -> MediaSummary {
    MediaSummary {
      kind:        self.kind,
      url:         self.url.clone(),
      preview_url: self.preview_url.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
  pub url:          String,
  pub expanded_url: Option<String>,
  pub title:        Option<String>,
  pub description:  Option<String>,
  pub image_url:    Option<String>,
}

impl RawLink {
  pub fn target_url(&self) -> &str {
    self.expanded_url.as_deref().unwrap_or(&self.url)
  }

  pub fn summary(&self) -> ExternalSummary {
    ExternalSummary {
      url:         self.target_url().to_owned(),
      domain:      crate::link::domain_of(self.target_url()),
      title:       self.title.clone(),
      description: self.description.clone(),
      image_url:   self.image_url.clone(),
    }
  }
}

// ─── Post source ─────────────────────────────────────────────────────────────

/// The owner's credential for the external platform. Obtaining it (token
/// exchange, refresh) happens outside this system.
#[derive(Debug, Clone)]
pub struct Credential {
  /// Platform user id of the owner.
  pub user_id:      String,
  pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
  pub max_results:      u32,
  pub pagination_token: Option<String>,
}

/// One bookmarked post as returned by the post source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
  pub post_id:       String,
  pub author:        String,
  pub author_name:   Option<String>,
  pub author_avatar: Option<String>,
  pub text:          String,
  pub url:           Option<String>,
  pub created_at:    Option<DateTime<Utc>>,
  pub is_reply:      bool,
  pub quoted:        Option<PostRef>,
  pub retweeted:     Option<PostRef>,
  #[serde(default)]
  pub media:         Vec<RawMedia>,
  #[serde(default)]
  pub links:         Vec<RawLink>,
  /// Verbatim source payload, persisted with the post.
  #[serde(default)]
  pub raw:           serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
  pub posts:      Vec<RawPost>,
  /// `None` when there are no further pages.
  pub next_token: Option<String>,
}

/// Paginated access to an owner's bookmarked posts. Any error is fatal to the
/// current run.
pub trait PostSource: Send + Sync {
  fn fetch(
    &self,
    credential: Credential,
    request: PageRequest,
  ) -> impl Future<Output = Result<SourcePage, SourceError>> + Send + '_;
}

// ─── Enrichment source ───────────────────────────────────────────────────────

/// The full content of one post, as the enrichment source sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPost {
  pub post_id:       String,
  pub author:        String,
  pub author_name:   Option<String>,
  pub author_avatar: Option<String>,
  pub text:          String,
  pub url:           Option<String>,
  pub created_at:    Option<DateTime<Utc>>,
  pub is_reply:      bool,
  pub quoted:        Option<PostRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
  pub title:           String,
  pub preview_text:    Option<String>,
  pub cover_image_url: Option<String>,
  pub url:             Option<String>,
  pub content:         Option<ArticleContent>,
}

impl EnrichedArticle {
  pub fn summary(&self) -> ArticleSummary {
    ArticleSummary {
      title:           self.title.clone(),
      preview_text:    self.preview_text.clone(),
      cover_image_url: self.cover_image_url.clone(),
      url:             self.url.clone(),
    }
  }
}

/// Result of a secondary fetch. Absent optional parts are normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
  pub post:     EnrichedPost,
  #[serde(default)]
  pub media:    Vec<RawMedia>,
  pub article:  Option<EnrichedArticle>,
  pub external: Option<RawLink>,
}

impl Enrichment {
  /// Refined category; overrides the primary heuristic when present.
  pub fn category(&self) -> Option<Category> {
    if self.article.is_some() {
      Some(Category::Article)
    } else if self.media.iter().any(|m| m.kind.is_motion()) {
      Some(Category::Video)
    } else if !self.media.is_empty() {
      Some(Category::Photo)
    } else {
      None
    }
  }

  /// Denormalised copy used when this post is embedded in another.
  pub fn embedded(&self) -> EmbeddedPost {
    EmbeddedPost {
      post_id:       self.post.post_id.clone(),
      author:        self.post.author.clone(),
      author_name:   self.post.author_name.clone(),
      author_avatar: self.post.author_avatar.clone(),
      text:          self.post.text.clone(),
      url:           self.post.url.clone(),
      created_at:    self.post.created_at,
      media:         self.media.iter().map(RawMedia::summary).collect(),
      article:       self.article.as_ref().map(EnrichedArticle::summary),
      external:      self.external.as_ref().map(RawLink::summary),
    }
  }
}

/// Per-post secondary metadata. Failures are never fatal to a run.
pub trait EnrichmentSource: Send + Sync {
  fn fetch(
    &self,
    author: String,
    post_id: String,
  ) -> impl Future<Output = Result<Enrichment, SourceError>> + Send + '_;
}
