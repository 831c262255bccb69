//! Per-post enrichment from an fxtwitter-style API
//! (`GET /{author}/status/{id}`).

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use stash_core::{
  article::ArticleContent,
  media::MediaKind,
  source::{
    EnrichedArticle, EnrichedPost, Enrichment, EnrichmentSource, PostRef,
    RawLink, RawMedia, SourceError,
  },
};
use tracing::debug;

use crate::http;

#[derive(Clone)]
pub struct FxEnrichmentSource {
  client:   Client,
  base_url: String,
}

impl FxEnrichmentSource {
  pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
    Ok(Self { client: http::client()?, base_url: base_url.into() })
  }

  async fn fetch_status(&self, author: &str, post_id: &str) -> Result<Enrichment, SourceError> {
    let url = http::join(&self.base_url, &format!("/{author}/status/{post_id}"));
    let resp = self
      .client
      .get(&url)
      .send()
      .await
      .map_err(http::transport)?;
    let body: StatusResponse = http::json(http::check(resp).await?).await?;

    match (body.code, body.tweet) {
      (200, Some(tweet)) => {
        debug!(post_id, "fetched enrichment");
        Ok(tweet.into_enrichment())
      }
      (404, _) | (200, None) => Err(SourceError::NotFound),
      (401 | 403, _) => Err(SourceError::Unauthorized(body.message)),
      (code, _) => Err(SourceError::Unavailable(format!("{code}: {}", body.message))),
    }
  }
}

impl EnrichmentSource for FxEnrichmentSource {
  async fn fetch(&self, author: String, post_id: String) -> Result<Enrichment, SourceError> {
    self.fetch_status(&author, &post_id).await
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StatusResponse {
  code:    u16,
  #[serde(default)]
  message: String,
  tweet:   Option<FxTweet>,
}

#[derive(Debug, Deserialize)]
struct FxTweet {
  id:                String,
  url:               Option<String>,
  #[serde(default)]
  text:              String,
  created_timestamp: Option<i64>,
  author:            FxAuthor,
  replying_to:       Option<String>,
  media:             Option<FxMedia>,
  quote:             Option<Box<FxTweet>>,
  article:           Option<FxArticle>,
  external:          Option<FxExternal>,
}

#[derive(Debug, Deserialize)]
struct FxAuthor {
  screen_name: String,
  name:        Option<String>,
  avatar_url:  Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FxMedia {
  #[serde(default)]
  photos: Vec<FxPhoto>,
  #[serde(default)]
  videos: Vec<FxVideo>,
}

#[derive(Debug, Deserialize)]
struct FxPhoto {
  url:    String,
  width:  Option<u32>,
  height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FxVideo {
  url:           String,
  thumbnail_url: Option<String>,
  width:         Option<u32>,
  height:        Option<u32>,
  /// Seconds.
  duration:      Option<f64>,
  #[serde(rename = "type")]
  kind:          Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxArticle {
  id:           Option<String>,
  title:        String,
  preview_text: Option<String>,
  cover_media:  Option<FxCoverMedia>,
  content:      Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FxCoverMedia {
  media_info: Option<FxMediaInfo>,
}

#[derive(Debug, Deserialize)]
struct FxMediaInfo {
  original_img_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxExternal {
  url:           String,
  title:         Option<String>,
  description:   Option<String>,
  thumbnail_url: Option<String>,
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

impl FxTweet {
  fn into_enrichment(self) -> Enrichment {
    let media = self.media.unwrap_or_default();
    let mut out = Vec::with_capacity(media.photos.len() + media.videos.len());
    for (i, p) in media.photos.into_iter().enumerate() {
      out.push(RawMedia {
        media_id:    format!("{}_p{i}", self.id),
        kind:        MediaKind::Photo,
        url:         p.url,
        preview_url: None,
        width:       p.width,
        height:      p.height,
        duration_ms: None,
      });
    }
    for (i, v) in media.videos.into_iter().enumerate() {
      let kind = match v.kind.as_deref() {
        Some("gif") => MediaKind::AnimatedGif,
        _ => MediaKind::Video,
      };
      out.push(RawMedia {
        media_id: format!("{}_v{i}", self.id),
        kind,
        url: v.url,
        preview_url: v.thumbnail_url,
        width: v.width,
        height: v.height,
        duration_ms: v.duration.map(|s| (s * 1000.0).round() as u64),
      });
    }

    let article = self.article.map(|a| EnrichedArticle {
      url:             a.id.as_ref().map(|id| format!("https://x.com/i/article/{id}")),
      title:           a.title,
      preview_text:    a.preview_text,
      cover_image_url: a
        .cover_media
        .and_then(|c| c.media_info)
        .and_then(|m| m.original_img_url),
      content:         a.content.and_then(ArticleContent::from_value),
    });

    Enrichment {
      post: EnrichedPost {
        created_at: self
          .created_timestamp
          .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
        is_reply: self.replying_to.is_some(),
        quoted: self.quote.map(|q| {
          let q = *q;
          PostRef { post_id: q.id, author: Some(q.author.screen_name) }
        }),
        post_id: self.id,
        author: self.author.screen_name,
        author_name: self.author.name,
        author_avatar: self.author.avatar_url,
        text: self.text,
        url: self.url,
      },
      media: out,
      article,
      external: self.external.map(|e| RawLink {
        url:          e.url,
        expanded_url: None,
        title:        e.title,
        description:  e.description,
        image_url:    e.thumbnail_url,
      }),
    }
  }
}
