//! Bookmarks from the X API v2 (`GET /2/users/{id}/bookmarks`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use stash_core::{
  media::MediaKind,
  post::status_url,
  source::{
    Credential, PageRequest, PostRef, PostSource, RawLink, RawMedia, RawPost,
    SourceError, SourcePage,
  },
};
use tracing::debug;

use crate::http;

const EXPANSIONS: &str =
  "author_id,attachments.media_keys,referenced_tweets.id,referenced_tweets.id.author_id";
const TWEET_FIELDS: &str =
  "created_at,entities,referenced_tweets,attachments,in_reply_to_user_id";
const USER_FIELDS: &str = "name,username,profile_image_url";
const MEDIA_FIELDS: &str =
  "type,url,preview_image_url,width,height,duration_ms,variants";

/// The platform's page-size bounds for this endpoint.
const MIN_RESULTS: u32 = 1;
const MAX_RESULTS: u32 = 100;

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct XBookmarkSource {
  client:   Client,
  base_url: String,
}

impl XBookmarkSource {
  pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
    Ok(Self { client: http::client()?, base_url: base_url.into() })
  }

  async fn fetch_page(
    &self,
    credential: Credential,
    request: PageRequest,
  ) -> Result<SourcePage, SourceError> {
    let url = http::join(
      &self.base_url,
      &format!("/2/users/{}/bookmarks", credential.user_id),
    );
    let max_results = request.max_results.clamp(MIN_RESULTS, MAX_RESULTS).to_string();
    let mut query = vec![
      ("max_results", max_results.as_str()),
      ("expansions", EXPANSIONS),
      ("tweet.fields", TWEET_FIELDS),
      ("user.fields", USER_FIELDS),
      ("media.fields", MEDIA_FIELDS),
    ];
    if let Some(token) = request.pagination_token.as_deref() {
      query.push(("pagination_token", token));
    }

    let resp = self
      .client
      .get(&url)
      .bearer_auth(&credential.access_token)
      .query(&query)
      .send()
      .await
      .map_err(http::transport)?;
    let body: BookmarksResponse = http::json(http::check(resp).await?).await?;

    let page = body.into_page()?;
    debug!(
      user_id = %credential.user_id,
      posts = page.posts.len(),
      next = ?page.next_token,
      "fetched bookmarks page"
    );
    Ok(page)
  }
}

impl PostSource for XBookmarkSource {
  async fn fetch(
    &self,
    credential: Credential,
    request: PageRequest,
  ) -> Result<SourcePage, SourceError> {
    self.fetch_page(credential, request).await
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BookmarksResponse {
  #[serde(default)]
  data:     Vec<serde_json::Value>,
  #[serde(default)]
  includes: Includes,
  #[serde(default)]
  meta:     Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
  #[serde(default)]
  users:  Vec<User>,
  #[serde(default)]
  media:  Vec<ApiMedia>,
  #[serde(default)]
  tweets: Vec<Tweet>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
  next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
  id:                  String,
  text:                String,
  author_id:           Option<String>,
  created_at:          Option<DateTime<Utc>>,
  in_reply_to_user_id: Option<String>,
  #[serde(default)]
  referenced_tweets:   Vec<Reference>,
  attachments:         Option<Attachments>,
  entities:            Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct Reference {
  #[serde(rename = "type")]
  kind: String,
  id:   String,
}

#[derive(Debug, Deserialize)]
struct Attachments {
  #[serde(default)]
  media_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Entities {
  #[serde(default)]
  urls: Vec<UrlEntity>,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
  url:          String,
  expanded_url: Option<String>,
  title:        Option<String>,
  description:  Option<String>,
  #[serde(default)]
  images:       Vec<UrlImage>,
}

#[derive(Debug, Deserialize)]
struct UrlImage {
  url: String,
}

#[derive(Debug, Deserialize)]
struct User {
  id:                String,
  username:          String,
  name:              Option<String>,
  profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
  media_key:         String,
  #[serde(rename = "type")]
  kind:              String,
  url:               Option<String>,
  preview_image_url: Option<String>,
  width:             Option<u32>,
  height:            Option<u32>,
  duration_ms:       Option<u64>,
  #[serde(default)]
  variants:          Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
  bit_rate:     Option<u64>,
  content_type: String,
  url:          String,
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

impl BookmarksResponse {
  fn into_page(self) -> Result<SourcePage, SourceError> {
    let users: HashMap<&str, &User> =
      self.includes.users.iter().map(|u| (u.id.as_str(), u)).collect();
    let media: HashMap<&str, &ApiMedia> = self
      .includes
      .media
      .iter()
      .map(|m| (m.media_key.as_str(), m))
      .collect();
    let referenced: HashMap<&str, &Tweet> = self
      .includes
      .tweets
      .iter()
      .map(|t| (t.id.as_str(), t))
      .collect();

    let handle_of = |author_id: Option<&str>| {
      author_id
        .and_then(|id| users.get(id))
        .map(|u| u.username.clone())
    };
    let reference = |id: &str| PostRef {
      post_id: id.to_owned(),
      author:  handle_of(referenced.get(id).and_then(|t| t.author_id.as_deref())),
    };

    let mut posts = Vec::with_capacity(self.data.len());
    for raw in self.data {
      let tweet: Tweet = serde_json::from_value(raw.clone())
        .map_err(|e| SourceError::Malformed(e.to_string()))?;
      let user = tweet.author_id.as_deref().and_then(|id| users.get(id));
      let author = user.map_or_else(|| "i".to_owned(), |u| u.username.clone());

      let find_ref = |kind: &str| {
        tweet
          .referenced_tweets
          .iter()
          .find(|r| r.kind == kind)
          .map(|r| reference(&r.id))
      };

      posts.push(RawPost {
        url: Some(status_url(&author, &tweet.id)),
        author_name: user.and_then(|u| u.name.clone()),
        author_avatar: user.and_then(|u| u.profile_image_url.clone()),
        created_at: tweet.created_at,
        is_reply: tweet.in_reply_to_user_id.is_some()
          || tweet.referenced_tweets.iter().any(|r| r.kind == "replied_to"),
        quoted: find_ref("quoted"),
        retweeted: find_ref("retweeted"),
        media: tweet
          .attachments
          .iter()
          .flat_map(|a| &a.media_keys)
          .filter_map(|k| media.get(k.as_str()))
          .filter_map(|m| raw_media(m))
          .collect(),
        links: tweet
          .entities
          .iter()
          .flat_map(|e| &e.urls)
          .map(raw_link)
          .collect(),
        post_id: tweet.id,
        text: tweet.text,
        author,
        raw,
      });
    }

    Ok(SourcePage { posts, next_token: self.meta.next_token })
  }
}

fn raw_media(m: &ApiMedia) -> Option<RawMedia> {
  let kind = match m.kind.as_str() {
    "photo" => MediaKind::Photo,
    "video" => MediaKind::Video,
    "animated_gif" => MediaKind::AnimatedGif,
    _ => return None,
  };
  // Motion media carries its playable file in the highest-bitrate mp4.
  let best_variant = m
    .variants
    .iter()
    .filter(|v| v.content_type == "video/mp4")
    .max_by_key(|v| v.bit_rate.unwrap_or(0))
    .map(|v| v.url.clone());
  let url = match kind {
    MediaKind::Photo => m.url.clone(),
    MediaKind::Video | MediaKind::AnimatedGif => {
      best_variant.or_else(|| m.preview_image_url.clone())
    }
  }?;

  Some(RawMedia {
    media_id: m.media_key.clone(),
    kind,
    url,
    preview_url: m.preview_image_url.clone(),
    width: m.width,
    height: m.height,
    duration_ms: m.duration_ms,
  })
}

fn raw_link(u: &UrlEntity) -> RawLink {
  RawLink {
    url:          u.url.clone(),
    expanded_url: u.expanded_url.clone(),
    title:        u.title.clone(),
    description:  u.description.clone(),
    image_url:    u.images.first().map(|i| i.url.clone()),
  }
}
