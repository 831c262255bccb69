//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with microsecond precision
//! and a `Z` suffix, so lexical order equals chronological order. Snapshots
//! and article bodies are stored as compact JSON and decoded here, once.

use chrono::{DateTime, SecondsFormat, Utc};
use stash_core::{
  OwnerId,
  article::ArticleContent,
  link::{Link, LinkType},
  media::{Media, MediaKind},
  post::{Category, Post},
  run::{RunStatus, SyncRun, TriggerType},
  snapshot::Snapshot,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_category(s: &str) -> Result<Category> {
  s.parse()
    .map_err(|_| stash_core::Error::UnknownCategory(s.to_owned()).into())
}

pub fn decode_media_kind(s: &str) -> Result<MediaKind> {
  s.parse()
    .map_err(|_| stash_core::Error::UnknownMediaKind(s.to_owned()).into())
}

pub fn decode_link_type(s: &str) -> Result<LinkType> {
  s.parse()
    .map_err(|_| stash_core::Error::UnknownLinkType(s.to_owned()).into())
}

pub fn decode_run_status(s: &str) -> Result<RunStatus> {
  s.parse()
    .map_err(|_| stash_core::Error::UnknownRunStatus(s.to_owned()).into())
}

pub fn decode_trigger(s: &str) -> Result<TriggerType> {
  s.parse()
    .map_err(|_| stash_core::Error::UnknownTrigger(s.to_owned()).into())
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_snapshot(s: &Snapshot) -> Result<String> {
  Ok(serde_json::to_string(s)?)
}

pub fn decode_snapshot(s: &str) -> Result<Snapshot> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_content(c: Option<&ArticleContent>) -> Result<Option<String>> {
  Ok(c.map(ArticleContent::to_json_string).transpose()?)
}

/// Article bodies are parsed leniently: a corrupt body reads as no body.
pub fn decode_content(s: Option<&str>) -> Option<ArticleContent> {
  s.and_then(ArticleContent::parse)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `posts` select; matches [`PostRow::from_row`].
pub const POST_COLUMNS: &str = "p.owner, p.post_id, p.author, p.author_name, \
   p.author_avatar, p.text, p.source_url, p.created_at, p.processed_at, \
   p.category, p.is_reply, p.is_quote, p.is_retweet, p.quoted_post_id, \
   p.snapshot, p.raw_json";

/// Raw values read directly from a `posts` row.
pub struct PostRow {
  pub owner:          String,
  pub post_id:        String,
  pub author:         String,
  pub author_name:    Option<String>,
  pub author_avatar:  Option<String>,
  pub text:           String,
  pub source_url:     String,
  pub created_at:     Option<String>,
  pub processed_at:   String,
  pub category:       String,
  pub is_reply:       bool,
  pub is_quote:       bool,
  pub is_retweet:     bool,
  pub quoted_post_id: Option<String>,
  pub snapshot:       String,
  pub raw_json:       Option<String>,
}

impl PostRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner:          row.get(0)?,
      post_id:        row.get(1)?,
      author:         row.get(2)?,
      author_name:    row.get(3)?,
      author_avatar:  row.get(4)?,
      text:           row.get(5)?,
      source_url:     row.get(6)?,
      created_at:     row.get(7)?,
      processed_at:   row.get(8)?,
      category:       row.get(9)?,
      is_reply:       row.get(10)?,
      is_quote:       row.get(11)?,
      is_retweet:     row.get(12)?,
      quoted_post_id: row.get(13)?,
      snapshot:       row.get(14)?,
      raw_json:       row.get(15)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      owner:          OwnerId::new(self.owner),
      post_id:        self.post_id,
      author:         self.author,
      author_name:    self.author_name,
      author_avatar:  self.author_avatar,
      text:           self.text,
      source_url:     self.source_url,
      created_at:     decode_opt_dt(self.created_at)?,
      processed_at:   decode_dt(&self.processed_at)?,
      category:       decode_category(&self.category)?,
      is_reply:       self.is_reply,
      is_quote:       self.is_quote,
      is_retweet:     self.is_retweet,
      quoted_post_id: self.quoted_post_id,
      snapshot:       decode_snapshot(&self.snapshot)?,
      raw:            self
        .raw_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
    })
  }
}

pub const MEDIA_COLUMNS: &str = "owner, media_id, post_id, kind, url, \
   preview_url, width, height, duration_ms";

/// Raw values read directly from a `media` row.
pub struct MediaRow {
  pub owner:       String,
  pub media_id:    String,
  pub post_id:     String,
  pub kind:        String,
  pub url:         String,
  pub preview_url: Option<String>,
  pub width:       Option<u32>,
  pub height:      Option<u32>,
  pub duration_ms: Option<i64>,
}

impl MediaRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner:       row.get(0)?,
      media_id:    row.get(1)?,
      post_id:     row.get(2)?,
      kind:        row.get(3)?,
      url:         row.get(4)?,
      preview_url: row.get(5)?,
      width:       row.get(6)?,
      height:      row.get(7)?,
      duration_ms: row.get(8)?,
    })
  }

  pub fn into_media(self) -> Result<Media> {
    Ok(Media {
      owner:       OwnerId::new(self.owner),
      media_id:    self.media_id,
      post_id:     self.post_id,
      kind:        decode_media_kind(&self.kind)?,
      url:         self.url,
      preview_url: self.preview_url,
      width:       self.width,
      height:      self.height,
      duration_ms: self.duration_ms.and_then(|d| u64::try_from(d).ok()),
    })
  }
}

pub const LINK_COLUMNS: &str = "link_id, owner, post_id, url, expanded_url, \
   domain, link_type, preview_title, preview_description, preview_image_url, \
   content_json";

/// Raw values read directly from a `links` row.
pub struct LinkRow {
  pub link_id:             i64,
  pub owner:               String,
  pub post_id:             String,
  pub url:                 String,
  pub expanded_url:        Option<String>,
  pub domain:              Option<String>,
  pub link_type:           String,
  pub preview_title:       Option<String>,
  pub preview_description: Option<String>,
  pub preview_image_url:   Option<String>,
  pub content_json:        Option<String>,
}

impl LinkRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      link_id:             row.get(0)?,
      owner:               row.get(1)?,
      post_id:             row.get(2)?,
      url:                 row.get(3)?,
      expanded_url:        row.get(4)?,
      domain:              row.get(5)?,
      link_type:           row.get(6)?,
      preview_title:       row.get(7)?,
      preview_description: row.get(8)?,
      preview_image_url:   row.get(9)?,
      content_json:        row.get(10)?,
    })
  }

  pub fn into_link(self) -> Result<Link> {
    Ok(Link {
      link_id:             self.link_id,
      owner:               OwnerId::new(self.owner),
      post_id:             self.post_id,
      url:                 self.url,
      expanded_url:        self.expanded_url,
      domain:              self.domain,
      link_type:           decode_link_type(&self.link_type)?,
      preview_title:       self.preview_title,
      preview_description: self.preview_description,
      preview_image_url:   self.preview_image_url,
      content:             decode_content(self.content_json.as_deref()),
    })
  }
}

pub const RUN_COLUMNS: &str = "run_id, owner, started_at, completed_at, \
   status, total_fetched, new_count, duplicates_skipped, error_message, \
   trigger_type";

/// Raw values read directly from a `sync_runs` row.
pub struct RunRow {
  pub run_id:             String,
  pub owner:              String,
  pub started_at:         String,
  pub completed_at:       Option<String>,
  pub status:             String,
  pub total_fetched:      u32,
  pub new_count:          u32,
  pub duplicates_skipped: u32,
  pub error_message:      Option<String>,
  pub trigger_type:       String,
}

impl RunRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      run_id:             row.get(0)?,
      owner:              row.get(1)?,
      started_at:         row.get(2)?,
      completed_at:       row.get(3)?,
      status:             row.get(4)?,
      total_fetched:      row.get(5)?,
      new_count:          row.get(6)?,
      duplicates_skipped: row.get(7)?,
      error_message:      row.get(8)?,
      trigger_type:       row.get(9)?,
    })
  }

  pub fn into_run(self) -> Result<SyncRun> {
    Ok(SyncRun {
      run_id:             decode_uuid(&self.run_id)?,
      owner:              OwnerId::new(self.owner),
      started_at:         decode_dt(&self.started_at)?,
      completed_at:       decode_opt_dt(self.completed_at)?,
      status:             decode_run_status(&self.status)?,
      total_fetched:      self.total_fetched,
      new_count:          self.new_count,
      duplicates_skipped: self.duplicates_skipped,
      error_message:      self.error_message,
      trigger:            decode_trigger(&self.trigger_type)?,
    })
  }
}

/// `?, ?, ?` with `n` placeholders, numbered from `start`.
pub fn placeholders(start: usize, n: usize) -> String {
  (start..start + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = encode_dt(DateTime::from_timestamp(1_700_000_000, 5_000).unwrap());
    let b = encode_dt(DateTime::from_timestamp(1_700_000_000, 120_000).unwrap());
    assert!(a < b);
    assert_eq!(decode_dt(&a).unwrap().timestamp(), 1_700_000_000);
  }

  #[test]
  fn placeholders_are_numbered() {
    assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
    assert_eq!(placeholders(1, 0), "");
  }
}
