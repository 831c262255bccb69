//! [`SqliteStore`]: the SQLite implementation of [`BookmarkStore`] and
//! [`FeedStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use uuid::Uuid;

use stash_core::{
  OwnerId,
  link::{Link, NewLink},
  media::Media,
  post::{NewPost, Post},
  run::{RunStats, RunStatus, SyncRun, TriggerType},
  store::{
    BookmarkStore, FeedQuery, FeedStore, InsertOutcome, OwnerDeletion, Tag,
    TagCount,
  },
};

use crate::{
  Error, Result,
  encode::{
    LINK_COLUMNS, LinkRow, MEDIA_COLUMNS, MediaRow, POST_COLUMNS, PostRow,
    RUN_COLUMNS, RunRow, encode_content, encode_dt, encode_snapshot,
    encode_uuid, placeholders,
  },
  schema::SCHEMA,
};

fn outcome(changed: usize) -> InsertOutcome {
  if changed == 0 {
    InsertOutcome::Skipped
  } else {
    InsertOutcome::Inserted
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stash bookmark store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows the owner has in `table`. Used by maintenance tooling
  /// and tests.
  pub async fn count_rows(&self, table: &'static str, owner: OwnerId) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM {table} WHERE owner = ?1"),
          rusqlite::params![owner.as_str()],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(count).unwrap_or_default())
  }

  /// Insert a row keyed on an existing post, or report the missing post.
  async fn insert_post_child(
    &self,
    owner: OwnerId,
    post_id: String,
    sql: &'static str,
    extra: Option<String>,
  ) -> Result<InsertOutcome> {
    let at_str = encode_dt(Utc::now());
    let (owner_c, post_c) = (owner.clone(), post_id.clone());

    let changed: Option<usize> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM posts WHERE owner = ?1 AND post_id = ?2",
            rusqlite::params![owner_c.as_str(), post_c],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }
        let changed = conn.execute(
          sql,
          rusqlite::params![owner_c.as_str(), post_c, extra.unwrap_or(at_str)],
        )?;
        Ok(Some(changed))
      })
      .await?;

    changed
      .map(outcome)
      .ok_or(Error::PostNotFound { owner, post_id })
  }

  /// Delete a row keyed on `(owner, post_id, extra)`.
  async fn delete_post_child(
    &self,
    sql: &'static str,
    params: Vec<String>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, params_from_iter(params.iter()))?))
      .await?;
    Ok(changed > 0)
  }

  async fn finish_run(
    &self,
    run_id: Uuid,
    status: RunStatus,
    stats: RunStats,
    message: Option<String>,
  ) -> Result<()> {
    let id_str     = encode_uuid(run_id);
    let at_str     = encode_dt(Utc::now());
    let status_str = <&'static str>::from(status);

    let (changed, exists) = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE sync_runs
              SET status = ?2, completed_at = ?3, total_fetched = ?4,
                  new_count = ?5, duplicates_skipped = ?6, error_message = ?7
            WHERE run_id = ?1 AND status = 'running'",
          rusqlite::params![
            id_str,
            status_str,
            at_str,
            stats.total,
            stats.new,
            stats.duplicates,
            message,
          ],
        )?;
        let exists = conn
          .query_row(
            "SELECT 1 FROM sync_runs WHERE run_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        Ok((changed, exists))
      })
      .await?;

    match (changed, exists) {
      (0, false) => Err(Error::RunNotFound(run_id)),
      (0, true) => Err(Error::RunAlreadyFinished(run_id)),
      _ => Ok(()),
    }
  }

  /// Run `SELECT {columns} FROM {from} WHERE owner = ?1 AND {key} IN (…)`.
  async fn select_by_post_ids<R, F>(
    &self,
    owner: OwnerId,
    post_ids: Vec<String>,
    sql_for: F,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>,
  ) -> Result<Vec<R>>
  where
    R: Send + 'static,
    F: FnOnce(&str) -> String + Send + 'static,
  {
    if post_ids.is_empty() {
      return Ok(Vec::new());
    }

    let rows = self
      .conn
      .call(move |conn| {
        let sql = sql_for(&placeholders(2, post_ids.len()));
        let params = std::iter::once(owner.as_str().to_owned()).chain(post_ids);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

// ─── BookmarkStore impl ──────────────────────────────────────────────────────

impl BookmarkStore for SqliteStore {
  type Error = Error;

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn insert_post(&self, post: NewPost) -> Result<InsertOutcome> {
    let processed_at = encode_dt(Utc::now());
    let created_at   = post.created_at.map(encode_dt);
    let category     = <&'static str>::from(post.category);
    let snapshot     = encode_snapshot(&post.snapshot)?;
    let raw_json     = post.raw.as_ref().map(serde_json::to_string).transpose()?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO posts (
             owner, post_id, author, author_name, author_avatar, text,
             source_url, created_at, processed_at, category,
             is_reply, is_quote, is_retweet, quoted_post_id, snapshot, raw_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
           ON CONFLICT (owner, post_id) DO NOTHING",
          rusqlite::params![
            post.owner.as_str(),
            post.post_id,
            post.author,
            post.author_name,
            post.author_avatar,
            post.text,
            post.source_url,
            created_at,
            processed_at,
            category,
            post.is_reply,
            post.is_quote,
            post.is_retweet,
            post.quoted_post_id,
            snapshot,
            raw_json,
          ],
        )?)
      })
      .await?;

    Ok(outcome(changed))
  }

  async fn insert_media(&self, media: Media) -> Result<InsertOutcome> {
    let kind        = <&'static str>::from(media.kind);
    let duration_ms = media.duration_ms.and_then(|d| i64::try_from(d).ok());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO media (
             owner, media_id, post_id, kind, url, preview_url,
             width, height, duration_ms
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (owner, media_id) DO NOTHING",
          rusqlite::params![
            media.owner.as_str(),
            media.media_id,
            media.post_id,
            kind,
            media.url,
            media.preview_url,
            media.width,
            media.height,
            duration_ms,
          ],
        )?)
      })
      .await?;

    Ok(outcome(changed))
  }

  async fn insert_link(&self, link: NewLink) -> Result<InsertOutcome> {
    let link_type = <&'static str>::from(link.link_type);
    let content   = encode_content(link.content.as_ref())?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO links (
             owner, post_id, url, expanded_url, domain, link_type,
             preview_title, preview_description, preview_image_url, content_json
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT (owner, post_id, url) DO NOTHING",
          rusqlite::params![
            link.owner.as_str(),
            link.post_id,
            link.url,
            link.expanded_url,
            link.domain,
            link_type,
            link.preview_title,
            link.preview_description,
            link.preview_image_url,
            content,
          ],
        )?)
      })
      .await?;

    Ok(outcome(changed))
  }

  async fn post_exists(&self, owner: OwnerId, post_id: String) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM posts WHERE owner = ?1 AND post_id = ?2",
              rusqlite::params![owner.as_str(), post_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn get_post(&self, owner: OwnerId, post_id: String) -> Result<Option<Post>> {
    let raw: Option<PostRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {POST_COLUMNS} FROM posts p
                  WHERE p.owner = ?1 AND p.post_id = ?2"
              ),
              rusqlite::params![owner.as_str(), post_id],
              PostRow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(PostRow::into_post).transpose()
  }

  // ── Tags & read status ────────────────────────────────────────────────────

  async fn add_tag(
    &self,
    owner: OwnerId,
    post_id: String,
    tag: String,
  ) -> Result<InsertOutcome> {
    let tag = stash_core::store::normalize_tag(&tag)?;
    self
      .insert_post_child(
        owner,
        post_id,
        "INSERT INTO tags (owner, post_id, tag) VALUES (?1, ?2, ?3)
         ON CONFLICT (owner, post_id, tag) DO NOTHING",
        Some(tag),
      )
      .await
  }

  async fn remove_tag(
    &self,
    owner: OwnerId,
    post_id: String,
    tag: String,
  ) -> Result<bool> {
    let tag = stash_core::store::normalize_tag(&tag)?;
    self
      .delete_post_child(
        "DELETE FROM tags WHERE owner = ?1 AND post_id = ?2 AND tag = ?3",
        vec![owner.as_str().to_owned(), post_id, tag],
      )
      .await
  }

  async fn list_tags(&self, owner: OwnerId) -> Result<Vec<TagCount>> {
    let tags = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT tag, COUNT(*) FROM tags WHERE owner = ?1
            GROUP BY tag ORDER BY COUNT(*) DESC, tag",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner.as_str()], |row| {
            Ok(TagCount { tag: row.get(0)?, count: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tags)
  }

  async fn mark_read(&self, owner: OwnerId, post_id: String) -> Result<InsertOutcome> {
    self
      .insert_post_child(
        owner,
        post_id,
        "INSERT INTO read_status (owner, post_id, read_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (owner, post_id) DO NOTHING",
        None,
      )
      .await
  }

  async fn mark_unread(&self, owner: OwnerId, post_id: String) -> Result<bool> {
    self
      .delete_post_child(
        "DELETE FROM read_status WHERE owner = ?1 AND post_id = ?2",
        vec![owner.as_str().to_owned(), post_id],
      )
      .await
  }

  // ── Runs ──────────────────────────────────────────────────────────────────

  async fn start_run(&self, owner: OwnerId, trigger: TriggerType) -> Result<SyncRun> {
    let run = SyncRun {
      run_id: Uuid::new_v4(),
      owner,
      started_at: Utc::now(),
      completed_at: None,
      status: RunStatus::Running,
      total_fetched: 0,
      new_count: 0,
      duplicates_skipped: 0,
      error_message: None,
      trigger,
    };

    let id_str      = encode_uuid(run.run_id);
    let owner_str   = run.owner.as_str().to_owned();
    let at_str      = encode_dt(run.started_at);
    let trigger_str = <&'static str>::from(trigger);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sync_runs (run_id, owner, started_at, status, trigger_type)
           VALUES (?1, ?2, ?3, 'running', ?4)",
          rusqlite::params![id_str, owner_str, at_str, trigger_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(run)
  }

  async fn complete_run(&self, run_id: Uuid, stats: RunStats) -> Result<()> {
    self.finish_run(run_id, RunStatus::Completed, stats, None).await
  }

  async fn fail_run(&self, run_id: Uuid, stats: RunStats, message: String) -> Result<()> {
    self
      .finish_run(run_id, RunStatus::Failed, stats, Some(message))
      .await
  }

  async fn latest_completed_run(&self, owner: OwnerId) -> Result<Option<SyncRun>> {
    let raw: Option<RunRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RUN_COLUMNS} FROM sync_runs
                  WHERE owner = ?1 AND status = 'completed'
                  ORDER BY completed_at DESC
                  LIMIT 1"
              ),
              rusqlite::params![owner.as_str()],
              RunRow::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RunRow::into_run).transpose()
  }

  async fn list_runs(&self, owner: OwnerId, limit: usize) -> Result<Vec<SyncRun>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RunRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RUN_COLUMNS} FROM sync_runs
            WHERE owner = ?1
            ORDER BY started_at DESC
            LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner.as_str(), limit_val], RunRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RunRow::into_run).collect()
  }

  // ── Bulk ──────────────────────────────────────────────────────────────────

  async fn delete_owner(&self, owner: OwnerId) -> Result<OwnerDeletion> {
    let deletion = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let owner = owner.as_str();
        // Children before posts so foreign keys stay satisfied.
        let del = |table: &str| -> rusqlite::Result<u64> {
          let n = tx.execute(
            &format!("DELETE FROM {table} WHERE owner = ?1"),
            rusqlite::params![owner],
          )?;
          Ok(n as u64)
        };
        let deletion = OwnerDeletion {
          read_status: del("read_status")?,
          tags:        del("tags")?,
          links:       del("links")?,
          media:       del("media")?,
          posts:       del("posts")?,
          runs:        del("sync_runs")?,
        };
        tx.commit()?;
        Ok(deletion)
      })
      .await?;
    Ok(deletion)
  }
}

// ─── FeedStore impl ──────────────────────────────────────────────────────────

impl FeedStore for SqliteStore {
  type Error = Error;

  async fn list_posts(&self, owner: OwnerId, query: FeedQuery) -> Result<Vec<Post>> {
    let raws: Vec<PostRow> = self
      .conn
      .call(move |conn| {
        let mut params: Vec<Value> = vec![Value::Text(owner.as_str().to_owned())];
        let mut conds: Vec<String> = vec!["p.owner = ?1".to_owned()];

        if let Some(category) = query.category {
          params.push(Value::Text(<&'static str>::from(category).to_owned()));
          conds.push(format!("p.category = ?{}", params.len()));
        }
        if query.unread_only {
          conds.push(
            "NOT EXISTS (SELECT 1 FROM read_status r
                          WHERE r.owner = p.owner AND r.post_id = p.post_id)"
              .to_owned(),
          );
        }
        if let Some(tag) = query.tag {
          params.push(Value::Text(tag));
          conds.push(format!(
            "EXISTS (SELECT 1 FROM tags t
                      WHERE t.owner = p.owner AND t.post_id = p.post_id
                        AND t.tag = ?{})",
            params.len()
          ));
        }

        params.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
        let limit_idx = params.len();
        params.push(Value::Integer(i64::try_from(query.offset).unwrap_or(0)));
        let offset_idx = params.len();

        let sql = format!(
          "SELECT {POST_COLUMNS} FROM posts p
            WHERE {}
            ORDER BY p.processed_at DESC, p.post_id DESC
            LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
          conds.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params), PostRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(PostRow::into_post).collect()
  }

  async fn posts_by_ids(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<Post>> {
    self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT {POST_COLUMNS} FROM posts p
              WHERE p.owner = ?1 AND p.post_id IN ({ph})"
          )
        },
        PostRow::from_row,
      )
      .await?
      .into_iter()
      .map(PostRow::into_post)
      .collect()
  }

  async fn media_for_posts(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<Media>> {
    self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT {MEDIA_COLUMNS} FROM media
              WHERE owner = ?1 AND post_id IN ({ph})
              ORDER BY rowid"
          )
        },
        MediaRow::from_row,
      )
      .await?
      .into_iter()
      .map(MediaRow::into_media)
      .collect()
  }

  async fn links_for_posts(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<Link>> {
    self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT {LINK_COLUMNS} FROM links
              WHERE owner = ?1 AND post_id IN ({ph})
              ORDER BY link_id"
          )
        },
        LinkRow::from_row,
      )
      .await?
      .into_iter()
      .map(LinkRow::into_link)
      .collect()
  }

  async fn tags_for_posts(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<Tag>> {
    let rows: Vec<(String, String, String)> = self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT owner, post_id, tag FROM tags
              WHERE owner = ?1 AND post_id IN ({ph})
              ORDER BY tag"
          )
        },
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
      )
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(owner, post_id, tag)| Tag { owner: OwnerId::new(owner), post_id, tag })
        .collect(),
    )
  }

  async fn read_post_ids(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<String>> {
    self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT post_id FROM read_status
              WHERE owner = ?1 AND post_id IN ({ph})"
          )
        },
        |row| row.get(0),
      )
      .await
  }

  async fn posts_quoting(&self, owner: OwnerId, post_ids: Vec<String>) -> Result<Vec<Post>> {
    self
      .select_by_post_ids(
        owner,
        post_ids,
        |ph| {
          format!(
            "SELECT {POST_COLUMNS} FROM posts p
              WHERE p.owner = ?1 AND p.quoted_post_id IN ({ph})
              ORDER BY p.processed_at DESC"
          )
        },
        PostRow::from_row,
      )
      .await?
      .into_iter()
      .map(PostRow::into_post)
      .collect()
  }
}
