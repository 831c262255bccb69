//! SQL schema for the Stash SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Posts are insert-or-skip: no UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS posts (
    owner           TEXT    NOT NULL,
    post_id         TEXT    NOT NULL,
    author          TEXT    NOT NULL,
    author_name     TEXT,
    author_avatar   TEXT,
    text            TEXT    NOT NULL,
    source_url      TEXT    NOT NULL,
    created_at      TEXT,              -- RFC 3339 UTC, from the source
    processed_at    TEXT    NOT NULL,  -- RFC 3339 UTC; server-assigned
    category        TEXT    NOT NULL,  -- 'tweet' | 'photo' | 'video' | 'article'
    is_reply        INTEGER NOT NULL DEFAULT 0,
    is_quote        INTEGER NOT NULL DEFAULT 0,
    is_retweet      INTEGER NOT NULL DEFAULT 0,
    quoted_post_id  TEXT,              -- same-owner post_id
    snapshot        TEXT    NOT NULL DEFAULT '{\"kind\":\"none\"}',
    raw_json        TEXT,
    PRIMARY KEY (owner, post_id)
);

CREATE TABLE IF NOT EXISTS media (
    owner        TEXT    NOT NULL,
    media_id     TEXT    NOT NULL,
    post_id      TEXT    NOT NULL,
    kind         TEXT    NOT NULL,     -- 'photo' | 'video' | 'animated_gif'
    url          TEXT    NOT NULL,
    preview_url  TEXT,
    width        INTEGER,
    height       INTEGER,
    duration_ms  INTEGER,
    PRIMARY KEY (owner, media_id),
    FOREIGN KEY (owner, post_id) REFERENCES posts(owner, post_id)
);

CREATE TABLE IF NOT EXISTS links (
    link_id              INTEGER PRIMARY KEY AUTOINCREMENT,
    owner                TEXT NOT NULL,
    post_id              TEXT NOT NULL,
    url                  TEXT NOT NULL,
    expanded_url         TEXT,
    domain               TEXT,
    link_type            TEXT NOT NULL, -- 'tweet' | 'article' | 'external'
    preview_title        TEXT,
    preview_description  TEXT,
    preview_image_url    TEXT,
    content_json         TEXT,          -- ArticleContent or NULL
    UNIQUE (owner, post_id, url),
    FOREIGN KEY (owner, post_id) REFERENCES posts(owner, post_id)
);

CREATE TABLE IF NOT EXISTS tags (
    owner    TEXT NOT NULL,
    post_id  TEXT NOT NULL,
    tag      TEXT NOT NULL,
    PRIMARY KEY (owner, post_id, tag),
    FOREIGN KEY (owner, post_id) REFERENCES posts(owner, post_id)
);

-- Presence of a row means the post has been read.
CREATE TABLE IF NOT EXISTS read_status (
    owner    TEXT NOT NULL,
    post_id  TEXT NOT NULL,
    read_at  TEXT NOT NULL,
    PRIMARY KEY (owner, post_id),
    FOREIGN KEY (owner, post_id) REFERENCES posts(owner, post_id)
);

CREATE TABLE IF NOT EXISTS sync_runs (
    run_id              TEXT    PRIMARY KEY,
    owner               TEXT    NOT NULL,
    started_at          TEXT    NOT NULL,
    completed_at        TEXT,
    status              TEXT    NOT NULL, -- 'running' | 'completed' | 'failed'
    total_fetched       INTEGER NOT NULL DEFAULT 0,
    new_count           INTEGER NOT NULL DEFAULT 0,
    duplicates_skipped  INTEGER NOT NULL DEFAULT 0,
    error_message       TEXT,
    trigger_type        TEXT    NOT NULL DEFAULT 'manual'
);

CREATE INDEX IF NOT EXISTS posts_processed_idx ON posts(owner, processed_at);
CREATE INDEX IF NOT EXISTS posts_quoted_idx    ON posts(owner, quoted_post_id);
CREATE INDEX IF NOT EXISTS media_post_idx      ON media(owner, post_id);
CREATE INDEX IF NOT EXISTS links_post_idx      ON links(owner, post_id);
CREATE INDEX IF NOT EXISTS tags_tag_idx        ON tags(owner, tag);
CREATE INDEX IF NOT EXISTS runs_owner_idx      ON sync_runs(owner, status, completed_at);

PRAGMA user_version = 1;
";
