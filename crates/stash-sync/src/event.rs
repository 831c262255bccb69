//! The progress vocabulary of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash_core::{post::Category, run::RunStats};
use strum::IntoStaticStr;
use uuid::Uuid;

/// Where a run is in its lifecycle.
///
/// `Idle → Connecting → Fetching → Processing → … → Complete | Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
  #[default]
  Idle,
  Connecting,
  Fetching { page: u32 },
  Processing { current: u32, total: u32 },
  Complete,
  Failed,
}

impl SyncState {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Complete | Self::Failed)
  }
}

/// What happened to one item, as reported in a `processing` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedItem {
  pub post_id:  String,
  pub author:   String,
  pub category: Category,
  /// False when the post was already stored for this owner.
  pub is_new:   bool,
}

/// One event on a run's progress stream. Every stream starts with `Start`
/// and ends with exactly one of `Complete` or `Failed`; `Ping`s may be
/// interleaved anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SyncEvent {
  Start {
    sync_id: Uuid,
  },
  Page {
    page_number: u32,
    items_found: u32,
    cursor:      Option<String>,
  },
  Processing {
    current: u32,
    total:   u32,
    item:    ProcessedItem,
  },
  Duplicate {
    post_id: String,
  },
  Complete {
    stats:               RunStats,
    enrichment_failures: u32,
  },
  #[serde(rename = "error")]
  #[strum(serialize = "error")]
  Failed {
    message: String,
  },
  Ping {
    timestamp: DateTime<Utc>,
  },
}

impl SyncEvent {
  /// The event's tag, e.g. `"page"` or `"error"`.
  pub fn name(&self) -> &'static str { self.into() }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Complete { .. } | Self::Failed { .. })
  }
}
