//! Sync run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::OwnerId;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
  Running,
  Completed,
  Failed,
}

/// What started a run.
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
pub enum TriggerType {
  #[default]
  Manual,
  Scheduled,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
  /// Primary items returned by the post source.
  pub total:      u32,
  /// Primary items that produced a new post row.
  pub new:        u32,
  /// Primary items that were already stored.
  pub duplicates: u32,
}

/// One execution of the sync orchestrator. Created with status `running`,
/// finalised exactly once as `completed` or `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
  pub run_id:             Uuid,
  pub owner:              OwnerId,
  pub started_at:         DateTime<Utc>,
  pub completed_at:       Option<DateTime<Utc>>,
  pub status:             RunStatus,
  pub total_fetched:      u32,
  pub new_count:          u32,
  pub duplicates_skipped: u32,
  pub error_message:      Option<String>,
  pub trigger:            TriggerType,
}

impl SyncRun {
  pub fn stats(&self) -> RunStats {
    RunStats {
      total:      self.total_fetched,
      new:        self.new_count,
      duplicates: self.duplicates_skipped,
    }
  }
}
