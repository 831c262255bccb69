//! The per-owner cooldown gate.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash_core::run::SyncRun;

/// Whether the owner may start a run now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
  pub can_sync:     bool,
  /// Zero when `can_sync` is true.
  pub remaining_ms: u64,
  /// Completion time of the owner's most recent completed run.
  pub last_sync_at: Option<DateTime<Utc>>,
}

impl CooldownStatus {
  /// Evaluate the gate against the owner's latest completed run. Only
  /// completed runs count; failed and running ones never block.
  pub fn evaluate(
    latest_completed: Option<&SyncRun>,
    window: Duration,
    now: DateTime<Utc>,
  ) -> Self {
    let Some(last) = latest_completed.and_then(|r| r.completed_at) else {
      return Self { can_sync: true, remaining_ms: 0, last_sync_at: None };
    };

    let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
    // A completion stamped in the future counts as "just now".
    let elapsed_ms = u64::try_from((now - last).num_milliseconds()).unwrap_or(0);
    let remaining_ms = window_ms.saturating_sub(elapsed_ms);

    Self {
      can_sync: remaining_ms == 0,
      remaining_ms,
      last_sync_at: Some(last),
    }
  }
}
