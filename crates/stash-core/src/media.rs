//! Media attached to a post.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::OwnerId;

/// The kind of a media attachment.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
  Photo,
  Video,
  AnimatedGif,
}

impl MediaKind {
  /// Videos and animated GIFs both classify a post as video.
  pub fn is_motion(self) -> bool { matches!(self, Self::Video | Self::AnimatedGif) }
}

/// A media row. The external media id is unique within an owner but may
/// recur across owners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
  pub owner:       OwnerId,
  pub media_id:    String,
  pub post_id:     String,
  pub kind:        MediaKind,
  pub url:         String,
  pub preview_url: Option<String>,
  pub width:       Option<u32>,
  pub height:      Option<u32>,
  pub duration_ms: Option<u64>,
}
