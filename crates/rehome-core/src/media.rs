//! Media items (images and videos) owned by a subject.
//!
//! At most one item per (subject, kind) is primary at any instant. Zero is
//! allowed: demoting the primary never promotes another item, and readers
//! substitute a placeholder through [`resolve_primary`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::validate::ValidationErrors;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaKind {
  Image,
  Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
  pub media_id:   Uuid,
  pub subject_id: Uuid,
  pub kind:       MediaKind,
  /// Storage reference; media storage itself lives elsewhere.
  pub uri:        String,
  pub caption:    String,
  pub is_primary: bool,
  pub sort_order: u16,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AdoptionStore::add_media`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedia {
  pub kind:       MediaKind,
  pub uri:        String,
  #[serde(default)]
  pub caption:    String,
  #[serde(default)]
  pub is_primary: bool,
  #[serde(default)]
  pub sort_order: u16,
}

impl NewMedia {
  pub fn image(uri: impl Into<String>) -> Self {
    Self {
      kind:       MediaKind::Image,
      uri:        uri.into(),
      caption:    String::new(),
      is_primary: false,
      sort_order: 0,
    }
  }

  pub fn primary(mut self) -> Self {
    self.is_primary = true;
    self
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut v = ValidationErrors::new();
    v.require("uri", &self.uri);
    v.max_chars("caption", &self.caption, 200);
    v.finish()
  }
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaUpdate {
  pub caption:    Option<String>,
  pub sort_order: Option<u16>,
  pub is_primary: Option<bool>,
}

impl MediaUpdate {
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut v = ValidationErrors::new();
    if let Some(caption) = &self.caption {
      v.max_chars("caption", caption, 200);
    }
    v.finish()
  }
}

// ─── Read-side resolution ────────────────────────────────────────────────────

/// References shown when a subject has no primary item of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholders {
  pub image: String,
  pub video: String,
}

impl Default for Placeholders {
  fn default() -> Self {
    Self {
      image: "/static/images/placeholder_subject.svg".into(),
      video: "/static/videos/placeholder_subject.mp4".into(),
    }
  }
}

impl Placeholders {
  pub fn for_kind(&self, kind: MediaKind) -> &str {
    match kind {
      MediaKind::Image => &self.image,
      MediaKind::Video => &self.video,
    }
  }
}

/// The representative media for a subject and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PrimaryMedia {
  Item(MediaItem),
  Placeholder { uri: String },
}

impl PrimaryMedia {
  pub fn uri(&self) -> &str {
    match self {
      Self::Item(item) => &item.uri,
      Self::Placeholder { uri } => uri,
    }
  }
}

/// Pick the primary item of `kind` from `items`, falling back to the
/// placeholder. Should more than one be flagged (not reachable through the
/// selector) the lowest `(sort_order, created_at)` wins.
pub fn resolve_primary(items: &[MediaItem], kind: MediaKind, placeholders: &Placeholders) -> PrimaryMedia {
  items
    .iter()
    .filter(|m| m.kind == kind && m.is_primary)
    .min_by_key(|m| (m.sort_order, m.created_at))
    .cloned()
    .map(PrimaryMedia::Item)
    .unwrap_or_else(|| PrimaryMedia::Placeholder { uri: placeholders.for_kind(kind).to_owned() })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(kind: MediaKind, is_primary: bool, sort_order: u16) -> MediaItem {
    MediaItem {
      media_id: Uuid::new_v4(),
      subject_id: Uuid::nil(),
      kind,
      uri: format!("media/{}.bin", Uuid::new_v4()),
      caption: String::new(),
      is_primary,
      sort_order,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn placeholder_when_no_primary() {
    let items = vec![item(MediaKind::Image, false, 0)];
    let p = Placeholders::default();
    assert_eq!(
      resolve_primary(&items, MediaKind::Image, &p),
      PrimaryMedia::Placeholder { uri: p.image.clone() }
    );
  }

  #[test]
  fn primary_of_other_kind_is_ignored() {
    let items = vec![item(MediaKind::Video, true, 0)];
    let p = Placeholders::default();
    assert_eq!(resolve_primary(&items, MediaKind::Image, &p).uri(), p.image);
  }

  #[test]
  fn primary_item_wins() {
    let primary = item(MediaKind::Image, true, 3);
    let items = vec![item(MediaKind::Image, false, 0), primary.clone()];
    assert_eq!(
      resolve_primary(&items, MediaKind::Image, &Placeholders::default()),
      PrimaryMedia::Item(primary)
    );
  }

  #[test]
  fn blank_uri_rejected() {
    assert!(NewMedia::image("  ").validate().unwrap_err().has("uri"));
  }
}
