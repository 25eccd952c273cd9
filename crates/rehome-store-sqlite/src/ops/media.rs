//! Media items and the primary selector.
//!
//! Every path that can set `is_primary` holds the subject lock and clears the
//! other primaries of the same kind before writing, so at most one primary
//! per (subject, kind) is ever committed. The partial unique index
//! `media_one_primary_idx` backs this up.

use rehome_core::{
  Error as CoreError,
  media::{MediaItem, MediaKind, MediaUpdate, NewMedia},
  principal::Actor,
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use super::{require_manager, require_subject};
use crate::{
  Result,
  encode::{RawMedia, encode_dt, encode_uuid, now},
  lock::Lock,
};

/// Add an item. The caller holds the subject lock.
pub fn add_media(
  tx: &Transaction<'_>,
  subject_id: Uuid,
  input: NewMedia,
  actor: Actor,
) -> Result<MediaItem> {
  let subject = require_subject(tx, subject_id)?;
  require_manager(tx, actor, subject.organization_id)?;

  let item = MediaItem {
    media_id: Uuid::new_v4(),
    subject_id,
    kind: input.kind,
    uri: input.uri,
    caption: input.caption,
    is_primary: input.is_primary,
    sort_order: input.sort_order,
    created_at: now(),
  };

  if item.is_primary {
    clear_primaries(tx, subject_id, item.kind, item.media_id)?;
  }

  tx.execute(
    &format!("INSERT INTO media ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", RawMedia::COLUMNS),
    rusqlite::params![
      encode_uuid(item.media_id),
      encode_uuid(item.subject_id),
      item.kind.as_ref(),
      item.uri,
      item.caption,
      item.is_primary,
      item.sort_order,
      encode_dt(item.created_at),
    ],
  )?;

  tracing::info!(media_id = %item.media_id, %subject_id, kind = %item.kind, primary = item.is_primary, "media added");
  Ok(item)
}

/// Apply a partial update. The caller holds the media lock; the subject is
/// locked here before any primary flag is touched.
pub fn update_media(
  tx: &Transaction<'_>,
  media_id: Uuid,
  update: MediaUpdate,
  actor: Actor,
) -> Result<MediaItem> {
  let mut item = require_media(tx, media_id)?;
  Lock::Subject(item.subject_id).acquire(tx)?;
  let subject = require_subject(tx, item.subject_id)?;
  require_manager(tx, actor, subject.organization_id)?;

  if let Some(caption) = update.caption {
    item.caption = caption;
  }
  if let Some(sort_order) = update.sort_order {
    item.sort_order = sort_order;
  }
  match update.is_primary {
    Some(true) if !item.is_primary => {
      clear_primaries(tx, item.subject_id, item.kind, media_id)?;
      item.is_primary = true;
    }
    // Demotion leaves the kind without a primary; readers fall back to the
    // placeholder.
    Some(false) => item.is_primary = false,
    _ => {}
  }

  tx.execute(
    "UPDATE media SET caption = ?2, sort_order = ?3, is_primary = ?4 WHERE media_id = ?1",
    rusqlite::params![encode_uuid(media_id), item.caption, item.sort_order, item.is_primary],
  )?;

  tracing::debug!(%media_id, primary = item.is_primary, "media updated");
  Ok(item)
}

/// Make `media_id` the only primary of its kind for `subject_id`. The caller
/// holds the subject lock.
pub fn set_primary_media(
  tx: &Transaction<'_>,
  subject_id: Uuid,
  media_id: Uuid,
  actor: Actor,
) -> Result<MediaItem> {
  let subject = require_subject(tx, subject_id)?;
  require_manager(tx, actor, subject.organization_id)?;

  let mut item = find_media(tx, media_id)?
    .filter(|item| item.subject_id == subject_id)
    .ok_or(CoreError::MediaNotFound(media_id))?;

  clear_primaries(tx, subject_id, item.kind, media_id)?;
  tx.execute(
    "UPDATE media SET is_primary = 1 WHERE media_id = ?1",
    rusqlite::params![encode_uuid(media_id)],
  )?;
  item.is_primary = true;

  tracing::info!(%media_id, %subject_id, kind = %item.kind, "primary media selected");
  Ok(item)
}

/// Primary first, then by `sort_order`, then by age.
pub fn list_media(conn: &Connection, subject_id: Uuid) -> Result<Vec<MediaItem>> {
  conn
    .prepare(&format!(
      "SELECT {} FROM media WHERE subject_id = ?1
       ORDER BY is_primary DESC, sort_order, created_at, rowid",
      RawMedia::COLUMNS
    ))?
    .query_map(rusqlite::params![encode_uuid(subject_id)], RawMedia::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawMedia::into_media)
    .collect()
}

fn find_media(conn: &Connection, media_id: Uuid) -> Result<Option<MediaItem>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM media WHERE media_id = ?1", RawMedia::COLUMNS),
      rusqlite::params![encode_uuid(media_id)],
      RawMedia::from_row,
    )
    .optional()?;
  raw.map(RawMedia::into_media).transpose()
}

fn require_media(conn: &Connection, media_id: Uuid) -> Result<MediaItem> {
  find_media(conn, media_id)?.ok_or_else(|| CoreError::MediaNotFound(media_id).into())
}

fn clear_primaries(tx: &Transaction<'_>, subject_id: Uuid, kind: MediaKind, keep: Uuid) -> Result<()> {
  let cleared = tx.execute(
    "UPDATE media SET is_primary = 0
     WHERE subject_id = ?1 AND kind = ?2 AND media_id <> ?3 AND is_primary = 1",
    rusqlite::params![encode_uuid(subject_id), kind.as_ref(), encode_uuid(keep)],
  )?;
  if cleared > 0 {
    tracing::debug!(%subject_id, %kind, cleared, "previous primary demoted");
  }
  Ok(())
}
