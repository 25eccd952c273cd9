//! Parent-row locks.
//!
//! SQLite has no `SELECT ... FOR UPDATE`. Every write transaction is opened
//! with `BEGIN IMMEDIATE`, which takes the database write lock before the
//! first read, so once [`Lock::acquire`] returns no other writer can change
//! the parent row (or anything else) until commit. Readers in WAL mode keep
//! seeing the last committed state and never wait.
//!
//! What remains per call is naming the parent and proving it exists, which
//! is what this module does.

use std::fmt;

use rusqlite::{OptionalExtension as _, Transaction};
use uuid::Uuid;

use crate::{Result, encode::encode_uuid};

/// The parent entity an invariant-bearing write is serialized on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
  Organization(Uuid),
  Subject(Uuid),
  Application(Uuid),
  Message(Uuid),
  Media(Uuid),
  Event(Uuid),
  /// No parent row; the write only needs the store-wide lock.
  Store,
}

impl Lock {
  fn row(&self) -> Option<(&'static str, &'static str, Uuid)> {
    match *self {
      Self::Organization(id) => Some(("organizations", "organization_id", id)),
      Self::Subject(id) => Some(("subjects", "subject_id", id)),
      Self::Application(id) => Some(("applications", "application_id", id)),
      Self::Message(id) => Some(("messages", "message_id", id)),
      Self::Media(id) => Some(("media", "media_id", id)),
      Self::Event(id) => Some(("events", "event_id", id)),
      Self::Store => None,
    }
  }

  fn not_found(&self) -> rehome_core::Error {
    use rehome_core::Error as E;
    match *self {
      Self::Organization(id) => E::OrganizationNotFound(id),
      Self::Subject(id) => E::SubjectNotFound(id),
      Self::Application(id) => E::ApplicationNotFound(id),
      Self::Message(id) => E::MessageNotFound(id),
      Self::Media(id) => E::MediaNotFound(id),
      Self::Event(id) => E::EventNotFound(id),
      Self::Store => E::Conflict("store lock has no parent row".into()),
    }
  }

  /// Confirm the parent row exists inside `tx`, which already holds the
  /// write lock.
  pub(crate) fn acquire(&self, tx: &Transaction<'_>) -> Result<()> {
    let Some((table, key, id)) = self.row() else {
      return Ok(());
    };

    let found = tx
      .query_row(
        &format!("SELECT 1 FROM {table} WHERE {key} = ?1"),
        rusqlite::params![encode_uuid(id)],
        |_| Ok(()),
      )
      .optional()?;

    match found {
      Some(()) => {
        tracing::trace!(lock = %self, "parent row locked");
        Ok(())
      }
      None => Err(self.not_found().into()),
    }
  }
}

impl fmt::Display for Lock {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.row() {
      Some((table, _, id)) => write!(f, "{table}/{id}"),
      None => f.write_str("store"),
    }
  }
}
