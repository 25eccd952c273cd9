//! Notes, system events, listing and the administrative purge.

use rehome_core::{
  Error as CoreError,
  audit::{ActorType, Event, EventType, NewEvent},
  principal::Actor,
};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use super::{insert_event, principals, require_application, standing_on};
use crate::{
  Result,
  encode::{RawEvent, decode_uuid, encode_uuid},
};

pub fn add_note(
  tx: &Transaction<'_>,
  application_id: Uuid,
  actor: Actor,
  note: String,
) -> Result<Event> {
  let application = require_application(tx, application_id)?;
  let standing = standing_on(tx, actor, &application)?;
  insert_event(tx, NewEvent::note(application_id, standing, actor, note))
}

pub fn record_system_event(
  tx: &Transaction<'_>,
  application_id: Uuid,
  note: String,
) -> Result<Event> {
  require_application(tx, application_id)?;
  insert_event(tx, NewEvent::system(application_id, note))
}

/// Events for one application in the order they were appended.
pub fn list_events(conn: &Connection, application_id: Uuid, viewer: Actor) -> Result<Vec<Event>> {
  let application = require_application(conn, application_id)?;
  standing_on(conn, viewer, &application)?;

  conn
    .prepare(&format!(
      "SELECT {} FROM events WHERE application_id = ?1 ORDER BY created_at, rowid",
      RawEvent::COLUMNS
    ))?
    .query_map(rusqlite::params![encode_uuid(application_id)], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawEvent::into_event)
    .collect()
}

/// Delete one event and append a record of the deletion. The caller holds
/// the event lock.
pub fn purge_event(
  tx: &Transaction<'_>,
  event_id: Uuid,
  admin_id: Uuid,
  reason: String,
) -> Result<Event> {
  if !principals::get_principal(tx, admin_id)?.is_admin() {
    return Err(CoreError::Forbidden(format!("user {admin_id} may not purge events")).into());
  }

  let application_id: String = tx.query_row(
    "SELECT application_id FROM events WHERE event_id = ?1",
    rusqlite::params![encode_uuid(event_id)],
    |row| row.get(0),
  )?;
  let application_id = decode_uuid(&application_id)?;

  tx.execute("DELETE FROM events WHERE event_id = ?1", rusqlite::params![encode_uuid(event_id)])?;

  let record = NewEvent {
    event_type: EventType::System,
    actor_type: ActorType::Admin,
    actor_id: Some(admin_id),
    ..NewEvent::system(application_id, format!("purged event {event_id}: {reason}"))
  };
  let event = insert_event(tx, record)?;

  tracing::warn!(%event_id, %application_id, %admin_id, "audit event purged");
  Ok(event)
}
