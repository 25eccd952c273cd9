//! Per-application message threads.

use rehome_core::{
  Error as CoreError,
  application::Application,
  message::{Message, SenderType},
};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use super::{principals, require_application};
use crate::{
  Result,
  encode::{RawMessage, encode_dt, encode_uuid, now},
};

pub fn send_message(
  tx: &Transaction<'_>,
  application_id: Uuid,
  sender_id: Uuid,
  content: String,
) -> Result<Message> {
  let application = require_application(tx, application_id)?;
  let sender_type = party(tx, &application, sender_id)?;

  let message = Message {
    message_id: Uuid::new_v4(),
    application_id,
    sender_id,
    sender_type,
    content,
    created_at: now(),
    read_at: None,
  };

  tx.execute(
    &format!("INSERT INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)", RawMessage::COLUMNS),
    rusqlite::params![
      encode_uuid(message.message_id),
      encode_uuid(message.application_id),
      encode_uuid(message.sender_id),
      message.sender_type.as_ref(),
      message.content,
      encode_dt(message.created_at),
    ],
  )?;

  tracing::debug!(message_id = %message.message_id, %application_id, %sender_type, "message sent");
  Ok(message)
}

/// Set `read_at` once. A second call returns the stored message untouched.
pub fn mark_message_read(tx: &Transaction<'_>, message_id: Uuid, reader_id: Uuid) -> Result<Message> {
  let message = require_message(tx, message_id)?;
  let application = require_application(tx, message.application_id)?;
  party(tx, &application, reader_id)?;
  if message.sender_id == reader_id {
    return Err(
      CoreError::Forbidden(format!("user {reader_id} cannot mark their own message read")).into(),
    );
  }
  if message.is_read() {
    return Ok(message);
  }

  let read_at = now();
  tx.execute(
    "UPDATE messages SET read_at = ?2 WHERE message_id = ?1 AND read_at IS NULL",
    rusqlite::params![encode_uuid(message_id), encode_dt(read_at)],
  )?;

  tracing::debug!(%message_id, %reader_id, "message read");
  Ok(Message { read_at: Some(read_at), ..message })
}

/// The thread for one application, oldest first.
pub fn list_messages(conn: &Connection, application_id: Uuid, viewer_id: Uuid) -> Result<Vec<Message>> {
  let application = require_application(conn, application_id)?;
  party(conn, &application, viewer_id)?;

  conn
    .prepare(&format!(
      "SELECT {} FROM messages WHERE application_id = ?1 ORDER BY created_at, rowid",
      RawMessage::COLUMNS
    ))?
    .query_map(rusqlite::params![encode_uuid(application_id)], RawMessage::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawMessage::into_message)
    .collect()
}

pub fn unread_count(conn: &Connection, application_id: Uuid, reader_id: Uuid) -> Result<u64> {
  let application = require_application(conn, application_id)?;
  party(conn, &application, reader_id)?;

  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM messages
     WHERE application_id = ?1 AND sender_id <> ?2 AND read_at IS NULL",
    rusqlite::params![encode_uuid(application_id), encode_uuid(reader_id)],
    |row| row.get(0),
  )?;
  crate::encode::decode_int("unread count", count)
}

fn require_message(conn: &Connection, message_id: Uuid) -> Result<Message> {
  conn
    .query_row(
      &format!("SELECT {} FROM messages WHERE message_id = ?1", RawMessage::COLUMNS),
      rusqlite::params![encode_uuid(message_id)],
      RawMessage::from_row,
    )?
    .into_message()
}

/// The sender type `user_id` would post under, or `Forbidden` if they are not
/// a party to the thread.
fn party(conn: &Connection, application: &Application, user_id: Uuid) -> Result<SenderType> {
  principals::get_principal(conn, user_id)?
    .sender_type_on(application.applicant_id, application.organization_id)
    .ok_or_else(|| {
      CoreError::Forbidden(format!(
        "user {user_id} is not a party to application {}",
        application.application_id
      ))
      .into()
    })
}
