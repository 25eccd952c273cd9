//! Synchronous operation bodies.
//!
//! Each function here runs on the connection thread inside one
//! [`tokio_rusqlite::Connection::call`]. Writers receive a [`Transaction`]
//! that already holds the write lock (see [`crate::lock`]); readers receive a
//! plain connection. Nothing in this module awaits.

pub mod applications;
pub mod audit;
pub mod media;
pub mod messages;
pub mod principals;
pub mod subjects;

use rehome_core::{
  Error as CoreError,
  application::Application,
  audit::{Event, NewEvent},
  principal::{Actor, Principal, Standing},
  subject::Subject,
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawApplication, RawEvent, RawSubject, encode_dt, encode_uuid, now},
};

// ─── Loaders ─────────────────────────────────────────────────────────────────

pub fn find_subject(conn: &Connection, subject_id: Uuid) -> Result<Option<Subject>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM subjects WHERE subject_id = ?1", RawSubject::COLUMNS),
      rusqlite::params![encode_uuid(subject_id)],
      RawSubject::from_row,
    )
    .optional()?;
  raw.map(RawSubject::into_subject).transpose()
}

pub fn require_subject(conn: &Connection, subject_id: Uuid) -> Result<Subject> {
  find_subject(conn, subject_id)?.ok_or_else(|| CoreError::SubjectNotFound(subject_id).into())
}

pub fn find_application(conn: &Connection, application_id: Uuid) -> Result<Option<Application>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM applications WHERE application_id = ?1", RawApplication::COLUMNS),
      rusqlite::params![encode_uuid(application_id)],
      RawApplication::from_row,
    )
    .optional()?;
  raw.map(RawApplication::into_application).transpose()
}

pub fn require_application(conn: &Connection, application_id: Uuid) -> Result<Application> {
  find_application(conn, application_id)?
    .ok_or_else(|| CoreError::ApplicationNotFound(application_id).into())
}

// ─── Standing ────────────────────────────────────────────────────────────────

/// The capacity in which `actor` relates to `application`, or `Forbidden`.
pub fn standing_on(conn: &Connection, actor: Actor, application: &Application) -> Result<Standing> {
  let Actor::User(user_id) = actor else {
    return Ok(Standing::System);
  };
  let principal = principals::get_principal(conn, user_id)?;
  principal
    .standing_on(application.applicant_id, application.organization_id)
    .ok_or_else(|| {
      CoreError::Forbidden(format!(
        "user {user_id} is not a party to application {}",
        application.application_id
      ))
      .into()
    })
}

/// The principal behind `actor` must manage `organization_id`. The system
/// actor always may.
pub fn require_manager(conn: &Connection, actor: Actor, organization_id: Uuid) -> Result<()> {
  let Actor::User(user_id) = actor else {
    return Ok(());
  };
  let principal: Principal = principals::get_principal(conn, user_id)?;
  if principal.manages(organization_id) {
    Ok(())
  } else {
    Err(
      CoreError::Forbidden(format!(
        "user {user_id} does not manage organization {organization_id}"
      ))
      .into(),
    )
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Append one audit record.
pub fn insert_event(tx: &Transaction<'_>, new: NewEvent) -> Result<Event> {
  let event = new.into_event(Uuid::new_v4(), now());

  tx.execute(
    &format!(
      "INSERT INTO events ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      RawEvent::COLUMNS
    ),
    rusqlite::params![
      encode_uuid(event.event_id),
      encode_uuid(event.application_id),
      event.event_type.as_ref(),
      event.from_status.as_ref().map(AsRef::<str>::as_ref),
      event.to_status.as_ref().map(AsRef::<str>::as_ref),
      event.actor_type.as_ref(),
      event.actor_id.map(encode_uuid),
      event.note,
      encode_dt(event.created_at),
    ],
  )?;

  tracing::debug!(
    event_id = %event.event_id,
    application_id = %event.application_id,
    event_type = %event.event_type,
    "event appended"
  );
  Ok(event)
}
