//! Subject registration, the pause override and status synchronization.

use rehome_core::{
  Error as CoreError,
  application::ApplicationStatus,
  principal::Actor,
  subject::{NewSubject, StatusCause, Subject, SubjectStatus, SubjectStatusChange},
  sync::{self, SyncDecision},
};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use super::{require_manager, require_subject};
use crate::{
  Result,
  encode::{RawStatusChange, RawSubject, decode_enum, encode_cause, encode_dt, encode_uuid, now},
};

pub fn register_subject(
  tx: &Transaction<'_>,
  organization_id: Uuid,
  input: NewSubject,
  actor: Actor,
) -> Result<Subject> {
  require_manager(tx, actor, organization_id)?;

  let at = now();
  let subject = Subject {
    subject_id: Uuid::new_v4(),
    organization_id,
    name: input.name,
    age_years: input.age_years,
    age_months: input.age_months,
    description: input.description,
    status: input.initial_status,
    created_at: at,
    updated_at: at,
  };

  tx.execute(
    &format!(
      "INSERT INTO subjects ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      RawSubject::COLUMNS
    ),
    rusqlite::params![
      encode_uuid(subject.subject_id),
      encode_uuid(subject.organization_id),
      subject.name,
      subject.age_years,
      subject.age_months,
      subject.description,
      subject.status.as_ref(),
      encode_dt(subject.created_at),
      encode_dt(subject.updated_at),
    ],
  )?;

  tracing::info!(
    subject_id = %subject.subject_id,
    %organization_id,
    status = %subject.status,
    "subject registered"
  );
  Ok(subject)
}

/// Set or clear the `Paused` override.
pub fn set_paused(
  tx: &Transaction<'_>,
  subject_id: Uuid,
  actor: Actor,
  paused: bool,
) -> Result<Subject> {
  let subject = require_subject(tx, subject_id)?;
  require_manager(tx, actor, subject.organization_id)?;

  let (to, cause) = match (paused, subject.status) {
    (true, SubjectStatus::Paused) => return Ok(subject),
    (true, SubjectStatus::Adopted) => {
      return Err(
        CoreError::SubjectUnavailable { subject_id, status: subject.status.to_string() }.into(),
      );
    }
    (true, _) => (SubjectStatus::Paused, StatusCause::Paused),
    (false, SubjectStatus::Paused) => {
      (sync::unpaused_status(application_statuses(tx, subject_id)?), StatusCause::Unpaused)
    }
    (false, _) => return Ok(subject),
  };

  write_status(tx, subject, to, cause, actor)
}

/// Recompute the subject's derived status after `application_id` moved to
/// `trigger`. Runs inside the transition's transaction.
pub fn synchronize(
  tx: &Transaction<'_>,
  subject: Subject,
  trigger: ApplicationStatus,
  application_id: Uuid,
  actor: Actor,
) -> Result<Subject> {
  let statuses = application_statuses(tx, subject.subject_id)?;

  match sync::decide(subject.status, statuses, trigger) {
    SyncDecision::Change { to, .. } => {
      write_status(tx, subject, to, StatusCause::Synchronized { application_id }, actor)
    }
    SyncDecision::Unchanged => Ok(subject),
    SyncDecision::Suppressed => {
      tracing::debug!(
        subject_id = %subject.subject_id,
        %application_id,
        "subject paused; synchronization suppressed"
      );
      Ok(subject)
    }
  }
}

pub fn subject_history(conn: &Connection, subject_id: Uuid) -> Result<Vec<SubjectStatusChange>> {
  conn
    .prepare(&format!(
      "SELECT {} FROM subject_status_changes WHERE subject_id = ?1
       ORDER BY recorded_at, rowid",
      RawStatusChange::COLUMNS
    ))?
    .query_map(rusqlite::params![encode_uuid(subject_id)], RawStatusChange::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawStatusChange::into_change)
    .collect()
}

/// Statuses of every application filed against `subject_id`.
fn application_statuses(conn: &Connection, subject_id: Uuid) -> Result<Vec<ApplicationStatus>> {
  conn
    .prepare("SELECT status FROM applications WHERE subject_id = ?1")?
    .query_map(rusqlite::params![encode_uuid(subject_id)], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .iter()
    .map(|s| decode_enum("application status", s))
    .collect()
}

/// Persist a status change and its log record.
fn write_status(
  tx: &Transaction<'_>,
  mut subject: Subject,
  to: SubjectStatus,
  cause: StatusCause,
  actor: Actor,
) -> Result<Subject> {
  let from = subject.status;
  let at = now();

  tx.execute(
    "UPDATE subjects SET status = ?2, updated_at = ?3 WHERE subject_id = ?1",
    rusqlite::params![encode_uuid(subject.subject_id), to.as_ref(), encode_dt(at)],
  )?;

  let (cause_str, application_id) = encode_cause(cause);
  tx.execute(
    &format!(
      "INSERT INTO subject_status_changes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      RawStatusChange::COLUMNS
    ),
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(subject.subject_id),
      from.as_ref(),
      to.as_ref(),
      cause_str,
      application_id,
      actor.user_id().map(encode_uuid),
      encode_dt(at),
    ],
  )?;

  tracing::info!(subject_id = %subject.subject_id, %from, %to, cause = cause_str, "subject status changed");

  subject.status = to;
  subject.updated_at = at;
  Ok(subject)
}
