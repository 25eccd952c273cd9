//! Application creation and the transition path.

use rehome_core::{
  Error as CoreError,
  application::{Application, ApplicationForm, ApplicationStatus, TransitionRequest},
  audit::{Event, NewEvent},
  lifecycle,
  principal::Actor,
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use super::{insert_event, principals, require_application, require_subject, standing_on, subjects};
use crate::{
  Result,
  encode::{RawApplication, encode_dt, encode_uuid, now},
  lock::Lock,
};

/// File a `Pending` application. The caller holds the subject lock, so the
/// active-application check and the insert cannot interleave with another
/// filing for the same subject.
pub fn apply_to(
  tx: &Transaction<'_>,
  subject_id: Uuid,
  applicant_id: Uuid,
  form: ApplicationForm,
) -> Result<Application> {
  let subject = require_subject(tx, subject_id)?;
  principals::get_principal(tx, applicant_id)?;

  if !subject.status.accepts_applications() {
    return Err(
      CoreError::SubjectUnavailable { subject_id, status: subject.status.to_string() }.into(),
    );
  }

  let existing: Option<String> = tx
    .query_row(
      &format!(
        "SELECT application_id FROM applications
         WHERE subject_id = ?1 AND applicant_id = ?2 AND status IN {}",
        ApplicationStatus::ACTIVE_SQL
      ),
      rusqlite::params![encode_uuid(subject_id), encode_uuid(applicant_id)],
      |row| row.get(0),
    )
    .optional()?;
  if existing.is_some() {
    return Err(CoreError::ActiveApplicationExists { subject_id, applicant_id }.into());
  }

  let at = now();
  let application = Application {
    application_id: Uuid::new_v4(),
    subject_id,
    applicant_id,
    organization_id: subject.organization_id,
    status: ApplicationStatus::Pending,
    form,
    version: 1,
    applied_at: at,
    updated_at: at,
  };

  tx.execute(
    &format!(
      "INSERT INTO applications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      RawApplication::COLUMNS
    ),
    rusqlite::params![
      encode_uuid(application.application_id),
      encode_uuid(application.subject_id),
      encode_uuid(application.applicant_id),
      encode_uuid(application.organization_id),
      application.status.as_ref(),
      serde_json::to_string(&application.form)?,
      application.version,
      encode_dt(application.applied_at),
      encode_dt(application.updated_at),
    ],
  )?;

  tracing::info!(
    application_id = %application.application_id,
    %subject_id,
    %applicant_id,
    "application filed"
  );
  Ok(application)
}

/// Execute one transition. The caller holds the application lock.
///
/// Order matters: version, standing and edge are checked against the row as
/// read under the lock; then the subject is locked for synchronization, its
/// organization is compared with the one recorded on the application, and
/// only then is anything written.
pub fn transition(
  tx: &Transaction<'_>,
  application_id: Uuid,
  actor: Actor,
  request: TransitionRequest,
) -> Result<(Application, Event)> {
  let mut application = require_application(tx, application_id)?;

  match request.expected_version {
    Some(expected) if expected != application.version => {
      return Err(
        CoreError::VersionMismatch { application_id, expected, actual: application.version }
          .into(),
      );
    }
    _ => {}
  }

  let standing = standing_on(tx, actor, &application)?;
  let from = application.status;
  let to = request.target;
  lifecycle::authorize_transition(standing, from, to)?;

  Lock::Subject(application.subject_id).acquire(tx)?;
  let subject = require_subject(tx, application.subject_id)?;
  if subject.organization_id != application.organization_id {
    return Err(
      CoreError::OrganizationMismatch {
        application_id,
        recorded: application.organization_id,
        actual: subject.organization_id,
      }
      .into(),
    );
  }

  let at = now();
  let changed = tx.execute(
    "UPDATE applications SET status = ?3, version = version + 1, updated_at = ?4
     WHERE application_id = ?1 AND version = ?2",
    rusqlite::params![encode_uuid(application_id), application.version, to.as_ref(), encode_dt(at)],
  )?;
  if changed != 1 {
    return Err(
      CoreError::Conflict(format!("application {application_id} changed during transition"))
        .into(),
    );
  }
  application.status = to;
  application.version += 1;
  application.updated_at = at;

  let event = insert_event(
    tx,
    NewEvent::status_changed(application_id, from, to, standing, actor, request.note),
  )?;

  subjects::synchronize(tx, subject, to, application_id, actor)?;

  tracing::info!(%application_id, %from, %to, ?standing, "application transitioned");
  Ok((application, event))
}

/// Every application filed against `subject_id`, oldest first.
pub fn list_applications(conn: &Connection, subject_id: Uuid) -> Result<Vec<Application>> {
  conn
    .prepare(&format!(
      "SELECT {} FROM applications WHERE subject_id = ?1 ORDER BY applied_at, rowid",
      RawApplication::COLUMNS
    ))?
    .query_map(rusqlite::params![encode_uuid(subject_id)], RawApplication::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawApplication::into_application)
    .collect()
}
