//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with fixed microsecond precision
//! so that text order is time order. Enums are stored as their snake_case
//! names. UUIDs are stored as hyphenated lowercase strings. The application
//! form is stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rehome_core::{
  application::Application,
  audit::Event,
  media::MediaItem,
  message::Message,
  principal::{Membership, User},
  subject::{StatusCause, Subject, SubjectStatusChange},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps, so values handed back
/// to callers compare equal to what a later read returns.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    rehome_core::Error::UnknownDiscriminant { what, value: s.to_owned() }.into()
  })
}

pub fn decode_int<T: TryFrom<i64>>(what: &'static str, v: i64) -> Result<T> {
  T::try_from(v).map_err(|_| Error::Range(format!("{what} = {v}")))
}

// ─── StatusCause ─────────────────────────────────────────────────────────────

pub fn encode_cause(cause: StatusCause) -> (&'static str, Option<String>) {
  match cause {
    StatusCause::Synchronized { application_id } => {
      ("synchronized", Some(encode_uuid(application_id)))
    }
    StatusCause::Paused => ("paused", None),
    StatusCause::Unpaused => ("unpaused", None),
  }
}

pub fn decode_cause(cause: &str, application_id: Option<Uuid>) -> Result<StatusCause> {
  match (cause, application_id) {
    ("synchronized", Some(application_id)) => Ok(StatusCause::Synchronized { application_id }),
    ("paused", _) => Ok(StatusCause::Paused),
    ("unpaused", _) => Ok(StatusCause::Unpaused),
    (other, _) => Err(
      rehome_core::Error::UnknownDiscriminant { what: "status cause", value: other.to_owned() }
        .into(),
    ),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, username, role, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      role:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      role:       decode_enum("user role", &self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `memberships` row.
pub struct RawMembership {
  pub organization_id: String,
  pub user_id:         String,
  pub role:            String,
  pub is_active:       bool,
  pub joined_at:       String,
}

impl RawMembership {
  pub const COLUMNS: &'static str = "organization_id, user_id, role, is_active, joined_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      organization_id: row.get(0)?,
      user_id:         row.get(1)?,
      role:            row.get(2)?,
      is_active:       row.get(3)?,
      joined_at:       row.get(4)?,
    })
  }

  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      organization_id: decode_uuid(&self.organization_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      role:            decode_enum("membership role", &self.role)?,
      is_active:       self.is_active,
      joined_at:       decode_dt(&self.joined_at)?,
    })
  }
}

/// Raw values read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id:      String,
  pub organization_id: String,
  pub name:            String,
  pub age_years:       i64,
  pub age_months:      i64,
  pub description:     String,
  pub status:          String,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawSubject {
  pub const COLUMNS: &'static str = "subject_id, organization_id, name, age_years, age_months, \
                                     description, status, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:      row.get(0)?,
      organization_id: row.get(1)?,
      name:            row.get(2)?,
      age_years:       row.get(3)?,
      age_months:      row.get(4)?,
      description:     row.get(5)?,
      status:          row.get(6)?,
      created_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id:      decode_uuid(&self.subject_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      name:            self.name,
      age_years:       decode_int("age_years", self.age_years)?,
      age_months:      decode_int("age_months", self.age_months)?,
      description:     self.description,
      status:          decode_enum("subject status", &self.status)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `applications` row.
pub struct RawApplication {
  pub application_id:  String,
  pub subject_id:      String,
  pub applicant_id:    String,
  pub organization_id: String,
  pub status:          String,
  pub form_json:       String,
  pub version:         i64,
  pub applied_at:      String,
  pub updated_at:      String,
}

impl RawApplication {
  pub const COLUMNS: &'static str = "application_id, subject_id, applicant_id, organization_id, \
                                     status, form_json, version, applied_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id:  row.get(0)?,
      subject_id:      row.get(1)?,
      applicant_id:    row.get(2)?,
      organization_id: row.get(3)?,
      status:          row.get(4)?,
      form_json:       row.get(5)?,
      version:         row.get(6)?,
      applied_at:      row.get(7)?,
      updated_at:      row.get(8)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id:  decode_uuid(&self.application_id)?,
      subject_id:      decode_uuid(&self.subject_id)?,
      applicant_id:    decode_uuid(&self.applicant_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      status:          decode_enum("application status", &self.status)?,
      form:            serde_json::from_str(&self.form_json)?,
      version:         decode_int("version", self.version)?,
      applied_at:      decode_dt(&self.applied_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `events` row.
pub struct RawEvent {
  pub event_id:       String,
  pub application_id: String,
  pub event_type:     String,
  pub from_status:    Option<String>,
  pub to_status:      Option<String>,
  pub actor_type:     String,
  pub actor_id:       Option<String>,
  pub note:           String,
  pub created_at:     String,
}

impl RawEvent {
  pub const COLUMNS: &'static str = "event_id, application_id, event_type, from_status, \
                                     to_status, actor_type, actor_id, note, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:       row.get(0)?,
      application_id: row.get(1)?,
      event_type:     row.get(2)?,
      from_status:    row.get(3)?,
      to_status:      row.get(4)?,
      actor_type:     row.get(5)?,
      actor_id:       row.get(6)?,
      note:           row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:       decode_uuid(&self.event_id)?,
      application_id: decode_uuid(&self.application_id)?,
      event_type:     decode_enum("event type", &self.event_type)?,
      from_status:    self
        .from_status
        .as_deref()
        .map(|s| decode_enum("application status", s))
        .transpose()?,
      to_status:      self
        .to_status
        .as_deref()
        .map(|s| decode_enum("application status", s))
        .transpose()?,
      actor_type:     decode_enum("actor type", &self.actor_type)?,
      actor_id:       decode_opt_uuid(self.actor_id)?,
      note:           self.note,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:     String,
  pub application_id: String,
  pub sender_id:      String,
  pub sender_type:    String,
  pub content:        String,
  pub created_at:     String,
  pub read_at:        Option<String>,
}

impl RawMessage {
  pub const COLUMNS: &'static str =
    "message_id, application_id, sender_id, sender_type, content, created_at, read_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:     row.get(0)?,
      application_id: row.get(1)?,
      sender_id:      row.get(2)?,
      sender_type:    row.get(3)?,
      content:        row.get(4)?,
      created_at:     row.get(5)?,
      read_at:        row.get(6)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:     decode_uuid(&self.message_id)?,
      application_id: decode_uuid(&self.application_id)?,
      sender_id:      decode_uuid(&self.sender_id)?,
      sender_type:    decode_enum("sender type", &self.sender_type)?,
      content:        self.content,
      created_at:     decode_dt(&self.created_at)?,
      read_at:        decode_opt_dt(self.read_at)?,
    })
  }
}

/// Raw values read directly from a `media` row.
pub struct RawMedia {
  pub media_id:   String,
  pub subject_id: String,
  pub kind:       String,
  pub uri:        String,
  pub caption:    String,
  pub is_primary: bool,
  pub sort_order: i64,
  pub created_at: String,
}

impl RawMedia {
  pub const COLUMNS: &'static str =
    "media_id, subject_id, kind, uri, caption, is_primary, sort_order, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      media_id:   row.get(0)?,
      subject_id: row.get(1)?,
      kind:       row.get(2)?,
      uri:        row.get(3)?,
      caption:    row.get(4)?,
      is_primary: row.get(5)?,
      sort_order: row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_media(self) -> Result<MediaItem> {
    Ok(MediaItem {
      media_id:   decode_uuid(&self.media_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      kind:       decode_enum("media kind", &self.kind)?,
      uri:        self.uri,
      caption:    self.caption,
      is_primary: self.is_primary,
      sort_order: decode_int("sort_order", self.sort_order)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `subject_status_changes` row.
pub struct RawStatusChange {
  pub change_id:      String,
  pub subject_id:     String,
  pub from_status:    String,
  pub to_status:      String,
  pub cause:          String,
  pub application_id: Option<String>,
  pub actor_id:       Option<String>,
  pub recorded_at:    String,
}

impl RawStatusChange {
  pub const COLUMNS: &'static str = "change_id, subject_id, from_status, to_status, cause, \
                                     application_id, actor_id, recorded_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      change_id:      row.get(0)?,
      subject_id:     row.get(1)?,
      from_status:    row.get(2)?,
      to_status:      row.get(3)?,
      cause:          row.get(4)?,
      application_id: row.get(5)?,
      actor_id:       row.get(6)?,
      recorded_at:    row.get(7)?,
    })
  }

  pub fn into_change(self) -> Result<SubjectStatusChange> {
    let application_id = decode_opt_uuid(self.application_id)?;
    Ok(SubjectStatusChange {
      change_id:   decode_uuid(&self.change_id)?,
      subject_id:  decode_uuid(&self.subject_id)?,
      from_status: decode_enum("subject status", &self.from_status)?,
      to_status:   decode_enum("subject status", &self.to_status)?,
      cause:       decode_cause(&self.cause, application_id)?,
      actor_id:    decode_opt_uuid(self.actor_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = decode_dt("2026-10-19T09:00:00.000001Z").unwrap();
    let late = decode_dt("2026-10-19T09:00:00.100000Z").unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn now_survives_a_round_trip() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }

  #[test]
  fn unknown_enum_value_is_reported() {
    let err = decode_enum::<rehome_core::subject::SubjectStatus>("subject status", "lost")
      .unwrap_err();
    assert!(err.to_string().contains("lost"));
  }

  #[test]
  fn synchronized_cause_needs_application() {
    assert!(decode_cause("synchronized", None).is_err());
    let id = Uuid::new_v4();
    assert_eq!(
      decode_cause("synchronized", Some(id)).unwrap(),
      StatusCause::Synchronized { application_id: id }
    );
  }
}
