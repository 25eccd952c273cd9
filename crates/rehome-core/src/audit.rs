//! Audit log records.
//!
//! Events are append-only: every accepted transition, note and system action
//! produces exactly one. They exist for traceability; the application row,
//! not a replay of its events, is authoritative for current status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  application::ApplicationStatus,
  principal::{Actor, Standing},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
  StatusChanged,
  Note,
  System,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorType {
  Applicant,
  Organization,
  Admin,
  System,
}

/// An immutable audit record owned by one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:       Uuid,
  pub application_id: Uuid,
  pub event_type:     EventType,
  pub from_status:    Option<ApplicationStatus>,
  pub to_status:      Option<ApplicationStatus>,
  pub actor_type:     ActorType,
  /// `None` for system events.
  pub actor_id:       Option<Uuid>,
  pub note:           String,
  pub created_at:     DateTime<Utc>,
}

/// An event before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
  pub application_id: Uuid,
  pub event_type:     EventType,
  pub from_status:    Option<ApplicationStatus>,
  pub to_status:      Option<ApplicationStatus>,
  pub actor_type:     ActorType,
  pub actor_id:       Option<Uuid>,
  pub note:           String,
}

impl NewEvent {
  pub fn status_changed(
    application_id: Uuid,
    from: ApplicationStatus,
    to: ApplicationStatus,
    standing: Standing,
    actor: Actor,
    note: Option<String>,
  ) -> Self {
    Self {
      application_id,
      event_type: EventType::StatusChanged,
      from_status: Some(from),
      to_status: Some(to),
      actor_type: standing.actor_type(),
      actor_id: actor.user_id(),
      note: note.unwrap_or_default(),
    }
  }

  pub fn note(application_id: Uuid, standing: Standing, actor: Actor, note: String) -> Self {
    Self {
      application_id,
      event_type: EventType::Note,
      from_status: None,
      to_status: None,
      actor_type: standing.actor_type(),
      actor_id: actor.user_id(),
      note,
    }
  }

  pub fn system(application_id: Uuid, note: String) -> Self {
    Self {
      application_id,
      event_type: EventType::System,
      from_status: None,
      to_status: None,
      actor_type: ActorType::System,
      actor_id: None,
      note,
    }
  }

  pub fn into_event(self, event_id: Uuid, created_at: DateTime<Utc>) -> Event {
    Event {
      event_id,
      application_id: self.application_id,
      event_type: self.event_type,
      from_status: self.from_status,
      to_status: self.to_status,
      actor_type: self.actor_type,
      actor_id: self.actor_id,
      note: self.note,
      created_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_change_records_both_ends_and_actor() {
    let app = Uuid::new_v4();
    let user = Uuid::new_v4();
    let ev = NewEvent::status_changed(
      app,
      ApplicationStatus::Pending,
      ApplicationStatus::Reviewing,
      Standing::Organization,
      Actor::User(user),
      Some("meeting booked".into()),
    );
    assert_eq!(ev.event_type, EventType::StatusChanged);
    assert_eq!(ev.from_status, Some(ApplicationStatus::Pending));
    assert_eq!(ev.to_status, Some(ApplicationStatus::Reviewing));
    assert_eq!(ev.actor_type, ActorType::Organization);
    assert_eq!(ev.actor_id, Some(user));
  }

  #[test]
  fn system_event_has_no_actor() {
    let ev = NewEvent::system(Uuid::new_v4(), "corrected".into());
    assert_eq!(ev.actor_type, ActorType::System);
    assert!(ev.actor_id.is_none());
    assert!(ev.from_status.is_none() && ev.to_status.is_none());
  }
}
