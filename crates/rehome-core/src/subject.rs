//! Subject: the animal whose adoption availability is tracked.
//!
//! A subject's `status` is derived from its applications by the
//! [synchronizer](crate::sync); clients only choose the initial `Open` or
//! `Paused` state and toggle the `Paused` override.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::validate::ValidationErrors;

/// Adoption availability of a subject.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectStatus {
  Open,
  /// Manual organization override; suppresses synchronization until cleared.
  Paused,
  InReview,
  Trial,
  Adopted,
}

impl SubjectStatus {
  /// Whether new applications may be filed against a subject in this state.
  pub fn accepts_applications(self) -> bool { !matches!(self, Self::Paused | Self::Adopted) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id:      Uuid,
  /// Exclusive owner; never changes after registration.
  pub organization_id: Uuid,
  pub name:            String,
  pub age_years:       u16,
  /// Always within `0..=11`.
  pub age_months:      u8,
  pub description:     String,
  pub status:          SubjectStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::AdoptionStore::register_subject`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
  pub name:           String,
  #[serde(default)]
  pub age_years:      u16,
  #[serde(default)]
  pub age_months:     u8,
  #[serde(default)]
  pub description:    String,
  /// Must be `Open` or `Paused`; defaults to `Open`.
  #[serde(default = "default_initial_status")]
  pub initial_status: SubjectStatus,
}

fn default_initial_status() -> SubjectStatus { SubjectStatus::Open }

impl NewSubject {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:           name.into(),
      age_years:      0,
      age_months:     0,
      description:    String::new(),
      initial_status: SubjectStatus::Open,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut v = ValidationErrors::new();
    v.require("name", &self.name);
    v.max_chars("name", &self.name, 100);
    if self.age_months > 11 {
      v.push("age_months", "must be between 0 and 11");
    }
    if !matches!(self.initial_status, SubjectStatus::Open | SubjectStatus::Paused) {
      v.push("initial_status", "must be open or paused");
    }
    v.finish()
  }
}

// ─── Status log ──────────────────────────────────────────────────────────────

/// Why a subject's availability changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusCause {
  /// Recomputed after a transition of `application_id`.
  Synchronized { application_id: Uuid },
  Paused,
  Unpaused,
}

/// Append-only record of one availability change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectStatusChange {
  pub change_id:   Uuid,
  pub subject_id:  Uuid,
  pub from_status: SubjectStatus,
  pub to_status:   SubjectStatus,
  pub cause:       StatusCause,
  /// `None` for changes made by the system on behalf of no user.
  pub actor_id:    Option<Uuid>,
  pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_subject_defaults_are_valid() {
    assert!(NewSubject::new("Mochi").validate().is_ok());
  }

  #[test]
  fn age_months_out_of_range() {
    let mut s = NewSubject::new("Mochi");
    s.age_months = 12;
    assert!(s.validate().unwrap_err().has("age_months"));
  }

  #[test]
  fn derived_initial_status_rejected() {
    let mut s = NewSubject::new("Mochi");
    s.initial_status = SubjectStatus::InReview;
    assert!(s.validate().unwrap_err().has("initial_status"));
  }

  #[test]
  fn status_round_trips_through_strum() {
    assert_eq!(SubjectStatus::InReview.as_ref(), "in_review");
    assert_eq!("in_review".parse::<SubjectStatus>().unwrap(), SubjectStatus::InReview);
  }
}
