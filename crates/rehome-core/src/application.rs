//! Application: one applicant's request to adopt one subject.
//!
//! Applications are never deleted. Their `status` changes only through
//! [`crate::store::AdoptionStore::transition`]; everything else about the row
//! is fixed at creation except `updated_at` and `version`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::validate::ValidationErrors;

/// Lifecycle status of an application. See [`crate::lifecycle`] for the legal
/// edges.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  Pending,
  Reviewing,
  Trial,
  Accepted,
  Rejected,
  Cancelled,
}

impl ApplicationStatus {
  /// Active applications count against the one-per-(subject, applicant) rule.
  pub fn is_active(self) -> bool {
    matches!(self, Self::Pending | Self::Reviewing | Self::Trial | Self::Accepted)
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Accepted | Self::Rejected | Self::Cancelled)
  }

  /// The SQL list used by the partial unique index and active-application
  /// queries. Must agree with [`Self::is_active`].
  pub const ACTIVE_SQL: &'static str = "('pending','reviewing','trial','accepted')";
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// Agreements an applicant must (or may) give when applying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consents {
  pub term_agreement:             bool,
  pub lifelong_care_agreement:    bool,
  pub spay_neuter_agreement:      bool,
  pub medical_cost_understanding: bool,
  /// Optional; sharing contact details with partner cafes.
  #[serde(default)]
  pub data_sharing_consent:       bool,
}

impl Consents {
  /// All required agreements given.
  pub fn all_required() -> Self {
    Self {
      term_agreement:             true,
      lifelong_care_agreement:    true,
      spay_neuter_agreement:      true,
      medical_cost_understanding: true,
      data_sharing_consent:       false,
    }
  }
}

/// Free-form household answers; none are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
  #[serde(default)]
  pub income_status:               String,
  #[serde(default)]
  pub emergency_contact_available: bool,
  #[serde(default)]
  pub family_consent:              bool,
  #[serde(default)]
  pub allergy_status:              String,
}

/// Everything the applicant fills in. Stored verbatim with the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
  pub full_name:              String,
  pub age:                    u8,
  pub occupation:             String,
  pub phone_number:           String,
  pub address:                String,
  pub housing_type:           String,
  #[serde(default)]
  pub has_garden:             bool,
  pub family_members:         u8,
  #[serde(default)]
  pub has_other_pets:         bool,
  #[serde(default)]
  pub other_pets_description: String,
  #[serde(default)]
  pub has_experience:         bool,
  #[serde(default)]
  pub experience_description: String,
  pub motivation:             String,
  /// Opening message to the shelter.
  #[serde(default)]
  pub message:                String,
  #[serde(default)]
  pub additional_notes:       String,
  pub consents:               Consents,
  #[serde(default)]
  pub background:             Background,
}

impl ApplicationForm {
  /// Shape checks only; no store access.
  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut v = ValidationErrors::new();

    v.require("full_name", &self.full_name);
    v.max_chars("full_name", &self.full_name, 100);
    if self.age > 120 {
      v.push("age", "must be at most 120");
    }
    v.require("occupation", &self.occupation);
    v.max_chars("occupation", &self.occupation, 100);
    v.require("phone_number", &self.phone_number);
    v.max_chars("phone_number", &self.phone_number, 20);
    v.require("address", &self.address);
    v.require("housing_type", &self.housing_type);
    v.max_chars("housing_type", &self.housing_type, 100);
    if !(1..=20).contains(&self.family_members) {
      v.push("family_members", "must be between 1 and 20");
    }
    if self.has_other_pets {
      v.require("other_pets_description", &self.other_pets_description);
    }
    v.require("motivation", &self.motivation);

    let c = &self.consents;
    for (field, given) in [
      ("consents.term_agreement", c.term_agreement),
      ("consents.lifelong_care_agreement", c.lifelong_care_agreement),
      ("consents.spay_neuter_agreement", c.spay_neuter_agreement),
      ("consents.medical_cost_understanding", c.medical_cost_understanding),
    ] {
      if !given {
        v.push(field, "must be agreed to");
      }
    }

    v.finish()
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
  pub application_id:  Uuid,
  pub subject_id:      Uuid,
  pub applicant_id:    Uuid,
  /// Copy of the subject's organization taken at creation; must always equal
  /// it.
  pub organization_id: Uuid,
  pub status:          ApplicationStatus,
  pub form:            ApplicationForm,
  /// Bumped on every write; used for optimistic concurrency by callers.
  pub version:         u64,
  /// Server-assigned; never changes.
  pub applied_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::AdoptionStore::transition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
  pub target:           ApplicationStatus,
  #[serde(default)]
  pub note:             Option<String>,
  /// If set, the transition fails with a conflict unless the application is
  /// still at this version.
  #[serde(default)]
  pub expected_version: Option<u64>,
}

impl TransitionRequest {
  pub fn to(target: ApplicationStatus) -> Self {
    Self { target, note: None, expected_version: None }
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.note = Some(note.into());
    self
  }

  pub fn expecting(mut self, version: u64) -> Self {
    self.expected_version = Some(version);
    self
  }

  pub fn validate(&self) -> Result<(), ValidationErrors> {
    let mut v = ValidationErrors::new();
    if let Some(note) = &self.note {
      v.max_chars("note", note, 2000);
    }
    v.finish()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  pub(crate) fn sample_form() -> ApplicationForm {
    ApplicationForm {
      full_name:              "Hana Sato".into(),
      age:                    34,
      occupation:             "Engineer".into(),
      phone_number:           "090-1234-5678".into(),
      address:                "1-2-3 Shibuya, Tokyo".into(),
      housing_type:           "apartment".into(),
      has_garden:             false,
      family_members:         2,
      has_other_pets:         false,
      other_pets_description: String::new(),
      has_experience:         true,
      experience_description: "Grew up with two cats".into(),
      motivation:             "Quiet home, lots of sunlight".into(),
      message:                String::new(),
      additional_notes:       String::new(),
      consents:               Consents::all_required(),
      background:             Background::default(),
    }
  }

  #[test]
  fn sample_form_is_valid() {
    assert!(sample_form().validate().is_ok());
  }

  #[test]
  fn missing_consent_is_reported() {
    let mut form = sample_form();
    form.consents.spay_neuter_agreement = false;
    let err = form.validate().unwrap_err();
    assert!(err.has("consents.spay_neuter_agreement"));
  }

  #[test]
  fn numeric_bounds() {
    let mut form = sample_form();
    form.age = 121;
    form.family_members = 0;
    let err = form.validate().unwrap_err();
    assert!(err.has("age"));
    assert!(err.has("family_members"));
  }

  #[test]
  fn other_pets_need_description() {
    let mut form = sample_form();
    form.has_other_pets = true;
    assert!(form.validate().unwrap_err().has("other_pets_description"));
  }

  #[test]
  fn active_sql_agrees_with_is_active() {
    for status in ApplicationStatus::iter() {
      let quoted = format!("'{}'", status.as_ref());
      assert_eq!(
        ApplicationStatus::ACTIVE_SQL.contains(&quoted),
        status.is_active(),
        "{status}"
      );
    }
  }
}
