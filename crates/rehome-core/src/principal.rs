//! Principals, organizations and standing.
//!
//! Authentication happens outside this crate. What arrives here is a user id;
//! the store resolves it into a [`Principal`] (global role plus active
//! organization memberships), and the pure functions below decide what that
//! principal may do relative to a specific application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{audit::ActorType, message::SenderType};

// ─── Users and organizations ─────────────────────────────────────────────────

/// The global role a user account was registered with.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
  Adopter,
  ShelterStaff,
  Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub role:       UserRole,
  pub created_at: DateTime<Utc>,
}

/// A shelter organization; the exclusive owner of its subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
  pub organization_id: Uuid,
  pub name:            String,
  pub created_at:      DateTime<Utc>,
}

/// A user's role inside one organization.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MembershipRole {
  Admin,
  Staff,
  Volunteer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
  pub organization_id: Uuid,
  pub user_id:         Uuid,
  pub role:            MembershipRole,
  pub is_active:       bool,
  pub joined_at:       DateTime<Utc>,
}

// ─── Principal ───────────────────────────────────────────────────────────────

/// A resolved user: global role plus the organizations where they currently
/// hold an active membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id:       Uuid,
  pub role:          UserRole,
  pub organizations: Vec<Uuid>,
}

/// Who is acting. `System` is used for automated corrections and carries no
/// user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Actor {
  User(Uuid),
  System,
}

impl Actor {
  pub fn user_id(&self) -> Option<Uuid> {
    match self {
      Self::User(id) => Some(*id),
      Self::System => None,
    }
  }
}

/// The capacity in which a principal relates to one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
  Applicant,
  Organization,
  Admin,
  System,
}

impl Standing {
  pub fn actor_type(self) -> ActorType {
    match self {
      Self::Applicant => ActorType::Applicant,
      Self::Organization => ActorType::Organization,
      Self::Admin => ActorType::Admin,
      Self::System => ActorType::System,
    }
  }

  /// Staff-side standing: may drive the full review workflow.
  pub fn is_reviewer(self) -> bool { !matches!(self, Self::Applicant) }
}

impl Principal {
  pub fn is_admin(&self) -> bool { self.role == UserRole::Admin }

  /// A shelter-staff account with an active membership in `organization_id`.
  pub fn is_staff_of(&self, organization_id: Uuid) -> bool {
    self.role == UserRole::ShelterStaff && self.organizations.contains(&organization_id)
  }

  /// May manage subjects (registration, pause, media) owned by
  /// `organization_id`.
  pub fn manages(&self, organization_id: Uuid) -> bool {
    self.is_admin() || self.is_staff_of(organization_id)
  }

  /// Standing on an application with the given applicant and owning
  /// organization. Admin outranks organization staff, which outranks the
  /// applicant.
  pub fn standing_on(&self, applicant_id: Uuid, organization_id: Uuid) -> Option<Standing> {
    if self.is_admin() {
      Some(Standing::Admin)
    } else if self.is_staff_of(organization_id) {
      Some(Standing::Organization)
    } else if self.user_id == applicant_id {
      Some(Standing::Applicant)
    } else {
      None
    }
  }

  /// The sender type recorded on a message this principal sends in a thread
  /// with the given applicant and owning organization, or `None` if they are
  /// not a party.
  ///
  /// The derivation is relative to the application: a shelter-staff account
  /// that is not staff of the owning organization posts as a plain user (and
  /// may only do so as the applicant).
  pub fn sender_type_on(&self, applicant_id: Uuid, organization_id: Uuid) -> Option<SenderType> {
    if self.is_admin() {
      Some(SenderType::Admin)
    } else if self.is_staff_of(organization_id) {
      Some(SenderType::Shelter)
    } else if self.user_id == applicant_id {
      Some(SenderType::User)
    } else {
      None
    }
  }
}
