//! Error types for `rehome-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{application::ApplicationStatus, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  #[error("application not found: {0}")]
  ApplicationNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("media item not found: {0}")]
  MediaNotFound(Uuid),

  #[error("message not found: {0}")]
  MessageNotFound(Uuid),

  #[error("event not found: {0}")]
  EventNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("organization not found: {0}")]
  OrganizationNotFound(Uuid),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("illegal transition {from} -> {to}")]
  InvalidTransition {
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },

  #[error("applicant {applicant_id} already has an active application for subject {subject_id}")]
  ActiveApplicationExists { subject_id: Uuid, applicant_id: Uuid },

  #[error("application {application_id} is at version {actual}, expected {expected}")]
  VersionMismatch {
    application_id: Uuid,
    expected:       u64,
    actual:         u64,
  },

  #[error("application {application_id} belongs to organization {recorded}, subject belongs to {actual}")]
  OrganizationMismatch {
    application_id: Uuid,
    recorded:       Uuid,
    actual:         Uuid,
  },

  #[error("subject {subject_id} is {status} and not accepting applications")]
  SubjectUnavailable { subject_id: Uuid, status: String },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("unknown {what} discriminant: {value:?}")]
  UnknownDiscriminant { what: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The caller-visible category of a failure. Outer layers (HTTP, CLI) map on
/// this instead of matching concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Forbidden,
  InvalidTransition,
  Conflict,
  ValidationFailed,
  Internal,
}

/// Implemented by every error type that crosses the store boundary.
pub trait Classify {
  fn kind(&self) -> ErrorKind;

  /// `true` when retrying the same operation may succeed (e.g. a lock wait
  /// expired). Only transient failures are retried by [`crate::engine::Engine`].
  fn is_transient(&self) -> bool { false }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::ApplicationNotFound(_)
      | Self::SubjectNotFound(_)
      | Self::MediaNotFound(_)
      | Self::MessageNotFound(_)
      | Self::EventNotFound(_)
      | Self::UserNotFound(_)
      | Self::OrganizationNotFound(_) => ErrorKind::NotFound,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
      Self::ActiveApplicationExists { .. }
      | Self::VersionMismatch { .. }
      | Self::OrganizationMismatch { .. }
      | Self::SubjectUnavailable { .. }
      | Self::Conflict(_) => ErrorKind::Conflict,
      Self::Validation(_) => ErrorKind::ValidationFailed,
      Self::UnknownDiscriminant { .. } | Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(e: ValidationErrors) -> Self { Self::Validation(e) }
}
