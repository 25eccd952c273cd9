//! The subject status synchronizer.
//!
//! A subject's availability is a function of its applications. Priority,
//! highest first:
//!
//! 1. any `Accepted` application → `Adopted`
//! 2. any `Trial` → `Trial`
//! 3. any `Reviewing` → `InReview`
//! 4. otherwise, if the change that triggered the run released the subject
//!    (`Rejected` or `Cancelled`) and no active application remains → `Open`
//!
//! When none of these apply the current status is left alone. `Pending`
//! applications never raise a subject's status, but they are active: a
//! release that leaves one behind keeps the current status.
//!
//! A `Paused` subject is never overwritten here; only the owning organization
//! clears the override.

use crate::{application::ApplicationStatus, subject::SubjectStatus};

/// The status the applications themselves impose, ignoring what triggered
/// the run.
pub fn holding_status<I>(statuses: I) -> Option<SubjectStatus>
where
  I: IntoIterator<Item = ApplicationStatus>,
{
  let (mut accepted, mut trial, mut reviewing) = (false, false, false);
  for status in statuses {
    match status {
      ApplicationStatus::Accepted => accepted = true,
      ApplicationStatus::Trial => trial = true,
      ApplicationStatus::Reviewing => reviewing = true,
      _ => {}
    }
  }

  if accepted {
    Some(SubjectStatus::Adopted)
  } else if trial {
    Some(SubjectStatus::Trial)
  } else if reviewing {
    Some(SubjectStatus::InReview)
  } else {
    None
  }
}

/// The derived status after a transition into `trigger`, or `None` when the
/// current status should be kept.
pub fn derive_status<I>(statuses: I, trigger: ApplicationStatus) -> Option<SubjectStatus>
where
  I: IntoIterator<Item = ApplicationStatus>,
{
  let statuses: Vec<_> = statuses.into_iter().collect();
  holding_status(statuses.iter().copied()).or_else(|| {
    let released = matches!(trigger, ApplicationStatus::Rejected | ApplicationStatus::Cancelled);
    (released && !statuses.iter().any(|s| s.is_active())).then_some(SubjectStatus::Open)
  })
}

/// The status to restore when the `Paused` override is cleared.
pub fn unpaused_status<I>(statuses: I) -> SubjectStatus
where
  I: IntoIterator<Item = ApplicationStatus>,
{
  holding_status(statuses).unwrap_or(SubjectStatus::Open)
}

/// What the synchronizer decided for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
  /// Write `to` over `from`.
  Change {
    from: SubjectStatus,
    to:   SubjectStatus,
  },
  /// Derived status equals the current one, or nothing was derived.
  Unchanged,
  /// The subject is paused; synchronization suppressed.
  Suppressed,
}

/// Decide what to do with a subject currently at `current`.
pub fn decide<I>(current: SubjectStatus, statuses: I, trigger: ApplicationStatus) -> SyncDecision
where
  I: IntoIterator<Item = ApplicationStatus>,
{
  if current == SubjectStatus::Paused {
    return SyncDecision::Suppressed;
  }
  match derive_status(statuses, trigger) {
    Some(to) if to != current => SyncDecision::Change { from: current, to },
    _ => SyncDecision::Unchanged,
  }
}
