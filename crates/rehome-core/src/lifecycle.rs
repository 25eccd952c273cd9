//! The application state machine.
//!
//! ```text
//! Pending   -> Reviewing | Rejected | Cancelled
//! Reviewing -> Trial | Accepted | Rejected | Cancelled
//! Trial     -> Accepted | Rejected | Cancelled
//! Accepted, Rejected, Cancelled: terminal
//! ```
//!
//! Everything here is pure. The store calls [`authorize_transition`] inside
//! its transaction, after locking, so the checked `from` state is the one that
//! gets overwritten.

use crate::{
  Error, Result,
  application::ApplicationStatus::{self, *},
  principal::Standing,
};

/// Legal targets from `from`, in table order.
pub fn allowed_targets(from: ApplicationStatus) -> &'static [ApplicationStatus] {
  match from {
    Pending => &[Reviewing, Rejected, Cancelled],
    Reviewing => &[Trial, Accepted, Rejected, Cancelled],
    Trial => &[Accepted, Rejected, Cancelled],
    Accepted | Rejected | Cancelled => &[],
  }
}

pub fn is_legal(from: ApplicationStatus, to: ApplicationStatus) -> bool {
  allowed_targets(from).contains(&to)
}

/// Reject the edge `from -> to` unless it is in the table.
pub fn check_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<()> {
  if is_legal(from, to) {
    Ok(())
  } else {
    Err(Error::InvalidTransition { from, to })
  }
}

/// Full precondition check for one transition by an actor with `standing`.
///
/// The edge is checked first so that an illegal edge is always reported as
/// such, whoever asks. Applicants may only withdraw (move to `Cancelled`);
/// every other legal edge needs reviewer standing.
pub fn authorize_transition(
  standing: Standing,
  from: ApplicationStatus,
  to: ApplicationStatus,
) -> Result<()> {
  check_transition(from, to)?;
  if !standing.is_reviewer() && to != Cancelled {
    return Err(Error::Forbidden(format!(
      "applicants may only cancel their application, not move it to {to}"
    )));
  }
  Ok(())
}
