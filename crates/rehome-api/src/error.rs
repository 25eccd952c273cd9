//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves as `{"error": <kind>, "message": <detail>}` with the
//! status code that kind maps to.

use std::fmt::Display;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rehome_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A classified failure from the engine or the store.
  #[error("{message}")]
  Domain { kind: ErrorKind, message: String },

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The `X-Principal-Id` header is missing or malformed.
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),
}

impl ApiError {
  /// Wrap any classified error, keeping its kind and message.
  pub fn domain<E: Classify + Display>(e: E) -> Self {
    let kind = e.kind();
    if kind == ErrorKind::Internal {
      tracing::error!(error = %e, "internal failure");
    }
    Self::Domain { kind, message: e.to_string() }
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    Self::Domain { kind: ErrorKind::Forbidden, message: message.into() }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Domain { kind, .. } => match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Self::Domain { kind, message } => json!({ "error": kind, "message": message }),
      Self::BadRequest(m) => json!({ "error": "bad_request", "message": m }),
      Self::Unauthenticated(m) => json!({ "error": "unauthenticated", "message": m }),
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use rehome_core::{Error, application::ApplicationStatus};

  use super::*;

  #[test]
  fn kinds_map_to_status_codes() {
    let cases = [
      (Error::ApplicationNotFound(uuid::Uuid::nil()), StatusCode::NOT_FOUND),
      (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
      (
        Error::InvalidTransition { from: ApplicationStatus::Rejected, to: ApplicationStatus::Trial },
        StatusCode::CONFLICT,
      ),
      (Error::Conflict("raced".into()), StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::domain(err).status(), status);
    }
  }

  #[test]
  fn transition_error_names_the_edge() {
    let err = ApiError::domain(Error::InvalidTransition {
      from: ApplicationStatus::Rejected,
      to:   ApplicationStatus::Trial,
    });
    assert!(err.to_string().contains("rejected -> trial"));
  }
}
