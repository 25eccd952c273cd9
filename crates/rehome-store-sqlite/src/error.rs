//! Error type for `rehome-store-sqlite`.

use rehome_core::{Classify, ErrorKind};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] rehome_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),

  /// The write lock could not be obtained within the busy timeout.
  #[error("timed out waiting for the store write lock")]
  LockTimeout,

  /// A schema constraint or trigger rejected the write.
  #[error("constraint violated: {0}")]
  Constraint(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column out of range: {0}")]
  Range(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    match &e {
      rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::LockTimeout,
        ErrorCode::ConstraintViolation => {
          Self::Constraint(message.clone().unwrap_or_else(|| failure.to_string()))
        }
        _ => Self::Sqlite(e),
      },
      _ => Self::Sqlite(e),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(inner) => Self::from(inner),
      other => Self::Database(other),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::LockTimeout | Self::Constraint(_) => ErrorKind::Conflict,
      _ => ErrorKind::Internal,
    }
  }

  fn is_transient(&self) -> bool { matches!(self, Self::LockTimeout) }
}
