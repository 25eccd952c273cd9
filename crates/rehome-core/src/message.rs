//! Per-application message threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::validate::ValidationErrors;

/// Longest message body accepted, in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// How the sender related to the application when the message was sent.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SenderType {
  User,
  Shelter,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub message_id:     Uuid,
  pub application_id: Uuid,
  pub sender_id:      Uuid,
  pub sender_type:    SenderType,
  pub content:        String,
  pub created_at:     DateTime<Utc>,
  /// Set at most once; never reset.
  pub read_at:        Option<DateTime<Utc>>,
}

impl Message {
  pub fn is_read(&self) -> bool { self.read_at.is_some() }
}

pub fn validate_content(content: &str) -> Result<(), ValidationErrors> {
  let mut v = ValidationErrors::new();
  v.require("content", content);
  v.max_chars("content", content, MAX_CONTENT_CHARS);
  v.finish()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_content_rejected() {
    assert!(validate_content(" \n ").unwrap_err().has("content"));
  }

  #[test]
  fn long_content_rejected() {
    let body = "a".repeat(MAX_CONTENT_CHARS + 1);
    assert!(validate_content(&body).is_err());
    assert!(validate_content(&body[..MAX_CONTENT_CHARS]).is_ok());
  }
}
