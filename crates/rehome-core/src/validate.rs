//! Shape validation: checks that need no lock and no store access.
//!
//! Every payload entering the engine is validated here first; invariant checks
//! that depend on stored state happen later, inside the store transaction.

use std::fmt;

use serde::Serialize;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

/// All field errors found in one payload. Never empty when returned as an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
    self.0.push(FieldError { field, message: message.into() });
  }

  /// Record an error for `field` unless `value` has non-whitespace content.
  pub fn require(&mut self, field: &'static str, value: &str) {
    if value.trim().is_empty() {
      self.push(field, "must not be empty");
    }
  }

  /// Record an error for `field` if `value` is longer than `max` characters.
  pub fn max_chars(&mut self, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
      self.push(field, format!("must be at most {max} characters"));
    }
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn fields(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  pub fn has(&self, field: &str) -> bool { self.0.iter().any(|e| e.field == field) }

  /// `Ok(())` when nothing was recorded, otherwise the collected errors.
  pub fn finish(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
    }
    Ok(())
  }
}
