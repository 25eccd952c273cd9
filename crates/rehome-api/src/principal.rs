//! The `X-Principal-Id` extractor.
//!
//! Authentication happens upstream; by the time a request reaches this router
//! the gateway has replaced whatever credential the client sent with the
//! authenticated user's id.

use axum::{extract::FromRequestParts, http::request::Parts};
use rehome_core::principal::Actor;
use uuid::Uuid;

use crate::error::ApiError;

pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// The authenticated user id of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
  pub fn actor(self) -> Actor { Actor::User(self.0) }
}

impl<St> FromRequestParts<St> for PrincipalId
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(PRINCIPAL_HEADER)
      .ok_or_else(|| ApiError::Unauthenticated("missing X-Principal-Id header".into()))?
      .to_str()
      .map_err(|_| ApiError::Unauthenticated("X-Principal-Id is not valid ASCII".into()))?;

    Uuid::parse_str(raw.trim())
      .map(Self)
      .map_err(|_| ApiError::Unauthenticated(format!("malformed principal id {raw:?}")))
  }
}
