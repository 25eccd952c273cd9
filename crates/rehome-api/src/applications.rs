//! Handlers for application, transition and audit-log endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects/{id}/applications` | Body: [`ApplicationForm`]; 201 + `ETag` |
//! | `GET`  | `/subjects/{id}/applications` | Managers of the subject's organization |
//! | `GET`  | `/applications/{id}` | Parties only; `ETag` carries the version |
//! | `POST` | `/applications/{id}/transitions` | Body: `{"target":..,"note":..}`; optional `If-Match` |
//! | `GET`  | `/applications/{id}/events` | Parties only |
//! | `POST` | `/applications/{id}/events` | Body: `{"note":".."}`; 201 |
//! | `POST` | `/events/{id}/purge` | Admins; body: `{"reason":".."}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::IntoResponse,
};
use rehome_core::{
  application::{Application, ApplicationForm, ApplicationStatus, TransitionRequest},
  audit::Event,
  engine::Engine,
  notify::Notifier,
  store::AdoptionStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, principal::PrincipalId};

// ─── Versions ────────────────────────────────────────────────────────────────

/// The `ETag` for an application at `version`.
pub fn etag(version: u64) -> HeaderValue {
  // Digits and quotes only; always a valid header value.
  HeaderValue::from_str(&format!("\"{version}\"")).unwrap_or(HeaderValue::from_static("\"0\""))
}

/// Parse `If-Match` into an expected version. Accepts `"3"`, `W/"3"` and a
/// bare `3`; `*` means no expectation.
pub fn if_match(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
  let Some(value) = headers.get(header::IF_MATCH) else {
    return Ok(None);
  };
  let raw = value
    .to_str()
    .map_err(|_| ApiError::BadRequest("If-Match is not valid ASCII".into()))?
    .trim();
  if raw == "*" {
    return Ok(None);
  }
  raw
    .trim_start_matches("W/")
    .trim_matches('"')
    .parse()
    .map(Some)
    .map_err(|_| ApiError::BadRequest(format!("If-Match {raw:?} is not an application version")))
}

// ─── Apply ───────────────────────────────────────────────────────────────────

/// `POST /subjects/{id}/applications`
pub async fn apply<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(subject_id): Path<Uuid>,
  Json(form): Json<ApplicationForm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let application = engine
    .apply_to(subject_id, principal.0, form)
    .await
    .map_err(ApiError::domain)?;
  Ok((StatusCode::CREATED, [(header::ETAG, etag(application.version))], Json(application)))
}

/// `GET /subjects/{id}/applications`
pub async fn list<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<Application>>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let applications = engine
    .list_applications_as(subject_id, principal.actor())
    .await
    .map_err(ApiError::domain)?;
  Ok(Json(applications))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /applications/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let application = engine
    .get_application_as(id, principal.actor())
    .await
    .map_err(ApiError::domain)?;
  Ok(([(header::ETAG, etag(application.version))], Json(application)))
}

// ─── Transition ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub target: ApplicationStatus,
  #[serde(default)]
  pub note:   Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
  pub application: Application,
  pub event:       Event,
}

/// `POST /applications/{id}/transitions`
pub async fn transition<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let request = TransitionRequest {
    target:           body.target,
    note:             body.note,
    expected_version: if_match(&headers)?,
  };
  let (application, event) = engine
    .transition_with(id, principal.actor(), request)
    .await
    .map_err(ApiError::domain)?;
  Ok((
    [(header::ETAG, etag(application.version))],
    Json(TransitionResponse { application, event }),
  ))
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// `GET /applications/{id}/events`
pub async fn events<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let events = engine.list_events(id, principal.actor()).await.map_err(ApiError::domain)?;
  Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct NoteBody {
  pub note: String,
}

/// `POST /applications/{id}/events`
pub async fn add_note<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let event = engine
    .add_note(id, principal.actor(), body.note)
    .await
    .map_err(ApiError::domain)?;
  Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct PurgeBody {
  pub reason: String,
}

/// `POST /events/{id}/purge`
pub async fn purge<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  Json(body): Json<PurgeBody>,
) -> Result<Json<Event>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let record = engine.purge_event(id, principal.0, body.reason).await.map_err(ApiError::domain)?;
  Ok(Json(record))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn with_if_match(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::IF_MATCH, HeaderValue::from_static(value));
    headers
  }

  #[test]
  fn if_match_forms() {
    assert_eq!(if_match(&HeaderMap::new()).unwrap(), None);
    assert_eq!(if_match(&with_if_match("\"3\"")).unwrap(), Some(3));
    assert_eq!(if_match(&with_if_match("W/\"4\"")).unwrap(), Some(4));
    assert_eq!(if_match(&with_if_match("5")).unwrap(), Some(5));
    assert_eq!(if_match(&with_if_match("*")).unwrap(), None);
    assert!(if_match(&with_if_match("\"abc\"")).is_err());
  }

  #[test]
  fn etag_round_trips_through_if_match() {
    let mut headers = HeaderMap::new();
    headers.insert(header::IF_MATCH, etag(7));
    assert_eq!(if_match(&headers).unwrap(), Some(7));
  }
}
