//! Handlers for subject endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/organizations/{id}/subjects` | Body: [`NewSubject`]; 201 |
//! | `GET`  | `/subjects/{id}` | Public |
//! | `POST` | `/subjects/{id}/pause` | Organization staff or admin |
//! | `POST` | `/subjects/{id}/unpause` | Recomputes the derived status |
//! | `GET`  | `/subjects/{id}/history` | Availability changes, oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rehome_core::{
  engine::Engine,
  notify::Notifier,
  store::AdoptionStore,
  subject::{NewSubject, Subject, SubjectStatusChange},
};
use uuid::Uuid;

use crate::{error::ApiError, principal::PrincipalId};

/// `POST /organizations/{id}/subjects`
pub async fn register<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(organization_id): Path<Uuid>,
  Json(input): Json<NewSubject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let subject = engine
    .register_subject(organization_id, input, principal.actor())
    .await
    .map_err(ApiError::domain)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `GET /subjects/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let subject = engine.get_subject(id).await.map_err(ApiError::domain)?;
  Ok(Json(subject))
}

/// `POST /subjects/{id}/pause`
pub async fn pause<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let subject = engine.set_paused(id, principal.actor(), true).await.map_err(ApiError::domain)?;
  Ok(Json(subject))
}

/// `POST /subjects/{id}/unpause`
pub async fn unpause<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let subject = engine.set_paused(id, principal.actor(), false).await.map_err(ApiError::domain)?;
  Ok(Json(subject))
}

/// `GET /subjects/{id}/history`
pub async fn history<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubjectStatusChange>>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let changes = engine.subject_history(id).await.map_err(ApiError::domain)?;
  Ok(Json(changes))
}
