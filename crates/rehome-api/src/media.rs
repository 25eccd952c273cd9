//! Handlers for media endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/subjects/{id}/media` | Primary first, then `sort_order` |
//! | `POST`  | `/subjects/{id}/media` | Body: [`NewMedia`]; 201 |
//! | `GET`   | `/subjects/{id}/media/primary` | `?kind=image\|video` (default image); item or placeholder |
//! | `POST`  | `/subjects/{id}/media/{media_id}/primary` | Make the item the only primary of its kind |
//! | `PATCH` | `/media/{id}` | Body: [`MediaUpdate`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rehome_core::{
  engine::Engine,
  media::{MediaItem, MediaKind, MediaUpdate, NewMedia, PrimaryMedia},
  notify::Notifier,
  store::AdoptionStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, principal::PrincipalId};

/// `GET /subjects/{id}/media`
pub async fn list<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<MediaItem>>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let items = engine.list_media(id).await.map_err(ApiError::domain)?;
  Ok(Json(items))
}

/// `POST /subjects/{id}/media`
pub async fn add<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  Json(input): Json<NewMedia>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let item = engine.add_media(id, input, principal.actor()).await.map_err(ApiError::domain)?;
  Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
pub struct PrimaryParams {
  pub kind: Option<MediaKind>,
}

/// `GET /subjects/{id}/media/primary[?kind=<kind>]`
pub async fn primary<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<PrimaryParams>,
) -> Result<Json<PrimaryMedia>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let kind = params.kind.unwrap_or(MediaKind::Image);
  let primary = engine.primary_media(id, kind).await.map_err(ApiError::domain)?;
  Ok(Json(primary))
}

/// `POST /subjects/{id}/media/{media_id}/primary`
pub async fn set_primary<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path((subject_id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MediaItem>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let item = engine
    .set_primary_media(subject_id, media_id, principal.actor())
    .await
    .map_err(ApiError::domain)?;
  Ok(Json(item))
}

/// `PATCH /media/{id}`
pub async fn update<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  Json(update): Json<MediaUpdate>,
) -> Result<Json<MediaItem>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let item = engine.update_media(id, update, principal.actor()).await.map_err(ApiError::domain)?;
  Ok(Json(item))
}
