//! Handlers for message-thread endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications/{id}/messages` | Parties only, oldest first |
//! | `POST` | `/applications/{id}/messages` | Body: `{"content":".."}`; 201 |
//! | `GET`  | `/applications/{id}/messages/unread` | `{"unread": n}` for the caller |
//! | `POST` | `/messages/{id}/read` | Idempotent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rehome_core::{engine::Engine, message::Message, notify::Notifier, store::AdoptionStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, principal::PrincipalId};

/// `GET /applications/{id}/messages`
pub async fn list<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let messages = engine.list_messages(id, principal.0).await.map_err(ApiError::domain)?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub content: String,
}

/// `POST /applications/{id}/messages`
pub async fn send<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
  Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let message = engine
    .send_message(id, principal.0, body.content)
    .await
    .map_err(ApiError::domain)?;
  Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
  pub unread: u64,
}

/// `GET /applications/{id}/messages/unread`
pub async fn unread<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<UnreadCount>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let unread = engine.unread_count(id, principal.0).await.map_err(ApiError::domain)?;
  Ok(Json(UnreadCount { unread }))
}

/// `POST /messages/{id}/read`
pub async fn mark_read<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  principal: PrincipalId,
  Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError>
where
  S: AdoptionStore,
  N: Notifier,
{
  let message = engine.mark_message_read(id, principal.0).await.map_err(ApiError::domain)?;
  Ok(Json(message))
}
