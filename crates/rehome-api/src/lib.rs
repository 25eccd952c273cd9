//! JSON REST API for the rehome adoption engine.
//!
//! Exposes an axum [`Router`] over an [`Engine`] backed by any
//! [`AdoptionStore`]. Authentication, TLS and transport concerns are the
//! caller's responsibility; the caller's user id arrives in the
//! `X-Principal-Id` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rehome_api::api_router(Arc::new(engine)))
//! ```

pub mod applications;
pub mod error;
pub mod media;
pub mod messages;
pub mod principal;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use rehome_core::{engine::Engine, notify::Notifier, store::AdoptionStore};

pub use error::ApiError;
pub use principal::{PRINCIPAL_HEADER, PrincipalId};

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(engine: Arc<Engine<S, N>>) -> Router<()>
where
  S: AdoptionStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    // Subjects
    .route("/organizations/{id}/subjects", post(subjects::register::<S, N>))
    .route("/subjects/{id}", get(subjects::get_one::<S, N>))
    .route("/subjects/{id}/pause", post(subjects::pause::<S, N>))
    .route("/subjects/{id}/unpause", post(subjects::unpause::<S, N>))
    .route("/subjects/{id}/history", get(subjects::history::<S, N>))
    // Applications
    .route(
      "/subjects/{id}/applications",
      get(applications::list::<S, N>).post(applications::apply::<S, N>),
    )
    .route("/applications/{id}", get(applications::get_one::<S, N>))
    .route("/applications/{id}/transitions", post(applications::transition::<S, N>))
    .route(
      "/applications/{id}/events",
      get(applications::events::<S, N>).post(applications::add_note::<S, N>),
    )
    .route("/events/{id}/purge", post(applications::purge::<S, N>))
    // Messages
    .route(
      "/applications/{id}/messages",
      get(messages::list::<S, N>).post(messages::send::<S, N>),
    )
    .route("/applications/{id}/messages/unread", get(messages::unread::<S, N>))
    .route("/messages/{id}/read", post(messages::mark_read::<S, N>))
    // Media
    .route("/subjects/{id}/media", get(media::list::<S, N>).post(media::add::<S, N>))
    .route("/subjects/{id}/media/primary", get(media::primary::<S, N>))
    .route("/subjects/{id}/media/{media_id}/primary", post(media::set_primary::<S, N>))
    .route("/media/{id}", patch(media::update::<S, N>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
