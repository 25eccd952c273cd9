//! Server wiring for rehome: configuration and the top-level router.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the SQLite store
//! and serves [`router`].

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use rehome_core::{
  engine::{Engine, EngineConfig},
  media::Placeholders,
  notify::Notifier,
  store::AdoptionStore,
};
use rehome_store_sqlite::StoreOptions;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REHOME_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// How long a writer waits on another writer's lock.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:   u64,
  /// Total tries per write when the store reports lock contention.
  #[serde(default = "default_max_attempts")]
  pub max_attempts:      u32,
  #[serde(default)]
  pub placeholder_image: Option<String>,
  #[serde(default)]
  pub placeholder_video: Option<String>,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("rehome.db") }
fn default_busy_timeout_ms() -> u64 { 5_000 }
fn default_max_attempts() -> u32 { 3 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { busy_timeout: Duration::from_millis(self.busy_timeout_ms) }
  }

  pub fn engine_config(&self) -> EngineConfig {
    let defaults = Placeholders::default();
    EngineConfig {
      max_attempts: self.max_attempts.max(1),
      placeholders: Placeholders {
        image: self.placeholder_image.clone().unwrap_or(defaults.image),
        video: self.placeholder_video.clone().unwrap_or(defaults.video),
      },
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API under `/api`, wrapped in request tracing.
pub fn router<S, N>(engine: Arc<Engine<S, N>>) -> Router
where
  S: AdoptionStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    .nest("/api", rehome_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use rehome_core::{
    principal::{Actor, MembershipRole, UserRole},
    subject::NewSubject,
  };
  use rehome_store_sqlite::SqliteStore;
  use tower::ServiceExt;

  use super::*;

  fn config_from(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = config_from("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.store_options().busy_timeout, Duration::from_secs(5));
    assert_eq!(cfg.engine_config(), EngineConfig::default());
  }

  #[test]
  fn placeholders_and_retries_are_configurable() {
    let cfg = config_from(
      r#"
      port = 9000
      max_attempts = 0
      placeholder_image = "/img/none.png"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    let engine = cfg.engine_config();
    assert_eq!(engine.max_attempts, 1);
    assert_eq!(engine.placeholders.image, "/img/none.png");
    assert_eq!(engine.placeholders.video, Placeholders::default().video);
  }

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let org = store.add_organization("Harbor Rescue".into()).await.unwrap().organization_id;
    let staff = store.add_user("sam".into(), UserRole::ShelterStaff).await.unwrap().user_id;
    store.add_membership(org, staff, MembershipRole::Staff).await.unwrap();
    let subject = store
      .register_subject(org, NewSubject::new("Miso"), Actor::User(staff))
      .await
      .unwrap();

    let app = router(Arc::new(Engine::new(store)));
    let req = Request::builder()
      .uri(format!("/api/subjects/{}", subject.subject_id))
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "Miso");

    let req = Request::builder()
      .uri(format!("/subjects/{}", subject.subject_id))
      .body(Body::empty())
      .unwrap();
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);
  }
}
