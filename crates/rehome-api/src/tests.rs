//! Router tests over an in-memory `SqliteStore`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use rehome_core::{
  engine::Engine,
  principal::{MembershipRole, UserRole},
  store::AdoptionStore,
  subject::NewSubject,
};
use rehome_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{PRINCIPAL_HEADER, api_router};

// ─── Fixtures ────────────────────────────────────────────────────────────────

struct Fixture {
  engine:   Arc<Engine<SqliteStore>>,
  staff:    Uuid,
  admin:    Uuid,
  adopter:  Uuid,
  stranger: Uuid,
  subject:  Uuid,
}

async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let org = store.add_organization("Harbor Rescue".into()).await.unwrap().organization_id;
  let staff = store.add_user("sam".into(), UserRole::ShelterStaff).await.unwrap().user_id;
  store.add_membership(org, staff, MembershipRole::Staff).await.unwrap();
  let admin = store.add_user("root".into(), UserRole::Admin).await.unwrap().user_id;
  let adopter = store.add_user("ana".into(), UserRole::Adopter).await.unwrap().user_id;
  let stranger = store.add_user("zed".into(), UserRole::Adopter).await.unwrap().user_id;

  let engine = Engine::new(store);
  let subject = engine
    .register_subject(org, NewSubject::new("Miso"), rehome_core::principal::Actor::User(staff))
    .await
    .unwrap()
    .subject_id;

  Fixture { engine: Arc::new(engine), staff, admin, adopter, stranger, subject }
}

fn form_json() -> Value {
  json!({
    "full_name":      "Ana Lima",
    "age":            29,
    "occupation":     "Nurse",
    "phone_number":   "555-0101",
    "address":        "12 Quay Street",
    "housing_type":   "house",
    "family_members": 3,
    "motivation":     "Room to run",
    "consents": {
      "term_agreement":             true,
      "lifelong_care_agreement":    true,
      "spay_neuter_agreement":      true,
      "medical_cost_understanding": true
    }
  })
}

impl Fixture {
  async fn send(
    &self,
    method: &str,
    uri: &str,
    principal: Option<Uuid>,
    headers: Vec<(header::HeaderName, &str)>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = principal {
      builder = builder.header(PRINCIPAL_HEADER, id.to_string());
    }
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    api_router(self.engine.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn apply(&self) -> Value {
    let resp = self
      .send(
        "POST",
        &format!("/subjects/{}/applications", self.subject),
        Some(self.adopter),
        vec![],
        Some(form_json()),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
  }
}

async fn body_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_principal_is_401() {
  let fx = fixture().await;
  let uri = format!("/subjects/{}/applications", fx.subject);
  let resp = fx.send("POST", &uri, None, vec![], Some(form_json())).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(body_json(resp).await["error"], "unauthenticated");
}

#[tokio::test]
async fn malformed_principal_is_401() {
  let fx = fixture().await;
  let req = Request::builder()
    .method("GET")
    .uri(format!("/subjects/{}/applications", fx.subject))
    .header(PRINCIPAL_HEADER, "not-a-uuid")
    .body(Body::empty())
    .unwrap();
  let resp = api_router(fx.engine.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subject_reads_are_public() {
  let fx = fixture().await;
  let resp = fx.send("GET", &format!("/subjects/{}", fx.subject), None, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(body_json(resp).await["status"], "open");
}

// ─── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_returns_201_with_etag() {
  let fx = fixture().await;
  let resp = fx
    .send(
      "POST",
      &format!("/subjects/{}/applications", fx.subject),
      Some(fx.adopter),
      vec![],
      Some(form_json()),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(resp.headers().get(header::ETAG).unwrap(), "\"1\"");
  let app = body_json(resp).await;
  assert_eq!(app["status"], "pending");
  assert_eq!(app["applicant_id"], fx.adopter.to_string());
}

#[tokio::test]
async fn duplicate_application_is_409() {
  let fx = fixture().await;
  fx.apply().await;
  let resp = fx
    .send(
      "POST",
      &format!("/subjects/{}/applications", fx.subject),
      Some(fx.adopter),
      vec![],
      Some(form_json()),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(body_json(resp).await["error"], "conflict");
}

#[tokio::test]
async fn invalid_form_is_422() {
  let fx = fixture().await;
  let mut form = form_json();
  form["full_name"] = json!("");
  form["consents"]["term_agreement"] = json!(false);
  let resp = fx
    .send("POST", &format!("/subjects/{}/applications", fx.subject), Some(fx.adopter), vec![], Some(form))
    .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = body_json(resp).await;
  assert_eq!(body["error"], "validation_failed");
  let message = body["message"].as_str().unwrap();
  assert!(message.contains("full_name"), "message: {message}");
  assert!(message.contains("consents.term_agreement"), "message: {message}");
}

#[tokio::test]
async fn strangers_cannot_read_an_application() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}", app["application_id"].as_str().unwrap());

  let resp = fx.send("GET", &uri, Some(fx.stranger), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("GET", &uri, Some(fx.staff), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_applications_requires_a_manager() {
  let fx = fixture().await;
  fx.apply().await;
  let uri = format!("/subjects/{}/applications", fx.subject);

  let resp = fx.send("GET", &uri, Some(fx.adopter), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("GET", &uri, Some(fx.staff), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn transition_moves_status_and_holds_the_subject() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/transitions", app["application_id"].as_str().unwrap());

  let resp = fx
    .send("POST", &uri, Some(fx.staff), vec![], Some(json!({ "target": "reviewing", "note": "looks good" })))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::ETAG).unwrap(), "\"2\"");
  let body = body_json(resp).await;
  assert_eq!(body["application"]["status"], "reviewing");
  assert_eq!(body["event"]["from_status"], "pending");
  assert_eq!(body["event"]["to_status"], "reviewing");

  let resp = fx.send("GET", &format!("/subjects/{}", fx.subject), None, vec![], None).await;
  assert_eq!(body_json(resp).await["status"], "in_review");
}

#[tokio::test]
async fn illegal_edge_is_409_invalid_transition() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/transitions", app["application_id"].as_str().unwrap());

  let resp = fx.send("POST", &uri, Some(fx.staff), vec![], Some(json!({ "target": "accepted" }))).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(body_json(resp).await["error"], "invalid_transition");
}

#[tokio::test]
async fn stale_if_match_is_409_and_current_one_succeeds() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/transitions", app["application_id"].as_str().unwrap());
  let body = json!({ "target": "reviewing" });

  let resp = fx
    .send("POST", &uri, Some(fx.staff), vec![(header::IF_MATCH, "\"7\"")], Some(body.clone()))
    .await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert_eq!(body_json(resp).await["error"], "conflict");

  let resp = fx.send("POST", &uri, Some(fx.staff), vec![(header::IF_MATCH, "\"1\"")], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_if_match_is_400() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/transitions", app["application_id"].as_str().unwrap());
  let resp = fx
    .send(
      "POST",
      &uri,
      Some(fx.staff),
      vec![(header::IF_MATCH, "\"abc\"")],
      Some(json!({ "target": "reviewing" })),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn applicant_cannot_advance_their_own_application() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/transitions", app["application_id"].as_str().unwrap());

  let resp = fx.send("POST", &uri, Some(fx.adopter), vec![], Some(json!({ "target": "reviewing" }))).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("POST", &uri, Some(fx.adopter), vec![], Some(json!({ "target": "cancelled" }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_application_is_404() {
  let fx = fixture().await;
  let uri = format!("/applications/{}/transitions", Uuid::new_v4());
  let resp = fx.send("POST", &uri, Some(fx.staff), vec![], Some(json!({ "target": "reviewing" }))).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"], "not_found");
}

// ─── Audit log ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn notes_and_purge() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let id = app["application_id"].as_str().unwrap();
  let events_uri = format!("/applications/{id}/events");

  let resp = fx
    .send("POST", &events_uri, Some(fx.staff), vec![], Some(json!({ "note": "called references" })))
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let note = body_json(resp).await;
  let purge_uri = format!("/events/{}/purge", note["event_id"].as_str().unwrap());

  let resp = fx.send("POST", &purge_uri, Some(fx.staff), vec![], Some(json!({ "reason": "pii" }))).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("POST", &purge_uri, Some(fx.admin), vec![], Some(json!({ "reason": "pii" }))).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = fx.send("GET", &events_uri, Some(fx.adopter), vec![], None).await;
  let events = body_json(resp).await;
  let notes: Vec<_> = events.as_array().unwrap().iter().map(|e| e["note"].clone()).collect();
  assert!(!notes.contains(&json!("called references")), "events: {events}");
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn message_thread_with_unread_counts() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/messages", app["application_id"].as_str().unwrap());

  let resp = fx.send("POST", &uri, Some(fx.staff), vec![], Some(json!({ "content": "When can you visit?" }))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let message = body_json(resp).await;
  assert_eq!(message["sender_type"], "shelter");

  let unread_uri = format!("{uri}/unread");
  let resp = fx.send("GET", &unread_uri, Some(fx.adopter), vec![], None).await;
  assert_eq!(body_json(resp).await["unread"], 1);

  let read_uri = format!("/messages/{}/read", message["message_id"].as_str().unwrap());
  let resp = fx.send("POST", &read_uri, Some(fx.staff), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("POST", &read_uri, Some(fx.adopter), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(!body_json(resp).await["read_at"].is_null());

  let resp = fx.send("GET", &unread_uri, Some(fx.adopter), vec![], None).await;
  assert_eq!(body_json(resp).await["unread"], 0);

  let resp = fx.send("GET", &uri, Some(fx.stranger), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_message_is_422() {
  let fx = fixture().await;
  let app = fx.apply().await;
  let uri = format!("/applications/{}/messages", app["application_id"].as_str().unwrap());
  let resp = fx.send("POST", &uri, Some(fx.adopter), vec![], Some(json!({ "content": "   " }))).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Subjects and media ──────────────────────────────────────────────────────

#[tokio::test]
async fn pause_and_unpause_are_logged() {
  let fx = fixture().await;
  let base = format!("/subjects/{}", fx.subject);

  let resp = fx.send("POST", &format!("{base}/pause"), Some(fx.adopter), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx.send("POST", &format!("{base}/pause"), Some(fx.staff), vec![], None).await;
  assert_eq!(body_json(resp).await["status"], "paused");

  let resp = fx.send("POST", &format!("{base}/unpause"), Some(fx.staff), vec![], None).await;
  assert_eq!(body_json(resp).await["status"], "open");

  let resp = fx.send("GET", &format!("{base}/history"), None, vec![], None).await;
  let history = body_json(resp).await;
  let statuses: Vec<_> = history.as_array().unwrap().iter().map(|c| c["to_status"].clone()).collect();
  assert!(statuses.ends_with(&[json!("paused"), json!("open")]), "history: {history}");
}

#[tokio::test]
async fn primary_media_falls_back_to_placeholder() {
  let fx = fixture().await;
  let base = format!("/subjects/{}/media", fx.subject);

  let resp = fx.send("GET", &format!("{base}/primary"), None, vec![], None).await;
  let primary = body_json(resp).await;
  assert_eq!(primary["source"], "placeholder");
  assert_eq!(primary["uri"], "/static/images/placeholder_subject.svg");

  let resp = fx
    .send("GET", &format!("{base}/primary?kind=video"), None, vec![], None)
    .await;
  assert_eq!(body_json(resp).await["uri"], "/static/videos/placeholder_subject.mp4");
}

#[tokio::test]
async fn set_primary_keeps_one_primary_per_kind() {
  let fx = fixture().await;
  let base = format!("/subjects/{}/media", fx.subject);

  let resp = fx
    .send("POST", &base, Some(fx.staff), vec![], Some(json!({ "kind": "image", "uri": "a.jpg", "is_primary": true })))
    .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let resp = fx
    .send("POST", &base, Some(fx.staff), vec![], Some(json!({ "kind": "image", "uri": "b.jpg" })))
    .await;
  let second = body_json(resp).await;
  let second_id = second["media_id"].as_str().unwrap();

  let resp = fx
    .send("POST", &format!("{base}/{second_id}/primary"), Some(fx.adopter), vec![], None)
    .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = fx
    .send("POST", &format!("{base}/{second_id}/primary"), Some(fx.staff), vec![], None)
    .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = fx.send("GET", &base, None, vec![], None).await;
  let items = body_json(resp).await;
  let primaries: Vec<_> =
    items.as_array().unwrap().iter().filter(|m| m["is_primary"] == json!(true)).collect();
  assert_eq!(primaries.len(), 1);
  assert_eq!(primaries[0]["uri"], "b.jpg");

  let resp = fx
    .send("PATCH", &format!("/media/{second_id}"), Some(fx.staff), vec![], Some(json!({ "caption": "sunny" })))
    .await;
  assert_eq!(body_json(resp).await["caption"], "sunny");
}
