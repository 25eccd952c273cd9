//! [`Engine`] is the typed operation surface over an [`AdoptionStore`].
//!
//! The engine adds what does not belong inside a store transaction:
//!
//! - shape validation, before any lock is taken;
//! - a bounded number of retries when the store reports a transient failure
//!   (an expired lock wait), after which the failure surfaces as a conflict;
//! - outward notifications, sent only after commit and never allowed to fail
//!   the operation.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify, Error,
  application::{Application, ApplicationForm, ApplicationStatus, TransitionRequest},
  audit::Event,
  media::{MediaItem, MediaKind, MediaUpdate, NewMedia, Placeholders, PrimaryMedia, resolve_primary},
  message::{Message, validate_content},
  notify::{NoopNotifier, Notification, Notifier},
  principal::Actor,
  store::AdoptionStore,
  subject::{NewSubject, Subject, SubjectStatusChange},
  validate::ValidationErrors,
};

/// Tunables for [`Engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  /// Total tries for one operation when the store reports a transient
  /// failure. `1` disables retrying.
  pub max_attempts: u32,
  pub placeholders: Placeholders,
}

impl Default for EngineConfig {
  fn default() -> Self { Self { max_attempts: 3, placeholders: Placeholders::default() } }
}

pub struct Engine<S, N = NoopNotifier> {
  store:    S,
  notifier: N,
  config:   EngineConfig,
}

impl<S: AdoptionStore> Engine<S> {
  pub fn new(store: S) -> Self { Self::with_notifier(store, NoopNotifier, EngineConfig::default()) }
}

impl<S, N> Engine<S, N>
where
  S: AdoptionStore,
  N: Notifier,
{
  pub fn with_notifier(store: S, notifier: N, config: EngineConfig) -> Self {
    Self { store, notifier, config }
  }

  /// The underlying store, for setup and reads that need no engine policy.
  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  // ── Applications ──────────────────────────────────────────────────────

  /// File a `Pending` application for `subject_id` on behalf of
  /// `applicant_id`.
  pub async fn apply_to(
    &self,
    subject_id: Uuid,
    applicant_id: Uuid,
    form: ApplicationForm,
  ) -> Result<Application, S::Error> {
    form.validate().map_err(invalid::<S>)?;

    let application = self
      .retrying("apply_to", move || self.store.apply_to(subject_id, applicant_id, form.clone()))
      .await?;

    self
      .publish(Notification::ApplicationSubmitted { application: application.clone() })
      .await;
    Ok(application)
  }

  /// Move an application to `target`.
  pub async fn transition(
    &self,
    application_id: Uuid,
    target: ApplicationStatus,
    actor: Actor,
    note: Option<String>,
  ) -> Result<(Application, Event), S::Error> {
    let request = TransitionRequest { target, note, expected_version: None };
    self.transition_with(application_id, actor, request).await
  }

  /// [`Self::transition`] with the full request, including an optional
  /// expected version.
  pub async fn transition_with(
    &self,
    application_id: Uuid,
    actor: Actor,
    request: TransitionRequest,
  ) -> Result<(Application, Event), S::Error> {
    request.validate().map_err(invalid::<S>)?;

    let (application, event) = self
      .retrying("transition", move || {
        self.store.transition(application_id, actor, request.clone())
      })
      .await?;

    self
      .publish(Notification::StatusChanged {
        application: application.clone(),
        event:       event.clone(),
      })
      .await;
    Ok((application, event))
  }

  pub async fn get_application(&self, application_id: Uuid) -> Result<Application, S::Error> {
    self
      .store
      .get_application(application_id)
      .await?
      .ok_or_else(|| Error::ApplicationNotFound(application_id).into())
  }

  /// [`Self::get_application`] on behalf of `viewer`, who must be a party to
  /// the application.
  pub async fn get_application_as(
    &self,
    application_id: Uuid,
    viewer: Actor,
  ) -> Result<Application, S::Error> {
    let application = self.get_application(application_id).await?;
    if let Actor::User(user_id) = viewer {
      let principal = self.store.get_principal(user_id).await?;
      if principal.standing_on(application.applicant_id, application.organization_id).is_none() {
        return Err(
          Error::Forbidden(format!("user {user_id} is not a party to application {application_id}"))
            .into(),
        );
      }
    }
    Ok(application)
  }

  pub async fn list_applications(&self, subject_id: Uuid) -> Result<Vec<Application>, S::Error> {
    self.require_subject(subject_id).await?;
    self.store.list_applications(subject_id).await
  }

  /// [`Self::list_applications`] on behalf of `viewer`, who must manage the
  /// subject's organization.
  pub async fn list_applications_as(
    &self,
    subject_id: Uuid,
    viewer: Actor,
  ) -> Result<Vec<Application>, S::Error> {
    let subject = self.require_subject(subject_id).await?;
    if let Actor::User(user_id) = viewer
      && !self.store.get_principal(user_id).await?.manages(subject.organization_id)
    {
      return Err(
        Error::Forbidden(format!("user {user_id} does not manage subject {subject_id}")).into(),
      );
    }
    self.store.list_applications(subject_id).await
  }

  // ── Subjects ──────────────────────────────────────────────────────────

  pub async fn register_subject(
    &self,
    organization_id: Uuid,
    input: NewSubject,
    actor: Actor,
  ) -> Result<Subject, S::Error> {
    input.validate().map_err(invalid::<S>)?;
    self.store.register_subject(organization_id, input, actor).await
  }

  pub async fn get_subject(&self, subject_id: Uuid) -> Result<Subject, S::Error> {
    self.require_subject(subject_id).await
  }

  pub async fn set_paused(
    &self,
    subject_id: Uuid,
    actor: Actor,
    paused: bool,
  ) -> Result<Subject, S::Error> {
    self
      .retrying("set_paused", move || self.store.set_paused(subject_id, actor, paused))
      .await
  }

  pub async fn subject_history(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<SubjectStatusChange>, S::Error> {
    self.require_subject(subject_id).await?;
    self.store.subject_history(subject_id).await
  }

  // ── Audit log ─────────────────────────────────────────────────────────

  pub async fn add_note(
    &self,
    application_id: Uuid,
    actor: Actor,
    note: String,
  ) -> Result<Event, S::Error> {
    let mut v = ValidationErrors::new();
    v.require("note", &note);
    v.max_chars("note", &note, 2000);
    v.finish().map_err(invalid::<S>)?;

    self
      .retrying("add_note", move || self.store.add_note(application_id, actor, note.clone()))
      .await
  }

  pub async fn record_system_event(
    &self,
    application_id: Uuid,
    note: String,
  ) -> Result<Event, S::Error> {
    self
      .retrying("record_system_event", move || {
        self.store.record_system_event(application_id, note.clone())
      })
      .await
  }

  pub async fn list_events(&self, application_id: Uuid, viewer: Actor) -> Result<Vec<Event>, S::Error> {
    self.store.list_events(application_id, viewer).await
  }

  pub async fn purge_event(
    &self,
    event_id: Uuid,
    admin_id: Uuid,
    reason: String,
  ) -> Result<Event, S::Error> {
    let mut v = ValidationErrors::new();
    v.require("reason", &reason);
    v.finish().map_err(invalid::<S>)?;
    self
      .retrying("purge_event", move || self.store.purge_event(event_id, admin_id, reason.clone()))
      .await
  }

  // ── Messages ──────────────────────────────────────────────────────────

  pub async fn send_message(
    &self,
    application_id: Uuid,
    sender_id: Uuid,
    content: String,
  ) -> Result<Message, S::Error> {
    validate_content(&content).map_err(invalid::<S>)?;

    let message = self
      .retrying("send_message", move || {
        self.store.send_message(application_id, sender_id, content.clone())
      })
      .await?;

    self.publish(Notification::MessageSent { message: message.clone() }).await;
    Ok(message)
  }

  pub async fn mark_message_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<Message, S::Error> {
    self
      .retrying("mark_message_read", move || self.store.mark_message_read(message_id, reader_id))
      .await
  }

  pub async fn list_messages(&self, application_id: Uuid, viewer_id: Uuid) -> Result<Vec<Message>, S::Error> {
    self.store.list_messages(application_id, viewer_id).await
  }

  pub async fn unread_count(&self, application_id: Uuid, reader_id: Uuid) -> Result<u64, S::Error> {
    self.store.unread_count(application_id, reader_id).await
  }

  // ── Media ─────────────────────────────────────────────────────────────

  pub async fn add_media(
    &self,
    subject_id: Uuid,
    input: NewMedia,
    actor: Actor,
  ) -> Result<MediaItem, S::Error> {
    input.validate().map_err(invalid::<S>)?;
    self
      .retrying("add_media", move || self.store.add_media(subject_id, input.clone(), actor))
      .await
  }

  pub async fn update_media(
    &self,
    media_id: Uuid,
    update: MediaUpdate,
    actor: Actor,
  ) -> Result<MediaItem, S::Error> {
    update.validate().map_err(invalid::<S>)?;
    self
      .retrying("update_media", move || self.store.update_media(media_id, update.clone(), actor))
      .await
  }

  pub async fn set_primary_media(
    &self,
    subject_id: Uuid,
    media_id: Uuid,
    actor: Actor,
  ) -> Result<MediaItem, S::Error> {
    self
      .retrying("set_primary_media", move || {
        self.store.set_primary_media(subject_id, media_id, actor)
      })
      .await
  }

  pub async fn list_media(&self, subject_id: Uuid) -> Result<Vec<MediaItem>, S::Error> {
    self.require_subject(subject_id).await?;
    self.store.list_media(subject_id).await
  }

  /// The primary item of `kind`, or the configured placeholder.
  pub async fn primary_media(&self, subject_id: Uuid, kind: MediaKind) -> Result<PrimaryMedia, S::Error> {
    let items = self.list_media(subject_id).await?;
    Ok(resolve_primary(&items, kind, &self.config.placeholders))
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn require_subject(&self, subject_id: Uuid) -> Result<Subject, S::Error> {
    self
      .store
      .get_subject(subject_id)
      .await?
      .ok_or_else(|| Error::SubjectNotFound(subject_id).into())
  }

  /// Run `op`, retrying while the store reports a transient failure and
  /// attempts remain.
  async fn retrying<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> Result<T, S::Error>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, S::Error>>,
  {
    let mut tries = 1;
    loop {
      match attempt().await {
        Err(e) if e.is_transient() && tries < self.config.max_attempts => {
          tracing::warn!(op, attempt = tries, error = %e, "transient store failure; retrying");
          tries += 1;
        }
        outcome => return outcome,
      }
    }
  }

  async fn publish(&self, notification: Notification) {
    let kind = notification.label();
    if let Err(e) = self.notifier.notify(notification).await {
      tracing::warn!(kind, error = %e, "notification failed; operation already committed");
    }
  }
}

fn invalid<S: AdoptionStore>(errors: ValidationErrors) -> S::Error { Error::Validation(errors).into() }
