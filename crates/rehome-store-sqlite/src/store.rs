//! [`SqliteStore`]: the SQLite implementation of [`AdoptionStore`].

use std::{path::Path, time::Duration};

use rehome_core::{
  application::{Application, ApplicationForm, TransitionRequest},
  audit::Event,
  media::{MediaItem, MediaUpdate, NewMedia},
  message::Message,
  principal::{Actor, Membership, MembershipRole, Organization, Principal, User, UserRole},
  store::AdoptionStore,
  subject::{NewSubject, Subject, SubjectStatusChange},
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::{Error, Result, lock::Lock, ops, schema::SCHEMA};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection settings.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// How long a writer waits for another writer's lock before the attempt
  /// fails with [`Error::LockTimeout`].
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { busy_timeout: Duration::from_secs(5) } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An adoption store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Separate
/// [`SqliteStore::open`] calls on the same path get separate connections that
/// contend for the file's write lock like separate processes would.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema(options).await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(StoreOptions::default()).await?;
    Ok(store)
  }

  async fn init_schema(&self, options: StoreOptions) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  /// Run `f` inside one write transaction serialized on `lock`.
  ///
  /// The transaction begins `IMMEDIATE`, so the write lock is held before the
  /// first read and until commit. The parent row must exist. `f`'s error
  /// rolls everything back; its success commits everything.
  pub async fn with_exclusive_lock<T, F>(&self, lock: Lock, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = lock.acquire(&tx).and_then(|()| f(&tx));
        match &outcome {
          Ok(_) => tx.commit()?,
          Err(e) => tracing::debug!(%lock, error = %e, "write rolled back"),
        }
        Ok(outcome)
      })
      .await?
  }

  /// Run `f` against the last committed state. Never waits on writers.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── AdoptionStore impl ──────────────────────────────────────────────────────

impl AdoptionStore for SqliteStore {
  type Error = Error;

  // ── Principals ────────────────────────────────────────────────────────

  async fn add_organization(&self, name: String) -> Result<Organization> {
    self
      .with_exclusive_lock(Lock::Store, move |tx| ops::principals::add_organization(tx, name))
      .await
  }

  async fn add_user(&self, username: String, role: UserRole) -> Result<User> {
    self
      .with_exclusive_lock(Lock::Store, move |tx| ops::principals::add_user(tx, username, role))
      .await
  }

  async fn add_membership(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
    role: MembershipRole,
  ) -> Result<Membership> {
    self
      .with_exclusive_lock(Lock::Organization(organization_id), move |tx| {
        ops::principals::add_membership(tx, organization_id, user_id, role)
      })
      .await
  }

  async fn deactivate_membership(&self, organization_id: Uuid, user_id: Uuid) -> Result<Membership> {
    self
      .with_exclusive_lock(Lock::Organization(organization_id), move |tx| {
        ops::principals::deactivate_membership(tx, organization_id, user_id)
      })
      .await
  }

  async fn get_principal(&self, user_id: Uuid) -> Result<Principal> {
    self.read(move |conn| ops::principals::get_principal(conn, user_id)).await
  }

  // ── Subjects ──────────────────────────────────────────────────────────

  async fn register_subject(
    &self,
    organization_id: Uuid,
    input: NewSubject,
    actor: Actor,
  ) -> Result<Subject> {
    self
      .with_exclusive_lock(Lock::Organization(organization_id), move |tx| {
        ops::subjects::register_subject(tx, organization_id, input, actor)
      })
      .await
  }

  async fn get_subject(&self, subject_id: Uuid) -> Result<Option<Subject>> {
    self.read(move |conn| ops::find_subject(conn, subject_id)).await
  }

  async fn set_paused(&self, subject_id: Uuid, actor: Actor, paused: bool) -> Result<Subject> {
    self
      .with_exclusive_lock(Lock::Subject(subject_id), move |tx| {
        ops::subjects::set_paused(tx, subject_id, actor, paused)
      })
      .await
  }

  async fn subject_history(&self, subject_id: Uuid) -> Result<Vec<SubjectStatusChange>> {
    self.read(move |conn| ops::subjects::subject_history(conn, subject_id)).await
  }

  // ── Applications ──────────────────────────────────────────────────────

  async fn apply_to(
    &self,
    subject_id: Uuid,
    applicant_id: Uuid,
    form: ApplicationForm,
  ) -> Result<Application> {
    self
      .with_exclusive_lock(Lock::Subject(subject_id), move |tx| {
        ops::applications::apply_to(tx, subject_id, applicant_id, form)
      })
      .await
  }

  async fn get_application(&self, application_id: Uuid) -> Result<Option<Application>> {
    self.read(move |conn| ops::find_application(conn, application_id)).await
  }

  async fn list_applications(&self, subject_id: Uuid) -> Result<Vec<Application>> {
    self.read(move |conn| ops::applications::list_applications(conn, subject_id)).await
  }

  async fn transition(
    &self,
    application_id: Uuid,
    actor: Actor,
    request: TransitionRequest,
  ) -> Result<(Application, Event)> {
    self
      .with_exclusive_lock(Lock::Application(application_id), move |tx| {
        ops::applications::transition(tx, application_id, actor, request)
      })
      .await
  }

  // ── Audit log ─────────────────────────────────────────────────────────

  async fn add_note(&self, application_id: Uuid, actor: Actor, note: String) -> Result<Event> {
    self
      .with_exclusive_lock(Lock::Application(application_id), move |tx| {
        ops::audit::add_note(tx, application_id, actor, note)
      })
      .await
  }

  async fn record_system_event(&self, application_id: Uuid, note: String) -> Result<Event> {
    self
      .with_exclusive_lock(Lock::Application(application_id), move |tx| {
        ops::audit::record_system_event(tx, application_id, note)
      })
      .await
  }

  async fn list_events(&self, application_id: Uuid, viewer: Actor) -> Result<Vec<Event>> {
    self.read(move |conn| ops::audit::list_events(conn, application_id, viewer)).await
  }

  async fn purge_event(&self, event_id: Uuid, admin_id: Uuid, reason: String) -> Result<Event> {
    self
      .with_exclusive_lock(Lock::Event(event_id), move |tx| {
        ops::audit::purge_event(tx, event_id, admin_id, reason)
      })
      .await
  }

  // ── Messages ──────────────────────────────────────────────────────────

  async fn send_message(
    &self,
    application_id: Uuid,
    sender_id: Uuid,
    content: String,
  ) -> Result<Message> {
    self
      .with_exclusive_lock(Lock::Application(application_id), move |tx| {
        ops::messages::send_message(tx, application_id, sender_id, content)
      })
      .await
  }

  async fn mark_message_read(&self, message_id: Uuid, reader_id: Uuid) -> Result<Message> {
    self
      .with_exclusive_lock(Lock::Message(message_id), move |tx| {
        ops::messages::mark_message_read(tx, message_id, reader_id)
      })
      .await
  }

  async fn list_messages(&self, application_id: Uuid, viewer_id: Uuid) -> Result<Vec<Message>> {
    self.read(move |conn| ops::messages::list_messages(conn, application_id, viewer_id)).await
  }

  async fn unread_count(&self, application_id: Uuid, reader_id: Uuid) -> Result<u64> {
    self.read(move |conn| ops::messages::unread_count(conn, application_id, reader_id)).await
  }

  // ── Media ─────────────────────────────────────────────────────────────

  async fn add_media(&self, subject_id: Uuid, input: NewMedia, actor: Actor) -> Result<MediaItem> {
    self
      .with_exclusive_lock(Lock::Subject(subject_id), move |tx| {
        ops::media::add_media(tx, subject_id, input, actor)
      })
      .await
  }

  async fn update_media(
    &self,
    media_id: Uuid,
    update: MediaUpdate,
    actor: Actor,
  ) -> Result<MediaItem> {
    self
      .with_exclusive_lock(Lock::Media(media_id), move |tx| {
        ops::media::update_media(tx, media_id, update, actor)
      })
      .await
  }

  async fn set_primary_media(
    &self,
    subject_id: Uuid,
    media_id: Uuid,
    actor: Actor,
  ) -> Result<MediaItem> {
    self
      .with_exclusive_lock(Lock::Subject(subject_id), move |tx| {
        ops::media::set_primary_media(tx, subject_id, media_id, actor)
      })
      .await
  }

  async fn list_media(&self, subject_id: Uuid) -> Result<Vec<MediaItem>> {
    self.read(move |conn| ops::media::list_media(conn, subject_id)).await
  }
}
