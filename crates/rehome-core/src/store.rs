//! The `AdoptionStore` trait.
//!
//! Implemented by storage backends (e.g. `rehome-store-sqlite`). Every
//! invariant-bearing write runs inside one store transaction that first takes
//! an exclusive lock on the parent row (the application for transitions, the
//! subject for application creation, synchronization and primary-media
//! selection), checks its invariants against what it read under that lock,
//! and commits all of its effects together or none of them.
//!
//! Shape validation is the caller's job ([`crate::engine::Engine`] does it);
//! the store assumes well-formed payloads.
//!
//! All methods return `Send` futures so the trait can be used in multi-threaded
//! async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  Classify,
  application::{Application, ApplicationForm, TransitionRequest},
  audit::Event,
  media::{MediaItem, MediaUpdate, NewMedia},
  message::Message,
  principal::{Actor, Membership, MembershipRole, Organization, Principal, User, UserRole},
  subject::{NewSubject, Subject, SubjectStatusChange},
};

pub trait AdoptionStore: Send + Sync {
  type Error: std::error::Error + Classify + From<crate::Error> + Send + Sync + 'static;

  // ── Principals ────────────────────────────────────────────────────────

  fn add_organization(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Organization, Self::Error>> + Send + '_;

  fn add_user(
    &self,
    username: String,
    role: UserRole,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Add (or reactivate with a new role) a membership.
  fn add_membership(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
    role: MembershipRole,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  /// Deactivate a membership; the user keeps no standing through it.
  fn deactivate_membership(
    &self,
    organization_id: Uuid,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  /// Resolve a user into role plus active memberships.
  fn get_principal(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Register a subject owned by `organization_id`. The actor must manage that
  /// organization.
  fn register_subject(
    &self,
    organization_id: Uuid,
    input: NewSubject,
    actor: Actor,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  fn get_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Set or clear the `Paused` override. Requesting the state already held is
  /// a no-op; clearing recomputes the derived status.
  fn set_paused(
    &self,
    subject_id: Uuid,
    actor: Actor,
    paused: bool,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// The subject's availability changes, oldest first.
  fn subject_history(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SubjectStatusChange>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// File a new `Pending` application. Fails with a conflict if the applicant
  /// already holds an active application for the subject.
  fn apply_to(
    &self,
    subject_id: Uuid,
    applicant_id: Uuid,
    form: ApplicationForm,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  fn get_application(
    &self,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// All applications for a subject, oldest first.
  fn list_applications(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  /// Execute one state-machine transition, append its event and resynchronize
  /// the subject, atomically.
  fn transition(
    &self,
    application_id: Uuid,
    actor: Actor,
    request: TransitionRequest,
  ) -> impl Future<Output = Result<(Application, Event), Self::Error>> + Send + '_;

  // ── Audit log ─────────────────────────────────────────────────────────

  fn add_note(
    &self,
    application_id: Uuid,
    actor: Actor,
    note: String,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn record_system_event(
    &self,
    application_id: Uuid,
    note: String,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Events for an application ordered by `created_at`. The viewer must be a
  /// party to it.
  fn list_events(
    &self,
    application_id: Uuid,
    viewer: Actor,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Administrative override: delete one event and append a system event
  /// recording the deletion. Returns the new record.
  fn purge_event(
    &self,
    event_id: Uuid,
    admin_id: Uuid,
    reason: String,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  fn send_message(
    &self,
    application_id: Uuid,
    sender_id: Uuid,
    content: String,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Set `read_at` if unset; otherwise return the message unchanged.
  fn mark_message_read(
    &self,
    message_id: Uuid,
    reader_id: Uuid,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  fn list_messages(
    &self,
    application_id: Uuid,
    viewer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Messages in the thread not sent by `reader_id` and not yet read.
  fn unread_count(
    &self,
    application_id: Uuid,
    reader_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Media ─────────────────────────────────────────────────────────────

  /// Add a media item; a primary item displaces the current primary of its
  /// kind in the same transaction.
  fn add_media(
    &self,
    subject_id: Uuid,
    input: NewMedia,
    actor: Actor,
  ) -> impl Future<Output = Result<MediaItem, Self::Error>> + Send + '_;

  /// Update caption, ordering or primary flag. Demoting never promotes
  /// another item.
  fn update_media(
    &self,
    media_id: Uuid,
    update: MediaUpdate,
    actor: Actor,
  ) -> impl Future<Output = Result<MediaItem, Self::Error>> + Send + '_;

  /// Make `media_id` the only primary item of its kind for `subject_id`.
  fn set_primary_media(
    &self,
    subject_id: Uuid,
    media_id: Uuid,
    actor: Actor,
  ) -> impl Future<Output = Result<MediaItem, Self::Error>> + Send + '_;

  /// Primary first, then by `sort_order`, then `created_at`.
  fn list_media(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MediaItem>, Self::Error>> + Send + '_;
}
