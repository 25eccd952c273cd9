//! Outward notifications.
//!
//! Delivery is someone else's job. The engine hands a [`Notification`] to a
//! [`Notifier`] only after the store has committed, and a failing notifier is
//! logged and otherwise ignored.

use std::future::Future;

use serde::Serialize;

use crate::{application::Application, audit::Event, message::Message};

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
  ApplicationSubmitted { application: Application },
  StatusChanged { application: Application, event: Event },
  MessageSent { message: Message },
}

impl Notification {
  pub fn label(&self) -> &'static str {
    match self {
      Self::ApplicationSubmitted { .. } => "application_submitted",
      Self::StatusChanged { .. } => "status_changed",
      Self::MessageSent { .. } => "message_sent",
    }
  }
}

pub trait Notifier: Send + Sync {
  fn notify(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + '_;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  async fn notify(&self, _notification: Notification) -> Result<(), NotifyError> { Ok(()) }
}

/// Emits each notification as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
    let payload = serde_json::to_string(&notification)?;
    tracing::info!(kind = notification.label(), %payload, "notification");
    Ok(())
  }
}
