//! Webhook fan-out.
//!
//! Handlers push events with [`WebhookSink::add_message`]; the
//! [`WebhookSender`] buffers them per [`WebhookType`] and, on every tick,
//! POSTs one JSON array per configured destination containing the events it
//! subscribed to. Delivery is best effort: failures are logged, never retried.

mod collection;
mod sender;
mod types;

pub use collection::{WebhookCollection, WebhookMessage};
pub use sender::{Destination, WebhookSender, DEFAULT_INTERVAL};
pub use types::{WebhookConfigError, WebhookType};

use golbat_common::AreaName;
use std::sync::Arc;

/// Anything that accepts outgoing webhook events.
pub trait WebhookSink: Send + Sync {
    fn add_message(&self, kind: WebhookType, message: serde_json::Value, areas: Vec<AreaName>);
}

pub type SharedWebhooks = Arc<dyn WebhookSink>;

/// Discards every event. Used when no destinations are configured and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWebhooks;

impl WebhookSink for NoopWebhooks {
    fn add_message(&self, _kind: WebhookType, _message: serde_json::Value, _areas: Vec<AreaName>) {}
}
