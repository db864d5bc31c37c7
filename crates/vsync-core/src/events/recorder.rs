//! Event recording for synchronization outcomes.
//!
//! The `BroadcastEventRecorder` publishes every recorded event on a tokio
//! broadcast channel so that any number of sinks (log shippers, tests, an
//! event writer against a store) can observe them.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::Event;
use crate::object::Object;

/// Default buffer size for the broadcast channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Sink for events recorded against objects.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: Event);

    fn warning(&self, obj: &Object, reason: &str, message: String) {
        self.record(Event::warning(obj, reason, message));
    }
}

/// Event recorder backed by a broadcast channel.
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct BroadcastEventRecorder {
    sender: broadcast::Sender<Event>,
}

impl BroadcastEventRecorder {
    /// Create a new recorder with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new recorder with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new recorder wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Subscribe to events.
    ///
    /// Events recorded before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventRecorder for BroadcastEventRecorder {
    fn record(&self, event: Event) {
        debug!(
            event_type = %event.event_type,
            reason = %event.reason,
            kind = %event.involved_object.kind,
            namespace = %event.involved_object.namespace,
            name = %event.involved_object.name,
            message = %event.message,
            "Recorded event"
        );
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl Default for BroadcastEventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastEventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEventRecorder")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
