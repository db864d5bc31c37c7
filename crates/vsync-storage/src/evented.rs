//! EventedStore - a store wrapper that emits watch events after mutations.
//!
//! This wrapper delegates all operations to an inner store while publishing a
//! [`StoreEvent`] on a broadcast channel after every successful write. It is
//! the watch feed the sync controller subscribes to.
//!
//! # Example
//!
//! ```ignore
//! use vsync_storage::EventedStore;
//! use vsync_db_memory::InMemoryStore;
//!
//! let store = EventedStore::new(InMemoryStore::new("physical"));
//! let mut watch = store.subscribe();
//!
//! // After this, an `Added` event is delivered to `watch`
//! store.create(&revision).await?;
//! ```

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;
use vsync_core::{GroupVersionKind, Object, ObjectKey};

use crate::error::StorageError;
use crate::traits::ObjectStore;
use crate::types::{StoreEvent, StoreEventType};

/// Default buffer size for the watch channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// A store wrapper that emits events after successful writes.
///
/// Events are emitted **after** the operation succeeds, so every event
/// corresponds to an actual change in the store.
pub struct EventedStore<S: ObjectStore> {
    /// The inner store implementation.
    inner: S,
    sender: broadcast::Sender<StoreEvent>,
}

impl<S: ObjectStore> EventedStore<S> {
    /// Create a new evented store wrapper.
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { inner, sender }
    }

    /// Get a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Subscribe to store changes made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn emit(&self, event_type: StoreEventType, object: &Object) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        let (Ok(gvk), Ok(key)) = (object.gvk(), object.key()) else {
            return;
        };
        debug!(
            backend = self.inner.backend_name(),
            event_type = %event_type,
            gvk = %gvk,
            key = %key,
            "Emitted store event"
        );
        let _ = self
            .sender
            .send(StoreEvent::new(event_type, gvk, key, object.clone()));
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for EventedStore<S> {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
    ) -> Result<Option<Object>, StorageError> {
        // Read operations don't emit events
        self.inner.get(gvk, key).await
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, StorageError> {
        self.inner.list(gvk, namespace).await
    }

    async fn create(&self, object: &Object) -> Result<Object, StorageError> {
        let created = self.inner.create(object).await?;
        self.emit(StoreEventType::Added, &created);
        Ok(created)
    }

    async fn update(&self, object: &Object) -> Result<Object, StorageError> {
        let updated = self.inner.update(object).await?;
        self.emit(StoreEventType::Modified, &updated);
        Ok(updated)
    }

    async fn update_status(&self, object: &Object) -> Result<Object, StorageError> {
        let updated = self.inner.update_status(object).await?;
        self.emit(StoreEventType::Modified, &updated);
        Ok(updated)
    }

    async fn delete(&self, object: &Object) -> Result<(), StorageError> {
        self.inner.delete(object).await?;
        self.emit(StoreEventType::Deleted, object);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<S: ObjectStore> std::fmt::Debug for EventedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedStore")
            .field("backend", &self.inner.backend_name())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
