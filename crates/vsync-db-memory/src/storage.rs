use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tracing::trace;
use vsync_core::{GroupVersionKind, Object, ObjectKey};
use vsync_storage::prelude::*;

/// Map key: object type plus namespaced identity.
pub type StorageKey = (GroupVersionKind, ObjectKey);

fn make_storage_key(object: &Object) -> StorageResult<StorageKey> {
    let gvk = object
        .gvk()
        .map_err(|e| StorageError::invalid_object(e.to_string()))?;
    let key = object
        .key()
        .map_err(|e| StorageError::invalid_object(e.to_string()))?;
    Ok((gvk, key))
}

/// In-memory object store using DashMap for concurrent access.
///
/// This store mimics the parts of an API server the reconciler relies on:
/// - uid, creation timestamp and resource version assignment on create
/// - optimistic concurrency on writes that carry a resource version
/// - `update` and `update_status` touching disjoint sections of the object
#[derive(Debug)]
pub struct InMemoryStore {
    name: &'static str,
    data: DashMap<StorageKey, Object>,
    /// Atomic counter for generating resource versions
    version_counter: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store. `name` shows up in logs (`physical`, `virtual`).
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            data: DashMap::new(),
            version_counter: AtomicU64::new(1),
        }
    }

    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    /// Number of stored objects across all types.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks the caller's resource version against the stored one.
    fn check_version(
        kind: &str,
        key: &ObjectKey,
        incoming: &Object,
        current: &Object,
    ) -> StorageResult<()> {
        match (
            incoming.metadata.resource_version.as_deref(),
            current.metadata.resource_version.as_deref(),
        ) {
            (Some(expected), Some(actual)) if expected != actual => {
                Err(StorageError::conflict(kind, key, expected, actual))
            }
            _ => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
    ) -> StorageResult<Option<Object>> {
        Ok(self
            .data
            .get(&(gvk.clone(), key.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> StorageResult<Vec<Object>> {
        let mut objects: Vec<(ObjectKey, Object)> = self
            .data
            .iter()
            .filter(|entry| &entry.key().0 == gvk)
            .filter(|entry| namespace.is_none_or(|ns| entry.key().1.namespace == ns))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        objects.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(objects.into_iter().map(|(_, obj)| obj).collect())
    }

    async fn create(&self, object: &Object) -> StorageResult<Object> {
        let storage_key = make_storage_key(object)?;
        let (gvk, key) = storage_key.clone();

        match self.data.entry(storage_key) {
            Entry::Occupied(_) => Err(StorageError::already_exists(&gvk.kind, &key)),
            Entry::Vacant(slot) => {
                let mut stored = object.clone();
                stored.metadata.uid = Some(uuid::Uuid::new_v4().to_string());
                stored.metadata.resource_version = Some(self.next_version());
                stored.metadata.creation_timestamp = Some(OffsetDateTime::now_utc());
                slot.insert(stored.clone());
                trace!(store = self.name, kind = %gvk.kind, key = %key, "Created object");
                Ok(stored)
            }
        }
    }

    async fn update(&self, object: &Object) -> StorageResult<Object> {
        let storage_key = make_storage_key(object)?;
        let (gvk, key) = storage_key.clone();

        let mut current = self
            .data
            .get_mut(&storage_key)
            .ok_or_else(|| StorageError::not_found(&gvk.kind, &key))?;
        Self::check_version(&gvk.kind, &key, object, &current)?;

        let mut stored = object.clone();
        stored.status = current.status.clone();
        stored.metadata.uid = current.metadata.uid.clone();
        stored.metadata.creation_timestamp = current.metadata.creation_timestamp;
        stored.metadata.resource_version = Some(self.next_version());
        *current = stored.clone();
        trace!(store = self.name, kind = %gvk.kind, key = %key, "Updated object");
        Ok(stored)
    }

    async fn update_status(&self, object: &Object) -> StorageResult<Object> {
        let storage_key = make_storage_key(object)?;
        let (gvk, key) = storage_key.clone();

        let mut current = self
            .data
            .get_mut(&storage_key)
            .ok_or_else(|| StorageError::not_found(&gvk.kind, &key))?;
        Self::check_version(&gvk.kind, &key, object, &current)?;

        current.status = object.status.clone();
        current.metadata.resource_version = Some(self.next_version());
        trace!(store = self.name, kind = %gvk.kind, key = %key, "Updated object status");
        Ok(current.clone())
    }

    async fn delete(&self, object: &Object) -> StorageResult<()> {
        let storage_key = make_storage_key(object)?;
        let (gvk, key) = storage_key.clone();

        match self.data.remove(&storage_key) {
            Some(_) => {
                trace!(store = self.name, kind = %gvk.kind, key = %key, "Deleted object");
                Ok(())
            }
            None => Err(StorageError::not_found(&gvk.kind, &key)),
        }
    }

    fn backend_name(&self) -> &'static str {
        self.name
    }
}
