//! Shared fixtures for the reconciler integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use vsync_core::{BroadcastEventRecorder, GroupVersionKind, Object, ObjectKey, OwnerReference};
use vsync_db_memory::InMemoryStore;
use vsync_storage::{ObjectStore, StorageError};
use vsync_syncer::config::NamespaceMapping;
use vsync_syncer::registry::kinds;
use vsync_syncer::{IdentityResolver, KindRegistry, Marker, NamespacedTranslator, RevisionSyncer};

pub const PHYSICAL_NS: &str = "vc-1-default";
pub const VIRTUAL_NS: &str = "default";
pub const INSTANCE: &str = "vc-1";
pub const MARKER_LABEL: &str = "vsync.dev/managed-by";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl OpKind {
    pub fn is_write(&self) -> bool {
        !matches!(self, OpKind::Get | OpKind::List)
    }
}

/// In-memory store that records calls and can inject failures.
#[derive(Debug)]
pub struct RecordingStore {
    inner: InMemoryStore,
    ops: Mutex<Vec<(OpKind, String)>>,
    failing: Mutex<HashSet<OpKind>>,
    hanging: Mutex<HashSet<OpKind>>,
}

impl RecordingStore {
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: InMemoryStore::new(name),
            ops: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_on(&self, kind: OpKind) {
        self.failing.lock().insert(kind);
    }

    pub fn hang_on(&self, kind: OpKind) {
        self.hanging.lock().insert(kind);
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
        self.hanging.lock().clear();
    }

    /// Write operations issued so far, as (kind, key).
    pub fn writes(&self) -> Vec<(OpKind, String)> {
        self.ops
            .lock()
            .iter()
            .filter(|(kind, _)| kind.is_write())
            .cloned()
            .collect()
    }

    pub fn write_kinds(&self) -> Vec<OpKind> {
        self.writes().into_iter().map(|(kind, _)| kind).collect()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Seeds an object without recording the write.
    pub async fn seed(&self, object: &Object) -> Object {
        self.inner.create(object).await.unwrap()
    }

    pub async fn fetch(&self, key: &ObjectKey) -> Option<Object> {
        self.inner.get(&kinds::revision_gvk(), key).await.unwrap()
    }

    async fn enter(&self, kind: OpKind, key: String) -> Result<(), StorageError> {
        self.ops.lock().push((kind, key));
        let hang = self.hanging.lock().contains(&kind);
        if hang {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().contains(&kind) {
            return Err(StorageError::unavailable("injected failure"));
        }
        Ok(())
    }
}

fn describe(object: &Object) -> String {
    object
        .key()
        .map(|k| k.to_string())
        .unwrap_or_else(|_| "<unnamed>".to_string())
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
    ) -> Result<Option<Object>, StorageError> {
        self.enter(OpKind::Get, key.to_string()).await?;
        self.inner.get(gvk, key).await
    }

    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, StorageError> {
        self.enter(OpKind::List, namespace.unwrap_or_default().to_string())
            .await?;
        self.inner.list(gvk, namespace).await
    }

    async fn create(&self, object: &Object) -> Result<Object, StorageError> {
        self.enter(OpKind::Create, describe(object)).await?;
        self.inner.create(object).await
    }

    async fn update(&self, object: &Object) -> Result<Object, StorageError> {
        self.enter(OpKind::Update, describe(object)).await?;
        self.inner.update(object).await
    }

    async fn update_status(&self, object: &Object) -> Result<Object, StorageError> {
        self.enter(OpKind::UpdateStatus, describe(object)).await?;
        self.inner.update_status(object).await
    }

    async fn delete(&self, object: &Object) -> Result<(), StorageError> {
        self.enter(OpKind::Delete, describe(object)).await?;
        self.inner.delete(object).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

pub struct Harness {
    pub physical: Arc<RecordingStore>,
    pub virtual_store: Arc<RecordingStore>,
    pub recorder: Arc<BroadcastEventRecorder>,
    pub syncer: RevisionSyncer,
}

pub fn harness() -> Harness {
    harness_with_suffix(None)
}

pub fn harness_with_suffix(suffix: Option<&str>) -> Harness {
    let physical = Arc::new(RecordingStore::new("physical"));
    let virtual_store = Arc::new(RecordingStore::new("virtual"));
    let recorder = BroadcastEventRecorder::new_shared();
    let resolver = IdentityResolver::new(
        [NamespaceMapping::new(PHYSICAL_NS, VIRTUAL_NS)],
        suffix.map(str::to_string),
    )
    .unwrap();
    let translator = NamespacedTranslator::new(
        Arc::new(resolver),
        Marker::new(MARKER_LABEL, INSTANCE),
        recorder.clone(),
    );
    let syncer = RevisionSyncer::new(
        physical.clone(),
        virtual_store.clone(),
        Arc::new(translator),
        KindRegistry::global(),
    );
    Harness {
        physical,
        virtual_store,
        recorder,
        syncer,
    }
}

pub fn revision(namespace: &str, name: &str, image: &str) -> Object {
    Object::new(&kinds::revision_gvk())
        .with_key(&ObjectKey::new(namespace, name))
        .with_spec(json!({"containers": [{"image": image}]}))
}

/// A physical Revision carrying the instance marker.
pub fn managed_revision(name: &str, image: &str) -> Object {
    revision(PHYSICAL_NS, name, image).with_label(MARKER_LABEL, INSTANCE)
}

pub fn configuration(namespace: &str, name: &str, marker: Option<&str>) -> Object {
    let obj = Object::new(&kinds::configuration_gvk())
        .with_key(&ObjectKey::new(namespace, name))
        .with_spec(json!({"template": {}}));
    match marker {
        Some(value) => obj.with_label(MARKER_LABEL, value),
        None => obj,
    }
}

pub fn configuration_owner(name: &str) -> OwnerReference {
    OwnerReference::new("serving.knative.dev/v1", "Configuration", name).with_controller(true)
}

pub fn image_of(object: &Object) -> Value {
    object.spec["containers"][0]["image"].clone()
}
