//! Registry of object types the reconciler can instantiate.
//!
//! Owner references name their parent by (apiVersion, kind). Before the
//! classifier can fetch a parent it must know the type exists and whether it
//! lives in a namespace. A miss is a recoverable [`SyncError::UnknownKind`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use vsync_core::{GroupVersionKind, Object};

use crate::error::{SyncError, SyncResult};

/// Known API types used by the reconciler.
pub mod kinds {
    use vsync_core::{GroupVersionKind, Object};

    pub const SERVING_GROUP: &str = "serving.knative.dev";

    pub fn revision_gvk() -> GroupVersionKind {
        GroupVersionKind::new(SERVING_GROUP, "v1", "Revision")
    }

    pub fn configuration_gvk() -> GroupVersionKind {
        GroupVersionKind::new(SERVING_GROUP, "v1", "Configuration")
    }

    pub fn service_gvk() -> GroupVersionKind {
        GroupVersionKind::new(SERVING_GROUP, "v1", "Service")
    }

    pub fn route_gvk() -> GroupVersionKind {
        GroupVersionKind::new(SERVING_GROUP, "v1", "Route")
    }

    pub fn config_map_gvk() -> GroupVersionKind {
        GroupVersionKind::new("", "v1", "ConfigMap")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindInfo {
    pub gvk: GroupVersionKind,
    pub namespaced: bool,
}

#[derive(Debug, Default)]
pub struct KindRegistryBuilder {
    kinds: HashMap<GroupVersionKind, KindInfo>,
}

impl KindRegistryBuilder {
    pub fn register(mut self, gvk: GroupVersionKind, namespaced: bool) -> Self {
        self.kinds
            .insert(gvk.clone(), KindInfo { gvk, namespaced });
        self
    }

    pub fn build(self) -> KindRegistry {
        KindRegistry { kinds: self.kinds }
    }
}

/// Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct KindRegistry {
    kinds: HashMap<GroupVersionKind, KindInfo>,
}

static GLOBAL: OnceLock<Arc<KindRegistry>> = OnceLock::new();

impl KindRegistry {
    pub fn builder() -> KindRegistryBuilder {
        KindRegistryBuilder::default()
    }

    pub fn with_defaults() -> Self {
        Self::builder()
            .register(kinds::service_gvk(), true)
            .register(kinds::configuration_gvk(), true)
            .register(kinds::revision_gvk(), true)
            .register(kinds::route_gvk(), true)
            .register(kinds::config_map_gvk(), true)
            .build()
    }

    /// Process-wide default registry, built on first use.
    pub fn global() -> Arc<KindRegistry> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::with_defaults()))
            .clone()
    }

    pub fn get(&self, gvk: &GroupVersionKind) -> Option<&KindInfo> {
        self.kinds.get(gvk)
    }

    pub fn contains(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(gvk)
    }

    pub fn resolve(&self, api_version: &str, kind: &str) -> SyncResult<&KindInfo> {
        let gvk = GroupVersionKind::from_api_version_and_kind(api_version, kind)
            .map_err(|_| SyncError::unknown_kind(api_version, kind))?;
        self.kinds
            .get(&gvk)
            .ok_or_else(|| SyncError::unknown_kind(api_version, kind))
    }

    /// Creates an empty object of a registered type.
    pub fn new_object(&self, api_version: &str, kind: &str) -> SyncResult<Object> {
        self.resolve(api_version, kind).map(|info| Object::new(&info.gvk))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
