//! Decides whether a physical object belongs to this virtual instance.

use std::sync::Arc;

use tracing::{debug, info, warn};
use vsync_core::{Object, ObjectKey, OwnerReference};
use vsync_storage::DynStore;

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::registry::KindRegistry;
use crate::translator::Translator;

/// How an object came to be in scope, if it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The object carries the marker itself.
    Direct,
    /// A parent named by this owner reference carries the marker.
    Inherited(OwnerReference),
    Unmanaged,
}

impl Scope {
    pub fn is_managed(&self) -> bool {
        !matches!(self, Scope::Unmanaged)
    }
}

/// Marker check with a one-level walk up the owner references.
///
/// Owners are read from the physical store only. A reference that cannot be
/// resolved or fetched is skipped; it never fails the classification.
#[derive(Clone)]
pub struct ScopeClassifier {
    translator: Arc<dyn Translator>,
    physical: DynStore,
    registry: Arc<KindRegistry>,
}

impl ScopeClassifier {
    pub fn new(
        translator: Arc<dyn Translator>,
        physical: DynStore,
        registry: Arc<KindRegistry>,
    ) -> Self {
        Self {
            translator,
            physical,
            registry,
        }
    }

    pub async fn classify(&self, ctx: &SyncContext, object: &Object) -> SyncResult<Scope> {
        if self.translator.is_managed(object) {
            return Ok(Scope::Direct);
        }

        let key = object
            .key()
            .map_err(|e| SyncError::classification(e.to_string()))?;

        for owner in &object.metadata.owner_references {
            let info = match self.registry.resolve(&owner.api_version, &owner.kind) {
                Ok(info) => info,
                Err(e) => {
                    warn!(
                        owner_kind = %owner.kind,
                        owner_api_version = %owner.api_version,
                        key = %key,
                        error = %e,
                        "Skipping owner of unknown kind"
                    );
                    continue;
                }
            };

            let namespace = if info.namespaced {
                key.namespace.as_str()
            } else {
                ""
            };
            let owner_key = ObjectKey::new(namespace, owner.name.as_str());

            let parent = match ctx.run(self.physical.get(&info.gvk, &owner_key)).await {
                Ok(Some(parent)) => parent,
                Ok(None) => {
                    info!(
                        owner = %owner_key,
                        owner_kind = %owner.kind,
                        key = %key,
                        "Owner not found"
                    );
                    continue;
                }
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    info!(
                        owner = %owner_key,
                        owner_kind = %owner.kind,
                        key = %key,
                        error = %e,
                        "Owner lookup failed"
                    );
                    continue;
                }
            };

            if self.translator.is_managed(&parent) {
                debug!(
                    owner = %owner_key,
                    owner_kind = %owner.kind,
                    key = %key,
                    "Managed through owner"
                );
                return Ok(Scope::Inherited(owner.clone()));
            }
        }

        Ok(Scope::Unmanaged)
    }

    pub async fn is_managed(&self, ctx: &SyncContext, object: &Object) -> SyncResult<bool> {
        Ok(self.classify(ctx, object).await?.is_managed())
    }
}

impl std::fmt::Debug for ScopeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeClassifier")
            .field("physical", &self.physical.backend_name())
            .field("kinds", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceMapping;
    use crate::identity::IdentityResolver;
    use crate::registry::kinds;
    use crate::translator::{Marker, NamespacedTranslator};
    use serde_json::json;
    use vsync_core::{BroadcastEventRecorder, GroupVersionKind};
    use vsync_db_memory::InMemoryStore;
    use vsync_storage::ObjectStore;

    const MARKER: &str = "vsync.dev/managed-by";

    fn classifier(store: Arc<InMemoryStore>) -> ScopeClassifier {
        let resolver =
            IdentityResolver::new([NamespaceMapping::new("vc-1-default", "default")], None)
                .unwrap();
        let translator = NamespacedTranslator::new(
            Arc::new(resolver),
            Marker::new(MARKER, "vc-1"),
            BroadcastEventRecorder::new_shared(),
        );
        ScopeClassifier::new(Arc::new(translator), store, KindRegistry::global())
    }

    fn revision(owner: Option<OwnerReference>) -> Object {
        let obj = Object::new(&kinds::revision_gvk())
            .with_key(&ObjectKey::new("vc-1-default", "rev-1"))
            .with_spec(json!({"image": "a:1"}));
        match owner {
            Some(owner) => obj.with_owner(owner),
            None => obj,
        }
    }

    fn configuration(name: &str, marker: Option<&str>) -> Object {
        let obj = Object::new(&kinds::configuration_gvk())
            .with_key(&ObjectKey::new("vc-1-default", name));
        match marker {
            Some(value) => obj.with_label(MARKER, value),
            None => obj,
        }
    }

    fn config_owner(name: &str) -> OwnerReference {
        OwnerReference::new("serving.knative.dev/v1", "Configuration", name)
    }

    #[tokio::test]
    async fn test_direct_marker() {
        let c = classifier(Arc::new(InMemoryStore::new("physical")));
        let obj = revision(None).with_label(MARKER, "vc-1");
        let scope = c.classify(&SyncContext::new(), &obj).await.unwrap();
        assert_eq!(scope, Scope::Direct);
    }

    #[tokio::test]
    async fn test_inherited_from_marked_owner() {
        let store = Arc::new(InMemoryStore::new("physical"));
        store.create(&configuration("hello", Some("vc-1"))).await.unwrap();
        let c = classifier(store);

        let scope = c
            .classify(&SyncContext::new(), &revision(Some(config_owner("hello"))))
            .await
            .unwrap();
        assert_eq!(scope, Scope::Inherited(config_owner("hello")));
    }

    #[tokio::test]
    async fn test_unmarked_or_foreign_owner_is_unmanaged() {
        let store = Arc::new(InMemoryStore::new("physical"));
        store.create(&configuration("plain", None)).await.unwrap();
        store.create(&configuration("foreign", Some("vc-2"))).await.unwrap();
        let c = classifier(store);
        let ctx = SyncContext::new();

        let obj = revision(Some(config_owner("plain"))).with_owner(config_owner("foreign"));
        assert_eq!(c.classify(&ctx, &obj).await.unwrap(), Scope::Unmanaged);
        assert!(!c.is_managed(&ctx, &revision(None)).await.unwrap());
    }

    #[tokio::test]
    async fn test_first_matching_owner_wins() {
        let store = Arc::new(InMemoryStore::new("physical"));
        store.create(&configuration("a", Some("vc-1"))).await.unwrap();
        store.create(&configuration("b", Some("vc-1"))).await.unwrap();
        let c = classifier(store);

        let obj = revision(Some(config_owner("missing")))
            .with_owner(config_owner("b"))
            .with_owner(config_owner("a"));
        let scope = c.classify(&SyncContext::new(), &obj).await.unwrap();
        assert_eq!(scope, Scope::Inherited(config_owner("b")));
    }

    #[tokio::test]
    async fn test_unknown_owner_kind_is_skipped() {
        let store = Arc::new(InMemoryStore::new("physical"));
        store.create(&configuration("hello", Some("vc-1"))).await.unwrap();
        let c = classifier(store);

        let obj = revision(Some(OwnerReference::new("example.com/v1", "Widget", "w")))
            .with_owner(config_owner("hello"));
        let scope = c.classify(&SyncContext::new(), &obj).await.unwrap();
        assert!(scope.is_managed());
    }

    #[tokio::test]
    async fn test_missing_name_is_a_classification_error() {
        let c = classifier(Arc::new(InMemoryStore::new("physical")));
        let obj = Object::new(&GroupVersionKind::new("serving.knative.dev", "v1", "Revision"));
        let err = c.classify(&SyncContext::new(), &obj).await.unwrap_err();
        assert!(matches!(err, SyncError::Classification(_)));
    }
}
