//! Translation of physical objects into their virtual mirrors.

use std::sync::Arc;

use vsync_core::{EventRecorder, Object, ObjectMeta};

use crate::error::SyncResult;
use crate::identity::IdentityResolver;
use crate::registry::KindRegistry;

/// Annotation on a virtual copy naming its physical counterpart.
pub const OBJECT_NAME_ANNOTATION: &str = "vsync.dev/object-name";
/// Annotation on a virtual copy naming its physical counterpart's namespace.
pub const OBJECT_NAMESPACE_ANNOTATION: &str = "vsync.dev/object-namespace";

/// Label key and expected value identifying objects of one virtual instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub label: String,
    pub value: String,
}

impl Marker {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn is_present_on(&self, object: &Object) -> bool {
        object.metadata.has_label_value(&self.label, &self.value)
    }
}

/// Generic per-type behavior the engine delegates to.
pub trait Translator: Send + Sync {
    fn marker(&self) -> &Marker;

    /// Direct management check; ancestry is the classifier's concern.
    fn is_managed(&self, object: &Object) -> bool {
        self.marker().is_present_on(object)
    }

    /// Builds the virtual copy of a physical object.
    fn reverse_translate(&self, physical: &Object) -> SyncResult<Object>;

    fn event_recorder(&self) -> &dyn EventRecorder;

    fn resolver(&self) -> &IdentityResolver;
}

/// Translator for namespaced types mapped through an [`IdentityResolver`].
pub struct NamespacedTranslator {
    resolver: Arc<IdentityResolver>,
    marker: Marker,
    recorder: Arc<dyn EventRecorder>,
}

impl NamespacedTranslator {
    pub fn new(
        resolver: Arc<IdentityResolver>,
        marker: Marker,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            resolver,
            marker,
            recorder,
        }
    }
}

impl Translator for NamespacedTranslator {
    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn reverse_translate(&self, physical: &Object) -> SyncResult<Object> {
        let source_key = physical.key()?;
        let target_key = self.resolver.to_target(&source_key)?;

        // Server-assigned metadata and owner references start empty
        let mut copy =
            KindRegistry::global().new_object(&physical.api_version, &physical.kind)?;

        let mut labels = physical.metadata.labels.clone();
        labels.remove(&self.marker.label);
        let mut annotations = physical.metadata.annotations.clone();
        annotations.insert(OBJECT_NAME_ANNOTATION.to_string(), source_key.name);
        annotations.insert(OBJECT_NAMESPACE_ANNOTATION.to_string(), source_key.namespace);

        copy.metadata = ObjectMeta {
            name: Some(target_key.name),
            namespace: Some(target_key.namespace),
            labels,
            annotations,
            ..ObjectMeta::default()
        };
        copy.spec = physical.spec.clone();
        copy.status = physical.status.clone();
        Ok(copy)
    }

    fn event_recorder(&self) -> &dyn EventRecorder {
        self.recorder.as_ref()
    }

    fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }
}

impl std::fmt::Debug for NamespacedTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedTranslator")
            .field("resolver", &self.resolver)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceMapping;
    use serde_json::json;
    use vsync_core::{BroadcastEventRecorder, GroupVersionKind, ObjectKey, OwnerReference};

    fn translator() -> NamespacedTranslator {
        let resolver =
            IdentityResolver::new([NamespaceMapping::new("vc-1-default", "default")], None)
                .unwrap();
        NamespacedTranslator::new(
            Arc::new(resolver),
            Marker::new("vsync.dev/managed-by", "vc-1"),
            BroadcastEventRecorder::new_shared(),
        )
    }

    fn physical_revision() -> Object {
        let mut obj = Object::new(&GroupVersionKind::new("serving.knative.dev", "v1", "Revision"))
            .with_key(&ObjectKey::new("vc-1-default", "rev-1"))
            .with_label("vsync.dev/managed-by", "vc-1")
            .with_label("app", "hello")
            .with_owner(OwnerReference::new(
                "serving.knative.dev/v1",
                "Configuration",
                "hello",
            ))
            .with_spec(json!({"image": "a:1"}))
            .with_status(json!({"ready": true}));
        obj.metadata.uid = Some("uid-1".into());
        obj.metadata.resource_version = Some("42".into());
        obj.metadata.managed_fields = vec![json!({"manager": "kubectl"})];
        obj
    }

    #[test]
    fn test_marker_requires_expected_value() {
        let t = translator();
        assert!(t.is_managed(&physical_revision()));

        let other = physical_revision().with_label("vsync.dev/managed-by", "vc-2");
        assert!(!t.is_managed(&other));
    }

    #[test]
    fn test_reverse_translate_rewrites_metadata() {
        let t = translator();
        let copy = t.reverse_translate(&physical_revision()).unwrap();

        assert_eq!(copy.key().unwrap(), ObjectKey::new("default", "rev-1"));
        assert!(copy.metadata.uid.is_none());
        assert!(copy.metadata.resource_version.is_none());
        assert!(copy.metadata.managed_fields.is_empty());
        assert!(copy.metadata.owner_references.is_empty());
        assert_eq!(copy.metadata.label("vsync.dev/managed-by"), None);
        assert_eq!(copy.metadata.label("app"), Some("hello"));
        assert_eq!(copy.metadata.annotation(OBJECT_NAME_ANNOTATION), Some("rev-1"));
        assert_eq!(
            copy.metadata.annotation(OBJECT_NAMESPACE_ANNOTATION),
            Some("vc-1-default")
        );
        assert_eq!(copy.spec, json!({"image": "a:1"}));
        assert_eq!(copy.status, json!({"ready": true}));
    }

    #[test]
    fn test_reverse_translate_rejects_unregistered_kind() {
        let t = translator();
        let mut obj = physical_revision();
        obj.api_version = "example.com/v1".into();
        obj.kind = "Widget".into();
        let err = t.reverse_translate(&obj).unwrap_err();
        assert!(matches!(err, crate::error::SyncError::UnknownKind(_)));
    }

    #[test]
    fn test_reverse_translate_outside_mapping_fails() {
        let t = translator();
        let obj = physical_revision().with_key(&ObjectKey::new("kube-system", "rev-1"));
        let err = t.reverse_translate(&obj).unwrap_err();
        assert!(err.is_identity_unresolvable());
    }
}
