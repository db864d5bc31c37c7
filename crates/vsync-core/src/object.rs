use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::error::{CoreError, Result};
use crate::gvk::GroupVersionKind;
use crate::key::ObjectKey;

/// Reference from an object to its logical parent in the same store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

impl OwnerReference {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            uid: None,
            controller: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_controller(mut self, controller: bool) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn gvk(&self) -> Result<GroupVersionKind> {
        GroupVersionKind::from_api_version_and_kind(&self.api_version, &self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub creation_timestamp: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_fields: Vec<Value>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Returns true if `key` is present with exactly `value`.
    pub fn has_label_value(&self, key: &str, value: &str) -> bool {
        self.label(key) == Some(value)
    }
}

/// A store object: type, metadata and the two independently synced sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub status: Value,
}

impl Object {
    pub fn new(gvk: &GroupVersionKind) -> Self {
        Self {
            api_version: gvk.api_version(),
            kind: gvk.kind.clone(),
            metadata: ObjectMeta::default(),
            spec: Value::Null,
            status: Value::Null,
        }
    }

    pub fn with_key(mut self, key: &ObjectKey) -> Self {
        self.metadata.name = Some(key.name.clone());
        self.metadata.namespace = Some(key.namespace.clone());
        self
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_status(mut self, status: Value) -> Self {
        self.status = status;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.metadata.owner_references.push(owner);
        self
    }

    pub fn gvk(&self) -> Result<GroupVersionKind> {
        GroupVersionKind::from_api_version_and_kind(&self.api_version, &self.kind)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    /// Returns the store identity of this object.
    ///
    /// A missing namespace is treated as cluster scope; a missing name is an error.
    pub fn key(&self) -> Result<ObjectKey> {
        let name = self
            .metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::missing_metadata("name"))?;
        Ok(ObjectKey::new(
            self.metadata.namespace.clone().unwrap_or_default(),
            name,
        ))
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_round_trip_uses_camel_case() {
        let value = json!({
            "apiVersion": "serving.knative.dev/v1",
            "kind": "Revision",
            "metadata": {
                "name": "rev-1",
                "namespace": "default",
                "resourceVersion": "7",
                "ownerReferences": [
                    {"apiVersion": "serving.knative.dev/v1", "kind": "Configuration", "name": "cfg"}
                ]
            },
            "spec": {"image": "a:1"}
        });

        let obj = Object::from_value(value.clone()).unwrap();
        assert_eq!(obj.metadata.resource_version.as_deref(), Some("7"));
        assert_eq!(obj.metadata.owner_references[0].kind, "Configuration");
        assert!(obj.status.is_null());
        assert_eq!(obj.to_value().unwrap(), value);
    }

    #[test]
    fn test_key_requires_name() {
        let gvk = GroupVersionKind::new("serving.knative.dev", "v1", "Revision");
        let obj = Object::new(&gvk);
        assert!(matches!(
            obj.key(),
            Err(CoreError::MissingMetadata { field: "name" })
        ));

        let obj = obj.with_key(&ObjectKey::new("default", "rev-1"));
        assert_eq!(obj.key().unwrap(), ObjectKey::new("default", "rev-1"));
    }

    #[test]
    fn test_label_value_check() {
        let meta = ObjectMeta {
            labels: BTreeMap::from([("vsync.dev/managed-by".to_string(), "vc-1".to_string())]),
            ..ObjectMeta::default()
        };
        assert!(meta.has_label_value("vsync.dev/managed-by", "vc-1"));
        assert!(!meta.has_label_value("vsync.dev/managed-by", "vc-2"));
        assert!(!meta.has_label_value("other", "vc-1"));
    }
}
