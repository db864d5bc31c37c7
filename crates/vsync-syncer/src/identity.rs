//! Mapping between physical (source) and virtual (target) object identities.

use std::collections::BTreeMap;

use vsync_core::ObjectKey;

use crate::config::{MappingConfig, NamespaceMapping};
use crate::error::{SyncError, SyncResult};

/// Longest object name either store accepts.
pub const MAX_NAME_LENGTH: usize = 253;

/// Pure, bidirectional identity mapping.
///
/// Physical namespaces map one-to-one onto virtual namespaces. When a name
/// suffix is configured, physical names are `<virtual name>-<suffix>`.
/// For every key `k` that resolves, `to_source(to_target(k)) == k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    to_virtual: BTreeMap<String, String>,
    to_physical: BTreeMap<String, String>,
    name_suffix: Option<String>,
}

impl IdentityResolver {
    pub fn new(
        mappings: impl IntoIterator<Item = NamespaceMapping>,
        name_suffix: Option<String>,
    ) -> SyncResult<Self> {
        let mut to_virtual = BTreeMap::new();
        let mut to_physical = BTreeMap::new();
        for mapping in mappings {
            if mapping.physical.is_empty() || mapping.virtual_.is_empty() {
                return Err(SyncError::config("namespace mapping entries must not be empty"));
            }
            if to_virtual
                .insert(mapping.physical.clone(), mapping.virtual_.clone())
                .is_some()
            {
                return Err(SyncError::config(format!(
                    "physical namespace {} is mapped twice",
                    mapping.physical
                )));
            }
            if to_physical
                .insert(mapping.virtual_.clone(), mapping.physical)
                .is_some()
            {
                return Err(SyncError::config(format!(
                    "virtual namespace {} is mapped twice",
                    mapping.virtual_
                )));
            }
        }
        if matches!(name_suffix.as_deref(), Some("")) {
            return Err(SyncError::config("name suffix must not be empty"));
        }
        Ok(Self {
            to_virtual,
            to_physical,
            name_suffix,
        })
    }

    pub fn from_config(mapping: &MappingConfig) -> SyncResult<Self> {
        Self::new(mapping.namespaces.iter().cloned(), mapping.name_suffix.clone())
    }

    /// Maps a physical key to the virtual key of its mirror.
    pub fn to_target(&self, source: &ObjectKey) -> SyncResult<ObjectKey> {
        let namespace = self.to_virtual.get(&source.namespace).ok_or_else(|| {
            SyncError::identity_unresolvable(source, "physical namespace is not mapped")
        })?;

        let name = match &self.name_suffix {
            None => source.name.clone(),
            Some(suffix) => {
                let stripped = source
                    .name
                    .strip_suffix(suffix.as_str())
                    .and_then(|rest| rest.strip_suffix('-'))
                    .ok_or_else(|| {
                        SyncError::identity_unresolvable(
                            source,
                            format!("name does not end with -{suffix}"),
                        )
                    })?;
                if stripped.is_empty() {
                    return Err(SyncError::identity_unresolvable(
                        source,
                        "name is only the suffix",
                    ));
                }
                stripped.to_string()
            }
        };

        Ok(ObjectKey::new(namespace.clone(), name))
    }

    /// Maps a virtual key back to the physical key it mirrors.
    pub fn to_source(&self, target: &ObjectKey) -> SyncResult<ObjectKey> {
        let namespace = self.to_physical.get(&target.namespace).ok_or_else(|| {
            SyncError::identity_unresolvable(target, "virtual namespace is not mapped")
        })?;
        if target.name.is_empty() {
            return Err(SyncError::identity_unresolvable(target, "name is empty"));
        }

        let name = match &self.name_suffix {
            None => target.name.clone(),
            Some(suffix) => format!("{}-{suffix}", target.name),
        };
        if name.len() > MAX_NAME_LENGTH {
            return Err(SyncError::identity_unresolvable(
                target,
                format!("physical name exceeds {MAX_NAME_LENGTH} characters"),
            ));
        }

        Ok(ObjectKey::new(namespace.clone(), name))
    }

    pub fn is_source_namespace(&self, namespace: &str) -> bool {
        self.to_virtual.contains_key(namespace)
    }

    pub fn source_namespaces(&self) -> impl Iterator<Item = &str> {
        self.to_virtual.keys().map(String::as_str)
    }

    pub fn target_namespaces(&self) -> impl Iterator<Item = &str> {
        self.to_physical.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(suffix: Option<&str>) -> IdentityResolver {
        IdentityResolver::new(
            [
                NamespaceMapping::new("vc-1-team-a", "team-a"),
                NamespaceMapping::new("vc-1-team-b", "team-b"),
            ],
            suffix.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_namespace_only_mapping() {
        let r = resolver(None);
        let source = ObjectKey::new("vc-1-team-a", "rev-1");
        let target = r.to_target(&source).unwrap();
        assert_eq!(target, ObjectKey::new("team-a", "rev-1"));
        assert_eq!(r.to_source(&target).unwrap(), source);
    }

    #[test]
    fn test_suffix_mapping_round_trips() {
        let r = resolver(Some("x-vc-1"));
        let source = ObjectKey::new("vc-1-team-b", "hello-00001-x-vc-1");
        let target = r.to_target(&source).unwrap();
        assert_eq!(target, ObjectKey::new("team-b", "hello-00001"));
        assert_eq!(r.to_source(&target).unwrap(), source);
    }

    #[test]
    fn test_unresolvable_keys() {
        let r = resolver(Some("x-vc-1"));
        let cases = [
            ObjectKey::new("kube-system", "rev-1-x-vc-1"),
            ObjectKey::new("vc-1-team-a", "rev-1"),
            ObjectKey::new("vc-1-team-a", "rev-1_x-vc-1"),
            ObjectKey::new("vc-1-team-a", "-x-vc-1"),
        ];
        for key in cases {
            let err = r.to_target(&key).unwrap_err();
            assert!(err.is_identity_unresolvable(), "{key} should not resolve");
        }

        assert!(r.to_source(&ObjectKey::new("other", "rev-1")).is_err());
        let long = "a".repeat(MAX_NAME_LENGTH);
        assert!(r.to_source(&ObjectKey::new("team-a", long)).is_err());
    }

    #[test]
    fn test_mapping_must_be_injective() {
        let err = IdentityResolver::new(
            [NamespaceMapping::new("p", "a"), NamespaceMapping::new("q", "a")],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(IdentityResolver::new(Vec::new(), Some(String::new())).is_err());
    }

    #[test]
    fn test_source_namespaces() {
        let r = resolver(None);
        assert!(r.is_source_namespace("vc-1-team-a"));
        assert!(!r.is_source_namespace("team-a"));
        assert_eq!(r.source_namespaces().count(), 2);
        assert_eq!(r.target_namespaces().collect::<Vec<_>>(), vec!["team-a", "team-b"]);
    }
}
