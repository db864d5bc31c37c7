//! Reverse lookup from a physical owner to the physical objects it owns.
//!
//! When a Configuration gains or loses the marker, the scope of every
//! Revision it owns changes with it. The controller uses this index to
//! re-enqueue those Revisions.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use vsync_core::{GroupVersionKind, Object, ObjectKey};

use crate::identity::IdentityResolver;

#[derive(Debug)]
pub struct OwnershipIndex {
    owner_gvk: GroupVersionKind,
    resolver: Arc<IdentityResolver>,
    by_owner: DashMap<ObjectKey, BTreeSet<ObjectKey>>,
    by_dependent: DashMap<ObjectKey, Vec<ObjectKey>>,
}

impl OwnershipIndex {
    pub fn new(owner_gvk: GroupVersionKind, resolver: Arc<IdentityResolver>) -> Self {
        Self {
            owner_gvk,
            resolver,
            by_owner: DashMap::new(),
            by_dependent: DashMap::new(),
        }
    }

    pub fn owner_gvk(&self) -> &GroupVersionKind {
        &self.owner_gvk
    }

    /// Keys of the owners of the indexed type named by `object`.
    ///
    /// Objects outside the mapped physical namespaces yield nothing.
    pub fn owner_keys(&self, object: &Object) -> Vec<ObjectKey> {
        let Some(namespace) = object.namespace() else {
            return Vec::new();
        };
        if !self.resolver.is_source_namespace(namespace) {
            return Vec::new();
        }
        object
            .metadata
            .owner_references
            .iter()
            .filter(|owner| owner.gvk().is_ok_and(|gvk| gvk == self.owner_gvk))
            .map(|owner| ObjectKey::new(namespace, owner.name.as_str()))
            .collect()
    }

    /// Records the current owners of `object`, replacing what was indexed before.
    pub fn upsert(&self, object: &Object) {
        let Ok(key) = object.key() else {
            return;
        };
        self.remove(&key);

        let owners = self.owner_keys(object);
        if owners.is_empty() {
            return;
        }
        for owner in &owners {
            self.by_owner
                .entry(owner.clone())
                .or_default()
                .insert(key.clone());
        }
        self.by_dependent.insert(key, owners);
    }

    pub fn remove(&self, dependent: &ObjectKey) {
        let Some((_, owners)) = self.by_dependent.remove(dependent) else {
            return;
        };
        for owner in owners {
            if let Some(mut set) = self.by_owner.get_mut(&owner) {
                set.remove(dependent);
            }
            self.by_owner.remove_if(&owner, |_, set| set.is_empty());
        }
    }

    /// Drops every indexed dependent not in `live`.
    pub fn retain(&self, live: &HashSet<ObjectKey>) {
        let stale: Vec<ObjectKey> = self
            .by_dependent
            .iter()
            .filter(|entry| !live.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.remove(key);
        }
    }

    /// Indexed dependents of `owner`, sorted.
    pub fn dependents(&self, owner: &ObjectKey) -> Vec<ObjectKey> {
        self.by_owner
            .get(owner)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_dependent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dependent.is_empty()
    }
}
