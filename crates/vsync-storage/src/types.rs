//! Watch event types emitted by evented stores.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use vsync_core::{GroupVersionKind, Object, ObjectKey};

/// Type of store change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreEventType {
    Added,
    Modified,
    Deleted,
}

impl StoreEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreEventType::Added => "added",
            StoreEventType::Modified => "modified",
            StoreEventType::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for StoreEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change observed on one store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub event_type: StoreEventType,
    pub gvk: GroupVersionKind,
    pub key: ObjectKey,
    /// The object after the change; the last known state for deletions
    pub object: Object,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl StoreEvent {
    pub fn new(
        event_type: StoreEventType,
        gvk: GroupVersionKind,
        key: ObjectKey,
        object: Object,
    ) -> Self {
        Self {
            event_type,
            gvk,
            key,
            object,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Check if this event is about objects of the given type.
    pub fn matches_gvk(&self, gvk: &GroupVersionKind) -> bool {
        &self.gvk == gvk
    }
}
