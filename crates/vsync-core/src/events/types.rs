//! Event types recorded against objects during synchronization.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::object::Object;

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal reference to the object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObject {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl From<&Object> for InvolvedObject {
    fn from(obj: &Object) -> Self {
        Self {
            api_version: obj.api_version.clone(),
            kind: obj.kind.clone(),
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            name: obj.metadata.name.clone().unwrap_or_default(),
            uid: obj.metadata.uid.clone(),
        }
    }
}

/// An event recorded against an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: EventType,
    /// Short machine-readable cause, e.g. `SyncError`
    pub reason: String,
    pub message: String,
    pub involved_object: InvolvedObject,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Event {
    pub fn new(
        event_type: EventType,
        involved_object: InvolvedObject,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            reason: reason.into(),
            message: message.into(),
            involved_object,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn warning(obj: &Object, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventType::Warning, obj.into(), reason, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GroupVersionKind, ObjectKey};

    #[test]
    fn test_warning_event_references_object() {
        let gvk = GroupVersionKind::new("serving.knative.dev", "v1", "Revision");
        let obj = Object::new(&gvk).with_key(&ObjectKey::new("default", "rev-1"));

        let event = Event::warning(&obj, "SyncError", "boom");
        assert_eq!(event.event_type, EventType::Warning);
        assert_eq!(event.reason, "SyncError");
        assert_eq!(event.involved_object.kind, "Revision");
        assert_eq!(event.involved_object.namespace, "default");
        assert_eq!(event.involved_object.name, "rev-1");
    }
}
