//! Group/version/kind identification of object types.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Fully qualified type of an object.
///
/// An empty `group` denotes the core API group, whose apiVersion is the bare
/// version string (`v1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Parses an `apiVersion` string (`group/version` or `version`) together with a kind.
    pub fn from_api_version_and_kind(api_version: &str, kind: &str) -> Result<Self> {
        if kind.is_empty() {
            return Err(CoreError::invalid_kind(kind));
        }
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        let missing_group = api_version.contains('/') && group.is_empty();
        if version.is_empty() || version.contains('/') || missing_group {
            return Err(CoreError::invalid_api_version(api_version));
        }
        Ok(Self::new(group, version, kind))
    }

    /// Returns the `apiVersion` string for this type.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_api_version() {
        let gvk = GroupVersionKind::from_api_version_and_kind("serving.knative.dev/v1", "Revision")
            .unwrap();
        assert_eq!(gvk.group, "serving.knative.dev");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Revision");
        assert_eq!(gvk.api_version(), "serving.knative.dev/v1");
    }

    #[test]
    fn test_parse_core_api_version() {
        let gvk = GroupVersionKind::from_api_version_and_kind("v1", "ConfigMap").unwrap();
        assert!(gvk.group.is_empty());
        assert_eq!(gvk.api_version(), "v1");
        assert_eq!(gvk.to_string(), "v1, Kind=ConfigMap");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(GroupVersionKind::from_api_version_and_kind("a/b/c", "X").is_err());
        assert!(GroupVersionKind::from_api_version_and_kind("/v1", "X").is_err());
        assert!(GroupVersionKind::from_api_version_and_kind("apps/", "X").is_err());
        assert!(GroupVersionKind::from_api_version_and_kind("", "X").is_err());
        assert!(GroupVersionKind::from_api_version_and_kind("v1", "").is_err());
    }
}
