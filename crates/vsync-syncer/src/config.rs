use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default label key marking physical objects that belong to a virtual instance.
pub const DEFAULT_MARKER_LABEL: &str = "vsync.dev/managed-by";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    #[serde(default)]
    pub instance: InstanceConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Instance validations
        if self.instance.name.is_empty() {
            return Err("instance.name must not be empty".into());
        }
        if self.instance.marker_label.is_empty() {
            return Err("instance.marker_label must not be empty".into());
        }
        // Mapping validations
        let mut physical = BTreeSet::new();
        let mut virtual_ = BTreeSet::new();
        for ns in &self.mapping.namespaces {
            if ns.physical.is_empty() || ns.virtual_.is_empty() {
                return Err("mapping.namespaces entries need both physical and virtual".into());
            }
            if !physical.insert(ns.physical.as_str()) {
                return Err(format!(
                    "mapping.namespaces maps physical namespace {} twice",
                    ns.physical
                ));
            }
            if !virtual_.insert(ns.virtual_.as_str()) {
                return Err(format!(
                    "mapping.namespaces maps virtual namespace {} twice",
                    ns.virtual_
                ));
            }
        }
        if matches!(self.mapping.name_suffix.as_deref(), Some("")) {
            return Err("mapping.name_suffix must not be empty when set".into());
        }
        // Controller validations
        if self.controller.workers == 0 {
            return Err("controller.workers must be > 0".into());
        }
        if self.controller.base_backoff_ms == 0 {
            return Err("controller.base_backoff_ms must be > 0".into());
        }
        if self.controller.base_backoff_ms > self.controller.max_backoff_ms {
            return Err("controller.base_backoff_ms must be <= controller.max_backoff_ms".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Name of the virtual instance; the marker label value must equal it.
    #[serde(default = "default_instance_name")]
    pub name: String,
    #[serde(default = "default_marker_label")]
    pub marker_label: String,
}

fn default_instance_name() -> String {
    "vsync".into()
}
fn default_marker_label() -> String {
    DEFAULT_MARKER_LABEL.into()
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: default_instance_name(),
            marker_label: default_marker_label(),
        }
    }
}

/// One physical namespace and the virtual namespace it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMapping {
    pub physical: String,
    #[serde(rename = "virtual")]
    pub virtual_: String,
}

impl NamespaceMapping {
    pub fn new(physical: impl Into<String>, virtual_: impl Into<String>) -> Self {
        Self {
            physical: physical.into(),
            virtual_: virtual_.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<NamespaceMapping>,
    /// Appended as `-<suffix>` to virtual names to form physical names.
    #[serde(default)]
    pub name_suffix: Option<String>,
}

fn default_namespaces() -> Vec<NamespaceMapping> {
    vec![NamespaceMapping::new("vsync", "default")]
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            namespaces: default_namespaces(),
            name_suffix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_workers() -> usize {
    4
}
fn default_base_backoff_ms() -> u64 {
    5
}
fn default_max_backoff_ms() -> u64 {
    300_000
}

impl ControllerConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::SyncConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<SyncConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("vsync.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., VSYNC__CONTROLLER__WORKERS=8
        builder = builder.add_source(
            Environment::with_prefix("VSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: SyncConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
