//! Alias configuration for remote-edit.
//!
//! Settings come from up to two layers, read in a fixed order: the global
//! settings file first, the project file last. Both share one shape:
//!
//! ```toml
//! debug = false
//! create_if_missing = false
//!
//! [ssh_configs.prod]
//! address = "10.0.0.5"
//! username = "dev"
//! ```
//!
//! Layering rules:
//!
//! - `debug` and `create_if_missing`: a layer that sets a boolean overrides
//!   the running value; any other value (or none) leaves it alone.
//! - `ssh_configs`: a layer that defines a table replaces the whole alias
//!   table. Tables are not merged alias-by-alias.
//!
//! Layers are kept as dynamic JSON values so that wrongly-typed entries can be
//! treated as absent instead of failing the whole file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::target::RemoteTarget;

/// Application name used for the config directory.
pub const APP_NAME: &str = "remote-edit";

/// File stem of the global settings file inside the config directory.
pub const GLOBAL_SETTINGS_STEM: &str = "settings";

/// File stem of the per-project settings file in the working directory.
pub const PROJECT_SETTINGS_STEM: &str = ".remote-edit";

/// Key under which a project file may nest its settings.
pub const PROJECT_SECTION: &str = "remote_edit";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine a configuration directory for this platform")]
    NoConfigDir,
}

/// Connection details for one alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    pub alias: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Per-alias default for creating missing remote files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_if_missing: Option<bool>,
}

impl ConnectionDescriptor {
    /// Build a descriptor from one `ssh_configs` entry.
    ///
    /// Returns `None` for entries that are not tables. A missing `address`
    /// falls back to the alias name itself.
    pub fn from_value(alias: &str, value: &Value) -> Option<Self> {
        let table = value.as_object()?;
        let string_field = |key: &str| {
            table
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            alias: alias.to_string(),
            address: string_field("address").unwrap_or_else(|| alias.to_string()),
            username: string_field("username"),
            create_if_missing: table.get("create_if_missing").and_then(Value::as_bool),
        })
    }

    /// The remote file `path` on this connection.
    pub fn target(&self, path: &str) -> RemoteTarget {
        RemoteTarget::new(&self.address, self.username.clone(), path)
    }
}

/// One settings document and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsLayer {
    pub origin: String,
    pub value: Value,
}

impl SettingsLayer {
    pub fn new(origin: impl Into<String>, value: Value) -> Self {
        Self {
            origin: origin.into(),
            value,
        }
    }

    /// Load a layer from a `.toml` or `.json` file.
    ///
    /// A missing file is not an error and yields `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file not present");
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let value = Self::parse(path, &content)?;
        tracing::debug!(path = %path.display(), "loaded settings layer");
        Ok(Some(Self::new(path.display().to_string(), value)))
    }

    /// Load a project layer, unwrapping a nested `remote_edit` section if present.
    pub fn load_project(path: &Path) -> Result<Option<Self>, ConfigError> {
        Ok(Self::load(path)?.map(|layer| {
            let value = match layer.value {
                Value::Object(mut map) if map.contains_key(PROJECT_SECTION) => map
                    .remove(PROJECT_SECTION)
                    .unwrap_or(Value::Null),
                other => other,
            };
            Self::new(layer.origin, value)
        }))
    }

    fn parse(path: &Path, content: &str) -> Result<Value, ConfigError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        } else {
            let table: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::to_value(table).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    fn bool_field(&self, key: &str) -> Option<bool> {
        self.value.get(key).and_then(Value::as_bool)
    }

    fn alias_table(&self) -> Option<&Map<String, Value>> {
        self.value.get("ssh_configs").and_then(Value::as_object)
    }
}

/// Result of folding all layers together, before alias resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedOptions {
    pub debug: bool,
    pub create_if_missing: bool,
    pub ssh_configs: Map<String, Value>,
}

/// Fold layers in order, later layers winning per the rules in the module docs.
pub fn merged_options(layers: &[SettingsLayer]) -> MergedOptions {
    let mut merged = MergedOptions::default();
    for layer in layers {
        if let Some(debug) = layer.bool_field("debug") {
            merged.debug = debug;
        }
        if let Some(create) = layer.bool_field("create_if_missing") {
            merged.create_if_missing = create;
        }
        if let Some(table) = layer.alias_table() {
            merged.ssh_configs = table.clone();
        }
    }
    merged
}

/// Turn a raw `ssh_configs` table into descriptors, keyed and sorted by alias.
pub fn resolve(alias_table: &Map<String, Value>) -> BTreeMap<String, ConnectionDescriptor> {
    alias_table
        .iter()
        .filter_map(|(alias, entry)| {
            let descriptor = ConnectionDescriptor::from_value(alias, entry);
            if descriptor.is_none() {
                tracing::warn!(alias = %alias, "ignoring ssh_configs entry that is not a table");
            }
            descriptor.map(|d| (alias.clone(), d))
        })
        .collect()
}

/// Where the two settings layers live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl ConfigPaths {
    /// Resolve layer paths, honouring explicit overrides.
    ///
    /// Without overrides the global file is `settings.toml` (or
    /// `settings.json`) in the platform config directory, and the project
    /// file is `.remote-edit.toml` (or `.json`) in `cwd`.
    pub fn discover(
        global_override: Option<PathBuf>,
        project_override: Option<PathBuf>,
        cwd: &Path,
    ) -> Self {
        let global = global_override.or_else(|| {
            default_config_dir().map(|dir| pick_existing(&dir, GLOBAL_SETTINGS_STEM))
        });
        let project = project_override.or_else(|| Some(pick_existing(cwd, PROJECT_SETTINGS_STEM)));
        Self { global, project }
    }
}

/// Platform config directory for remote-edit (e.g. `~/.config/remote-edit`).
pub fn default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Prefer `<stem>.toml`, fall back to an existing `<stem>.json`.
fn pick_existing(dir: &Path, stem: &str) -> PathBuf {
    let toml_path = dir.join(format!("{stem}.toml"));
    let json_path = dir.join(format!("{stem}.json"));
    if !toml_path.exists() && json_path.exists() {
        json_path
    } else {
        toml_path
    }
}

/// Fully merged settings with aliases resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub debug: bool,
    pub create_if_missing: bool,
    pub aliases: BTreeMap<String, ConnectionDescriptor>,
}

impl Settings {
    pub fn from_layers(layers: &[SettingsLayer]) -> Self {
        let merged = merged_options(layers);
        Self {
            debug: merged.debug,
            create_if_missing: merged.create_if_missing,
            aliases: resolve(&merged.ssh_configs),
        }
    }

    /// Read the global then the project layer and merge them.
    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        if let Some(global) = &paths.global
            && let Some(layer) = SettingsLayer::load(global)?
        {
            layers.push(layer);
        }
        if let Some(project) = &paths.project
            && let Some(layer) = SettingsLayer::load_project(project)?
        {
            layers.push(layer);
        }
        Ok(Self::from_layers(&layers))
    }

    pub fn alias(&self, name: &str) -> Option<&ConnectionDescriptor> {
        self.aliases.get(name)
    }

    /// Effective create-if-missing policy for an open request.
    ///
    /// Explicit request flag, then the alias default, then the merged setting.
    pub fn create_if_missing_for(
        &self,
        descriptor: &ConnectionDescriptor,
        explicit: Option<bool>,
    ) -> bool {
        explicit
            .or(descriptor.create_if_missing)
            .unwrap_or(self.create_if_missing)
    }
}
