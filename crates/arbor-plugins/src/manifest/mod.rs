//! Plugin manifest loading and validation.
//!
//! Every plugin directory carries a fixed-named declaration file,
//! [`MANIFEST_FILE`], describing the plugin's identity: its name, the hooks
//! it subscribes to, the configuration key it reads from project profiles,
//! and how to launch it. Only `name` is required; the entrypoint and runtime
//! fall back to conventional defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::event::HookKind;

/// Fixed name of the declaration file inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// Conventional entrypoint script used when the manifest omits one.
pub const DEFAULT_ENTRYPOINT: &str = "main.py";

/// Conventional interpreter used when the manifest omits one.
pub const DEFAULT_RUNTIME: &str = "python3";

/// A plugin's self-description, read from [`MANIFEST_FILE`].
///
/// # Example
///
/// ```
/// use arbor_plugins::{HookKind, PluginManifest};
///
/// let manifest: PluginManifest =
///     serde_json::from_str(r#"{"name": "notifier", "hooks": ["on_load"]}"#)
///         .expect("parse manifest");
/// assert_eq!(manifest.name(), "notifier");
/// assert_eq!(manifest.entrypoint(), "main.py");
/// assert_eq!(manifest.runtime(), "python3");
/// assert_eq!(manifest.hooks(), &[HookKind::OnLoad]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    name: String,
    #[serde(default)]
    config_key: String,
    #[serde(default)]
    hooks: Vec<HookKind>,
    #[serde(default = "default_entrypoint")]
    entrypoint: String,
    #[serde(default = "default_runtime")]
    runtime: String,
}

fn default_entrypoint() -> String {
    DEFAULT_ENTRYPOINT.to_owned()
}

fn default_runtime() -> String {
    DEFAULT_RUNTIME.to_owned()
}

impl PluginManifest {
    /// Reads and validates the declaration file inside `plugin_dir`.
    ///
    /// Hook names outside the fixed vocabulary are rejected during
    /// deserialisation.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] when the file is missing, is not
    /// valid JSON, or fails validation.
    pub fn load(plugin_dir: &Path) -> Result<Self, PluginError> {
        let path = plugin_dir.join(MANIFEST_FILE);
        let contents = fs::read_to_string(&path).map_err(|source| PluginError::Manifest {
            path: path.clone(),
            message: format!("failed to read declaration: {source}"),
        })?;
        let manifest: Self =
            serde_json::from_str(&contents).map_err(|source| PluginError::Manifest {
                path: path.clone(),
                message: format!("failed to parse declaration: {source}"),
            })?;
        manifest.validate(&path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::Manifest {
                path: path.to_path_buf(),
                message: String::from("plugin name must not be empty"),
            });
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the key under which project profiles store configuration for
    /// this plugin.
    #[must_use]
    pub const fn config_key(&self) -> &str {
        self.config_key.as_str()
    }

    /// Returns the hooks the plugin subscribes to.
    #[must_use]
    pub fn hooks(&self) -> &[HookKind] {
        &self.hooks
    }

    /// Returns the entrypoint script, relative to the plugin directory.
    #[must_use]
    pub const fn entrypoint(&self) -> &str {
        self.entrypoint.as_str()
    }

    /// Returns the interpreter used to launch the entrypoint.
    #[must_use]
    pub const fn runtime(&self) -> &str {
        self.runtime.as_str()
    }

    /// Resolves the entrypoint path inside the given plugin directory.
    #[must_use]
    pub fn entrypoint_path(&self, plugin_dir: &Path) -> PathBuf {
        plugin_dir.join(&self.entrypoint)
    }
}
