//! Durable store of installed plugin declarations.
//!
//! The registry is a single human-readable JSON file at a per-user config
//! path: `{"plugins": [...]}`. Every mutation loads the full set, applies
//! the change, and writes the file back as a pretty-printed overwrite. The
//! file is not lock-protected in-process; callers are expected to be
//! short-lived CLI invocations. Long-running hosts sharing one registry
//! would need advisory locking — an open question, not solved here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PluginError;
use crate::event::HookKind;
use crate::manifest::PluginManifest;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "arbor_plugins::registry";

/// A persisted plugin declaration: the manifest fields plus the source the
/// plugin was installed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    name: String,
    url: String,
    #[serde(default)]
    config_key: String,
    #[serde(default)]
    hooks: Vec<HookKind>,
    entrypoint: String,
    runtime: String,
}

impl PluginRecord {
    /// Builds a record from a validated manifest and its source URL.
    #[must_use]
    pub fn from_manifest(manifest: &PluginManifest, url: impl Into<String>) -> Self {
        Self {
            name: manifest.name().to_owned(),
            url: url.into(),
            config_key: manifest.config_key().to_owned(),
            hooks: manifest.hooks().to_vec(),
            entrypoint: manifest.entrypoint().to_owned(),
            runtime: manifest.runtime().to_owned(),
        }
    }

    /// Returns the plugin name, the registry's unique key.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the source the plugin was installed from.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
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

    /// Returns whether the plugin subscribes to the given hook.
    #[must_use]
    pub fn handles_hook(&self, kind: HookKind) -> bool {
        self.hooks.contains(&kind)
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
}

/// On-disk shape of the registry file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    plugins: Vec<PluginRecord>,
}

/// File-backed registry of installed plugin declarations.
///
/// # Example
///
/// ```rust,no_run
/// use arbor_plugins::PluginRegistry;
///
/// let registry = PluginRegistry::new("/home/user/.config/arbor/plugins.json");
/// for record in registry.list().expect("registry readable") {
///     println!("{}", record.name());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    path: PathBuf,
}

impl PluginRegistry {
    /// Creates a registry handle for the given store file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the backing store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Loads the current declaration set. An absent or empty backing file
    /// yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the file exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<Vec<PluginRecord>, PluginError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(PluginError::Registry {
                    path: self.path.clone(),
                    message: format!("failed to read store: {error}"),
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: RegistryFile =
            serde_json::from_str(&contents).map_err(|error| PluginError::Registry {
                path: self.path.clone(),
                message: format!("failed to parse store: {error}"),
            })?;
        Ok(file.plugins)
    }

    /// Persists the full declaration set as a human-readable overwrite,
    /// creating the parent directory on first use.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the directory or file cannot
    /// be written.
    pub fn save(&self, records: &[PluginRecord]) -> Result<(), PluginError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| PluginError::Registry {
                path: self.path.clone(),
                message: format!("failed to create store directory: {error}"),
            })?;
        }
        let file = RegistryFile {
            plugins: records.to_vec(),
        };
        let mut contents =
            serde_json::to_string_pretty(&file).map_err(|error| PluginError::Registry {
                path: self.path.clone(),
                message: format!("failed to serialise store: {error}"),
            })?;
        contents.push('\n');
        fs::write(&self.path, contents).map_err(|error| PluginError::Registry {
            path: self.path.clone(),
            message: format!("failed to write store: {error}"),
        })
    }

    /// Upserts a declaration by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the store cannot be loaded or
    /// written back.
    pub fn add(&self, record: PluginRecord) -> Result<(), PluginError> {
        let mut records = self.load()?;
        match records.iter_mut().find(|existing| existing.name == record.name) {
            Some(existing) => {
                debug!(
                    target: REGISTRY_TARGET,
                    plugin = record.name(),
                    "replacing existing registry entry"
                );
                *existing = record;
            }
            None => records.push(record),
        }
        self.save(&records)
    }

    /// Removes a declaration by name. Removing an absent name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the store cannot be loaded or
    /// written back.
    pub fn remove(&self, name: &str) -> Result<(), PluginError> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|record| record.name != name);
        if records.len() == before {
            return Ok(());
        }
        self.save(&records)
    }

    /// Looks up a declaration by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the store cannot be loaded.
    pub fn find(&self, name: &str) -> Result<Option<PluginRecord>, PluginError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|record| record.name == name))
    }

    /// Returns every declaration in the store.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the store cannot be loaded.
    pub fn list(&self) -> Result<Vec<PluginRecord>, PluginError> {
        self.load()
    }
}
