//! Plugin installation: cloning sources and registering their manifests.
//!
//! Installation clones a plugin's git repository into the plugins directory,
//! validates the declaration file it carries, and registers the declaration.
//! A clone whose manifest fails validation is rolled back by deleting the
//! half-installed directory so the plugins directory never accumulates
//! unusable checkouts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::registry::{PluginRecord, PluginRegistry};

/// Tracing target for installer operations.
const INSTALLER_TARGET: &str = "arbor_plugins::installer";

/// Installs and uninstalls plugins beneath a plugins directory.
///
/// # Example
///
/// ```rust,no_run
/// use arbor_plugins::{PluginInstaller, PluginRegistry};
///
/// let registry = PluginRegistry::new("/home/user/.config/arbor/plugins.json");
/// let installer = PluginInstaller::new("/home/user/.config/arbor/plugins", registry);
/// let record = installer
///     .install("https://example.com/arbor-notifier.git")
///     .expect("install plugin");
/// assert_eq!(record.name(), "arbor-notifier");
/// ```
#[derive(Debug)]
pub struct PluginInstaller {
    plugins_dir: PathBuf,
    registry: PluginRegistry,
}

impl PluginInstaller {
    /// Creates an installer rooted at the given plugins directory.
    #[must_use]
    pub fn new(plugins_dir: impl Into<PathBuf>, registry: PluginRegistry) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            registry,
        }
    }

    /// Clones the plugin at `url`, validates its manifest, and registers it.
    ///
    /// The target directory name is derived from the URL. A manifest
    /// failure after a successful clone deletes the cloned directory before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::AlreadyInstalled`] when the target directory
    /// exists, [`PluginError::Clone`] when git fails,
    /// [`PluginError::Manifest`] when the clone carries no usable
    /// declaration, or [`PluginError::Registry`] when registration fails.
    pub fn install(&self, url: &str) -> Result<PluginRecord, PluginError> {
        fs::create_dir_all(&self.plugins_dir).map_err(|error| PluginError::Clone {
            url: url.to_owned(),
            message: format!("failed to create plugins directory: {error}"),
        })?;

        let name = repo_name_from_url(url);
        let plugin_dir = self.plugins_dir.join(&name);
        if plugin_dir.exists() {
            return Err(PluginError::AlreadyInstalled {
                name,
                path: plugin_dir,
            });
        }

        clone_repository(url, &plugin_dir)?;

        let manifest = match PluginManifest::load(&plugin_dir) {
            Ok(manifest) => manifest,
            Err(error) => {
                // Roll the half-installed checkout back before surfacing
                // the manifest failure.
                if let Err(cleanup) = fs::remove_dir_all(&plugin_dir) {
                    warn!(
                        target: INSTALLER_TARGET,
                        plugin = %name,
                        error = %cleanup,
                        "failed to roll back half-installed plugin"
                    );
                }
                return Err(error);
            }
        };

        let record = PluginRecord::from_manifest(&manifest, url);
        self.registry.add(record.clone())?;
        debug!(
            target: INSTALLER_TARGET,
            plugin = record.name(),
            url,
            "installed plugin"
        );
        Ok(record)
    }

    /// Registers a plugin directory that already exists beneath the plugins
    /// directory, without cloning anything.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] when the directory carries no
    /// usable declaration, or [`PluginError::Registry`] when registration
    /// fails.
    pub fn register(&self, name: &str) -> Result<PluginRecord, PluginError> {
        let plugin_dir = self.plugins_dir.join(name);
        let manifest = PluginManifest::load(&plugin_dir)?;
        let record = PluginRecord::from_manifest(&manifest, plugin_dir.display().to_string());
        self.registry.add(record.clone())?;
        Ok(record)
    }

    /// Removes a plugin's directory (best effort) and its registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the registry entry cannot be
    /// removed. Directory removal failures other than the directory being
    /// absent are logged, not surfaced.
    pub fn uninstall(&self, name: &str) -> Result<(), PluginError> {
        let plugin_dir = self.plugins_dir.join(name);
        if let Err(error) = fs::remove_dir_all(&plugin_dir) {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(
                    target: INSTALLER_TARGET,
                    plugin = name,
                    error = %error,
                    "failed to remove plugin directory"
                );
            }
        }
        self.registry.remove(name)
    }
}

/// Derives the plugin directory name from a source URL: the final path
/// segment with any `.git` suffix stripped.
fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let without_suffix = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    without_suffix
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(without_suffix)
        .to_owned()
}

fn clone_repository(url: &str, target: &Path) -> Result<(), PluginError> {
    let status = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(target)
        .status()
        .map_err(|error| PluginError::Clone {
            url: url.to_owned(),
            message: format!("failed to run git: {error}"),
        })?;
    if !status.success() {
        return Err(PluginError::Clone {
            url: url.to_owned(),
            message: format!("git clone exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
