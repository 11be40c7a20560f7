//! Derives the on-disk locations shared by the CLI and the plugin host.
//!
//! Durable plugin state (installed plugin checkouts and the registry file)
//! lives under the per-user configuration directory. Socket files are
//! ephemeral and live under the user runtime directory, falling back to a
//! uid-namespaced temporary directory on systems without one.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

#[cfg(unix)]
use dirs::{config_dir, runtime_dir};
#[cfg(unix)]
use libc::geteuid;

/// Environment variable overriding the arbor configuration directory.
pub const CONFIG_HOME_ENV: &str = "ARBOR_CONFIG_HOME";

/// Environment variable overriding the socket directory.
pub const RUNTIME_DIR_ENV: &str = "ARBOR_RUNTIME_DIR";

/// Canonical per-user paths for durable and ephemeral plugin state.
///
/// # Example
///
/// ```rust,no_run
/// use arbor_config::ArborPaths;
///
/// let paths = ArborPaths::resolve().expect("resolve paths");
/// assert!(paths.registry_path().ends_with("plugins.json"));
/// ```
#[derive(Debug, Clone)]
pub struct ArborPaths {
    config_dir: PathBuf,
    plugins_dir: PathBuf,
    registry_path: PathBuf,
    sockets_dir: Utf8PathBuf,
}

impl ArborPaths {
    /// Resolves the path set for the current user and environment.
    ///
    /// `ARBOR_CONFIG_HOME` and `ARBOR_RUNTIME_DIR` take precedence over the
    /// platform defaults, which keeps test processes and unusual setups away
    /// from the real per-user state.
    ///
    /// # Errors
    ///
    /// Returns [`PathsError::MissingConfigDir`] when no per-user
    /// configuration directory can be determined, or
    /// [`PathsError::NonUtf8Path`] when an override contains non-UTF-8
    /// bytes (socket paths are handed to subprocesses as plain strings).
    pub fn resolve() -> Result<Self, PathsError> {
        let config_home = env::var_os(CONFIG_HOME_ENV);
        let runtime_override = env::var_os(RUNTIME_DIR_ENV);
        Self::resolve_with(config_home.as_deref(), runtime_override.as_deref())
    }

    fn resolve_with(
        config_home: Option<&OsStr>,
        runtime_override: Option<&OsStr>,
    ) -> Result<Self, PathsError> {
        let config_dir = resolve_config_dir(config_home)?;
        let sockets_dir = resolve_sockets_dir(runtime_override)?;
        Ok(Self {
            plugins_dir: config_dir.join("plugins"),
            registry_path: config_dir.join("plugins.json"),
            sockets_dir,
            config_dir,
        })
    }

    /// Directory holding all arbor configuration for the current user.
    #[must_use]
    pub fn config_dir(&self) -> &std::path::Path {
        self.config_dir.as_path()
    }

    /// Directory installed plugins are cloned into, one subdirectory each.
    #[must_use]
    pub fn plugins_dir(&self) -> &std::path::Path {
        self.plugins_dir.as_path()
    }

    /// Path to the durable plugin registry file.
    #[must_use]
    pub fn registry_path(&self) -> &std::path::Path {
        self.registry_path.as_path()
    }

    /// Directory plugin sockets are created in.
    #[must_use]
    pub fn sockets_dir(&self) -> &camino::Utf8Path {
        self.sockets_dir.as_path()
    }
}

fn resolve_config_dir(override_value: Option<&OsStr>) -> Result<PathBuf, PathsError> {
    if let Some(value) = override_value {
        return Ok(PathBuf::from(value));
    }
    user_config_dir()
        .map(|dir| dir.join("arbor"))
        .ok_or(PathsError::MissingConfigDir)
}

#[cfg(unix)]
fn user_config_dir() -> Option<PathBuf> {
    config_dir()
}

#[cfg(not(unix))]
fn user_config_dir() -> Option<PathBuf> {
    env::var_os("APPDATA").map(PathBuf::from)
}

fn resolve_sockets_dir(override_value: Option<&OsStr>) -> Result<Utf8PathBuf, PathsError> {
    if let Some(value) = override_value {
        return Utf8PathBuf::from_path_buf(PathBuf::from(value))
            .map_err(|path| PathsError::NonUtf8Path { path });
    }
    Ok(default_sockets_dir())
}

#[cfg(unix)]
fn default_sockets_dir() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("arbor");
    if apply_namespace {
        base.push(user_namespace());
    }
    base.join("plugins")
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_sockets_dir() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    let base = Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("."));
    base.join("arbor").join("plugins")
}

/// Errors raised while deriving per-user paths.
#[derive(Debug, Error)]
pub enum PathsError {
    /// No per-user configuration directory could be determined.
    #[error("no per-user configuration directory is available on this system")]
    MissingConfigDir,
    /// A path override contained non-UTF-8 bytes.
    #[error("path override '{path}' is not valid UTF-8")]
    NonUtf8Path {
        /// The rejected path.
        path: PathBuf,
    },
}
