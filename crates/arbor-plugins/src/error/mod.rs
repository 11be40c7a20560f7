//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can inspect the failure programmatically. I/O errors are wrapped
//! in `Arc` to satisfy the `result_large_err` Clippy lint and to keep the
//! enum cheap to move through channels.

use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin declaration file was missing or malformed.
    #[error("invalid plugin manifest at '{path}': {message}")]
    Manifest {
        /// Path of the declaration file that was read.
        path: PathBuf,
        /// Description of what was wrong with it.
        message: String,
    },

    /// The durable registry file was unreadable or corrupt.
    #[error("plugin registry '{path}' is unusable: {message}")]
    Registry {
        /// Path of the registry file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// An installation target directory already exists.
    #[error("plugin '{name}' already exists at '{path}'")]
    AlreadyInstalled {
        /// Name derived from the source URL.
        name: String,
        /// Directory that is already occupied.
        path: PathBuf,
    },

    /// Cloning a plugin source failed.
    #[error("failed to clone '{url}': {message}")]
    Clone {
        /// Source URL that was being cloned.
        url: String,
        /// Description of the git failure.
        message: String,
    },

    /// The plugin's entrypoint script does not exist on disk.
    #[error("plugin '{name}' entrypoint not found: {path}")]
    EntrypointMissing {
        /// Plugin name.
        name: String,
        /// Entrypoint path that was checked.
        path: PathBuf,
    },

    /// The socket directory or a stale socket file could not be prepared.
    #[error("failed to prepare socket path '{path}': {source}")]
    SocketPrepare {
        /// Socket path or directory being prepared.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin process could not be spawned.
    #[error("failed to start plugin '{name}': {source}")]
    Spawn {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A freshly spawned plugin never started accepting connections.
    #[error("plugin '{name}' socket not ready after {timeout_secs}s")]
    SocketTimeout {
        /// Plugin name.
        name: String,
        /// Configured readiness timeout in seconds.
        timeout_secs: u64,
    },

    /// A call was issued for a plugin that has not been woken.
    #[error("plugin '{name}' is not running")]
    NotRunning {
        /// Plugin name.
        name: String,
    },

    /// Establishing a connection to the plugin socket failed.
    #[error("failed to connect to plugin '{name}': {source}")]
    Connect {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// An I/O error occurred while exchanging a request with the plugin.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A call did not complete within its round-trip deadline.
    #[error("call to plugin '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Round-trip budget in seconds.
        timeout_secs: u64,
    },

    /// The plugin reported a structured error in its response.
    #[error("plugin '{name}' returned error [{code}]: {message}")]
    Application {
        /// Plugin name.
        name: String,
        /// Plugin-reported error code.
        code: i64,
        /// Plugin-reported error message.
        message: String,
    },

    /// The request could not be serialised to JSON.
    #[error("failed to serialise plugin request: {0}")]
    SerializeRequest(#[source] serde_json::Error),

    /// The plugin response could not be deserialised from JSON.
    #[error("plugin '{name}' produced an invalid response: {source}")]
    DeserializeResponse {
        /// Plugin name.
        name: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
