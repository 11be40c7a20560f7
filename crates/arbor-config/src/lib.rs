//! Shared configuration for the arbor binaries.
//!
//! The crate owns two concerns the CLI and the plugin host must agree on:
//! where durable plugin state lives on disk ([`ArborPaths`]) and how log
//! output is formatted ([`LogFormat`]). Keeping the derivation in one place
//! means every component resolves the same registry file, plugin directory,
//! and socket directory for a given user.

mod logging;
mod paths;

pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::paths::{ArborPaths, PathsError};

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";
