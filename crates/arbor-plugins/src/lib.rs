//! Plugin host for the arbor workflow tool.
//!
//! Plugins are independent subprocesses, written in any language, that react
//! to arbor lifecycle and diagnostic events over a private IPC channel. Each
//! plugin serves a Unix domain socket; the host speaks a minimal JSON-RPC
//! dialect over it, one request/response exchange per connection.
//!
//! The crate is organised leaf-first:
//!
//! - [`manifest`] loads a plugin's self-description (`plugin.json`).
//! - [`registry`] is the durable store of installed plugin declarations.
//! - [`installer`] clones plugin sources and registers their manifests.
//! - [`host`] supervises one subprocess and one socket per plugin and
//!   implements the wire protocol ([`protocol`]).
//! - [`dispatch`] fans hook events ([`event`]) out to interested plugins,
//!   tolerating partial failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use arbor_plugins::{HookDispatcher, HookEvent, HookKind, PluginHost, PluginRegistry};
//!
//! let registry = PluginRegistry::new("/home/user/.config/arbor/plugins.json");
//! let host = Arc::new(PluginHost::new(
//!     "/home/user/.config/arbor/plugins",
//!     "/run/user/1000/arbor/plugins",
//! ));
//! let dispatcher = HookDispatcher::new(registry, Arc::clone(&host));
//!
//! let event = HookEvent::new(HookKind::OnLoad, "my-project");
//! for result in dispatcher.dispatch(&event).expect("registry readable") {
//!     println!("{}: {:?}", result.plugin(), result.response());
//! }
//! host.kill_all();
//! ```

pub mod dispatch;
pub mod error;
pub mod event;
pub mod host;
pub mod installer;
pub mod manifest;
pub mod protocol;
pub mod registry;

mod transport;

pub use self::dispatch::{HookDispatcher, HookResult, PluginCaller};
pub use self::error::PluginError;
pub use self::event::{HookEvent, HookFamily, HookKind};
pub use self::host::{PluginHost, ProcessState, WakeupOutcome};
pub use self::installer::PluginInstaller;
pub use self::manifest::{MANIFEST_FILE, PluginManifest};
pub use self::protocol::{RpcError, WireRequest, WireResponse};
pub use self::registry::{PluginRecord, PluginRegistry};
