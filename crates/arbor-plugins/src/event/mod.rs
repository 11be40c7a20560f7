//! Hook event vocabulary and payload construction.
//!
//! Hooks form a fixed vocabulary in two families plus one reserved
//! broadcast: **lifecycle** events raised as projects are loaded, closed,
//! created, deleted, or entered, and **diagnostic** events raised by the
//! logging subsystem. A [`HookEvent`] couples a [`HookKind`] with free-form
//! data fields and, for lifecycle events, per-plugin configuration slices.
//! The wire payload shape is `{project, hook_type, data?, config?}`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

const FIELD_ERROR: &str = "error";
const FIELD_WARNING: &str = "warning";
const FIELD_MESSAGE: &str = "message";
const FIELD_CONTEXT: &str = "context";
const FIELD_SOURCE: &str = "source";
const FIELD_SESSION: &str = "session";
const FIELD_WINDOW: &str = "window";
const FIELD_COMMAND: &str = "command";

/// Fixed vocabulary of hook event names.
///
/// Each kind doubles as the wire method name for the corresponding plugin
/// call, e.g. [`HookKind::OnLoad`] is dispatched as the `on_load` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// A project was loaded into a session.
    OnLoad,
    /// A project session was closed.
    OnClose,
    /// A project worktree was created.
    OnCreate,
    /// A project worktree was deleted.
    OnDelete,
    /// A shell was entered inside a project.
    OnShellRunIn,
    /// A shell inside a project exited.
    OnShellRunOut,
    /// A plugin was woken explicitly by the operator.
    OnPluginWakeup,
    /// A tmux session was started for a project.
    OnTmuxSessionStart,
    /// A tmux window was created for a project.
    OnTmuxWindow,
    /// The logging subsystem reported an error.
    OnError,
    /// The logging subsystem reported a warning.
    OnWarning,
    /// The logging subsystem reported a debug message.
    OnDebug,
    /// The logging subsystem reported an informational message.
    OnMessage,
    /// Reserved broadcast used to health-check every subscribed plugin.
    OnHealthcheck,
}

impl HookKind {
    /// Returns the canonical wire name of the hook.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnLoad => "on_load",
            Self::OnClose => "on_close",
            Self::OnCreate => "on_create",
            Self::OnDelete => "on_delete",
            Self::OnShellRunIn => "on_shell_run_in",
            Self::OnShellRunOut => "on_shell_run_out",
            Self::OnPluginWakeup => "on_plugin_wakeup",
            Self::OnTmuxSessionStart => "on_tmux_session_start",
            Self::OnTmuxWindow => "on_tmux_window",
            Self::OnError => "on_error",
            Self::OnWarning => "on_warning",
            Self::OnDebug => "on_debug",
            Self::OnMessage => "on_message",
            Self::OnHealthcheck => "on_healthcheck",
        }
    }

    /// Returns the family the hook belongs to.
    #[must_use]
    pub const fn family(self) -> HookFamily {
        match self {
            Self::OnLoad
            | Self::OnClose
            | Self::OnCreate
            | Self::OnDelete
            | Self::OnShellRunIn
            | Self::OnShellRunOut
            | Self::OnPluginWakeup
            | Self::OnTmuxSessionStart
            | Self::OnTmuxWindow => HookFamily::Lifecycle,
            Self::OnError | Self::OnWarning | Self::OnDebug | Self::OnMessage => {
                HookFamily::Diagnostic
            }
            Self::OnHealthcheck => HookFamily::Broadcast,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Families of the hook vocabulary.
///
/// Only lifecycle events carry a plugin-specific configuration slice; the
/// diagnostic family is raised by the logging subsystem with message data
/// only, and the broadcast family is reserved for health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFamily {
    /// Project lifecycle transitions.
    Lifecycle,
    /// Events raised by the logging subsystem.
    Diagnostic,
    /// Reserved fan-out events such as the health check.
    Broadcast,
}

/// A domain event about to be fanned out to interested plugins.
///
/// Built by calling code with the builder methods, consumed by the
/// dispatcher. The free-form data map and the per-config-key plugin
/// configuration map are kept separate: data travels to every subscriber,
/// while each plugin only ever sees the configuration slice stored under
/// its own declared config key.
///
/// # Example
///
/// ```
/// use arbor_plugins::{HookEvent, HookKind};
///
/// let event = HookEvent::new(HookKind::OnError, "my-project")
///     .with_error("worktree vanished")
///     .with_context("git_service");
/// assert_eq!(event.kind(), HookKind::OnError);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    kind: HookKind,
    project: String,
    data: serde_json::Map<String, serde_json::Value>,
    plugin_configs: HashMap<String, serde_json::Value>,
}

/// Wire shape of a dispatched hook payload.
#[derive(Debug, Serialize)]
struct HookPayload<'a> {
    project: &'a str,
    hook_type: HookKind,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    data: &'a serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a serde_json::Value>,
}

impl HookEvent {
    /// Creates an event of the given kind for the named project.
    ///
    /// Surrounding whitespace in the project name is trimmed so payloads
    /// stay consistent regardless of how the caller derived the name.
    #[must_use]
    pub fn new(kind: HookKind, project: impl AsRef<str>) -> Self {
        Self {
            kind,
            project: project.as_ref().trim().to_owned(),
            data: serde_json::Map::new(),
            plugin_configs: HashMap::new(),
        }
    }

    /// Attaches an error description.
    #[must_use]
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.with_field(FIELD_ERROR, message.into())
    }

    /// Attaches a warning description.
    #[must_use]
    pub fn with_warning(self, message: impl Into<String>) -> Self {
        self.with_field(FIELD_WARNING, message.into())
    }

    /// Attaches an informational message.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with_field(FIELD_MESSAGE, message.into())
    }

    /// Attaches the context the event originated from.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        self.with_field(FIELD_CONTEXT, context.into())
    }

    /// Attaches the source subsystem of the event.
    #[must_use]
    pub fn with_source(self, source: impl Into<String>) -> Self {
        self.with_field(FIELD_SOURCE, source.into())
    }

    /// Attaches a tmux session name.
    #[must_use]
    pub fn with_session(self, session: impl Into<String>) -> Self {
        self.with_field(FIELD_SESSION, session.into())
    }

    /// Attaches a tmux window index.
    #[must_use]
    pub fn with_window(self, index: u32) -> Self {
        self.with_field(FIELD_WINDOW, index)
    }

    /// Attaches the shell command associated with the event.
    #[must_use]
    pub fn with_command(self, command: impl Into<String>) -> Self {
        self.with_field(FIELD_COMMAND, command.into())
    }

    /// Attaches an arbitrary data field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attaches the project profile's plugin configuration, keyed by each
    /// plugin's declared config key. Only lifecycle payloads include a
    /// config slice; the map is ignored for the other families.
    #[must_use]
    pub fn with_plugin_configs(mut self, configs: HashMap<String, serde_json::Value>) -> Self {
        self.plugin_configs = configs;
        self
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn kind(&self) -> HookKind {
        self.kind
    }

    /// Returns the active project name.
    #[must_use]
    pub const fn project(&self) -> &str {
        self.project.as_str()
    }

    /// Returns the free-form data fields.
    #[must_use]
    pub const fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }

    /// Builds the wire payload for a plugin declaring the given config key.
    ///
    /// The payload merges the event data with the project name; lifecycle
    /// events additionally carry the configuration slice stored under the
    /// plugin's config key, when one exists.
    #[must_use]
    pub fn payload_for(&self, config_key: &str) -> serde_json::Value {
        let config = match self.kind.family() {
            HookFamily::Lifecycle => self.plugin_configs.get(config_key),
            HookFamily::Diagnostic | HookFamily::Broadcast => None,
        };
        let payload = HookPayload {
            project: &self.project,
            hook_type: self.kind,
            data: &self.data,
            config,
        };
        serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
    }
}
