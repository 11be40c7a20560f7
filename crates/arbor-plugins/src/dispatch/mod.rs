//! Hook dispatch: fanning events out to interested plugins.
//!
//! The [`HookDispatcher`] asks the registry which plugins subscribe to an
//! event's hook, wakes and calls each of them through a [`PluginCaller`],
//! and aggregates per-plugin results. One plugin's failure never aborts
//! dispatch to its siblings.
//!
//! The caller abstraction exists for testability: the production
//! implementation is [`PluginHost`](crate::host::PluginHost), and tests
//! inject mocks that never spawn real processes.

use std::sync::Arc;

use tracing::debug;

use crate::error::PluginError;
use crate::event::HookEvent;
use crate::host::PluginHost;
use crate::registry::PluginRegistry;

#[cfg(test)]
use mockall::automock;

/// Tracing target for dispatch operations.
const DISPATCH_TARGET: &str = "arbor_plugins::dispatch";

/// Trait abstracting the wake/call surface of the process host.
#[cfg_attr(test, automock)]
pub trait PluginCaller {
    /// Ensures the named plugin is running.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the plugin cannot be started.
    fn wakeup(&self, name: &str) -> Result<(), PluginError>;

    /// Issues one request/response exchange against the named plugin.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] when the exchange fails.
    fn call(
        &self,
        name: &str,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PluginError>;
}

impl PluginCaller for PluginHost {
    fn wakeup(&self, name: &str) -> Result<(), PluginError> {
        Self::wakeup(self, name)
    }

    fn call(
        &self,
        name: &str,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PluginError> {
        Self::call(self, name, method, params)
    }
}

impl<C: PluginCaller + ?Sized> PluginCaller for Arc<C> {
    fn wakeup(&self, name: &str) -> Result<(), PluginError> {
        self.as_ref().wakeup(name)
    }

    fn call(
        &self,
        name: &str,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PluginError> {
        self.as_ref().call(name, method, params)
    }
}

/// Per-plugin outcome of a dispatched hook.
#[derive(Debug)]
pub struct HookResult {
    plugin: String,
    outcome: Result<String, PluginError>,
}

impl HookResult {
    fn success(plugin: &str, response: String) -> Self {
        Self {
            plugin: plugin.to_owned(),
            outcome: Ok(response),
        }
    }

    fn failure(plugin: &str, error: PluginError) -> Self {
        Self {
            plugin: plugin.to_owned(),
            outcome: Err(error),
        }
    }

    /// Returns the plugin the result belongs to.
    #[must_use]
    pub const fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    /// Returns whether the plugin handled the hook successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the cleaned textual response, when the hook succeeded.
    #[must_use]
    pub fn response(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(String::as_str)
    }

    /// Returns the failure, when the hook failed.
    #[must_use]
    pub fn error(&self) -> Option<&PluginError> {
        self.outcome.as_ref().err()
    }
}

/// Fans hook events out to every subscribed plugin.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use arbor_plugins::{HookDispatcher, HookEvent, HookKind, PluginHost, PluginRegistry};
///
/// let registry = PluginRegistry::new("/home/user/.config/arbor/plugins.json");
/// let host = Arc::new(PluginHost::new("/plugins", "/run/user/1000/arbor/plugins"));
/// let dispatcher = HookDispatcher::new(registry, host);
///
/// let event = HookEvent::new(HookKind::OnClose, "demo");
/// let results = dispatcher.dispatch(&event).expect("registry readable");
/// for result in &results {
///     if let Some(error) = result.error() {
///         eprintln!("{}: {error}", result.plugin());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct HookDispatcher<C> {
    registry: PluginRegistry,
    caller: C,
}

impl<C: PluginCaller> HookDispatcher<C> {
    /// Creates a dispatcher over the given registry and caller.
    #[must_use]
    pub const fn new(registry: PluginRegistry, caller: C) -> Self {
        Self { registry, caller }
    }

    /// Dispatches an event to every plugin whose hook set contains its
    /// kind: wake, then call with the merged payload. A failing plugin
    /// contributes an error result and dispatch continues with the rest.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the declaration set cannot be
    /// loaded; per-plugin failures are captured in the result list instead.
    pub fn dispatch(&self, event: &HookEvent) -> Result<Vec<HookResult>, PluginError> {
        let records = self.registry.list()?;
        let mut results = Vec::new();

        for record in records
            .iter()
            .filter(|record| record.handles_hook(event.kind()))
        {
            let name = record.name();
            debug!(
                target: DISPATCH_TARGET,
                plugin = name,
                hook = %event.kind(),
                "dispatching hook"
            );

            if let Err(error) = self.caller.wakeup(name) {
                results.push(HookResult::failure(name, error));
                continue;
            }

            let params = event.payload_for(record.config_key());
            match self.caller.call(name, event.kind().as_str(), Some(params)) {
                Ok(value) => results.push(HookResult::success(name, clean_response(&value))),
                Err(error) => results.push(HookResult::failure(name, error)),
            }
        }

        Ok(results)
    }

    /// Health-checks every plugin subscribed to the reserved broadcast
    /// hook, reusing the ordinary fan-out.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Registry`] when the declaration set cannot be
    /// loaded.
    pub fn healthcheck(&self, project: &str) -> Result<Vec<HookResult>, PluginError> {
        self.dispatch(&HookEvent::new(crate::event::HookKind::OnHealthcheck, project))
    }
}

/// Normalises a plugin response for display: string results are trimmed of
/// surrounding whitespace (their JSON quoting is already gone), null
/// becomes empty, and anything else is rendered as compact JSON.
fn clean_response(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.trim().to_owned(),
        other => other.to_string(),
    }
}
