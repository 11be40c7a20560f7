//! Diagnostic reporting with hook fan-out.
//!
//! The [`Reporter`] is the bridge between the logging subsystem and the
//! plugin system: every diagnostic it emits becomes a `tracing` event and,
//! when plugins subscribe to the matching diagnostic hook, a dispatched
//! [`HookEvent`]. Fan-out failures are logged and swallowed — diagnostics
//! must never fail the operation that raised them.

use arbor_plugins::{HookDispatcher, HookEvent, HookKind, PluginCaller};
use tracing::debug;

/// Tracing target for reporter operations.
const REPORTER_TARGET: &str = "arbor_cli::reporter";

/// Emits diagnostics to the log and to subscribed plugins.
pub struct Reporter<C: PluginCaller> {
    dispatcher: HookDispatcher<C>,
    project: String,
}

impl<C: PluginCaller> Reporter<C> {
    /// Creates a reporter dispatching on behalf of the given project.
    #[must_use]
    pub fn new(dispatcher: HookDispatcher<C>, project: impl Into<String>) -> Self {
        Self {
            dispatcher,
            project: project.into(),
        }
    }

    /// Reports an error.
    pub fn error(&self, context: &str, message: &str) {
        tracing::error!(target: REPORTER_TARGET, context, "{message}");
        self.fan_out(
            HookEvent::new(HookKind::OnError, &self.project)
                .with_error(message)
                .with_context(context),
        );
    }

    /// Reports a warning.
    pub fn warning(&self, context: &str, message: &str) {
        tracing::warn!(target: REPORTER_TARGET, context, "{message}");
        self.fan_out(
            HookEvent::new(HookKind::OnWarning, &self.project)
                .with_warning(message)
                .with_context(context),
        );
    }

    /// Reports an informational message.
    pub fn info(&self, source: &str, message: &str) {
        tracing::info!(target: REPORTER_TARGET, source, "{message}");
        self.fan_out(
            HookEvent::new(HookKind::OnMessage, &self.project)
                .with_message(message)
                .with_source(source),
        );
    }

    /// Reports a debug message.
    pub fn debug(&self, context: &str, message: &str) {
        tracing::debug!(target: REPORTER_TARGET, context, "{message}");
        self.fan_out(
            HookEvent::new(HookKind::OnDebug, &self.project)
                .with_message(message)
                .with_context(context),
        );
    }

    fn fan_out(&self, event: HookEvent) {
        match self.dispatcher.dispatch(&event) {
            Ok(results) => {
                for result in results.iter().filter(|result| !result.is_success()) {
                    debug!(
                        target: REPORTER_TARGET,
                        plugin = result.plugin(),
                        hook = %event.kind(),
                        "diagnostic hook failed"
                    );
                }
            }
            Err(error) => {
                debug!(
                    target: REPORTER_TARGET,
                    hook = %event.kind(),
                    error = %error,
                    "diagnostic fan-out skipped"
                );
            }
        }
    }
}
