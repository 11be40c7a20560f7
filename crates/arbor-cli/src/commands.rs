//! Handlers for the `plugin` subcommands.

use std::io::Write;
use std::sync::Arc;

use arbor_config::ArborPaths;
use arbor_plugins::{
    HookDispatcher, HookKind, PluginHost, PluginInstaller, PluginRegistry,
};
use tracing::info;

use crate::cli::PluginAction;
use crate::errors::AppError;
use crate::runtime_utils::project_name_from_cwd;

fn registry(paths: &ArborPaths) -> PluginRegistry {
    PluginRegistry::new(paths.registry_path())
}

fn installer(paths: &ArborPaths) -> PluginInstaller {
    PluginInstaller::new(paths.plugins_dir(), registry(paths))
}

fn host(paths: &ArborPaths) -> Arc<PluginHost> {
    Arc::new(PluginHost::new(paths.plugins_dir(), paths.sockets_dir()))
}

/// Runs one plugin subcommand against the resolved paths.
pub(crate) fn handle_plugin<W: Write>(
    action: &PluginAction,
    paths: &ArborPaths,
    stdout: &mut W,
) -> Result<(), AppError> {
    match action {
        PluginAction::Add { url } => add(url, paths, stdout),
        PluginAction::List => list(paths, stdout),
        PluginAction::Rm { name } => remove(name, paths, stdout),
        PluginAction::Register { name } => register(name, paths, stdout),
        PluginAction::Healthcheck => healthcheck(paths, stdout),
        PluginAction::Run { name } => run(name, paths, stdout),
        PluginAction::Kill { name } => kill(name, paths, stdout),
    }
}

fn add<W: Write>(url: &str, paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    let record = installer(paths).install(url)?;
    writeln!(stdout, "Installed plugin: {}", record.name())?;
    writeln!(stdout, "  Config key: {}", record.config_key())?;
    writeln!(stdout, "  Hooks: {}", format_hooks(record.hooks()))?;
    Ok(())
}

fn list<W: Write>(paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    let records = registry(paths).list()?;
    if records.is_empty() {
        writeln!(stdout, "No plugins installed")?;
        return Ok(());
    }
    for record in records {
        writeln!(stdout, "{}", record.name())?;
        writeln!(stdout, "  config_key: {}", record.config_key())?;
        writeln!(stdout, "  hooks: {}", format_hooks(record.hooks()))?;
        writeln!(stdout, "  url: {}", record.url())?;
    }
    Ok(())
}

fn remove<W: Write>(name: &str, paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    installer(paths).uninstall(name)?;
    writeln!(stdout, "Removed plugin: {name}")?;
    Ok(())
}

fn register<W: Write>(name: &str, paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    installer(paths).register(name)?;
    writeln!(stdout, "Registered plugin: {name}")?;
    Ok(())
}

fn healthcheck<W: Write>(paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    let host = host(paths);
    let dispatcher = HookDispatcher::new(registry(paths), Arc::clone(&host));
    // Plugins woken for the broadcast must not outlive the command.
    let results = match dispatcher.healthcheck(&project_name_from_cwd()) {
        Ok(list) => list,
        Err(error) => {
            host.kill_all();
            return Err(error.into());
        }
    };
    if results.is_empty() {
        writeln!(stdout, "No plugins with healthcheck support")?;
        host.kill_all();
        return Ok(());
    }
    for result in &results {
        match result.error() {
            Some(error) => writeln!(stdout, "ERR {}: {error}", result.plugin())?,
            None => writeln!(
                stdout,
                "OK  {}: {}",
                result.plugin(),
                result.response().unwrap_or_default()
            )?,
        }
    }
    host.kill_all();
    Ok(())
}

fn run<W: Write>(name: &str, paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    let host = host(paths);

    let receiver = host.wakeup_async(name);
    writeln!(stdout, "Starting plugin {name}...")?;
    let outcome = receiver.recv().map_err(|_| AppError::WakeupInterrupted)?;
    outcome.into_result()?;
    info!(plugin = name, "plugin is running");

    let payload = serde_json::json!({"project": project_name_from_cwd()});
    let response = host.call(name, HookKind::OnPluginWakeup.as_str(), Some(payload))?;
    if !response.is_null() {
        writeln!(stdout, "{}", render_value(&response))?;
    }
    // The plugin keeps serving after this command exits; a later
    // invocation adopts its socket instead of respawning.
    Ok(())
}

fn kill<W: Write>(name: &str, paths: &ArborPaths, stdout: &mut W) -> Result<(), AppError> {
    let host = host(paths);
    if !host.ping(name) {
        writeln!(stdout, "Plugin {name} is not running")?;
        return Ok(());
    }
    // The handshake answered, so wakeup adopts the live socket rather than
    // spawning; kill then owns the shutdown.
    host.wakeup(name)?;
    host.kill(name);
    writeln!(stdout, "Killed plugin: {name}")?;
    Ok(())
}

fn format_hooks(hooks: &[HookKind]) -> String {
    hooks
        .iter()
        .map(|hook| hook.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.trim().to_owned(),
        other => other.to_string(),
    }
}
