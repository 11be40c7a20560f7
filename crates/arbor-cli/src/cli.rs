//! CLI argument definitions for the arbor tool.

use arbor_config::LogFormat;
use clap::{Parser, Subcommand};

/// Command-line interface for the arbor workflow tool.
#[derive(Parser, Debug)]
#[command(name = "arbor", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Controls how log output is rendered.
    #[arg(long, global = true, default_value_t = LogFormat::default())]
    pub(crate) log_format: LogFormat,
    /// Enables debug-level logging.
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,
    /// Structured subcommands (for example `plugin list`).
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands for the arbor CLI.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Manages plugins.
    Plugin {
        /// The plugin action to perform.
        #[command(subcommand)]
        action: PluginAction,
    },
}

/// Plugin management actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum PluginAction {
    /// Installs a plugin from a git repository.
    Add {
        /// Source repository to clone.
        url: String,
    },
    /// Lists installed plugins.
    #[command(alias = "ls")]
    List,
    /// Removes an installed plugin.
    Rm {
        /// Plugin to remove.
        name: String,
    },
    /// Registers an existing plugin directory.
    Register {
        /// Directory name beneath the plugins directory.
        name: String,
    },
    /// Runs a healthcheck on all plugins that support it.
    #[command(alias = "hc")]
    Healthcheck,
    /// Wakes a plugin asynchronously and runs its wakeup hook.
    Run {
        /// Plugin to wake.
        name: String,
    },
    /// Kills a running plugin.
    Kill {
        /// Plugin to kill.
        name: String,
    },
}
