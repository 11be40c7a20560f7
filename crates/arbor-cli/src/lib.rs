//! Runtime for the arbor CLI.
//!
//! [`run`] parses arguments, installs telemetry, resolves the per-user path
//! layout, and drives the plugin subsystem: installation, registry
//! management, health checks, and the wakeup/kill lifecycle. Command
//! failures are reported through the [`reporter::Reporter`] so plugins
//! subscribed to diagnostic hooks hear about them before the process exits.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;

use arbor_config::{ArborPaths, DEFAULT_LOG_FILTER};
use arbor_plugins::{HookDispatcher, PluginHost, PluginRegistry};

mod cli;
mod commands;
mod errors;
mod runtime_utils;
pub mod reporter;
pub mod telemetry;

use crate::cli::{Cli, CliCommand};
use crate::errors::AppError;
use crate::reporter::Reporter;
use crate::runtime_utils::project_name_from_cwd;

/// Log filter used when `--verbose` is requested.
const VERBOSE_LOG_FILTER: &str = "debug";

/// Parses arguments and runs the requested command, writing user-facing
/// output to the provided streams.
pub fn run<I, T, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return write_parse_error(&error, stdout, stderr),
    };

    match execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_failure(&error);
            // Best effort: a broken stderr cannot be reported anywhere.
            drop(writeln!(stderr, "error: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn execute<W: Write>(cli: &Cli, stdout: &mut W) -> Result<(), AppError> {
    let filter = if cli.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    telemetry::initialise(cli.log_format, filter)?;

    let paths = ArborPaths::resolve()?;
    match &cli.command {
        CliCommand::Plugin { action } => commands::handle_plugin(action, &paths, stdout),
    }
}

/// Fans a command failure out to plugins subscribed to `on_error`, then
/// reaps anything the fan-out woke. Failures here are swallowed: reporting
/// must never mask the original error.
fn report_failure(error: &AppError) {
    let Ok(paths) = ArborPaths::resolve() else {
        return;
    };
    let host = Arc::new(PluginHost::new(paths.plugins_dir(), paths.sockets_dir()));
    let dispatcher = HookDispatcher::new(
        PluginRegistry::new(paths.registry_path()),
        Arc::clone(&host),
    );
    let reporter = Reporter::new(dispatcher, project_name_from_cwd());
    reporter.error("plugin", &error.to_string());
    host.kill_all();
}

fn write_parse_error<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            drop(write!(stdout, "{error}"));
            ExitCode::SUCCESS
        }
        _ => {
            drop(write!(stderr, "{error}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cli(args: &[&str]) -> (ExitCode, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run(args.iter().copied(), &mut stdout, &mut stderr);
        (
            code,
            String::from_utf8(stdout).expect("utf8 stdout"),
            String::from_utf8(stderr).expect("utf8 stderr"),
        )
    }

    fn assert_code(actual: ExitCode, expected: ExitCode) {
        // ExitCode has no PartialEq; its Debug form is stable enough here.
        assert_eq!(format!("{actual:?}"), format!("{expected:?}"));
    }

    #[test]
    fn help_lists_plugin_subcommand() {
        let (code, stdout, _stderr) = run_cli(&["arbor", "--help"]);
        assert_code(code, ExitCode::SUCCESS);
        assert!(stdout.contains("plugin"), "help should mention plugin: {stdout}");
    }

    #[test]
    fn unknown_subcommand_fails_with_usage() {
        let (code, _stdout, stderr) = run_cli(&["arbor", "teleport"]);
        assert_code(code, ExitCode::FAILURE);
        assert!(!stderr.is_empty(), "usage error must be written to stderr");
    }
}
