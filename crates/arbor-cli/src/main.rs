//! CLI entrypoint for the arbor workflow tool.
//!
//! The binary delegates to [`arbor_cli::run`], which parses arguments,
//! installs telemetry, resolves per-user paths, and drives the plugin
//! subsystem.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    arbor_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
