//! Error types for the CLI runtime.

use std::io;

use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Failures surfaced to the operator by the CLI.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to resolve arbor paths: {0}")]
    Paths(#[from] arbor_config::PathsError),
    #[error(transparent)]
    Plugin(#[from] arbor_plugins::PluginError),
    #[error("failed to install telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("background wakeup ended without reporting an outcome")]
    WakeupInterrupted,
    #[error("failed to write command output: {0}")]
    WriteOutput(#[from] io::Error),
}
