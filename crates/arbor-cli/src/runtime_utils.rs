//! Small runtime helpers shared across commands.

use std::env;

/// Derives the active project name from the current working directory, the
/// same way the session tooling names tmux sessions: the directory's
/// basename, or an empty string when the cwd is unavailable.
pub(crate) fn project_name_from_cwd() -> String {
    env::current_dir()
        .ok()
        .and_then(|dir| {
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}
