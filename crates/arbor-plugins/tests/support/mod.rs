//! Shared helpers for integration tests that drive real plugin processes
//! over real Unix sockets.
//!
//! Test plugins are small Python programs implementing the wire protocol,
//! matching the conventional plugin runtime. Tests calling
//! [`python3_available`] skip with a note when no interpreter is present.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Protocol-speaking test plugin. Records its pid on startup and every
/// request id it sees, echoes hook payloads back as the result, answers
/// `fail` with a structured error, and stops on `shutdown`.
pub const SERVE_SCRIPT: &str = r#"
import json
import os
import socket
import sys

SOCKET_PATH = sys.argv[1]

with open("spawns.txt", "a", encoding="utf-8") as log:
    log.write(str(os.getpid()) + "\n")

server = socket.socket(socket.AF_UNIX, socket.SOCK_STREAM)
server.bind(SOCKET_PATH)
server.listen(8)

while True:
    conn, _ = server.accept()
    stream = conn.makefile("rwb")
    line = stream.readline()
    if not line:
        conn.close()
        continue
    request = json.loads(line)
    with open("ids.txt", "a", encoding="utf-8") as log:
        log.write(str(request.get("id")) + "\n")
    method = request.get("method", "")
    if method == "shutdown":
        conn.close()
        break
    if method == "fail":
        response = {
            "jsonrpc": "2.0",
            "id": request.get("id"),
            "error": {"code": 13, "message": "induced failure"},
        }
    elif method.startswith("on_"):
        response = {"jsonrpc": "2.0", "id": request.get("id"), "result": request.get("params")}
    else:
        response = {"jsonrpc": "2.0", "id": request.get("id"), "result": "ok:" + method}
    stream.write((json.dumps(response) + "\n").encode("utf-8"))
    stream.flush()
    conn.close()
"#;

/// Test plugin that binds its socket, then dies on the first connection
/// without ever responding.
pub const EXIT_AFTER_ACCEPT_SCRIPT: &str = r#"
import socket
import sys

server = socket.socket(socket.AF_UNIX, socket.SOCK_STREAM)
server.bind(sys.argv[1])
server.listen(1)
conn, _ = server.accept()
conn.close()
sys.exit(1)
"#;

/// Test plugin that never binds its socket at all.
pub const NEVER_BINDS_SCRIPT: &str = "import time\ntime.sleep(30)\n";

/// Returns whether a `python3` interpreter is available on this host.
pub fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// An isolated plugins/sockets layout for one test.
pub struct TestWorld {
    // Held for the lifetime of the test so the directories survive.
    _dir: TempDir,
    plugins_dir: PathBuf,
    sockets_dir: Utf8PathBuf,
    registry_path: PathBuf,
}

impl TestWorld {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let plugins_dir = dir.path().join("plugins");
        fs::create_dir_all(&plugins_dir).expect("create plugins dir");
        let sockets_dir = Utf8PathBuf::from_path_buf(dir.path().join("sockets"))
            .expect("utf8 sockets dir");
        let registry_path = dir.path().join("plugins.json");
        Self {
            _dir: dir,
            plugins_dir,
            sockets_dir,
            registry_path,
        }
    }

    pub fn plugins_dir(&self) -> &PathBuf {
        &self.plugins_dir
    }

    pub fn sockets_dir(&self) -> &Utf8PathBuf {
        &self.sockets_dir
    }

    pub fn registry_path(&self) -> &PathBuf {
        &self.registry_path
    }

    /// Writes a plugin directory with the given declaration and entrypoint.
    pub fn write_plugin(&self, name: &str, manifest: &str, script: &str) {
        let plugin_dir = self.plugins_dir.join(name);
        fs::create_dir_all(&plugin_dir).expect("create plugin dir");
        fs::write(plugin_dir.join("plugin.json"), manifest).expect("write manifest");
        fs::write(plugin_dir.join("main.py"), script).expect("write entrypoint");
    }

    /// Reads the non-empty lines of a file a test plugin wrote into its own
    /// directory, or an empty list when the file does not exist.
    pub fn plugin_log(&self, name: &str, file: &str) -> Vec<String> {
        let path = self.plugins_dir.join(name).join(file);
        fs::read_to_string(path)
            .map(|contents| {
                contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builds a declaration file body for a test plugin.
pub fn manifest(name: &str, config_key: &str, hooks: &[&str]) -> String {
    serde_json::json!({
        "name": name,
        "config_key": config_key,
        "hooks": hooks,
    })
    .to_string()
}
