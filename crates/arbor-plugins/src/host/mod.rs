//! Plugin subprocess supervision over per-plugin Unix sockets.
//!
//! The [`PluginHost`] owns an in-memory map of plugin name to tracked
//! process, guarded by one mutex, plus a shared monotonic request-id
//! counter. Subprocess spawn, socket polling, and per-call I/O execute
//! largely outside the lock so one slow plugin does not block unrelated
//! plugins — with one deliberate exception: [`PluginHost::wakeup`] holds
//! the lock across its full check-then-spawn sequence so sequential callers
//! observe at most one spawn per name. Truly concurrent callers targeting
//! the same name serialise on that lock; the at-most-one-spawn property is
//! best effort under heavy concurrency, not a hard guarantee.
//!
//! Cancellation is deadline-based only. There is no caller-supplied
//! cancellation token, so an abandoned wakeup still runs to its internal
//! deadline.

use std::collections::HashMap;
use std::fs::{self, DirBuilder};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::protocol::{self, METHOD_PING, METHOD_SHUTDOWN, WireRequest, WireResponse};
use crate::transport;

/// Tracing target for host operations.
const HOST_TARGET: &str = "arbor_plugins::host";

/// Timeout for liveness probes against a plugin socket.
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// How long a freshly spawned plugin gets to start accepting connections.
const SPAWN_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between connection attempts while waiting for a new socket.
const SPAWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timeout for establishing a call connection.
const CALL_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Round-trip budget for one call exchange.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for the best-effort shutdown and ping handshakes.
const SHORT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// I/O budget for the best-effort shutdown and ping handshakes.
const SHORT_IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of a plugin process as observed by the host.
///
/// Transitions happen only through [`PluginHost`] methods:
/// `Unloaded → Spawning → Ready` during wakeup, `Ready → Terminated` on
/// kill or when a liveness probe reveals the process is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// The plugin is not tracked by this host.
    Unloaded,
    /// The subprocess has been started and its socket is being polled.
    Spawning,
    /// The socket accepted a connection; calls may be issued.
    Ready,
    /// The process was killed or found dead; the entry is gone.
    Terminated,
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unloaded => "unloaded",
            Self::Spawning => "spawning",
            Self::Ready => "ready",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// A tracked plugin process: name, socket path, and the OS handle when this
/// host spawned it. Adopted processes (left running by a prior invocation)
/// carry no handle; killing them is limited to the shutdown RPC and socket
/// cleanup.
#[derive(Debug)]
struct PluginProcess {
    name: String,
    socket_path: Utf8PathBuf,
    child: Option<Child>,
    state: ProcessState,
}

impl PluginProcess {
    fn new(name: &str, socket_path: Utf8PathBuf) -> Self {
        Self {
            name: name.to_owned(),
            socket_path,
            child: None,
            state: ProcessState::Unloaded,
        }
    }

    fn adopted(name: &str, socket_path: Utf8PathBuf) -> Self {
        let mut process = Self::new(name, socket_path);
        process.transition(ProcessState::Ready);
        process
    }

    fn transition(&mut self, next: ProcessState) {
        debug!(
            target: HOST_TARGET,
            plugin = %self.name,
            from = %self.state,
            to = %next,
            "plugin state transition"
        );
        self.state = next;
    }
}

/// Mutex-protected host state: the tracked map and the request-id counter.
#[derive(Debug)]
struct HostState {
    tracked: HashMap<String, PluginProcess>,
    next_request_id: u64,
}

impl HostState {
    fn take_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }
}

/// Outcome delivered on the completion channel of
/// [`PluginHost::wakeup_async`].
#[derive(Debug)]
pub struct WakeupOutcome {
    name: String,
    result: Result<(), PluginError>,
}

impl WakeupOutcome {
    /// Returns the plugin name the wakeup targeted.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether the wakeup succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Consumes the outcome, yielding the wakeup result.
    ///
    /// # Errors
    ///
    /// Returns the error the background wakeup failed with.
    pub fn into_result(self) -> Result<(), PluginError> {
        self.result
    }
}

/// Supervises one subprocess and one Unix socket per plugin.
///
/// The host is an explicit instance owning its map and mutex — injected
/// where needed rather than a process-wide singleton — so tests can run
/// isolated hosts in parallel.
///
/// # Example
///
/// ```rust,no_run
/// use arbor_plugins::PluginHost;
///
/// let host = PluginHost::new(
///     "/home/user/.config/arbor/plugins",
///     "/run/user/1000/arbor/plugins",
/// );
/// host.wakeup("notifier").expect("plugin starts");
/// let result = host
///     .call("notifier", "on_load", Some(serde_json::json!({"project": "demo"})))
///     .expect("plugin responds");
/// println!("{result}");
/// host.kill_all();
/// ```
#[derive(Debug)]
pub struct PluginHost {
    plugins_dir: PathBuf,
    sockets_dir: Utf8PathBuf,
    state: Mutex<HostState>,
}

impl PluginHost {
    /// Creates a host managing plugins beneath `plugins_dir` with sockets
    /// created in `sockets_dir`.
    #[must_use]
    pub fn new(plugins_dir: impl Into<PathBuf>, sockets_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            sockets_dir: sockets_dir.into(),
            state: Mutex::new(HostState {
                tracked: HashMap::new(),
                next_request_id: 1,
            }),
        }
    }

    /// Returns the canonical socket path for a plugin name.
    #[must_use]
    pub fn socket_path(&self, name: &str) -> Utf8PathBuf {
        self.sockets_dir.join(format!("{name}.sock"))
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ensures a plugin process is running and its socket is accepting
    /// connections. Idempotent: waking a live plugin is a no-op.
    ///
    /// A tracked plugin that fails its liveness probe is forgotten before
    /// anything else happens. An untracked socket that is already accepting
    /// connections — left running by a prior invocation — is adopted
    /// without spawning. Otherwise the manifest is loaded, the entrypoint
    /// verified, any stale socket file deleted, and
    /// `<runtime> <entrypoint> <socket>` spawned with the plugin directory
    /// as working directory, polling the socket every 50ms for up to 5s.
    ///
    /// The whole check-then-spawn sequence runs under the host lock so a
    /// caller's sequential wakeups spawn at most one process per name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] when the declaration cannot be
    /// loaded, [`PluginError::EntrypointMissing`] when the script is gone,
    /// [`PluginError::Spawn`] when the process fails to start, or
    /// [`PluginError::SocketTimeout`] when the socket never becomes ready
    /// (the orphaned process is killed before the error is returned).
    pub fn wakeup(&self, name: &str) -> Result<(), PluginError> {
        let mut state = self.lock_state();

        if let Some(existing) = state.tracked.get(name) {
            if transport::probe(&existing.socket_path, PROBE_TIMEOUT) {
                return Ok(());
            }
            if let Some(mut dead) = state.tracked.remove(name) {
                dead.transition(ProcessState::Terminated);
            }
        }

        let socket_path = self.socket_path(name);
        if transport::probe(&socket_path, PROBE_TIMEOUT) {
            debug!(
                target: HOST_TARGET,
                plugin = name,
                socket = %socket_path,
                "adopting plugin socket left by a prior invocation"
            );
            state
                .tracked
                .insert(name.to_owned(), PluginProcess::adopted(name, socket_path));
            return Ok(());
        }

        let process = self.spawn_plugin(name, socket_path)?;
        state.tracked.insert(name.to_owned(), process);
        Ok(())
    }

    /// Runs [`PluginHost::wakeup`] on a background thread, returning a
    /// single-slot completion channel carrying the outcome. Does not block
    /// the caller. Concurrent calls for the same name are not coalesced
    /// beyond the internal lock.
    #[must_use]
    pub fn wakeup_async(self: &Arc<Self>, name: &str) -> Receiver<WakeupOutcome> {
        let (sender, receiver) = mpsc::sync_channel(1);
        let host = Arc::clone(self);
        let plugin = name.to_owned();
        thread::spawn(move || {
            let result = host.wakeup(&plugin);
            // The caller may have dropped the receiver; nothing to do then.
            drop(sender.send(WakeupOutcome {
                name: plugin,
                result,
            }));
        });
        receiver
    }

    /// Issues one request/response exchange against a tracked plugin.
    ///
    /// Requires an already-tracked entry and does not implicitly wake the
    /// plugin; a name that was never woken fails before any socket I/O.
    /// Every call opens a fresh connection, writes one framed request, and
    /// reads one framed response within a 30s round-trip deadline. A
    /// structured error in the response surfaces as
    /// [`PluginError::Application`], distinct from transport failures.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotRunning`] when the plugin is untracked,
    /// [`PluginError::Connect`] when the socket refuses the connection,
    /// [`PluginError::Timeout`] when the deadline lapses,
    /// [`PluginError::Io`] on other transport failures, or
    /// [`PluginError::Application`] when the plugin reports an error.
    pub fn call(
        &self,
        name: &str,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PluginError> {
        let (socket_path, request_id) = {
            let mut state = self.lock_state();
            let socket_path = state
                .tracked
                .get(name)
                .map(|process| process.socket_path.clone())
                .ok_or_else(|| PluginError::NotRunning {
                    name: name.to_owned(),
                })?;
            (socket_path, state.take_request_id())
        };

        let request = WireRequest::new(request_id, method, params);
        let deadline = Instant::now() + CALL_TIMEOUT;
        let stream = transport::connect(&socket_path, CALL_CONNECT_TIMEOUT).map_err(|source| {
            PluginError::Connect {
                name: name.to_owned(),
                source: Arc::new(source),
            }
        })?;
        exchange(name, stream, &request, deadline)
    }

    /// Stops a tracked plugin: best-effort `shutdown` RPC with short
    /// deadlines (errors ignored), forcible termination with a wait for
    /// exit when this host owns the process, socket file removal, and
    /// dropping the tracked entry. A no-op for untracked names.
    pub fn kill(&self, name: &str) {
        let removed = self.lock_state().tracked.remove(name);
        let Some(mut process) = removed else {
            return;
        };

        self.send_shutdown(&process);

        if let Some(child) = process.child.as_mut() {
            if let Err(error) = child.kill() {
                debug!(
                    target: HOST_TARGET,
                    plugin = name,
                    error = %error,
                    "kill signal failed; process likely already exited"
                );
            }
            drop(child.wait());
        }

        if let Err(error) = fs::remove_file(&process.socket_path) {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(
                    target: HOST_TARGET,
                    plugin = name,
                    error = %error,
                    "failed to remove plugin socket file"
                );
            }
        }
        process.transition(ProcessState::Terminated);
    }

    /// Kills every tracked plugin. The tracked names are snapshotted under
    /// the lock, then each kill runs outside it to avoid self-deadlock.
    /// Called on command exit so children are not leaked.
    pub fn kill_all(&self) {
        let names: Vec<String> = self.lock_state().tracked.keys().cloned().collect();
        for name in names {
            self.kill(&name);
        }
    }

    /// Returns whether the named plugin is tracked and its socket passes a
    /// liveness probe. Never propagates errors.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        let state = self.lock_state();
        state
            .tracked
            .get(name)
            .is_some_and(|process| transport::probe(&process.socket_path, PROBE_TIMEOUT))
    }

    /// Returns the tracked plugin names — a snapshot, not a re-probe:
    /// entries whose process died since the last probe are still listed.
    #[must_use]
    pub fn list_running(&self) -> Vec<String> {
        self.lock_state().tracked.keys().cloned().collect()
    }

    /// Returns the host's view of a plugin's lifecycle state.
    #[must_use]
    pub fn process_state(&self, name: &str) -> ProcessState {
        self.lock_state()
            .tracked
            .get(name)
            .map_or(ProcessState::Unloaded, |process| process.state)
    }

    /// Dedicated liveness handshake: connect and round-trip the reserved
    /// `ping` method under short deadlines. Any transport or application
    /// error collapses to `false`; ping never propagates errors.
    ///
    /// Untracked names are pinged at their canonical socket path, so a
    /// plugin left running by a prior invocation still answers.
    #[must_use]
    pub fn ping(&self, name: &str) -> bool {
        let (socket_path, request_id) = {
            let mut state = self.lock_state();
            let socket_path = state
                .tracked
                .get(name)
                .map_or_else(|| self.socket_path(name), |process| process.socket_path.clone());
            (socket_path, state.take_request_id())
        };

        let request = WireRequest::new(request_id, METHOD_PING, None);
        let Ok(mut stream) = transport::connect(&socket_path, SHORT_CONNECT_TIMEOUT) else {
            return false;
        };
        if stream.set_write_timeout(Some(SHORT_IO_TIMEOUT)).is_err()
            || stream.set_read_timeout(Some(SHORT_IO_TIMEOUT)).is_err()
        {
            return false;
        }
        let Ok(body) = protocol::encode_frame(&request) else {
            return false;
        };
        if stream.write_all(&body).is_err() {
            return false;
        }
        let mut line = String::new();
        if BufReader::new(stream).read_line(&mut line).is_err() {
            return false;
        }
        protocol::decode_frame::<WireResponse>(&line)
            .map(|response| response.error().is_none())
            .unwrap_or(false)
    }

    /// Spawns the plugin process and waits for its socket to become ready.
    /// Runs with the host lock held by the caller.
    fn spawn_plugin(&self, name: &str, socket_path: Utf8PathBuf) -> Result<PluginProcess, PluginError> {
        let plugin_dir = self.plugins_dir.join(name);
        let manifest = PluginManifest::load(&plugin_dir)?;
        let entrypoint = manifest.entrypoint_path(&plugin_dir);
        if !entrypoint.exists() {
            return Err(PluginError::EntrypointMissing {
                name: name.to_owned(),
                path: entrypoint,
            });
        }

        prepare_sockets_dir(&self.sockets_dir)?;
        // Deleting a stale socket file here assumes no other live process
        // still owns it. Two invocations waking the same plugin
        // concurrently can race on this file; the window is accepted rather
        // than papered over.
        remove_stale_socket(&socket_path)?;

        let mut process = PluginProcess::new(name, socket_path.clone());
        process.transition(ProcessState::Spawning);

        debug!(
            target: HOST_TARGET,
            plugin = name,
            runtime = manifest.runtime(),
            entrypoint = %entrypoint.display(),
            socket = %socket_path,
            "spawning plugin process"
        );

        let child = Command::new(manifest.runtime())
            .arg(&entrypoint)
            .arg(socket_path.as_str())
            .current_dir(&plugin_dir)
            .spawn()
            .map_err(|source| PluginError::Spawn {
                name: name.to_owned(),
                source: Arc::new(source),
            })?;
        process.child = Some(child);

        if let Err(error) = wait_for_socket(name, &socket_path, SPAWN_READY_TIMEOUT) {
            warn!(
                target: HOST_TARGET,
                plugin = name,
                socket = %socket_path,
                "plugin socket never became ready; reaping orphan"
            );
            if let Some(child) = process.child.as_mut() {
                drop(child.kill());
                drop(child.wait());
            }
            return Err(error);
        }

        process.transition(ProcessState::Ready);
        Ok(process)
    }

    /// Best-effort graceful stop: one `shutdown` frame under short
    /// deadlines. The response, and every error along the way, is ignored.
    fn send_shutdown(&self, process: &PluginProcess) {
        let request_id = self.lock_state().take_request_id();
        let request = WireRequest::new(request_id, METHOD_SHUTDOWN, None);
        let Ok(mut stream) = transport::connect(&process.socket_path, SHORT_CONNECT_TIMEOUT)
        else {
            return;
        };
        drop(stream.set_write_timeout(Some(SHORT_IO_TIMEOUT)));
        if let Ok(body) = protocol::encode_frame(&request) {
            drop(stream.write_all(&body));
        }
    }
}

/// Performs the framed request/response exchange for [`PluginHost::call`].
fn exchange(
    name: &str,
    mut stream: transport::Connection,
    request: &WireRequest,
    deadline: Instant,
) -> Result<serde_json::Value, PluginError> {
    let body = protocol::encode_frame(request).map_err(PluginError::SerializeRequest)?;

    stream
        .set_write_timeout(Some(CALL_TIMEOUT))
        .and_then(|()| stream.write_all(&body))
        .map_err(|error| classify_io(name, error))?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(PluginError::Timeout {
            name: name.to_owned(),
            timeout_secs: CALL_TIMEOUT.as_secs(),
        });
    }
    stream
        .set_read_timeout(Some(remaining))
        .map_err(|error| classify_io(name, error))?;

    let mut line = String::new();
    let bytes_read = BufReader::new(stream)
        .read_line(&mut line)
        .map_err(|error| classify_io(name, error))?;
    if bytes_read == 0 {
        return Err(PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a response arrived",
            )),
        });
    }

    let response: WireResponse =
        protocol::decode_frame(&line).map_err(|source| PluginError::DeserializeResponse {
            name: name.to_owned(),
            source,
        })?;

    response.into_result().map_err(|error| PluginError::Application {
        name: name.to_owned(),
        code: error.code(),
        message: error.message().to_owned(),
    })
}

/// Maps an I/O failure during a call to the timeout or transport variant.
fn classify_io(name: &str, error: io::Error) -> PluginError {
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => PluginError::Timeout {
            name: name.to_owned(),
            timeout_secs: CALL_TIMEOUT.as_secs(),
        },
        _ => PluginError::Io {
            name: name.to_owned(),
            source: Arc::new(error),
        },
    }
}

/// Creates the sockets directory with restrictive permissions.
fn prepare_sockets_dir(dir: &Utf8Path) -> Result<(), PluginError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    match builder.create(dir.as_std_path()) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(PluginError::SocketPrepare {
            path: dir.to_path_buf(),
            source: Arc::new(source),
        }),
    }
}

/// Removes a leftover socket file so the new process can bind the path.
fn remove_stale_socket(path: &Utf8Path) -> Result<(), PluginError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PluginError::SocketPrepare {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }),
    }
}

/// Polls the socket until it accepts a connection or the deadline lapses.
fn wait_for_socket(name: &str, path: &Utf8Path, timeout: Duration) -> Result<(), PluginError> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if transport::probe(path, PROBE_TIMEOUT) {
            return Ok(());
        }
        thread::sleep(SPAWN_POLL_INTERVAL);
    }
    Err(PluginError::SocketTimeout {
        name: name.to_owned(),
        timeout_secs: timeout.as_secs(),
    })
}
