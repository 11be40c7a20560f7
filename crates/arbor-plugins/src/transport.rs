//! Socket transport helpers for the plugin host.
//!
//! Encapsulates establishing timed connections to plugin Unix domain sockets
//! and the short-timeout liveness probe used to infer whether a plugin's
//! socket is currently served. Connections are never pooled: every call is a
//! fresh handshake, so a wedged plugin cannot hold a connection open and
//! block future calls.

use std::io::{self, Read, Write};
use std::time::Duration;

use camino::Utf8Path;

#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

/// A single-use connection to a plugin socket.
#[cfg(unix)]
#[derive(Debug)]
pub(crate) struct Connection(UnixStream);

/// A single-use connection to a plugin socket (unsupported platform stub).
#[cfg(not(unix))]
#[derive(Debug)]
pub(crate) struct Connection;

#[cfg(unix)]
impl Connection {
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.0.set_read_timeout(timeout)
    }

    pub(crate) fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.0.set_write_timeout(timeout)
    }
}

#[cfg(unix)]
impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

#[cfg(unix)]
impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

#[cfg(not(unix))]
impl Connection {
    pub(crate) fn set_read_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
        Err(unsupported())
    }

    pub(crate) fn set_write_timeout(&self, _timeout: Option<Duration>) -> io::Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(unix))]
impl Read for Connection {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(unsupported())
    }
}

#[cfg(not(unix))]
impl Write for Connection {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(unsupported())
    }
}

/// Connects to a plugin socket within the given timeout.
#[cfg(unix)]
pub(crate) fn connect(path: &Utf8Path, timeout: Duration) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path.as_str())?;
    socket.connect_timeout(&address, timeout)?;
    let stream: UnixStream = OwnedFd::from(socket).into();
    Ok(Connection(stream))
}

/// Connects to a plugin socket within the given timeout (unsupported
/// platform stub).
#[cfg(not(unix))]
pub(crate) fn connect(_path: &Utf8Path, _timeout: Duration) -> io::Result<Connection> {
    Err(unsupported())
}

#[cfg(not(unix))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "unix sockets unsupported on this platform",
    )
}

/// Short-timeout liveness probe against a plugin socket.
///
/// Any failure to connect — missing socket file, connection refused, or a
/// probe timeout — collapses to `false`; probes never propagate errors.
pub(crate) fn probe(path: &Utf8Path, timeout: Duration) -> bool {
    connect(path, timeout).is_ok()
}
