//! Session operations abstraction
//!
//! This module provides the session operations pattern that allows
//! transparent switching between plain TCP and TLS connections, plus the
//! `connect` entry point that picks one from the target's scheme.
//!
//! The connect timeout covers the TCP connect and, for https, the TLS
//! handshake that follows it.
//!
//! Reads block without limit unless a read timeout is configured: an
//! HTTP/1.0 body ends when the peer closes, so a peer that stalls after
//! connecting stalls the fetch with it.

use super::tls::TlsConfig;
use super::{Error, Result, Target};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Connect timeout applied when the caller does not configure one
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Session operations trait
///
/// This trait defines the operations that can be performed on a session,
/// abstracting over plain TCP and TLS connections.
pub trait SessionOps {
    /// Poll the session for events
    ///
    /// Returns true if the session is ready for the requested operation
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool>;

    /// Read data from the session
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write data to the session
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session
    fn close(&mut self) -> Result<()>;
}

impl<S: SessionOps + ?Sized> SessionOps for Box<S> {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool> {
        (**self).poll(events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Poll events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvents {
    Read,
    Write,
    Both,
}

/// Wait on a raw descriptor with `poll(2)`
pub(crate) fn poll_fd(fd: i32, events: PollEvents, timeout: Option<Duration>) -> Result<bool> {
    use libc::{poll, pollfd, POLLIN, POLLOUT};

    let mut pfd = pollfd {
        fd,
        events: match events {
            PollEvents::Read => POLLIN,
            PollEvents::Write => POLLOUT,
            PollEvents::Both => POLLIN | POLLOUT,
        },
        revents: 0,
    };

    let timeout_ms = timeout
        .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
        .unwrap_or(-1); // -1 = infinite

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }

    Ok(result > 0)
}

/// HTTP session wrapping a transport with session operations
pub struct HttpSession<S: SessionOps> {
    session: S,
    read_timeout: Option<Duration>,
}

impl<S: SessionOps> HttpSession<S> {
    /// Create a new HTTP session; reads block until data or EOF
    pub fn new(session: S) -> Self {
        HttpSession {
            session,
            read_timeout: None,
        }
    }

    /// Bound every read by `timeout`
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Get the read timeout
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Read data, honouring the read timeout
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.read_timeout.is_some()
            && !self.session.poll(PollEvents::Read, self.read_timeout)?
        {
            return Err(Error::Timeout);
        }

        self.session.read(buf)
    }

    /// Write the whole buffer or fail with `Error::Write`
    pub fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.session.write(buf) {
                Ok(0) => {
                    return Err(Error::Write(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed while writing",
                    )))
                }
                Ok(n) => buf = &buf[n..],
                Err(Error::Io(e)) => return Err(Error::Write(e)),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Close the session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Get a reference to the underlying session
    pub fn get_ref(&self) -> &S {
        &self.session
    }

    /// Get a mutable reference to the underlying session
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: SessionOps> Read for HttpSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match HttpSession::read(self, buf) {
            Ok(n) => Ok(n),
            Err(Error::Io(e)) => Err(e),
            Err(Error::Timeout) => Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// Plain file descriptor session operations
pub struct FdSessionOps {
    stream: TcpStream,
}

impl FdSessionOps {
    /// Create a new FD session operations from a TCP stream
    pub fn new(stream: TcpStream) -> Self {
        FdSessionOps { stream }
    }
}

impl SessionOps for FdSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool> {
        poll_fd(self.stream.as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(Error::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The peer closing first is the normal end of an HTTP/1.0 reply
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}

/// Transport settings for one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub verify_tls: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            verify_tls: true,
        }
    }
}

/// Smallest socket timeout handed to the TLS handshake; zero means "no limit"
const MIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(1);

/// Open a TCP connection to one address, bounded by `timeout`
fn connect_addr(addr: &SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect_timeout(&(*addr).into(), timeout)?;
    socket.set_nodelay(true)?;
    Ok(socket.into())
}

/// Connect to `target`, trying each resolved address in turn
///
/// https targets get a TLS session with SNI set to the target host.
pub fn connect(
    target: &Target,
    options: &ConnectOptions,
) -> Result<HttpSession<Box<dyn SessionOps>>> {
    let connect_error = |source: io::Error| Error::Connect {
        host: target.host.clone(),
        port: target.port,
        source,
    };

    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(connect_error)?
        .collect();

    let mut last_error =
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
    let mut connected = None;
    for addr in &addrs {
        trace!("connecting to {}", addr);
        let started = Instant::now();
        match connect_addr(addr, options.connect_timeout) {
            Ok(s) => {
                connected = Some((s, started));
                break;
            }
            Err(e) => {
                debug!("connect to {} failed: {}", addr, e);
                last_error = e;
            }
        }
    }
    let (stream, started) = connected.ok_or_else(|| connect_error(last_error))?;

    let ops: Box<dyn SessionOps> = if target.scheme.is_encrypted() {
        // The handshake gets whatever is left of the connect timeout
        let remaining = options
            .connect_timeout
            .saturating_sub(started.elapsed())
            .max(MIN_HANDSHAKE_TIMEOUT);
        stream.set_read_timeout(Some(remaining)).map_err(connect_error)?;
        stream.set_write_timeout(Some(remaining)).map_err(connect_error)?;

        let config = TlsConfig::client().verify_peer(options.verify_tls).build()?;
        let tls = config.connect(stream, &target.host)?;
        trace!("TLS handshake with {} took {:?}", target, started.elapsed());

        tls.get_ref().set_read_timeout(None).map_err(connect_error)?;
        tls.get_ref().set_write_timeout(None).map_err(connect_error)?;
        Box::new(tls)
    } else {
        Box::new(FdSessionOps::new(stream))
    };

    let mut session = HttpSession::new(ops);
    session.set_read_timeout(options.read_timeout);
    debug!("connected to {}", target);
    Ok(session)
}
