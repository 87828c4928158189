//! TLS session operations
//!
//! This module implements the SessionOps trait for TLS connections,
//! enabling transparent switching between plain TCP and TLS I/O.

use super::config::{TlsConfig, TlsError};
use crate::http::session::{poll_fd, PollEvents, SessionOps};
use crate::http::{Error, Result as HttpResult};
use openssl::ssl::{ErrorCode, HandshakeError, Ssl, SslStream};
use std::io::Write;
use std::net::{IpAddr, Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;

/// TLS session operations
///
/// Wraps an OpenSSL SslStream and provides poll/read/write/close operations.
pub struct TlsSessionOps {
    stream: SslStream<TcpStream>,
    _config: TlsConfig,
    failed: bool,
}

impl TlsSessionOps {
    /// Create a client TLS connection (perform handshake)
    ///
    /// Host names are sent as SNI and, when verification is on, checked
    /// against the peer certificate. IP literals are checked as addresses.
    pub fn connect(
        tcp_stream: TcpStream,
        config: TlsConfig,
        servername: &str,
    ) -> std::result::Result<Self, TlsError> {
        let mut ssl = Ssl::new(&config.ctx)?;

        match servername.parse::<IpAddr>() {
            Ok(ip) => {
                if config.verify_peer {
                    ssl.param_mut().set_ip(ip)?;
                }
            }
            Err(_) => {
                ssl.set_hostname(servername)?;
                if config.verify_peer {
                    ssl.param_mut().set_host(servername)?;
                }
            }
        }

        // Bounded only by the socket timeouts the caller set; one firing
        // mid-handshake surfaces as WouldBlock
        let ssl_stream = ssl.connect(tcp_stream).map_err(|e| match e {
            HandshakeError::WouldBlock(_) => {
                TlsError::HandshakeFailed(format!("{}: timed out", servername))
            }
            e => TlsError::HandshakeFailed(format!("{}: {}", servername, e)),
        })?;

        Ok(TlsSessionOps {
            stream: ssl_stream,
            _config: config,
            failed: false,
        })
    }

    /// Get reference to underlying TCP stream
    pub fn get_ref(&self) -> &TcpStream {
        self.stream.get_ref()
    }
}

impl SessionOps for TlsSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> HttpResult<bool> {
        // Check if SSL has pending data
        if (events == PollEvents::Read || events == PollEvents::Both)
            && self.stream.ssl().pending() > 0
        {
            return Ok(true);
        }

        poll_fd(self.stream.get_ref().as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> HttpResult<usize> {
        match self.stream.ssl_read(buf) {
            Ok(n) => Ok(n),
            // Peer sent close_notify
            Err(e) if e.code() == ErrorCode::ZERO_RETURN => Ok(0),
            // Many servers just drop the TCP connection without close_notify
            Err(e) if e.code() == ErrorCode::SYSCALL && e.io_error().is_none() => Ok(0),
            Err(e) => {
                self.failed = true;
                Err(Error::Io(
                    e.into_io_error()
                        .unwrap_or_else(|e| std::io::Error::other(e.to_string())),
                ))
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> HttpResult<usize> {
        match self.stream.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.failed = true;
                Err(Error::Io(e))
            }
        }
    }

    fn close(&mut self) -> HttpResult<()> {
        // Perform SSL shutdown if not failed
        if !self.failed {
            let _ = self.stream.shutdown();
        }

        match self.stream.get_mut().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }
}
