//! TLS support for https targets
//!
//! https URLs are fetched over an OpenSSL client session. The session
//! implements `SessionOps`, so everything above the transport (framing,
//! response parsing, caching) is unaware of the encryption.
//!
//! # Examples
//!
//! ```no_run
//! use cachefetch::http::tls::TlsConfig;
//! use std::net::TcpStream;
//!
//! let tls_config = TlsConfig::client()
//!     .verify_peer(true)
//!     .build()
//!     .unwrap();
//!
//! let tcp_stream = TcpStream::connect("example.com:443").unwrap();
//! let tls_session = tls_config.connect(tcp_stream, "example.com").unwrap();
//! ```

pub mod config;
pub mod session;

pub use config::{ClientConfigBuilder, TlsConfig, TlsError, TlsVersion};
pub use session::TlsSessionOps;

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
