//! HTTP/1.0 wire layer for the fetch engine
//!
//! This module frames requests and reads responses directly from a socket,
//! without an HTTP client library in between.
//!
//! # Architecture
//!
//! The layer uses a session operations abstraction so that the same code
//! drives plain TCP and TLS connections:
//!
//! - `SessionOps` trait defines operations (poll, read, write, close)
//! - `HttpSession` wraps a session with an optional read timeout and exposes
//!   it as a `std::io::Read`
//! - `LineReader` sits on top of any `Read`, so the response parser runs
//!   unchanged over a socket or over a cache file
//!
//! # Examples
//!
//! ```no_run
//! use cachefetch::http::{self, ConnectOptions, FetchRequest, RequestDefaults, Target};
//!
//! let target = Target::parse("http://example.com/").unwrap();
//! let request = FetchRequest::get("http://example.com/");
//! let wire = request.encode(&target, &RequestDefaults::default());
//!
//! let mut session = http::connect(&target, &ConnectOptions::default()).unwrap();
//! session.write_all(&wire).unwrap();
//! let response = http::parse_response(&mut http::LineReader::new(&mut session)).unwrap();
//! println!("{}", response.status);
//! ```

pub mod headers;
pub mod message;
pub mod parser;
pub mod reader;
pub mod session;
pub mod tls;
pub mod url;

pub use headers::Headers;
pub use message::{FetchRequest, Method, RequestBody, RequestDefaults};
pub use parser::{parse_response, ParsedResponse, ParserState, ResponseParser};
pub use reader::LineReader;
pub use session::{connect, ConnectOptions, FdSessionOps, HttpSession, SessionOps};
pub use url::{Scheme, Target};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not open connection to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),

    #[error("Error writing request to socket: {0}")]
    Write(#[source] std::io::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Could not authenticate")]
    AuthFailed,

    #[error("Timeout")]
    Timeout,
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default HTTPS port
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Protocol version sent on every request line
pub const HTTP_VERSION: &str = "HTTP/1.0";

/// CRLF line ending
pub const CRLF: &str = "\r\n";
