//! Request target parsing
//!
//! Turns a caller-supplied URL into the `{scheme, host, port, path}` tuple
//! the transport needs. A missing scheme means plain HTTP.

use super::{Error, Result, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// `scheme://` at the very start of a URL; group 1 is the scheme name
static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*)://").unwrap());

/// Transport scheme of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Port used when the URL does not name one
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => DEFAULT_HTTP_PORT,
            Scheme::Https => DEFAULT_HTTPS_PORT,
        }
    }

    /// Whether the connection is wrapped in TLS
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Scheme::Https)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Where a request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Path plus query string, always starting with `/`
    pub path: String,
}

impl Target {
    /// Parse a URL such as `https://example.com:8443/a?b=c` or `example.com/a`.
    ///
    /// Any scheme other than `https` is fetched as plain HTTP. The host and
    /// port are validated; the path and query are sent exactly as given,
    /// without dot-segment removal or percent-encoding. A fragment is dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidUrl("empty URL".to_string()));
        }

        let (scheme, rest) = match SCHEME_PREFIX.captures(input) {
            Some(caps) => {
                let scheme = if caps[1].eq_ignore_ascii_case("https") {
                    Scheme::Https
                } else {
                    Scheme::Http
                };
                (scheme, &input[caps[0].len()..])
            }
            None => (Scheme::Http, input),
        };

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        // Only the authority goes through the URL parser, under the scheme
        // actually used, so ports are resolved against http or https
        let parsed = ::url::Url::parse(&format!("{}://{}/", scheme.as_str(), authority))
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", input, e)))?;

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(Error::InvalidUrl(format!("{}: missing host", input))),
        };

        let port = parsed
            .port_or_known_default()
            .unwrap_or_else(|| scheme.default_port());

        let path = match tail.split('#').next().unwrap_or_default() {
            "" => "/".to_string(),
            query if query.starts_with('?') => format!("/{}", query),
            path => path.to_string(),
        };

        Ok(Target {
            scheme,
            host,
            port,
            path,
        })
    }

    /// Value of the `Host` request header, which always carries the port
    pub fn host_header(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme.as_str(), self.host, self.port, self.path)
    }
}
