//! Engine configuration
//!
//! Everything the engine needs beyond a single request lives here and is
//! fixed at construction. Nothing is read from the process environment; a
//! caller that wants to forward its own user agent or page URL passes them in.

use crate::http::message::DEFAULT_USER_AGENT;
use crate::http::session::DEFAULT_CONNECT_TIMEOUT;
use crate::http::{ConnectOptions, RequestDefaults};
use std::path::PathBuf;
use std::time::Duration;

/// Long-lived engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Directory holding `http_*` cache entries
    pub cache_dir: PathBuf,
    pub connect_timeout: Duration,
    /// Unset by default: reads wait until the peer sends or closes
    pub read_timeout: Option<Duration>,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Check https certificates and host names
    pub verify_tls: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig {
            cache_dir: PathBuf::from("."),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: None,
            verify_tls: true,
        }
    }
}

impl FetcherConfig {
    /// Create a builder starting from the defaults
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            verify_tls: self.verify_tls,
        }
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
        }
    }
}

/// Builder for `FetcherConfig`
#[derive(Debug, Clone, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.referer = Some(referer.into());
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    pub fn build(self) -> FetcherConfig {
        self.config
    }
}
