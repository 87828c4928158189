//! Per-call fetch results
//!
//! A fetch never returns `Err`. It returns a `FetchResult` whose status is
//! empty on failure, with the reason in `error` and a trail of what happened
//! in `log`. Partial headers or body read before a failure are kept.

use crate::http::{Headers, ParsedResponse};
use bytes::Bytes;
use std::fmt;
use tracing::{debug, trace};

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("could not open connection: {0}")]
    Connect(String),

    #[error("could not send request: {0}")]
    Write(String),

    #[error("could not read response: {0}")]
    Read(String),

    #[error("could not authenticate")]
    AuthFailed,

    #[error("could not read cache entry: {0}")]
    CacheRead(String),

    /// Reported alongside a successful result, never as the failure
    #[error("could not write cache entry: {0}")]
    CacheWrite(String),
}

/// Where the response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Network,
    Cache,
}

/// Stages of one fetch, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Init,
    Resolved(Source),
    ReadingHeaders,
    ReadingBody,
    Done,
    Error,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchState::Init => write!(f, "init"),
            FetchState::Resolved(Source::Network) => write!(f, "resolved(network)"),
            FetchState::Resolved(Source::Cache) => write!(f, "resolved(cache)"),
            FetchState::ReadingHeaders => write!(f, "reading-headers"),
            FetchState::ReadingBody => write!(f, "reading-body"),
            FetchState::Done => write!(f, "done"),
            FetchState::Error => write!(f, "error"),
        }
    }
}

/// Append-only event log of one call
#[derive(Debug, Clone)]
pub(crate) struct FetchLog {
    entries: Vec<String>,
    state: FetchState,
}

impl FetchLog {
    pub(crate) fn new() -> Self {
        FetchLog {
            entries: Vec::new(),
            state: FetchState::Init,
        }
    }

    pub(crate) fn note(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(state = %self.state, "{}", entry);
        self.entries.push(entry);
    }

    pub(crate) fn enter(&mut self, state: FetchState) {
        trace!(from = %self.state, to = %state, "fetch state");
        self.state = state;
    }
}

/// Outcome of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Three-character status code; empty when the fetch failed
    pub status: String,
    /// Raw header block including the status line, as received
    pub header: Bytes,
    pub body: Bytes,
    pub log: Vec<String>,
    pub source: Option<Source>,
    /// Fatal failure, if any
    pub error: Option<FetchError>,
    /// Non-fatal failure to persist a network response
    pub cache_error: Option<FetchError>,
}

impl FetchResult {
    pub(crate) fn completed(response: ParsedResponse, source: Source, log: FetchLog) -> Self {
        FetchResult {
            status: response.status,
            header: response.header,
            body: response.body,
            log: log.entries,
            source: Some(source),
            error: None,
            cache_error: None,
        }
    }

    pub(crate) fn failed(error: FetchError, mut log: FetchLog) -> Self {
        Self::failed_with(error, ParsedResponse::default(), None, &mut log)
    }

    /// Failure after part of a response was read
    pub(crate) fn failed_with(
        error: FetchError,
        partial: ParsedResponse,
        source: Option<Source>,
        log: &mut FetchLog,
    ) -> Self {
        log.note(error.to_string());
        log.enter(FetchState::Error);
        FetchResult {
            status: String::new(),
            header: partial.header,
            body: partial.body,
            log: std::mem::take(&mut log.entries),
            source,
            error: Some(error),
            cache_error: None,
        }
    }

    /// A response was obtained and no fatal error occurred
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.status.is_empty()
    }

    /// Status code as a number, if it is one
    pub fn status_code(&self) -> Option<u16> {
        self.status.parse().ok()
    }

    /// Header block decoded as UTF-8, replacing invalid sequences
    pub fn header_text(&self) -> String {
        String::from_utf8_lossy(&self.header).into_owned()
    }

    /// Parsed view of the header block
    pub fn headers(&self) -> Headers {
        Headers::from_block(&self.header_text())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn from_cache(&self) -> bool {
        self.source == Some(Source::Cache)
    }

    /// Turn the result into a `Result`, keeping the log on success
    pub fn into_result(self) -> Result<FetchResult, FetchError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self),
        }
    }
}
