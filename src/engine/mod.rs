//! Cache-gated fetch engine
//!
//! `Fetcher` decides per call whether a stored copy is fresh enough to use
//! or the network has to be asked, then runs the same response parser over
//! either source. The engine itself only holds configuration; everything
//! that happens during a call ends up in the returned `FetchResult`.
//!
//! # Examples
//!
//! ```no_run
//! use cachefetch::cache::FreshnessPolicy;
//! use cachefetch::engine::{Fetcher, FetcherConfig};
//!
//! let fetcher = Fetcher::new(FetcherConfig::builder().cache_dir("/tmp").build());
//! let result = fetcher.get("http://example.com/", FreshnessPolicy::from_ttl_secs(300));
//! if result.is_success() {
//!     println!("{} ({} bytes)", result.status, result.body.len());
//! }
//! ```

pub mod config;
pub mod result;

pub use config::{FetcherConfig, FetcherConfigBuilder};
pub use result::{FetchError, FetchResult, FetchState, Source};

use crate::cache::{CacheError, CacheKey, CacheStore, FreshnessPolicy};
use crate::http::{self, FetchRequest, LineReader, ParsedResponse, RequestBody, ResponseParser, Target};
use result::FetchLog;
use std::io::Read;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Where one call gets its response from
#[derive(Debug)]
enum Route {
    /// Ask the network, then store the response under the key if there is one
    Network { save: Option<CacheKey> },
    Cache(CacheKey),
}

impl Route {
    fn source(&self) -> Source {
        match self {
            Route::Network { .. } => Source::Network,
            Route::Cache(_) => Source::Cache,
        }
    }
}

/// Fetch engine
///
/// Holds no per-call state, so one `Fetcher` can be shared between threads.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: FetcherConfig,
    store: CacheStore,
}

impl Fetcher {
    pub fn new(config: FetcherConfig) -> Self {
        let store = CacheStore::new(config.cache_dir.clone());
        Fetcher { config, store }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// GET `url` under `policy`
    pub fn get(&self, url: &str, policy: FreshnessPolicy) -> FetchResult {
        self.fetch(&FetchRequest::builder(url).policy(policy).build())
    }

    /// Run one fetch
    ///
    /// Never fails outright: errors are reported through `FetchResult::error`
    /// with an empty status.
    pub fn fetch(&self, request: &FetchRequest) -> FetchResult {
        let mut log = FetchLog::new();
        log.note("fetch() called");
        log.note(format!("url: {}", request.url()));

        if request.url().trim().is_empty() {
            return FetchResult::failed(FetchError::InvalidInput("no URL given".to_string()), log);
        }

        let route = match self.resolve(request, &mut log) {
            Ok(route) => route,
            Err(e) => return FetchResult::failed(e, log),
        };

        let result = match route {
            Route::Cache(key) => self.from_cache(&key, log),
            Route::Network { save } => self.from_network(request, save.as_ref(), log),
        };

        info!(
            url = request.url(),
            status = %result.status,
            source = ?result.source,
            "fetch finished"
        );
        result
    }

    /// Pick the source for this call from the policy and the entry's mtime
    fn resolve(&self, request: &FetchRequest, log: &mut FetchLog) -> Result<Route, FetchError> {
        let policy = request.policy();
        if !policy.uses_cache() {
            log.note("caching disabled");
            log.enter(FetchState::Resolved(Source::Network));
            return Ok(Route::Network { save: None });
        }

        let key = CacheKey::derive(request.name(), request.url()).map_err(|e| match e {
            CacheError::InvalidName(_) => FetchError::InvalidInput(e.to_string()),
            other => FetchError::CacheRead(other.to_string()),
        })?;
        let path = self.store.path(&key);
        log.note(format!("filename: {}", path.display()));

        let route = match self.store.modified(&key) {
            None => {
                log.note(format!("{} does not exist", path.display()));
                Route::Network { save: Some(key) }
            }
            Some(modified) if policy.is_fresh(modified, SystemTime::now()) => {
                log.note(format!("cache is fresh (ttl {})", policy));
                Route::Cache(key)
            }
            Some(_) => {
                log.note("cache has expired");
                Route::Network { save: Some(key) }
            }
        };

        log.enter(FetchState::Resolved(route.source()));
        Ok(route)
    }

    fn from_network(
        &self,
        request: &FetchRequest,
        save: Option<&CacheKey>,
        mut log: FetchLog,
    ) -> FetchResult {
        log.note("requesting from network");

        let target = match Target::parse(request.url()) {
            Ok(target) => target,
            Err(e) => return FetchResult::failed(FetchError::InvalidInput(e.to_string()), log),
        };

        if request.has_credentials() {
            log.note("authentication will be attempted");
        }
        match request.body() {
            RequestBody::Form(_) => log.note("variables will be POSTed"),
            RequestBody::Raw { content_type, .. } => {
                log.note(format!("{} request body will be sent", content_type))
            }
            RequestBody::Empty => {}
        }
        let wire = request.encode(&target, &self.config.request_defaults());

        let mut session = match http::connect(&target, &self.config.connect_options()) {
            Ok(session) => session,
            Err(e) => return FetchResult::failed(FetchError::Connect(e.to_string()), log),
        };
        log.note(format!("connected to {}", target));

        if let Err(e) = session.write_all(&wire) {
            close_session(&mut session);
            return FetchResult::failed(FetchError::Write(e.to_string()), log);
        }
        debug!("sent {} bytes to {}", wire.len(), target);

        let outcome = read_response(&mut session, &mut log);
        close_session(&mut session);

        let response = match outcome {
            Ok(response) => response,
            Err((e, partial)) => {
                let error = match e {
                    http::Error::AuthFailed => FetchError::AuthFailed,
                    other => FetchError::Read(other.to_string()),
                };
                return FetchResult::failed_with(error, partial, Some(Source::Network), &mut log);
            }
        };

        // A peer that closes without a status line gave no response; nothing is stored
        if response.status.is_empty() {
            let error = FetchError::Read("empty response".to_string());
            return FetchResult::failed_with(error, response, Some(Source::Network), &mut log);
        }

        let mut cache_error = None;
        if let Some(key) = save {
            match self.store.store(key, &response.header, &response.body) {
                Ok(path) => log.note(format!("saved to {}", path.display())),
                Err(e) => {
                    warn!("{}", e);
                    let error = FetchError::CacheWrite(e.to_string());
                    log.note(error.to_string());
                    cache_error = Some(error);
                }
            }
        }

        log.enter(FetchState::Done);
        let mut result = FetchResult::completed(response, Source::Network, log);
        result.cache_error = cache_error;
        result
    }

    fn from_cache(&self, key: &CacheKey, mut log: FetchLog) -> FetchResult {
        log.note("reading from cache");

        let file = match self.store.open(key) {
            Ok(file) => file,
            Err(e) => return FetchResult::failed(FetchError::CacheRead(e.to_string()), log),
        };

        match read_response(file, &mut log) {
            Ok(response) if response.status.is_empty() => {
                let error = FetchError::CacheRead("empty cache entry".to_string());
                FetchResult::failed_with(error, response, Some(Source::Cache), &mut log)
            }
            Ok(response) => {
                log.enter(FetchState::Done);
                FetchResult::completed(response, Source::Cache, log)
            }
            Err((e, partial)) => {
                let error = match e {
                    http::Error::AuthFailed => FetchError::AuthFailed,
                    other => FetchError::CacheRead(other.to_string()),
                };
                FetchResult::failed_with(error, partial, Some(Source::Cache), &mut log)
            }
        }
    }
}

/// Parse a response, handing back what was read so far on failure
fn read_response<R: Read>(
    source: R,
    log: &mut FetchLog,
) -> Result<ParsedResponse, (http::Error, ParsedResponse)> {
    let mut reader = LineReader::new(source);
    let mut parser = ResponseParser::new();

    log.enter(FetchState::ReadingHeaders);
    if let Err(e) = parser.read_head(&mut reader) {
        return Err((e, parser.finish()));
    }

    log.enter(FetchState::ReadingBody);
    if let Err(e) = parser.read_body(&mut reader) {
        return Err((e, parser.finish()));
    }

    Ok(parser.finish())
}

fn close_session<S: http::SessionOps>(session: &mut http::HttpSession<S>) {
    if let Err(e) = session.close() {
        debug!("error closing session: {}", e);
    }
}
