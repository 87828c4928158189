//! cachefetch - raw-socket HTTP/1.0 fetching with a file-backed cache
//!
//! The crate frames HTTP/1.0 requests by hand, reads the reply straight off
//! the socket, and keeps a copy on disk so that later calls can skip the
//! network while the copy is still fresh.
//!
//! - `http` is the wire layer: URL targets, request framing, plain and TLS
//!   sessions, and the response parser
//! - `cache` holds freshness policies, entry names and the on-disk store
//! - `engine` ties both together in `Fetcher`
//! - `table` extracts tables from fetched HTML

pub mod cache;
pub mod engine;
pub mod http;
pub mod table;

pub use cache::FreshnessPolicy;
pub use engine::{FetchError, FetchResult, Fetcher, FetcherConfig, Source};
pub use http::{FetchRequest, Method};
