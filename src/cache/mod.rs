//! File-backed response cache
//!
//! A cache entry is the raw response (header block, CRLF, body) stored as
//! `{dir}/http_{key}`. The file's modification time is the only freshness
//! signal; there is no metadata file.

pub mod key;
pub mod policy;
pub mod store;

pub use key::CacheKey;
pub use policy::FreshnessPolicy;
pub use store::CacheStore;

use std::path::PathBuf;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache operation errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Could not open {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache name: {0}")]
    InvalidName(String),

    #[error("Invalid ttl: {0}")]
    InvalidPolicy(String),

    #[error("Digest error: {0}")]
    Digest(#[from] openssl::error::ErrorStack),
}
