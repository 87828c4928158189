//! Cache entry names

use super::{CacheError, Result};
use openssl::hash::{hash, MessageDigest};
use std::fmt;

/// Name of a cache entry
///
/// Either the caller's name or, when none is given, the hex MD5 digest of
/// the URL, which keeps the name stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `url`, preferring a non-blank `name`
    pub fn derive(name: &str, url: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Self::digest(url);
        }

        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(CacheKey(name.to_string()))
    }

    /// Hex MD5 digest of `url`
    pub fn digest(url: &str) -> Result<Self> {
        let digest = hash(MessageDigest::md5(), url.as_bytes())?;
        Ok(CacheKey(hex::encode(&*digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
