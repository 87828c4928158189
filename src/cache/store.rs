//! On-disk cache store

use super::{CacheError, CacheKey, Result};
use crate::http::CRLF;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Prefix of every cache file name
pub const ENTRY_PREFIX: &str = "http_";

/// Directory of cache entries
///
/// Each call opens, uses and releases its own file handle. Entries are
/// replaced by renaming a fully written temporary file over them, so a
/// concurrent reader sees either the old or the new entry, never a torn one.
/// Nothing here deletes entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/http_{key}`
    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}{}", ENTRY_PREFIX, key))
    }

    /// Modification time of the entry, `None` if there is no entry
    pub fn modified(&self, key: &CacheKey) -> Option<SystemTime> {
        let path = self.path(key);
        match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(ts) => Some(ts),
            Err(e) => {
                debug!("{} not usable: {}", path.display(), e);
                None
            }
        }
    }

    /// Open the entry for reading
    pub fn open(&self, key: &CacheKey) -> Result<File> {
        let path = self.path(key);
        File::open(&path).map_err(|source| CacheError::Read { path, source })
    }

    /// Replace the entry with `header` + CRLF + `body`
    pub fn store(&self, key: &CacheKey, header: &[u8], body: &[u8]) -> Result<PathBuf> {
        let path = self.path(key);
        let write_error = |source: io::Error| CacheError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_error)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}", ENTRY_PREFIX))
            .tempfile_in(&self.dir)
            .map_err(write_error)?;

        tmp.write_all(header).map_err(write_error)?;
        tmp.write_all(CRLF.as_bytes()).map_err(write_error)?;
        tmp.write_all(body).map_err(write_error)?;
        tmp.flush().map_err(write_error)?;

        tmp.persist(&path).map_err(|e| write_error(e.error))?;
        debug!("stored {} bytes in {}", header.len() + CRLF.len() + body.len(), path.display());
        Ok(path)
    }
}
