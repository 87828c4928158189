//! Freshness policies
//!
//! A policy decides whether a stored copy can be used instead of going to
//! the network, based only on the entry's modification time.

use super::CacheError;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// How long a cached copy stays usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FreshnessPolicy {
    /// Always fetch; never read or write the cache
    #[default]
    NoCache,
    /// Fresh while the entry is younger than the duration; a zero duration
    /// behaves as `NoCache`
    FixedTtl(Duration),
    /// Fresh while the entry was written on today's calendar date
    DailyReset,
}

impl FreshnessPolicy {
    /// A ttl of zero seconds means no caching, not a zero-length window
    pub fn from_ttl_secs(secs: u64) -> Self {
        if secs == 0 {
            FreshnessPolicy::NoCache
        } else {
            FreshnessPolicy::FixedTtl(Duration::from_secs(secs))
        }
    }

    /// Whether this policy reads and writes cache entries at all
    pub fn uses_cache(&self) -> bool {
        match self {
            FreshnessPolicy::NoCache => false,
            FreshnessPolicy::FixedTtl(ttl) => !ttl.is_zero(),
            FreshnessPolicy::DailyReset => true,
        }
    }

    /// Decide freshness using the local time zone for calendar dates
    pub fn is_fresh(&self, modified: SystemTime, now: SystemTime) -> bool {
        self.is_fresh_in(&Local, modified, now)
    }

    /// Decide freshness with calendar dates taken in `tz`
    ///
    /// A modification time in the future counts as age zero.
    pub fn is_fresh_in<Tz: TimeZone>(&self, tz: &Tz, modified: SystemTime, now: SystemTime) -> bool {
        match self {
            FreshnessPolicy::NoCache => false,
            FreshnessPolicy::FixedTtl(ttl) => {
                let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                age < *ttl
            }
            FreshnessPolicy::DailyReset => {
                let modified = DateTime::<Utc>::from(modified).with_timezone(tz);
                let now = DateTime::<Utc>::from(now).with_timezone(tz);
                modified.date_naive() == now.date_naive()
            }
        }
    }
}

impl FromStr for FreshnessPolicy {
    type Err = CacheError;

    /// Accepts `daily`, a number of seconds (fractions allowed), or an empty
    /// string for no caching
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(FreshnessPolicy::NoCache);
        }
        if s.eq_ignore_ascii_case("daily") {
            return Ok(FreshnessPolicy::DailyReset);
        }
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(FreshnessPolicy::from_ttl_secs(secs));
        }

        let ttl = s
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .ok_or_else(|| CacheError::InvalidPolicy(s.to_string()))?;
        if ttl.is_zero() {
            Ok(FreshnessPolicy::NoCache)
        } else {
            Ok(FreshnessPolicy::FixedTtl(ttl))
        }
    }
}

impl fmt::Display for FreshnessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessPolicy::NoCache => write!(f, "0"),
            FreshnessPolicy::FixedTtl(ttl) if ttl.subsec_nanos() == 0 => {
                write!(f, "{}", ttl.as_secs())
            }
            FreshnessPolicy::FixedTtl(ttl) => write!(f, "{}", ttl.as_secs_f64()),
            FreshnessPolicy::DailyReset => write!(f, "daily"),
        }
    }
}
