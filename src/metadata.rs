//! Event metadata: stable key, timestamp, and call-site locator
//!
//! Every `start`/`end` resolves the same triple for an event name:
//!
//! - [`StableKey`]: lowercase hex MD5 of the raw name bytes. Same name, same
//!   key, in every process and run. It is a correlation key, not a security
//!   boundary.
//! - [`Timestamp`]: 19 characters, seconds since the epoch followed by the
//!   nanosecond component, so lexical order matches chronological order.
//! - [`CallSite`]: the `file:line` of the code that called the public API.

use crate::error::{BtError, Result};
use md5::{Digest, Md5};
use regex::Regex;
use std::fmt;
use std::panic::Location;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fixed width of every encoded timestamp
pub const TIMESTAMP_WIDTH: usize = 19;

/// Deterministic fingerprint of an event name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableKey(String);

impl StableKey {
    pub fn for_name(name: &str) -> Self {
        let digest = Md5::digest(name.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-width, lexically sortable wall-clock timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        // A clock set before 1970 encodes as the epoch
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_parts(since_epoch.as_secs(), since_epoch.subsec_nanos())
    }

    /// Encode `secs` and `nanos` as `<secs><nanos:09>`, right-padded with `'0'`
    ///
    /// Ten-digit seconds (2001 through 2286) fill the width exactly; shorter
    /// values are padded, longer ones are left as they are.
    pub fn from_parts(secs: u64, nanos: u32) -> Self {
        let encoded = format!("{secs}{nanos:09}");
        Self(format!("{encoded:0<width$}", width = TIMESTAMP_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn locator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[[:alnum:]_./-]+:[[:digit:]]+").unwrap_or_else(|e| {
            unreachable!("locator pattern is a valid literal: {e}")
        })
    })
}

/// Where a public API call came from
///
/// Capturing is cheap. The locator string is only extracted once the gate
/// has decided the call does real work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSite {
    /// Source location captured through `#[track_caller]`
    Tracked(&'static Location<'static>),
    /// Location text supplied by the caller
    Explicit(String),
}

impl CallSite {
    /// Location of the code calling the enclosing `#[track_caller]` function
    #[track_caller]
    pub fn caller() -> Self {
        Self::Tracked(Location::caller())
    }

    /// Use caller-supplied location text, e.g. from a wrapper that knows better
    pub fn explicit(location: impl Into<String>) -> Self {
        Self::Explicit(location.into())
    }

    /// Extract the first `path:line` token from the location
    pub fn locator(&self) -> Result<String> {
        let text = self.to_string();
        locator_pattern()
            .find(&text)
            .map(|m| m.as_str().to_string())
            .ok_or(BtError::CallSite { location: text })
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tracked(location) => write!(f, "{location}"),
            Self::Explicit(text) => f.write_str(text),
        }
    }
}

/// Everything `start`/`end` need to know about one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub call_site: String,
    pub key: StableKey,
    pub timestamp: Timestamp,
}

impl EventMetadata {
    pub fn resolve(name: &str, site: &CallSite) -> Result<Self> {
        Ok(Self {
            call_site: site.locator()?,
            key: StableKey::for_name(name),
            timestamp: Timestamp::now(),
        })
    }
}
