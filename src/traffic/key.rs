//! Time-partitioned storage keys.

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Storage key of one traffic log:
/// `<prefix>/<YYYY>/<MM>/<DD>/<HH>/<hiFiTimestamp>-<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogKey(String);

impl LogKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds [`LogKey`]s under a fixed prefix.
#[derive(Debug, Clone)]
pub struct LogKeyBuilder {
    prefix: String,
}

impl LogKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Deterministic in its inputs; the date partition comes from the UTC
    /// calendar fields of `now`.
    pub fn build(&self, now: DateTime<Utc>, id: &str, hifi_timestamp: &str) -> LogKey {
        LogKey(format!(
            "{}/{:04}/{:02}/{:02}/{:02}/{}-{}.json",
            self.prefix,
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            hifi_timestamp,
            id
        ))
    }
}

impl Default for LogKeyBuilder {
    fn default() -> Self {
        Self::new("network")
    }
}
