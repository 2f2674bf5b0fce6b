//! Record timestamps.
//!
//! Stored records carry their modification time in whatever field the
//! feature that wrote them chose: epoch milliseconds, ISO-8601 strings, or
//! nothing at all. [`RecordTimestamp`] normalises those into epoch
//! milliseconds. A record without a usable time is [`RecordTimestamp::ZERO`],
//! which loses every tie-free comparison against a timed record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTimestamp(i64);

impl RecordTimestamp {
    /// The timestamp given to records with no extractable time.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Returns epoch milliseconds.
    #[must_use]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// Returns true if no time was found for the record.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Interprets a single JSON scalar as a timestamp.
    ///
    /// Numbers are epoch milliseconds. Strings may be numeric, RFC 3339,
    /// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
    /// Anything else yields `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .filter(|ms| *ms > 0)
                .map(Self),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Parses a date string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(ms) = s.parse::<i64>() {
            return (ms > 0).then_some(Self(ms));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.timestamp_millis()));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self(naive.and_utc().timestamp_millis()));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc().timestamp_millis()))
    }

    /// Renders the timestamp as RFC 3339 with millisecond precision.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.0)
            .unwrap_or_default()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

impl fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordTimestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}
