//! Time-derived ordinal identifiers
//!
//! An `OrdinalId` is the UTC wall clock at microsecond resolution rendered as
//! `YYYYMMDDTHHMMSSffffff`. The format is fixed-width, so lexicographic order
//! is chronological order. Ids issued by one process are strictly increasing:
//! when the clock has not moved past the last issued microsecond, the next
//! microsecond is taken instead.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

const ID_FORMAT: &str = "%Y%m%dT%H%M%S%6f";
const SECONDS_FORMAT: &str = "%Y%m%dT%H%M%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

static LAST_MICROS: AtomicI64 = AtomicI64::new(0);

/// Next microsecond timestamp, strictly greater than any previously returned.
pub(crate) fn next_micros() -> i64 {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_MICROS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_MICROS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Next monotonic instant as a UTC datetime
pub(crate) fn next_instant() -> DateTime<Utc> {
    let micros = next_micros();
    DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
}

/// Monotonic, time-derived identifier used as primary key and sort key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrdinalId(String);

impl OrdinalId {
    /// Allocate a fresh identifier
    pub fn generate() -> Self {
        Self(next_instant().format(ID_FORMAT).to_string())
    }

    /// Wrap an identifier read back from storage
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable timestamp (`YYYY-MM-DD HH:MM`, UTC) decoded from the id.
    ///
    /// Returns `None` for ids that do not carry a parsable timestamp; callers
    /// simply omit the timestamp in that case.
    pub fn display_time(&self) -> Option<String> {
        let seconds = self.0.get(..15)?;
        let parsed = NaiveDateTime::parse_from_str(seconds, SECONDS_FORMAT).ok()?;
        Some(parsed.format(DISPLAY_FORMAT).to_string())
    }
}

impl fmt::Display for OrdinalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrdinalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
