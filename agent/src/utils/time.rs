//! Time utility functions

use chrono::{DateTime, Utc};

use crate::core::constants::INDEX_DATE_FORMAT;

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format a UTC date the way daily indices are suffixed (`yyyy.MM.dd`)
pub fn logstash_date(dt: DateTime<Utc>) -> String {
    dt.format(INDEX_DATE_FORMAT).to_string()
}

/// Convert milliseconds since Unix epoch to DateTime<Utc>
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::warn!(millis, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}
