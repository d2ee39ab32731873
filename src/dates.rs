//! Date parsing helpers
//!
//! Registry payloads, archived items and command-line flags spell timestamps
//! in slightly different ways. Everything funnels through [`parse_timestamp`]
//! so that comparisons always happen on `DateTime<Utc>` values.

use crate::{HarvestError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Default lower bound for fetches: the Unix epoch
pub const DEFAULT_DATETIME: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a timestamp string into UTC
///
/// Accepted forms, tried in order:
///
/// 1. RFC 3339 (`2021-06-01T00:00:00+00:00`, `2021-06-01T00:00:00.123Z`)
/// 2. Space separated with offset (`2021-06-01 00:00:00.123+00:00`)
/// 3. Naive date-time, assumed to be UTC (`2021-06-01T00:00:00`)
/// 4. Bare date at midnight UTC (`2021-06-01`)
///
/// # Errors
///
/// Returns `HarvestError::InvalidTimestamp` if none of the forms match.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(HarvestError::InvalidTimestamp(value.to_string()))
}

/// Converts a UTC datetime into floating point Unix seconds
pub fn timestamp_seconds(dt: DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1_000_000.0
}

/// Formats a UTC datetime the way `fetched_on` is emitted
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
