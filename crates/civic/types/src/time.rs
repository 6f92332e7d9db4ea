//! Lenient timestamp decoding for persisted schedule fields.
//!
//! Stored phase-end dates may be missing or malformed. Decoding never fails:
//! an unusable value becomes `None`, which the election controller treats as
//! "not yet elapsed".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a stored timestamp, returning `None` when it cannot be understood.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]`
/// (interpreted as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Decode an optional stored timestamp
pub fn parse_optional(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

/// Encode a timestamp for storage
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Whether a deadline has passed. An unknown deadline has not.
pub fn has_elapsed(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    deadline.map(|d| now >= d).unwrap_or(false)
}
