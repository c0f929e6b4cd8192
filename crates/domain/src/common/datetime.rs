//! DateTime parsing helpers for stores that keep timestamps as RFC3339 text.

use chrono::{DateTime, Utc};

/// Parses an RFC3339 timestamp string into UTC.
///
/// # Errors
///
/// Returns `chrono::ParseError` if the string is not valid RFC3339.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
