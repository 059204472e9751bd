//! Calendar date parsing for table cells and query bounds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a date or timestamp string into a calendar date.
///
/// Accepts `YYYY-MM-DD`, naive timestamps with `T` or space separators and
/// RFC 3339 timestamps. The time of day is discarded; an RFC 3339 offset is
/// not applied, so the date is the one written in the string.
#[must_use]
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        return Some(date);
    }
    if let Some(date) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Some(date.date());
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}
