//! Date coercion for exposure headers and stored records
//!
//! Header writers disagree on how `DATE-OBS` is spelled (bare dates, ISO
//! timestamps with or without fractional seconds, space separated variants).
//! Everything is coerced to a naive UTC `NaiveDateTime` here.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Width of the calibration session window on either side of the anchor
pub const SESSION_WINDOW_HOURS: i64 = 12;

enum Pattern {
    Date(&'static str),
    DateTime(&'static str),
}

/// Tried in order; the first pattern that consumes the whole input wins
const PATTERNS: &[Pattern] = &[
    Pattern::Date("%Y-%m-%d"),
    Pattern::DateTime("%Y-%m-%dT%H:%M:%S"),
    Pattern::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
    Pattern::DateTime("%Y-%m-%d %H:%M:%S"),
    Pattern::DateTime("%Y-%m-%d %H:%M:%S%.f"),
    Pattern::DateTime("%Y-%m-%dT%H:%M"),
    Pattern::DateTime("%Y-%m-%d %H:%M"),
];

/// A date-like value as it arrives from a header or a caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateLike<'a> {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(&'a str),
}

fn parse_with_patterns(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);

    PATTERNS.iter().find_map(|pattern| match pattern {
        Pattern::Date(fmt) => NaiveDate::parse_from_str(trimmed, fmt)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN)),
        Pattern::DateTime(fmt) => NaiveDateTime::parse_from_str(trimmed, fmt).ok(),
    })
}

fn parse_leading_date(input: &str) -> Option<NaiveDateTime> {
    let head: String = input.trim().chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a header date into a timestamp.
///
/// Falls back to the first 10 characters as a bare date when no pattern
/// matches. Returns `None` (and logs a warning) when nothing parses; never panics.
pub fn to_date_value(input: &str) -> Option<NaiveDateTime> {
    if let Some(value) = parse_with_patterns(input) {
        return Some(value);
    }

    if let Some(value) = parse_leading_date(input) {
        tracing::debug!(input, "Date parsed from leading 10 characters only");
        return Some(value);
    }

    tracing::warn!(input, "Unparsable date value");
    None
}

/// Canonicalize a date-like value to `YYYY-MM-DD`.
///
/// `None` stays `None`; text that cannot be parsed is returned unchanged.
pub fn to_date_string(value: Option<DateLike<'_>>) -> Option<String> {
    match value? {
        DateLike::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
        DateLike::DateTime(dt) => Some(dt.format("%Y-%m-%d").to_string()),
        DateLike::Text(text) => match parse_with_patterns(text).or_else(|| parse_leading_date(text)) {
            Some(dt) => Some(dt.format("%Y-%m-%d").to_string()),
            None => Some(text.to_string()),
        },
    }
}

/// True when two timestamps are at most 12 hours apart (inclusive)
pub fn same_day(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    let window_ms = SESSION_WINDOW_HOURS * 3_600_000;
    a.signed_duration_since(b).num_milliseconds().abs() <= window_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_bare_date_is_midnight() {
        assert_eq!(to_date_value("2024-05-01"), Some(dt("2024-05-01T00:00:00")));
    }

    #[test]
    fn test_iso_with_seconds() {
        assert_eq!(
            to_date_value("2024-05-01T22:15:30"),
            Some(dt("2024-05-01T22:15:30"))
        );
    }

    #[test]
    fn test_iso_with_fraction() {
        let value = to_date_value("2024-05-01T22:15:30.250").unwrap();
        assert_eq!(value.format("%H:%M:%S%.3f").to_string(), "22:15:30.250");
    }

    #[test]
    fn test_space_separated() {
        assert_eq!(
            to_date_value("2024-05-01 22:15:30"),
            Some(dt("2024-05-01T22:15:30"))
        );
    }

    #[test]
    fn test_trailing_utc_designator() {
        assert_eq!(
            to_date_value("2024-05-01T22:15:30Z"),
            Some(dt("2024-05-01T22:15:30"))
        );
    }

    #[test]
    fn test_truncation_fallback() {
        assert_eq!(
            to_date_value("2024-05-01/garbage"),
            Some(dt("2024-05-01T00:00:00"))
        );
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(to_date_value("last tuesday"), None);
        assert_eq!(to_date_value(""), None);
    }

    #[test]
    fn test_to_date_string_variants() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(to_date_string(None), None);
        assert_eq!(
            to_date_string(Some(DateLike::Date(date))).as_deref(),
            Some("2024-05-01")
        );
        assert_eq!(
            to_date_string(Some(DateLike::DateTime(dt("2024-05-01T22:15:30")))).as_deref(),
            Some("2024-05-01")
        );
        assert_eq!(
            to_date_string(Some(DateLike::Text("2024-05-01 03:00:00"))).as_deref(),
            Some("2024-05-01")
        );
        assert_eq!(
            to_date_string(Some(DateLike::Text("not a date"))).as_deref(),
            Some("not a date")
        );
    }

    #[test]
    fn test_same_day_window_edges() {
        let anchor = dt("2024-05-01T23:00:00");
        assert!(same_day(anchor, anchor));
        assert!(same_day(anchor, dt("2024-05-02T11:00:00")));
        assert!(!same_day(anchor, dt("2024-05-02T11:00:01")));
        assert!(same_day(dt("2024-05-02T11:00:00"), anchor));
        assert!(!same_day(dt("2024-05-02T11:00:01"), anchor));
    }
}
