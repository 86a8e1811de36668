//! `google.protobuf.Timestamp` JSON literal parsing: RFC 3339, e.g.
//! `"2023-01-15T12:30:00.250Z"`.
//!
//! Grounded on `end_timestamp_base`/`end_timestamp_zone` in the original
//! implementation, reimplemented against `chrono::DateTime` rather than
//! hand-rolled `strptime`/`mktime` arithmetic. The lower-bound rejection of
//! timestamps before year 1 is preserved.

use chrono::DateTime;

use crate::error::ErrorKind;

/// `0001-01-01T00:00:00Z` expressed as Unix seconds; timestamps earlier than
/// this are rejected, matching the original's `seconds < -62135596800` check.
const MIN_SECONDS: i64 = -62_135_596_800;

/// Parses an RFC 3339 timestamp literal's text (without surrounding quotes)
/// into `(seconds, nanos)` since the Unix epoch.
pub(crate) fn parse(text: &str) -> Result<(i64, i32), ErrorKind> {
    let fixed = DateTime::parse_from_rfc3339(text).map_err(|e| ErrorKind::TimestampRange {
        reason: format!("invalid RFC 3339 timestamp: {e}"),
    })?;

    // The zone grammar is `Z` or `±HH:00`; chrono's RFC 3339 parser is
    // looser and accepts any `±HH:MM` offset, so a non-whole-hour offset has
    // to be rejected by hand.
    if fixed.offset().local_minus_utc() % 3600 != 0 {
        return Err(ErrorKind::TimestampRange {
            reason: "timezone offset must be a whole number of hours".to_owned(),
        });
    }

    let dt = fixed.with_timezone(&chrono::Utc);
    let seconds = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos();

    if seconds < MIN_SECONDS {
        return Err(ErrorKind::TimestampRange {
            reason: "timestamp before 0001-01-01T00:00:00Z".to_owned(),
        });
    }

    // `chrono` accepts fractional-second precision beyond 9 digits by
    // rounding; the wire format caps nanosecond resolution.
    Ok((seconds, nanos as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zulu_timestamp() {
        assert_eq!(
            parse("1970-01-01T00:00:00Z").unwrap(),
            (0, 0)
        );
    }

    #[test]
    fn parses_fractional_seconds() {
        let (s, n) = parse("2023-01-15T12:30:00.250Z").unwrap();
        assert_eq!(n, 250_000_000);
        assert!(s > 0);
    }

    #[test]
    fn parses_numeric_offset() {
        let (s, _) = parse("2023-01-15T12:30:00-05:00").unwrap();
        let (z, _) = parse("2023-01-15T17:30:00Z").unwrap();
        assert_eq!(s, z);
    }

    #[test]
    fn rejects_non_whole_hour_offset() {
        assert!(parse("2023-01-15T12:30:00+05:30").is_err());
    }

    #[test]
    fn rejects_year_zero() {
        assert!(parse("0000-12-31T23:59:59Z").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("not a timestamp").is_err());
    }
}
