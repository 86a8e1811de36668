//! `google.protobuf.Duration` JSON literal parsing: `"[-]SECONDS(.FRACTION)?s"`.
//!
//! Grounded on `end_duration_base` in the original implementation: split at
//! the final `.`, parse the whole-seconds part with a signed range check,
//! parse the fractional part as nanoseconds, and apply the sign of the
//! seconds part to the fractional part too.

use crate::error::ErrorKind;

const DURATION_SECONDS_MAX: i64 = 315_576_000_000;

/// Parses a duration literal's text (without the surrounding quotes) into
/// `(seconds, nanos)`.
pub(crate) fn parse(text: &str) -> Result<(i64, i32), ErrorKind> {
    let body = text.strip_suffix('s').ok_or_else(|| ErrorKind::DurationRange {
        reason: "duration must end in 's'".to_owned(),
    })?;

    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (body, None),
    };

    if whole.is_empty() || whole == "-" {
        return Err(ErrorKind::DurationRange {
            reason: "missing seconds".to_owned(),
        });
    }

    let seconds: i64 = whole.parse().map_err(|_| ErrorKind::DurationRange {
        reason: format!("invalid seconds component '{whole}'"),
    })?;

    if seconds.abs() > DURATION_SECONDS_MAX {
        return Err(ErrorKind::DurationRange {
            reason: format!("seconds {seconds} outside of ±{DURATION_SECONDS_MAX}"),
        });
    }

    let negative = whole.starts_with('-') || (seconds == 0 && whole.starts_with("-0"));

    let nanos = match frac {
        None => 0,
        Some(f) if f.is_empty() => {
            return Err(ErrorKind::DurationRange {
                reason: "empty fractional part".to_owned(),
            });
        }
        Some(f) => {
            if !f.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ErrorKind::DurationRange {
                    reason: format!("invalid fractional component '{f}'"),
                });
            }
            if f.len() > 9 {
                return Err(ErrorKind::DurationRange {
                    reason: "fractional part has more than 9 digits".to_owned(),
                });
            }
            let mut digits = f.to_owned();
            while digits.len() < 9 {
                digits.push('0');
            }
            let mut n: i32 = digits.parse().map_err(|_| ErrorKind::DurationRange {
                reason: format!("invalid fractional component '{f}'"),
            })?;
            if negative {
                n = -n;
            }
            n
        }
    };

    Ok((seconds, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_seconds() {
        assert_eq!(parse("5s").unwrap(), (5, 0));
    }

    #[test]
    fn fractional_seconds() {
        assert_eq!(parse("1.5s").unwrap(), (1, 500_000_000));
    }

    #[test]
    fn negative_duration_negates_nanos_too() {
        assert_eq!(parse("-1.5s").unwrap(), (-1, -500_000_000));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(parse("315576000001s").is_err());
    }

    #[test]
    fn rejects_missing_suffix() {
        assert!(parse("5").is_err());
    }

    #[test]
    fn pads_short_fraction() {
        assert_eq!(parse("0.25s").unwrap(), (0, 250_000_000));
    }
}
