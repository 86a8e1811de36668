//! Conversion of a captured numeric (or quoted-numeric) literal into the
//! scalar type demanded by a field's [`prost_reflect::Kind`].
//!
//! Grounded on `parse_number_from_buffer` in the original C implementation:
//! same per-kind range checks and the same `Infinity`/`-Infinity` literal
//! handling, but reading uniformly from the captured text rather than from
//! whichever buffer happened to be live (the original's `UINT64` arm reads
//! from the wrong variable; this version does not reproduce that).

use prost_reflect::Kind;

use crate::error::ErrorKind;

/// A decoded numeric value, tagged with the Rust type the field kind maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumberValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

/// Parses `text` (the literal exactly as captured, without surrounding
/// quotes) into the scalar type `kind` expects.
///
/// `was_quoted` gates the fractional-coercion fallback below: a *bare* JSON
/// number like `3.0` is accepted into an integer field if it is integral,
/// but a *quoted* literal requiring that same fallback (`"3.0"`) is rejected
/// outright, matching the proto3 JSON mapping's requirement that a quoted
/// integer be spelled as a plain integer, never as a float.
pub(crate) fn parse_number(
    text: &str,
    kind: &Kind,
    was_quoted: bool,
) -> Result<NumberValue, ErrorKind> {
    match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            parse_i64_checked(text, i64::from(i32::MIN), i64::from(i32::MAX), was_quoted)
                .map(|v| NumberValue::I32(v as i32))
        }
        Kind::Uint32 | Kind::Fixed32 => {
            parse_u64_checked(text, u64::from(u32::MAX), was_quoted).map(|v| NumberValue::U32(v as u32))
        }
        Kind::Enum(_) => parse_i64_checked(text, i64::from(i32::MIN), i64::from(i32::MAX), was_quoted)
            .map(|v| NumberValue::I32(v as i32)),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            parse_i64_checked(text, i64::MIN, i64::MAX, was_quoted).map(NumberValue::I64)
        }
        Kind::Uint64 | Kind::Fixed64 => {
            parse_u64_checked(text, u64::MAX, was_quoted).map(NumberValue::U64)
        }
        Kind::Float => parse_float(text).map(|v| NumberValue::F32(v as f32)),
        Kind::Double => parse_float(text).map(NumberValue::F64),
        _ => Err(ErrorKind::NumberRange {
            text: text.to_owned(),
        }),
    }
}

fn bad(text: &str) -> ErrorKind {
    ErrorKind::NumberRange {
        text: text.to_owned(),
    }
}

fn is_fractional(text: &str) -> bool {
    text.contains('.') || text.contains('e') || text.contains('E')
}

fn parse_i64_checked(text: &str, min: i64, max: i64, was_quoted: bool) -> Result<i64, ErrorKind> {
    if is_fractional(text) {
        if was_quoted {
            // A quoted integer literal must be spelled as a plain integer;
            // "3.0" is not a legal spelling even though it is integral.
            return Err(bad(text));
        }
        // A bare JSON number was given for an integer field; only accept it
        // if it is integral (e.g. `3.0`).
        let f: f64 = text.parse().map_err(|_| bad(text))?;
        if f.fract() != 0.0 || f < min as f64 || f > max as f64 {
            return Err(bad(text));
        }
        return Ok(f as i64);
    }
    let v: i64 = text.parse().map_err(|_| bad(text))?;
    if v < min || v > max {
        return Err(bad(text));
    }
    Ok(v)
}

fn parse_u64_checked(text: &str, max: u64, was_quoted: bool) -> Result<u64, ErrorKind> {
    if text.starts_with('-') {
        return Err(bad(text));
    }
    if is_fractional(text) {
        if was_quoted {
            return Err(bad(text));
        }
        let f: f64 = text.parse().map_err(|_| bad(text))?;
        if f.fract() != 0.0 || f < 0.0 || f > max as f64 {
            return Err(bad(text));
        }
        return Ok(f as u64);
    }
    let v: u64 = text.parse().map_err(|_| bad(text))?;
    if v > max {
        return Err(bad(text));
    }
    Ok(v)
}

fn parse_float(text: &str) -> Result<f64, ErrorKind> {
    match text {
        "Infinity" => return Ok(f64::INFINITY),
        "-Infinity" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    text.parse::<f64>().map_err(|_| bad(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_range_checked() {
        assert!(matches!(
            parse_number("2147483647", &Kind::Int32, false),
            Ok(NumberValue::I32(2_147_483_647))
        ));
        assert!(parse_number("2147483648", &Kind::Int32, false).is_err());
    }

    #[test]
    fn quoted_uint64_accepted() {
        assert_eq!(
            parse_number("18446744073709551615", &Kind::Uint64, true).unwrap(),
            NumberValue::U64(u64::MAX)
        );
    }

    #[test]
    fn negative_uint32_rejected() {
        assert!(parse_number("-1", &Kind::Uint32, false).is_err());
    }

    #[test]
    fn double_accepts_infinity_literal() {
        match parse_number("Infinity", &Kind::Double, false).unwrap() {
            NumberValue::F64(v) => assert!(v.is_infinite() && v > 0.0),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn integral_double_into_int_field() {
        assert_eq!(
            parse_number("3.0", &Kind::Int32, false).unwrap(),
            NumberValue::I32(3)
        );
        assert!(parse_number("3.5", &Kind::Int32, false).is_err());
    }

    #[test]
    fn quoted_fractional_literal_rejected_for_integer_kinds() {
        assert!(parse_number("3.0", &Kind::Int32, true).is_err());
        assert!(parse_number("3.0", &Kind::Uint64, true).is_err());
        assert!(parse_number("1e2", &Kind::Int64, true).is_err());
        assert_eq!(
            parse_number("3", &Kind::Int32, true).unwrap(),
            NumberValue::I32(3)
        );
    }
}
