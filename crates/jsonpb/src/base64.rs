//! Decoder for `bytes`-field JSON literals.
//!
//! Accepts both the standard and URL-safe alphabets, and both padded and
//! unpadded input, since real-world producers disagree on which variant the
//! proto3 JSON mapping calls for; either way the un-padded character count
//! must be a whole multiple of 4, matching the original's strict
//! 4-character grouping.

use crate::error::ErrorKind;

/// Decodes a base64 literal (already stripped of surrounding quotes) into
/// raw bytes.
pub(crate) fn decode(text: &str) -> Result<Vec<u8>, ErrorKind> {
    let stripped = text.trim_end_matches('=');
    if stripped.len() % 4 != 0 {
        return Err(ErrorKind::InvalidBase64 {
            reason: "length is not a multiple of 4".to_owned(),
        });
    }

    let mut out = Vec::with_capacity(stripped.len() * 3 / 4 + 3);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for c in stripped.bytes() {
        let sextet = sextet(c).ok_or_else(|| ErrorKind::InvalidBase64 {
            reason: format!("invalid character '{}'", c as char),
        })?;
        acc = (acc << 6) | u32::from(sextet);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push(((acc >> bits) & 0xFF) as u8);
        }
    }

    // Any leftover bits must be zero padding, not data.
    if bits > 0 && (acc & ((1 << bits) - 1)) != 0 {
        return Err(ErrorKind::InvalidBase64 {
            reason: "non-zero padding bits".to_owned(),
        });
    }

    Ok(out)
}

fn sextet(c: u8) -> Option<u8> {
    Some(match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' | b'-' => 62,
        b'/' | b'_' => 63,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_standard() {
        assert_eq!(decode("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn decodes_unpadded_when_length_is_already_a_multiple_of_four() {
        // "foo" is 3 bytes, so its base64 encoding needs no padding.
        assert_eq!(decode("Zm9v").unwrap(), b"foo");
    }

    #[test]
    fn rejects_unpadded_length_not_a_multiple_of_four() {
        assert!(decode("aGVsbG8").is_err());
        assert!(decode("QQ").is_err());
    }

    #[test]
    fn decodes_url_safe_alphabet() {
        assert_eq!(decode("PDw_Pz8-Pg").unwrap(), decode("PDw/Pz8+Pg==").unwrap());
    }

    #[test]
    fn rejects_invalid_character() {
        assert!(decode("not base64!!").is_err());
    }

    #[test]
    fn empty_decodes_to_empty() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }
}
