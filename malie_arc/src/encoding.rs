//! CP932 (Shift-JIS superset) entry-name encoding (spec §3, §4.6).

use crate::error::ArchiveError;
use encoding_rs::SHIFT_JIS;

pub const NAME_FIELD_LEN: usize = 20;

/// Decodes a NUL-padded, `NAME_FIELD_LEN`-byte CP932 name field. Unmappable
/// sequences are lossily replaced with U+FFFD rather than rejected, since
/// the archives in the wild are not guaranteed to be pure Shift-JIS.
pub fn decode_name(field: &[u8]) -> String {
    let trimmed = match field.iter().position(|&b| b == 0) {
        Some(idx) => &field[..idx],
        None => field,
    };
    let (cow, _, _) = SHIFT_JIS.decode(trimmed);
    cow.into_owned()
}

/// Encodes `name` into a `NAME_FIELD_LEN`-byte, NUL-padded field. Hard
/// error if the encoded form does not fit.
pub fn encode_name(name: &str) -> Result<[u8; NAME_FIELD_LEN], ArchiveError> {
    let (cow, _, had_unmappable) = SHIFT_JIS.encode(name);
    if had_unmappable {
        return Err(ArchiveError::NameEncoding(name.to_string()));
    }
    if cow.len() > NAME_FIELD_LEN {
        return Err(ArchiveError::NameEncoding(name.to_string()));
    }
    let mut field = [0u8; NAME_FIELD_LEN];
    field[..cow.len()].copy_from_slice(&cow);
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_name_round_trips() {
        let field = encode_name("a.txt").unwrap();
        assert_eq!(decode_name(&field), "a.txt");
    }

    #[test]
    fn rejects_names_too_long() {
        let long_name = "x".repeat(NAME_FIELD_LEN + 1);
        assert!(encode_name(&long_name).is_err());
    }

    #[test]
    fn decode_stops_at_first_nul() {
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..3].copy_from_slice(b"abc");
        assert_eq!(decode_name(&field), "abc");
    }
}
