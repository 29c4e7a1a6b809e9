//! Bidirectional MGF/PNG image container conversion (spec §4.8).
//!
//! The engine's custom image format is a standard PNG with its 8-byte
//! signature replaced. Metadata past the signature is untouched standard
//! PNG, so conversion is pure prefix substitution.

use crate::error::ArchiveError;

pub const SIGNATURE_LEN: usize = 8;
pub const PNG_SIGNATURE: [u8; SIGNATURE_LEN] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// `'MalieGF'` plus one undefined trailing byte.
pub const MGF_PREFIX: &[u8; 7] = b"MalieGF";

fn check_len(data: &[u8]) -> Result<(), ArchiveError> {
    if data.len() < SIGNATURE_LEN {
        return Err(ArchiveError::MalformedArchive(
            "image container shorter than its signature".into(),
        ));
    }
    Ok(())
}

/// Replaces an MGF signature with the standard PNG signature.
pub fn mgf_to_png(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    check_len(data)?;
    let mut out = data.to_vec();
    out[..SIGNATURE_LEN].copy_from_slice(&PNG_SIGNATURE);
    Ok(out)
}

/// Replaces a PNG signature with an MGF signature. The 8th byte is
/// undefined by the format and `mgf_to_png` discards whatever it held, so
/// there is no way to recover an original mgf's trailing byte from a
/// converted png — this always writes 0x00.
pub fn png_to_mgf_fresh(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    check_len(data)?;
    let mut out = data.to_vec();
    out[..7].copy_from_slice(MGF_PREFIX);
    out[7] = 0x00;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mgf_to_png_replaces_signature_only() {
        let mut data = vec![0x4D, 0x61, 0x6C, 0x69, 0x65, 0x47, 0x46, 0x00];
        data.extend_from_slice(&[0xAAu8; 192]);
        let png = mgf_to_png(&data).unwrap();
        assert_eq!(png.len(), 200);
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert_eq!(&png[8..], &data[8..]);
    }

    #[test]
    fn png_to_mgf_fresh_uses_zero_trailing_byte() {
        let mut original = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        original.extend_from_slice(&[1, 2, 3, 4]);

        let mgf = png_to_mgf_fresh(&original).unwrap();
        assert_eq!(&mgf[..7], MGF_PREFIX);
        assert_eq!(mgf[7], 0x00);
        assert_eq!(&mgf[8..], &original[8..]);
    }

    #[test]
    fn rejects_too_short_input() {
        assert!(mgf_to_png(&[1, 2, 3]).is_err());
    }
}
