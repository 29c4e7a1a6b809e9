//! Encrypted-region I/O (spec §4.3): reads/writes arbitrary byte ranges
//! through Camellia-ECB, handling sub-block alignment.

use crate::byteview::ByteView;
use crate::cipher::Camellia256;
use crate::error::ArchiveError;

/// Fills `length` bytes starting at absolute `offset`, decrypting as
/// needed. A zero-length request is a no-op; a request wholly past EOF
/// returns an empty vec.
pub fn read_encrypted(
    view: &ByteView,
    cipher: &Camellia256,
    offset: u64,
    length: usize,
) -> Result<Vec<u8>, ArchiveError> {
    if length == 0 || offset >= view.len() {
        return Ok(Vec::new());
    }
    let pad = (offset % 16) as usize;
    let aligned_len = ((pad + length + 15) / 16) * 16;
    let aligned_offset = offset - pad as u64;

    let mut buf = view.read_at(aligned_offset, aligned_len)?;
    // Short reads at EOF are zero-filled so the block cipher always has a
    // full 16-byte block to operate on.
    buf.resize(aligned_len, 0);

    let block_count = aligned_len / 16;
    for i in 0..block_count {
        cipher.decrypt_block(aligned_offset + (16 * i) as u64, &mut buf, i * 16);
    }

    let end = (pad + length).min(buf.len());
    Ok(buf[pad..end].to_vec())
}

/// Symmetric counterpart of [`read_encrypted`]: encrypts `plaintext` and
/// returns the bytes that should be written at absolute `offset`, along
/// with the (possibly earlier) aligned offset they start at. Callers that
/// need to merge with existing on-disk bytes must read-modify-write the
/// padding bytes themselves; this crate's writer always writes whole,
/// 16-byte-aligned regions so no merge is required in practice.
pub fn write_encrypted(
    cipher: &Camellia256,
    offset: u64,
    plaintext: &[u8],
) -> (u64, Vec<u8>) {
    if plaintext.is_empty() {
        return (offset, Vec::new());
    }
    let pad = (offset % 16) as usize;
    let aligned_len = ((pad + plaintext.len() + 15) / 16) * 16;
    let aligned_offset = offset - pad as u64;

    let mut buf = vec![0u8; aligned_len];
    buf[pad..pad + plaintext.len()].copy_from_slice(plaintext);

    let block_count = aligned_len / 16;
    for i in 0..block_count {
        cipher.encrypt_block(aligned_offset + (16 * i) as u64, &mut buf, i * 16);
    }

    (aligned_offset, buf)
}
