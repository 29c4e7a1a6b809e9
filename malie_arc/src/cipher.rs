//! Camellia-256 block cipher (spec §4.2).
//!
//! Thin wrapper over `camellia-rs`, the same crate the teacher's Malie
//! scheme depends on. `absolute_offset` is accepted purely for tracing —
//! per spec this is plain ECB with no tweak derived from position, unlike
//! the ad-hoc per-block bit rotation the teacher's `malie.rs` applies
//! (that rotation is specific to the teacher's own target title and is
//! not part of this format's contract; see DESIGN.md).

use crate::error::ArchiveError;
use camellia_rs::{Block, CamelliaCipher};

#[derive(Debug)]
pub struct Camellia256 {
    cipher: CamelliaCipher,
}

impl Camellia256 {
    pub fn new(key: &[u8; 32]) -> Result<Self, ArchiveError> {
        let cipher = CamelliaCipher::new(key)
            .map_err(|_| ArchiveError::MalformedArchive("invalid Camellia key length".into()))?;
        Ok(Self { cipher })
    }

    /// Decrypts exactly 16 bytes in place at `buf[idx..idx + 16]`.
    /// `absolute_offset` is advisory only, logged for tracing.
    pub fn decrypt_block(&self, absolute_offset: u64, buf: &mut [u8], idx: usize) {
        log::trace!("camellia decrypt block at offset {:#x}", absolute_offset);
        let mut block = Block::default();
        block.bytes.copy_from_slice(&buf[idx..idx + 16]);
        self.cipher.decrypt(&mut block);
        buf[idx..idx + 16].copy_from_slice(&block.bytes);
    }

    /// Encrypts exactly 16 bytes in place at `buf[idx..idx + 16]`.
    pub fn encrypt_block(&self, absolute_offset: u64, buf: &mut [u8], idx: usize) {
        log::trace!("camellia encrypt block at offset {:#x}", absolute_offset);
        let mut block = Block::default();
        block.bytes.copy_from_slice(&buf[idx..idx + 16]);
        self.cipher.encrypt(&mut block);
        buf[idx..idx + 16].copy_from_slice(&block.bytes);
    }
}
