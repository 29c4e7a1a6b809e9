use std::path::PathBuf;
use thiserror::Error;

/// Classified error taxonomy (spec §7). CLI code maps each variant to one
/// of the exit codes in §6; library callers that only need a message
/// chain can keep propagating these through `anyhow::Result` as the
/// teacher crate does with `AkaibuError`.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("no catalog key matched this archive")]
    NoMatchingKey,

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("truncated read at offset {offset:#x}: expected {expected} bytes, got {got}")]
    TruncatedRead {
        offset: u64,
        expected: usize,
        got: usize,
    },

    #[error("entry name {0:?} does not fit in 20 bytes of CP932")]
    NameEncoding(String),

    #[error("sidecar mismatch: {0}")]
    SidecarMismatch(String),

    #[error("corrupt huffman bitstream")]
    CorruptBitstream,

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
