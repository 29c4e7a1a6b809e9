//! Output dispatcher (spec §4.10): decides where decrypted entry bytes go
//! and whether they need a final transform before hitting disk.

use crate::transform::{NotTransform, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Written verbatim under the entry's own extension.
    Verbatim,
    /// `.pn` entries are PNG payloads; written out with a `.png` extension.
    RenameToPng,
}

/// Classifies a filename extension into a dispatch sink. Unknown
/// extensions still dispatch as `Verbatim`; signature sniffing is a
/// caller-side fallback this function does not perform.
pub fn classify_extension(name: &str) -> Sink {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "pn" => Sink::RenameToPng,
        _ => Sink::Verbatim,
    }
}

/// Maps an archive-internal entry name to the output filename it should
/// be written under, applying the `.pn` -> `.png` rename.
pub fn output_name(name: &str) -> String {
    match classify_extension(name) {
        Sink::RenameToPng => {
            let stem = name.strip_suffix(".pn").unwrap_or(name);
            format!("{}.png", stem)
        }
        Sink::Verbatim => name.to_string(),
    }
}

/// Threshold below which entries bypass Camellia decryption entirely.
pub const TINY_ENTRY_THRESHOLD: usize = 16;

/// The tiny-entry bypass is only confirmed for the stream handlers that
/// route through the csv/txt/bat dispatch path; ogg/png/other handlers
/// always run the normal decrypt path regardless of size.
fn is_tiny_entry_eligible(name: &str) -> bool {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    matches!(ext.as_str(), "csv" | "txt" | "bat")
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Whether csv/txt/bat entries shorter than [`TINY_ENTRY_THRESHOLD`]
    /// get byte-complemented after bypassing decryption. Feature-gated
    /// per spec §4.10 since this behavior is unconfirmed against every
    /// archive family; defaults on, matching the confirmed test scenario.
    pub tiny_entry_complement: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            tiny_entry_complement: true,
        }
    }
}

/// Whether `name`'s entry, at `size` bytes, should bypass Camellia
/// decryption entirely and go straight to [`dispatch_tiny_entry`].
pub fn bypasses_decryption(name: &str, size: usize) -> bool {
    size < TINY_ENTRY_THRESHOLD && is_tiny_entry_eligible(name)
}

/// Applies the tiny-entry bypass policy to raw (not yet decrypted) bytes.
/// Returns the bytes that should be written to disk under `output_name`.
/// Callers should only reach this after [`bypasses_decryption`] confirms
/// the entry is eligible — this function does not re-check the name.
pub fn dispatch_tiny_entry(raw: &[u8], options: &DispatchOptions) -> Vec<u8> {
    debug_assert!(raw.len() < TINY_ENTRY_THRESHOLD);
    if options.tiny_entry_complement {
        NotTransform.transform_block(raw)
    } else {
        raw.to_vec()
    }
}
