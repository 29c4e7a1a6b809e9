#![deny(
    rust_2018_idioms,
    unreachable_pub,
    unsafe_code,
    unused_imports,
    unused_mut,
    missing_debug_implementations
)]

extern crate positioned_io_preview as positioned_io;

pub mod byteview;
pub mod cipher;
pub mod dispatcher;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod header;
pub mod huffman;
pub mod image;
pub mod keys;
pub mod reader;
pub mod region;
pub mod sidecar;
pub mod transform;
pub mod writer;

use rust_embed::RustEmbed;

/// Embedded runtime resources, loaded the same way the teacher crate
/// embeds its per-title key dictionaries.
#[derive(Debug, RustEmbed)]
#[folder = "resources/"]
pub struct Resources;
