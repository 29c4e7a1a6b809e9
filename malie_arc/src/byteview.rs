//! Read-only, random-access window over an archive file (spec §4.1).
//!
//! A `ByteView` never holds a cursor: every read is addressed by an
//! absolute offset into the underlying file, so the same view can be read
//! from multiple call sites (or threads) without coordination. `subrange`
//! clips the readable window but keeps addressing absolute, so offsets
//! computed against the parent view stay valid against the subview.

use crate::error::ArchiveError;
use positioned_io::ReadAt;
use std::{path::Path, sync::Arc};

#[derive(Debug, Clone)]
pub struct ByteView {
    file: Arc<positioned_io::RandomAccessFile>,
    window_start: u64,
    window_end: u64,
}

impl ByteView {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        if !path.is_file() {
            return Err(ArchiveError::InputNotFound(path.to_path_buf()));
        }
        let file = positioned_io::RandomAccessFile::open(path)?;
        let len = path.metadata()?.len();
        Ok(Self {
            file: Arc::new(file),
            window_start: 0,
            window_end: len,
        })
    }

    /// Length of the readable window, in bytes.
    pub fn len(&self) -> u64 {
        self.window_end - self.window_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A restricted view over the same absolute address space. Offsets
    /// passed to `read_at` on the returned view are still absolute file
    /// offsets, not relative to `offset`.
    pub fn subrange(&self, offset: u64, len: u64) -> Self {
        let start = (self.window_start + offset).min(self.window_end);
        let end = start.saturating_add(len).min(self.window_end);
        Self {
            file: Arc::clone(&self.file),
            window_start: start,
            window_end: end,
        }
    }

    /// Reads up to `n` bytes starting at absolute offset `offset`. Short
    /// reads at end-of-window are clamped, never an error: the returned
    /// `Vec` may be shorter than `n`, including empty when `offset` is
    /// past the end of the window.
    pub fn read_at(&self, offset: u64, n: usize) -> Result<Vec<u8>, ArchiveError> {
        if offset >= self.window_end || n == 0 {
            return Ok(Vec::new());
        }
        let max_len = (self.window_end - offset) as usize;
        let to_read = n.min(max_len);
        let mut buf = vec![0u8; to_read];
        let mut got = 0usize;
        while got < to_read {
            let read = self.file.read_at(offset + got as u64, &mut buf[got..])?;
            if read == 0 {
                break;
            }
            got += read;
        }
        buf.truncate(got);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tmpfile(contents: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().expect("create temp file");
        f.write_all(contents).expect("write temp file");
        f.flush().expect("flush temp file");
        f
    }

    #[test]
    fn reads_are_clamped_at_eof() {
        let f = tmpfile(b"hello world");
        let view = ByteView::open(f.path()).unwrap();
        assert_eq!(view.len(), 11);
        assert_eq!(view.read_at(6, 100).unwrap(), b"world");
        assert_eq!(view.read_at(11, 5).unwrap(), b"");
        assert_eq!(view.read_at(100, 5).unwrap(), b"");
    }

    #[test]
    fn subrange_keeps_absolute_addressing() {
        let f = tmpfile(b"0123456789");
        let view = ByteView::open(f.path()).unwrap();
        let sub = view.subrange(3, 4); // window [3,7)
        assert_eq!(sub.len(), 4);
        assert_eq!(sub.read_at(3, 4).unwrap(), b"3456");
        // past the subrange's window end, even though the underlying file
        // has more bytes
        assert_eq!(sub.read_at(7, 2).unwrap(), b"");
    }
}
