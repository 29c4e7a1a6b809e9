//! Plaintext archive writer (spec §4.6).

use crate::encoding::encode_name;
use crate::error::ArchiveError;
use crate::header::{HEADER_LEN, MAGIC};

const INDEX_ENTRY_LEN: u64 = 0x20;
const DIR_FLAG_CLEAR: u32 = 0;
const FILE_FLAG: u32 = 0x10000;

/// One entry as reconstructed from a sidecar, ready to be written back
/// out in `entry_index` order.
#[derive(Debug, Clone)]
pub struct WriteEntry {
    pub name: String,
    pub entry_index: u32,
    pub size: u32,
    pub is_dir: bool,
    /// Directories: first-child `entry_index` (written verbatim as `locator`).
    /// Files: the offset table slot this entry owns, written as `offset_index`.
    pub locator: u32,
    /// Directories only: the 4 bytes preserved verbatim from unpack.
    pub directory_tail: [u8; 4],
    /// Files only: write order (rank by ascending original `raw_offset`).
    pub order: Option<u32>,
    /// Files only: the plaintext payload bytes.
    pub data: Option<Vec<u8>>,
}

/// Builds a complete plaintext archive in memory: header, index table,
/// offset table, and aligned data region, in that fixed sequence.
pub fn write_plaintext(entries: &[WriteEntry]) -> Result<Vec<u8>, ArchiveError> {
    let total_count = entries.len() as u32;
    let mut file_entries: Vec<&WriteEntry> = entries.iter().filter(|e| !e.is_dir).collect();
    let file_count = file_entries.len() as u32;

    let mut buf = Vec::new();
    write_header(&mut buf, total_count, file_count);

    let index_start = buf.len();
    write_index_table(&mut buf, entries)?;
    debug_assert_eq!(buf.len(), index_start + (INDEX_ENTRY_LEN * total_count as u64) as usize);

    let offset_table_start = buf.len();
    buf.resize(offset_table_start + 4 * file_count as usize, 0);

    let base_offset = align_up(buf.len() as u64, 0x1000);
    buf.resize(base_offset as usize, 0);

    file_entries.sort_by_key(|e| e.order.unwrap_or(0));
    for pair in file_entries.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(ArchiveError::MalformedArchive(format!(
                "duplicate order {:?} among file entries",
                pair[0].order
            )));
        }
    }

    let mut offset_table = vec![0u32; file_count as usize];
    // Single raw running cursor, carried forward as each file's own
    // (unaligned) end offset — the two-stage alignment below compares a
    // candidate offset against this same cursor, not against the
    // previous file's start.
    let mut cursor = base_offset;
    for file in &file_entries {
        let data = file
            .data
            .as_ref()
            .ok_or_else(|| ArchiveError::MalformedArchive("file entry missing data".into()))?;

        let write_offset = align_two_stage(cursor);
        buf.resize(write_offset as usize, 0);
        buf.extend_from_slice(data);

        debug_assert!((write_offset - base_offset) % 0x400 == 0);
        offset_table[file.locator as usize] = ((write_offset - base_offset) >> 10) as u32;

        cursor = write_offset + data.len() as u64;
    }

    let offset_table_bytes: Vec<u8> = offset_table.iter().flat_map(|v| v.to_le_bytes()).collect();
    buf[offset_table_start..offset_table_start + offset_table_bytes.len()]
        .copy_from_slice(&offset_table_bytes);

    Ok(buf)
}

fn write_header(buf: &mut Vec<u8>, total_count: u32, file_count: u32) {
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&total_count.to_le_bytes());
    buf.extend_from_slice(&file_count.to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]);
    debug_assert_eq!(buf.len() as u64, HEADER_LEN);
}

fn write_index_table(buf: &mut Vec<u8>, entries: &[WriteEntry]) -> Result<(), ArchiveError> {
    let mut ordered = entries.to_vec();
    ordered.sort_by_key(|e| e.entry_index);
    for entry in &ordered {
        let name_field = encode_name(&entry.name)?;
        buf.extend_from_slice(&name_field);
        if entry.is_dir {
            buf.extend_from_slice(&DIR_FLAG_CLEAR.to_le_bytes());
            buf.extend_from_slice(&entry.directory_tail);
        } else {
            buf.extend_from_slice(&FILE_FLAG.to_le_bytes());
            buf.extend_from_slice(&entry.locator.to_le_bytes());
        }
        buf.extend_from_slice(&entry.size.to_le_bytes());
    }
    Ok(())
}

/// Two-stage padding: align `cursor` up to 0x400 first; if that crosses a
/// 0x1000 boundary relative to `cursor` itself, align up to 0x1000
/// instead.
fn align_two_stage(cursor: u64) -> u64 {
    let aligned_400 = align_up(cursor, 0x400);
    if (aligned_400 / 0x1000) != (cursor / 0x1000) {
        align_up(cursor, 0x1000)
    } else {
        aligned_400
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::open;
    use crate::byteview::ByteView;
    use crate::keys::KeyCatalog;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn writes_single_file_archive_and_reads_it_back() {
        let entries = vec![WriteEntry {
            name: "a.txt".to_string(),
            entry_index: 0,
            size: 4,
            is_dir: false,
            locator: 0,
            directory_tail: [0; 4],
            order: Some(0),
            data: Some(b"test".to_vec()),
        }];

        let bytes = write_plaintext(&entries).unwrap();

        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        f.flush().unwrap();

        let view = ByteView::open(f.path()).unwrap();
        let archive = open(&view, &KeyCatalog::new()).unwrap();
        assert_eq!(archive.entries.len(), 1);
        assert_eq!(archive.entries[0].path, "a.txt");
        assert_eq!(archive.entries[0].size, 4);

        let payload = view
            .read_at(archive.entries[0].raw_offset.unwrap(), 4)
            .unwrap();
        assert_eq!(payload, b"test");
    }

    #[test]
    fn rejects_name_too_long() {
        let entries = vec![WriteEntry {
            name: "x".repeat(21),
            entry_index: 0,
            size: 0,
            is_dir: false,
            locator: 0,
            directory_tail: [0; 4],
            order: Some(0),
            data: Some(Vec::new()),
        }];
        assert!(write_plaintext(&entries).is_err());
    }

    /// A file whose size carries the running cursor across a 0x1000
    /// boundary must not push the next file to a fresh page when the
    /// post-alignment candidate offset already lands on the same page as
    /// that raw cursor. Regression test for the two-stage alignment's
    /// comparison operand.
    #[test]
    fn second_file_is_placed_without_spurious_page_escalation() {
        let entries = vec![
            WriteEntry {
                name: "a".to_string(),
                entry_index: 0,
                size: 0x1800,
                is_dir: false,
                locator: 0,
                directory_tail: [0; 4],
                order: Some(0),
                data: Some(vec![0xAB; 0x1800]),
            },
            WriteEntry {
                name: "b".to_string(),
                entry_index: 1,
                size: 4,
                is_dir: false,
                locator: 1,
                directory_tail: [0; 4],
                order: Some(1),
                data: Some(b"test".to_vec()),
            },
        ];

        let bytes = write_plaintext(&entries).unwrap();

        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&bytes).unwrap();
        f.flush().unwrap();

        let view = ByteView::open(f.path()).unwrap();
        let archive = open(&view, &KeyCatalog::new()).unwrap();

        let base_offset = archive.base_offset;
        let offset_a = archive
            .entries
            .iter()
            .find(|e| e.path == "a")
            .unwrap()
            .raw_offset
            .unwrap();
        let offset_b = archive
            .entries
            .iter()
            .find(|e| e.path == "b")
            .unwrap()
            .raw_offset
            .unwrap();

        assert_eq!(offset_a, base_offset);
        assert_eq!(offset_b, base_offset + 0x1800);
    }
}
