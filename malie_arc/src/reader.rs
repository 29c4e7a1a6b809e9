//! Archive reader (spec §4.5): key-trial opening protocol plus the
//! pre-order DFS index walk.

use crate::byteview::ByteView;
use crate::cipher::Camellia256;
use crate::entry::{Entry, EntryKind};
use crate::error::ArchiveError;
use crate::header::{HEADER_LEN, MAGIC};
use crate::keys::KeyCatalog;
use crate::region::read_encrypted;

const INDEX_ENTRY_LEN: u64 = 0x20;

/// Passes bytes through unchanged; used for plaintext archives so the
/// same DFS-walking code serves both flavors.
enum Decryptor {
    Plain,
    Keyed(Camellia256),
}

impl Decryptor {
    fn read(&self, view: &ByteView, offset: u64, len: usize) -> Result<Vec<u8>, ArchiveError> {
        match self {
            Decryptor::Plain => Ok(view.read_at(offset, len)?),
            Decryptor::Keyed(cipher) => read_encrypted(view, cipher, offset, len),
        }
    }
}

#[derive(Debug)]
pub struct OpenArchive {
    pub entries: Vec<Entry>,
    /// Label of the catalog key that decrypted this archive, or `None`
    /// for a plaintext archive.
    pub key_label: Option<String>,
    pub base_offset: u64,
}

/// Attempts to open `view` as a plaintext archive, and on failure tries
/// each key in `catalog` in order. Returns a distinguishable failure
/// (`ArchiveError::NoMatchingKey`) if every attempt fails, so callers can
/// decide what to try next.
pub fn open(view: &ByteView, catalog: &KeyCatalog) -> Result<OpenArchive, ArchiveError> {
    if let Ok(archive) = try_open(view, &Decryptor::Plain) {
        return Ok(OpenArchive {
            key_label: None,
            ..archive
        });
    }
    for key_entry in catalog.iter() {
        let cipher = Camellia256::new(&key_entry.key)?;
        if let Ok(archive) = try_open(view, &Decryptor::Keyed(cipher)) {
            return Ok(OpenArchive {
                key_label: Some(key_entry.label.clone()),
                ..archive
            });
        }
    }
    Err(ArchiveError::NoMatchingKey)
}

/// Decrypts an entire archive view to a single plaintext blob, trying the
/// same key-trial protocol as [`open`] but without parsing the index.
/// Used by `unpack-plain`, which only needs a bit-faithful decrypted copy
/// of the container, not a reconstructed file tree.
pub fn decrypt_whole(
    view: &ByteView,
    catalog: &KeyCatalog,
) -> Result<(Vec<u8>, Option<String>), ArchiveError> {
    if try_open(view, &Decryptor::Plain).is_ok() {
        return Ok((view.read_at(0, view.len() as usize)?, None));
    }
    for key_entry in catalog.iter() {
        let cipher = Camellia256::new(&key_entry.key)?;
        let decryptor = Decryptor::Keyed(cipher);
        if try_open(view, &decryptor).is_ok() {
            let plaintext = decryptor.read(view, 0, view.len() as usize)?;
            return Ok((plaintext, Some(key_entry.label.clone())));
        }
    }
    Err(ArchiveError::NoMatchingKey)
}

fn try_open(view: &ByteView, decryptor: &Decryptor) -> Result<OpenArchive, ArchiveError> {
    let header_buf = decryptor.read(view, 0, HEADER_LEN as usize)?;
    if header_buf.len() < HEADER_LEN as usize || &header_buf[0..4] != MAGIC {
        return Err(ArchiveError::MalformedArchive("bad magic".into()));
    }
    let total_count = u32::from_le_bytes(header_buf[4..8].try_into().unwrap());
    let offset_count = u32::from_le_bytes(header_buf[8..12].try_into().unwrap());
    if total_count == 0 {
        return Err(ArchiveError::MalformedArchive("zero total_count".into()));
    }

    let index_size = INDEX_ENTRY_LEN * total_count as u64;
    let offset_table_size = 4u64 * offset_count as u64;

    let index_buf = decryptor.read(view, HEADER_LEN, index_size as usize)?;
    if index_buf.len() < index_size as usize {
        return Err(ArchiveError::TruncatedRead {
            offset: HEADER_LEN,
            expected: index_size as usize,
            got: index_buf.len(),
        });
    }
    let offset_table_buf =
        decryptor.read(view, HEADER_LEN + index_size, offset_table_size as usize)?;
    if offset_table_buf.len() < offset_table_size as usize {
        return Err(ArchiveError::TruncatedRead {
            offset: HEADER_LEN + index_size,
            expected: offset_table_size as usize,
            got: offset_table_buf.len(),
        });
    }
    let offset_table: Vec<u32> = offset_table_buf
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();

    let pre_align = HEADER_LEN + index_size + offset_table_size;
    let base_offset = align_up(pre_align, 0x1000);

    let mut entries = Vec::new();
    read_dir(
        &index_buf,
        &offset_table,
        total_count,
        base_offset,
        "",
        0,
        1,
        &mut entries,
    )?;

    if entries.is_empty() {
        return Err(ArchiveError::MalformedArchive("empty entry list".into()));
    }

    Ok(OpenArchive {
        entries,
        key_label: None,
        base_offset,
    })
}

#[allow(clippy::too_many_arguments)]
fn read_dir(
    index_buf: &[u8],
    offset_table: &[u32],
    total_count: u32,
    base_offset: u64,
    parent_path: &str,
    entry_index: u32,
    count: u32,
    out: &mut Vec<Entry>,
) -> Result<(), ArchiveError> {
    for i in 0..count {
        let idx = entry_index
            .checked_add(i)
            .ok_or_else(|| ArchiveError::MalformedArchive("entry_index overflow".into()))?;
        if idx >= total_count {
            return Err(ArchiveError::MalformedArchive(
                "entry_index out of range".into(),
            ));
        }
        let rec_offset = (idx as u64) * INDEX_ENTRY_LEN;
        let rec = &index_buf[rec_offset as usize..(rec_offset + INDEX_ENTRY_LEN) as usize];

        let name = crate::encoding::decode_name(&rec[0..0x14]);
        let flags = u32::from_le_bytes(rec[0x14..0x18].try_into().unwrap());
        let locator = i32::from_le_bytes(rec[0x18..0x1C].try_into().unwrap());
        let size = u32::from_le_bytes(rec[0x1C..0x20].try_into().unwrap());
        let is_dir = (flags & 0x10000) == 0;

        let path = if parent_path.is_empty() {
            if is_dir {
                format!("{}/", name)
            } else {
                name.clone()
            }
        } else if is_dir {
            format!("{}{}/", parent_path, name)
        } else {
            format!("{}{}", parent_path, name)
        };

        if is_dir {
            let mut directory_tail = [0u8; 4];
            directory_tail.copy_from_slice(&rec[0x18..0x1C]);
            out.push(Entry {
                path: path.clone(),
                kind: EntryKind::Directory {
                    first_child: locator.max(0) as u32,
                    directory_tail,
                },
                entry_index: idx,
                size,
                raw_offset: None,
            });
            if locator > idx as i32 {
                read_dir(
                    index_buf,
                    offset_table,
                    total_count,
                    base_offset,
                    &path,
                    locator as u32,
                    size,
                    out,
                )?;
            }
        } else {
            if locator < 0 || locator as usize >= offset_table.len() {
                return Err(ArchiveError::MalformedArchive("locator out of range".into()));
            }
            let file_offset = base_offset + ((offset_table[locator as usize] as u64) << 10);
            out.push(Entry {
                path,
                kind: EntryKind::File {
                    offset_index: locator as u32,
                },
                entry_index: idx,
                size,
                raw_offset: Some(file_offset),
            });
        }
    }
    Ok(())
}

fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build_minimal_archive() -> Vec<u8> {
        // Scenario 1: one file entry "a.txt", size 4, offset_index 0,
        // four data bytes "test" at absolute offset 0x1000.
        let mut buf = vec![0u8; 0x1010];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..8].copy_from_slice(&1u32.to_le_bytes()); // total_count
        buf[8..12].copy_from_slice(&1u32.to_le_bytes()); // offset_count

        let index_start = HEADER_LEN as usize;
        let name = crate::encoding::encode_name("a.txt").unwrap();
        buf[index_start..index_start + 0x14].copy_from_slice(&name);
        buf[index_start + 0x14..index_start + 0x18].copy_from_slice(&0x10000u32.to_le_bytes());
        buf[index_start + 0x18..index_start + 0x1C].copy_from_slice(&0u32.to_le_bytes()); // offset_index 0
        buf[index_start + 0x1C..index_start + 0x20].copy_from_slice(&4u32.to_le_bytes()); // size

        let offset_table_start = index_start + 0x20;
        buf[offset_table_start..offset_table_start + 4].copy_from_slice(&0u32.to_le_bytes());

        buf[0x1000..0x1004].copy_from_slice(b"test");
        buf
    }

    #[test]
    fn scenario_1_minimal_plaintext_open() {
        let data = build_minimal_archive();
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&data).unwrap();
        f.flush().unwrap();

        let view = ByteView::open(f.path()).unwrap();
        let catalog = KeyCatalog::new();
        let archive = open(&view, &catalog).unwrap();

        assert_eq!(archive.entries.len(), 1);
        let entry = &archive.entries[0];
        assert_eq!(entry.path, "a.txt");
        assert_eq!(entry.size, 4);
        assert_eq!(entry.raw_offset, Some(0x1000));

        let payload = view.read_at(entry.raw_offset.unwrap(), entry.size as usize).unwrap();
        assert_eq!(payload, b"test");
    }

    #[test]
    fn every_key_failing_returns_no_matching_key() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&[0u8; 64]).unwrap();
        f.flush().unwrap();
        let view = ByteView::open(f.path()).unwrap();
        let mut catalog = KeyCatalog::new();
        catalog.push("bogus", [0u8; 32]);
        assert!(matches!(open(&view, &catalog), Err(ArchiveError::NoMatchingKey)));
    }
}
