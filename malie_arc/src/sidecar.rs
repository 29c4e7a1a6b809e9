//! Metadata replay sidecar (spec §4.7, §6).
//!
//! The sidecar is the document that makes a repack bit-faithful: it
//! captures everything a plaintext archive write needs that isn't
//! recoverable from the extracted files alone (entry ordering, directory
//! tail bytes, the original write order).

use crate::entry::{Entry, EntryKind};
use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SidecarEntry {
    pub arc_path: String,
    pub entry_index: u32,
    pub offset_index: Option<u32>,
    pub order: Option<u32>,
    pub size: u32,
    pub is_dir: bool,
    pub directory_tail: Option<String>,
    pub key_name: String,

    /// Forward-compatibility catch-all for fields this version doesn't
    /// know about yet. Never written, only preserved on round-trip
    /// load-then-save if a caller chooses to.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sidecar {
    pub entries: Vec<SidecarEntry>,
}

impl Sidecar {
    /// Builds a sidecar from an opened archive's entry list. `key_name`
    /// is empty for plaintext archives.
    pub fn from_entries(entries: &[Entry], key_name: &str) -> Result<Self, ArchiveError> {
        let order_by_entry_index = compute_order(entries)?;

        let sidecar_entries = entries
            .iter()
            .map(|entry| {
                let directory_tail = match &entry.kind {
                    EntryKind::Directory { directory_tail, .. } => {
                        Some(hex::encode(directory_tail))
                    }
                    EntryKind::File { .. } => None,
                };
                SidecarEntry {
                    arc_path: entry.path.clone(),
                    entry_index: entry.entry_index,
                    offset_index: entry.offset_index(),
                    order: order_by_entry_index.get(&entry.entry_index).copied(),
                    size: entry.size,
                    is_dir: entry.is_dir(),
                    directory_tail,
                    key_name: key_name.to_string(),
                    extra: HashMap::new(),
                }
            })
            .collect();

        Ok(Self {
            entries: sidecar_entries,
        })
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ArchiveError::SidecarMismatch(format!("serialize: {}", e)))
    }

    pub fn from_json(text: &str) -> Result<Self, ArchiveError> {
        serde_json::from_str(text)
            .map_err(|e| ArchiveError::SidecarMismatch(format!("parse: {}", e)))
    }

    /// Validates that `disk_paths` (the set of files actually extracted,
    /// directories excluded) exactly matches the non-directory entries
    /// recorded in this sidecar.
    pub fn validate_against_disk(&self, disk_paths: &[String]) -> Result<(), ArchiveError> {
        let sidecar_files: std::collections::HashSet<&str> = self
            .entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.arc_path.as_str())
            .collect();
        let disk_files: std::collections::HashSet<&str> =
            disk_paths.iter().map(|s| s.as_str()).collect();

        for missing in sidecar_files.difference(&disk_files) {
            return Err(ArchiveError::SidecarMismatch(format!(
                "file {:?} listed in sidecar but absent on disk",
                missing
            )));
        }
        for extra in disk_files.difference(&sidecar_files) {
            return Err(ArchiveError::SidecarMismatch(format!(
                "file {:?} present on disk but absent from sidecar",
                extra
            )));
        }
        Ok(())
    }
}

/// Ranks file entries by ascending `raw_offset`, 0-based. Equal offsets
/// among distinct files are a hard error (spec: cannot happen in a valid
/// archive).
fn compute_order(entries: &[Entry]) -> Result<HashMap<u32, u32>, ArchiveError> {
    let mut files: Vec<&Entry> = entries
        .iter()
        .filter(|e| matches!(e.kind, EntryKind::File { .. }))
        .collect();
    files.sort_by_key(|e| e.raw_offset.unwrap_or(0));

    for pair in files.windows(2) {
        if pair[0].raw_offset == pair[1].raw_offset {
            return Err(ArchiveError::MalformedArchive(format!(
                "duplicate raw_offset {:?} between entries {} and {}",
                pair[0].raw_offset, pair[0].entry_index, pair[1].entry_index
            )));
        }
    }

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(rank, e)| (e.entry_index, rank as u32))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;

    fn file_entry(entry_index: u32, raw_offset: u64) -> Entry {
        Entry {
            path: format!("f{}", entry_index),
            kind: EntryKind::File { offset_index: entry_index },
            entry_index,
            size: 4,
            raw_offset: Some(raw_offset),
        }
    }

    #[test]
    fn order_ranks_by_ascending_raw_offset() {
        let entries = vec![file_entry(0, 0x2000), file_entry(1, 0x1000)];
        let sidecar = Sidecar::from_entries(&entries, "").unwrap();
        let order_of = |idx: u32| {
            sidecar
                .entries
                .iter()
                .find(|e| e.entry_index == idx)
                .unwrap()
                .order
                .unwrap()
        };
        assert_eq!(order_of(0), 1);
        assert_eq!(order_of(1), 0);
    }

    #[test]
    fn duplicate_raw_offset_is_hard_error() {
        let entries = vec![file_entry(0, 0x1000), file_entry(1, 0x1000)];
        assert!(Sidecar::from_entries(&entries, "").is_err());
    }

    #[test]
    fn json_round_trips() {
        let entries = vec![file_entry(0, 0x1000)];
        let sidecar = Sidecar::from_entries(&entries, "HaruUso").unwrap();
        let json = sidecar.to_json().unwrap();
        let parsed = Sidecar::from_json(&json).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].key_name, "HaruUso");
    }

    #[test]
    fn tolerates_unrecognized_fields_on_load() {
        let json = r#"{"entries":[{"arc_path":"a.txt","entry_index":0,"offset_index":0,"order":0,"size":4,"is_dir":false,"directory_tail":null,"key_name":"","future_field":"ignored"}]}"#;
        let sidecar = Sidecar::from_json(json).unwrap();
        assert_eq!(sidecar.entries[0].arc_path, "a.txt");
    }

    #[test]
    fn validate_detects_missing_file_on_disk() {
        let entries = vec![file_entry(0, 0x1000)];
        let sidecar = Sidecar::from_entries(&entries, "").unwrap();
        assert!(sidecar.validate_against_disk(&[]).is_err());
    }
}
