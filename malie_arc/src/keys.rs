//! Key catalog (spec §4.4): a fixed-order list of (label, 256-bit key)
//! pairs tried in sequence until one decrypts a header with a valid magic.

use crate::error::ArchiveError;
use crate::Resources;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub label: String,
    pub key: [u8; 32],
}

#[derive(Debug, Deserialize)]
struct RawKeyEntry {
    label: String,
    key_hex: String,
}

#[derive(Debug, Clone, Default)]
pub struct KeyCatalog {
    entries: Vec<KeyEntry>,
}

impl KeyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key. Existing entries are never reordered: callers that
    /// need to merge catalogs should always push new entries after old
    /// ones, since the label is the stable identifier recorded by sidecars.
    pub fn push(&mut self, label: impl Into<String>, key: [u8; 32]) {
        self.entries.push(KeyEntry {
            label: label.into(),
            key,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, label: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Loads the catalog embedded at build time from
    /// `resources/malie/keys.json`, the same embedding approach the
    /// teacher crate uses for its own resource dictionaries.
    pub fn embedded() -> Result<Self, ArchiveError> {
        let file = Resources::get("malie/keys.json")
            .ok_or_else(|| ArchiveError::MalformedArchive("missing embedded keys.json".into()))?;
        let raw: Vec<RawKeyEntry> = serde_json::from_slice(&file)
            .map_err(|e| ArchiveError::MalformedArchive(format!("keys.json: {}", e)))?;

        let mut catalog = Self::new();
        for entry in raw {
            let bytes = hex::decode(&entry.key_hex)
                .map_err(|e| ArchiveError::MalformedArchive(format!("keys.json: {}", e)))?;
            let key: [u8; 32] = bytes
                .try_into()
                .map_err(|_| ArchiveError::MalformedArchive("key must be 32 bytes".into()))?;
            catalog.push(entry.label, key);
        }
        Ok(catalog)
    }
}
