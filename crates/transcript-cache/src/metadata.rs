//! Persisted metadata index
//!
//! A single JSON document mapping cache key to [`CacheEntry`]. It is read
//! and fully rewritten on every mutation.

use crate::error::Result;
use crate::types::CacheEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

/// File name of the metadata index inside the cache directory
pub const METADATA_FILE: &str = "cache_metadata.json";

/// Mapping from cache key to entry metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataIndex {
    entries: BTreeMap<String, CacheEntry>,
}

impl MetadataIndex {
    /// Load the index from `path`.
    ///
    /// A missing, unreadable or unparseable document yields an empty index;
    /// the next save overwrites whatever was on disk.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read cache metadata, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(index) => index,
            Err(e) => {
                warn!(path = ?path, error = %e, "Corrupt cache metadata, starting empty");
                Self::default()
            }
        }
    }

    /// Replace the document at `path` with this index
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(key, entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Keys ordered for eviction: oldest `stored_at` first, ties broken by
    /// ascending key.
    pub fn keys_oldest_first(&self) -> Vec<String> {
        let mut keys: Vec<(&String, &CacheEntry)> = self.entries.iter().collect();
        // BTreeMap iteration is already key-ordered, so a stable sort on the
        // timestamp keeps equal timestamps in key order.
        keys.sort_by_key(|(_, e)| e.stored_at);
        keys.into_iter().map(|(k, _)| k.clone()).collect()
    }
}
