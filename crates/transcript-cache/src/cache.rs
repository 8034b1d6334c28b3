//! File-based artifact caching with a persisted metadata index

use crate::error::{LoadError, Result};
use crate::metadata::{MetadataIndex, METADATA_FILE};
use crate::types::{CacheConfig, CacheEntry, CacheStats};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Derive the cache key for a logical identifier (hex SHA-256)
pub fn derive_key(logical_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(logical_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// A transcript cache with one JSON file per entry and a metadata index
///
/// The directory is assumed to be owned by a single instance. Nothing stops
/// two instances from sharing it, but their metadata writes will race and
/// the last writer wins.
pub struct ArtifactCache {
    /// Directory where artifacts and the metadata index are stored
    cache_dir: PathBuf,
    /// Path of the metadata index
    metadata_path: PathBuf,
    /// Entries older than this are dropped on read
    max_age: Duration,
    /// Eviction kicks in above this many bytes
    max_total_size: u64,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl ArtifactCache {
    /// Open a cache, creating the directory and an empty metadata index if
    /// they do not exist yet
    pub fn open(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir)?;

        let metadata_path = config.cache_dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            MetadataIndex::default().save(&metadata_path)?;
        }

        info!(
            cache_dir = ?config.cache_dir,
            max_age_secs = config.max_age.as_secs(),
            max_total_size = config.max_total_size,
            "Cache initialized"
        );

        Ok(Self {
            cache_dir: config.cache_dir,
            metadata_path,
            max_age: config.max_age,
            max_total_size: config.max_total_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the artifact file for a logical identifier
    pub fn artifact_path(&self, logical_id: &str) -> PathBuf {
        self.path_for_key(&derive_key(logical_id))
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Get an artifact if it is cached and not expired.
    ///
    /// Expired entries and artifacts that can no longer be read or parsed as
    /// `T` are removed and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, logical_id: &str) -> Option<T> {
        self.get_at(logical_id, Utc::now())
    }

    pub(crate) fn get_at<T: DeserializeOwned>(
        &self,
        logical_id: &str,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let key = derive_key(logical_id);
        let path = self.path_for_key(&key);

        if !path.exists() {
            debug!(logical_id, "Cache miss");
            return self.miss();
        }

        let index = MetadataIndex::load(&self.metadata_path);
        match index.get(&key) {
            Some(entry) if self.is_expired(entry, now) => {
                debug!(logical_id, stored_at = %entry.stored_at, "Cache entry expired");
                self.discard(logical_id);
                return self.miss();
            }
            Some(_) => {}
            None => debug!(logical_id, "Artifact has no metadata entry"),
        }

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!(logical_id, error = %e, "Failed to read cached artifact, removing entry");
                self.discard(logical_id);
                return self.miss();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(artifact) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(logical_id, "Cache hit");
                Some(artifact)
            }
            Err(e) => {
                warn!(logical_id, error = %e, "Corrupt cached artifact, removing entry");
                self.discard(logical_id);
                self.miss()
            }
        }
    }

    /// Store an artifact, replacing any previous one for the same id, then
    /// evict the oldest entries if the cache is over budget
    pub fn set<T: Serialize + ?Sized>(&self, logical_id: &str, artifact: &T) -> Result<()> {
        self.set_at(logical_id, artifact, Utc::now())
    }

    pub(crate) fn set_at<T: Serialize + ?Sized>(
        &self,
        logical_id: &str,
        artifact: &T,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = derive_key(logical_id);
        let path = self.path_for_key(&key);

        let json = serde_json::to_vec_pretty(artifact)?;
        let mut index = match self.write_entry(&key, &path, logical_id, &json, now) {
            Ok(index) => index,
            Err(e) => {
                // A half-written artifact or one the index never recorded
                // must not outlive the failed write.
                warn!(key = %key, logical_id, error = %e, "Failed to cache artifact, rolling back");
                self.discard(logical_id);
                return Err(e);
            }
        };

        self.evict_if_needed(&mut index)?;
        Ok(())
    }

    /// Write the artifact file and record it in the index
    fn write_entry(
        &self,
        key: &str,
        path: &Path,
        logical_id: &str,
        json: &[u8],
        now: DateTime<Utc>,
    ) -> Result<MetadataIndex> {
        fs::write(path, json)?;
        let size_bytes = fs::metadata(path)?.len();

        let mut index = MetadataIndex::load(&self.metadata_path);
        index.insert(
            key.to_string(),
            CacheEntry {
                logical_id: logical_id.to_string(),
                stored_at: now,
                size_bytes,
            },
        );
        index.save(&self.metadata_path)?;
        debug!(key = %key, logical_id, size_bytes, "Cached artifact");
        Ok(index)
    }

    /// Get an artifact, or fetch and cache it on a miss
    pub fn get_or_insert_with<T, E, F>(
        &self,
        logical_id: &str,
        fetch: F,
    ) -> std::result::Result<T, LoadError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if let Some(artifact) = self.get(logical_id) {
            return Ok(artifact);
        }

        let artifact = fetch().map_err(LoadError::Fetch)?;
        self.set(logical_id, &artifact)?;
        Ok(artifact)
    }

    /// Remove the artifact and metadata entry for an id. Missing entries are
    /// a no-op.
    ///
    /// The metadata entry is dropped even when the artifact path cannot be
    /// removed; the removal error is returned afterwards.
    pub fn delete(&self, logical_id: &str) -> Result<()> {
        let key = derive_key(logical_id);
        let removed_file = remove_file_if_exists(&self.path_for_key(&key));

        let mut index = MetadataIndex::load(&self.metadata_path);
        if index.remove(&key).is_some() {
            index.save(&self.metadata_path)?;
            debug!(key = %key, logical_id, "Deleted cache entry");
        }

        removed_file?;
        Ok(())
    }

    /// Remove every artifact in the cache directory and reset the index
    pub fn clear(&self) -> Result<()> {
        let mut removed = 0usize;
        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(e) => {
                    warn!(error = %e, "Failed to read cache directory entry");
                    continue;
                }
            };

            let is_artifact = path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != METADATA_FILE);
            if !is_artifact {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = ?path, error = %e, "Failed to remove cached artifact"),
            }
        }

        MetadataIndex::default().save(&self.metadata_path)?;
        info!(removed, "Cache cleared");
        Ok(())
    }

    /// Snapshot of the metadata index, oldest entries first
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        let index = MetadataIndex::load(&self.metadata_path);
        index
            .keys_oldest_first()
            .into_iter()
            .filter_map(|key| index.get(&key).cloned().map(|entry| (key, entry)))
            .collect()
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        let index = MetadataIndex::load(&self.metadata_path);
        CacheStats {
            entries: index.len(),
            total_size: index.total_size(),
            max_size: self.max_total_size,
            max_age_secs: self.max_age.as_secs(),
            cache_dir: self.cache_dir.clone(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A timestamp in the future (clock moved backwards) counts as fresh.
        match (now - entry.stored_at).to_std() {
            Ok(age) => age > self.max_age,
            Err(_) => false,
        }
    }

    fn miss<T>(&self) -> Option<T> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Cleanup on the read path, where failures are logged rather than
    /// surfaced to the caller
    fn discard(&self, logical_id: &str) {
        if let Err(e) = self.delete(logical_id) {
            warn!(logical_id, error = %e, "Failed to remove stale cache entry");
        }
    }

    /// Evict oldest entries until the total size fits the budget. Returns the
    /// number of evicted entries.
    fn evict_if_needed(&self, index: &mut MetadataIndex) -> Result<usize> {
        let mut total_size = index.total_size();
        if total_size <= self.max_total_size {
            return Ok(0);
        }

        let mut evicted = 0usize;
        for key in index.keys_oldest_first() {
            if total_size <= self.max_total_size {
                break;
            }

            if let Err(e) = remove_file_if_exists(&self.path_for_key(&key)) {
                warn!(key = %key, error = %e, "Failed to evict cached artifact, skipping");
                continue;
            }

            if let Some(entry) = index.remove(&key) {
                total_size = total_size.saturating_sub(entry.size_bytes);
                evicted += 1;
                debug!(key = %key, logical_id = %entry.logical_id, "Evicted oldest cache entry");
            }
        }

        if evicted > 0 {
            index.save(&self.metadata_path)?;
            info!(evicted, total_size, max_size = self.max_total_size, "Evicted cache entries");
        }
        Ok(evicted)
    }
}

fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
