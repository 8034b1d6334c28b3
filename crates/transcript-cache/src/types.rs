//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Metadata for a cached artifact, keyed by its derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub logical_id: String,
    pub stored_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Configuration for an artifact cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub max_age: Duration,
    pub max_total_size: u64,
}

impl CacheConfig {
    /// Default cache location: `~/.youtube_mcp_cache`, falling back to the
    /// working directory when `HOME` is unset.
    pub fn default_cache_dir() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".youtube_mcp_cache")
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            max_age: Duration::from_secs(7 * 24 * 60 * 60), // 1 week
            max_total_size: 100 * 1024 * 1024,              // 100MB
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub max_size: u64,
    pub max_age_secs: u64,
    pub cache_dir: PathBuf,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn total_size_mb(&self) -> f64 {
        (self.total_size as f64 / BYTES_PER_MB * 100.0).round() / 100.0
    }

    pub fn max_size_mb(&self) -> f64 {
        self.max_size as f64 / BYTES_PER_MB
    }

    pub fn max_age_hours(&self) -> f64 {
        self.max_age_secs as f64 / 3600.0
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "- Total transcripts cached: {}", self.entries)?;
        writeln!(f, "- Total cache size: {} MB", self.total_size_mb())?;
        writeln!(f, "- Maximum cache size: {} MB", self.max_size_mb())?;
        writeln!(f, "- Cache directory: {}", self.cache_dir.display())?;
        writeln!(f, "- Cache expiration: {} hours", self.max_age_hours())?;
        write!(f, "- Hits/misses this session: {}/{}", self.hits, self.misses)
    }
}
