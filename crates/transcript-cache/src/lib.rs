//! File-backed transcript cache with TTL expiration and size-bounded eviction
//!
//! Stores one JSON artifact per logical identifier (a video id) on disk,
//! alongside a single metadata index that tracks when each artifact was
//! stored and how large it is. Entries older than the configured max age are
//! dropped on read, and the oldest entries are evicted whenever a write pushes
//! the total size over budget.

mod cache;
mod error;
mod metadata;
mod types;

pub use cache::{derive_key, ArtifactCache};
pub use error::{CacheError, LoadError, Result};
pub use metadata::{MetadataIndex, METADATA_FILE};
pub use types::{CacheConfig, CacheEntry, CacheStats};
