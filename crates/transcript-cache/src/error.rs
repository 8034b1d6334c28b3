//! Error types for the transcript cache

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    Io(Box<std::io::Error>),
    Serialization(Box<serde_json::Error>),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            CacheError::Serialization(err) => Some(err.as_ref()),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Failure of a read-through lookup.
///
/// Keeps the caller's fetch error apart from cache write failures so a
/// transcript API outage is never reported as a disk problem (or vice versa).
#[derive(Debug)]
pub enum LoadError<E> {
    Fetch(E),
    Cache(CacheError),
}

impl<E: fmt::Display> fmt::Display for LoadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Fetch(err) => write!(f, "Fetch error: {}", err),
            LoadError::Cache(err) => write!(f, "Cache error: {}", err),
        }
    }
}

impl<E> std::error::Error for LoadError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(err) => Some(err),
            LoadError::Cache(err) => Some(err),
        }
    }
}

impl<E> From<CacheError> for LoadError<E> {
    fn from(err: CacheError) -> Self {
        LoadError::Cache(err)
    }
}
