//! Key-value cache seam with TTL semantics
//!
//! [`CacheStore`] stores raw bytes under string keys with a per-entry
//! time-to-live. Stores must be safe for concurrent use; overlapping writes to
//! one key may land in any order and the last writer wins.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "memory-store")]
use dashmap::DashMap;
#[cfg(feature = "memory-store")]
use std::time::Instant;

/// Cache backend failure
#[derive(Debug, Clone, Error)]
#[error("Cache error: {0}")]
pub struct CacheError(pub String);

/// Byte store with TTL
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
}

/// Store that keeps nothing; every read misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

#[async_trait]
impl CacheStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(feature = "memory-store")]
#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process [`CacheStore`] with lazy expiry
///
/// Expired entries read as absent and are removed on that read.
#[cfg(feature = "memory-store")]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

#[cfg(feature = "memory-store")]
impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(feature = "memory-store")]
#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let expired = match self.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };

        // Read guard is released here; removing while holding it would deadlock
        if expired {
            self.entries
                .remove_if(key, |_, entry| Instant::now() >= entry.expires_at);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError(format!("TTL out of range: {ttl:?}")))?;

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }
}
