//! Cache store boundary and an in-memory store with per-entry TTL.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::FxResult;

/// Key-value store with expiration.
///
/// Entries become unreadable once their TTL has elapsed. Concurrent writers
/// to the same key are allowed; the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value if present and not expired.
    async fn get(&self, key: &str) -> FxResult<Option<String>>;

    /// Store a value for `ttl_secs` seconds.
    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> FxResult<()>;
}

/// Longest lifetime an entry can be given (about a century).
const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

/// Cached payload entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(payload: String, ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_TTL_SECS);
        Self {
            payload,
            expires_at: Utc::now() + Duration::seconds(secs),
        }
    }

    fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries before expired ones are evicted on write.
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

/// Thread-safe in-memory cache store.
pub struct MemoryCacheStore {
    cache: DashMap<String, CacheEntry>,
    config: MemoryCacheConfig,
}

impl MemoryCacheStore {
    /// Create a new store with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    /// Create a new store with custom configuration.
    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Remove a key.
    pub fn remove(&self, key: &str) {
        self.cache.remove(key);
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries.
    pub fn evict_expired(&self) {
        self.cache.retain(|_, entry| entry.is_valid());
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let valid = self.cache.iter().filter(|e| e.is_valid()).count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> FxResult<Option<String>> {
        if let Some(entry) = self.cache.get(key) {
            if entry.is_valid() {
                debug!(key, "Cache hit");
                return Ok(Some(entry.payload.clone()));
            }
            debug!(key, "Cache entry expired");
            drop(entry);
            self.cache.remove(key);
        }

        debug!(key, "Cache miss");
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl_secs: u64) -> FxResult<()> {
        if self.cache.len() >= self.config.max_entries {
            self.evict_expired();
        }

        self.cache
            .insert(key.to_string(), CacheEntry::new(value, ttl_secs));
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}
