use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Upper bound on entries kept by [`MemoryCache`].
pub const DEFAULT_CAPACITY: u64 = 1_000;

/// An expiring key-value store holding UTF-8 text.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`, replacing any previous one. A `None` or zero TTL never expires.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;
}

#[derive(Clone)]
struct CacheEntry {
    data: String,
    ttl: Option<Duration>,
}

/// Each entry lives for the TTL it was written with; a rewrite restarts the clock.
struct WrittenTtl;

impl Expiry<String, CacheEntry> for WrittenTtl {
    fn expire_after_create(&self, _key: &String, entry: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-process [`CacheStore`] backed by moka.
pub struct MemoryCache {
    entries: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .expire_after(WrittenTtl)
            .build();
        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.data))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry {
            data: value,
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }
}
