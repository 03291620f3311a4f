//! Cache store contract and the in-memory store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::entry::CachedComponent;
use crate::error::CacheResult;

/// Component cache backend.
///
/// Stores are shared by concurrent renders. Two renders storing the same key
/// simply overwrite each other.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedComponent>>;

    async fn has(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn set(&self, key: &str, entry: CachedComponent) -> CacheResult<()>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CachedComponent,
    stored_at: Instant,
}

/// Concurrent in-process store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, StoredEntry>,
    ttl: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire entries older than `ttl` on lookup.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remove(&self, key: &str) -> Option<CachedComponent> {
        self.entries.remove(key).map(|(_, stored)| stored.entry)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn is_expired(&self, stored: &StoredEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| stored.stored_at.elapsed() >= ttl)
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedComponent>> {
        let found = self
            .entries
            .get(key)
            .map(|stored| (self.is_expired(&stored), stored.entry.clone()));

        match found {
            Some((true, _)) => {
                tracing::trace!(key, "Cache entry expired");
                self.entries.remove(key);
                Ok(None)
            }
            Some((false, entry)) => Ok(Some(entry)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, entry: CachedComponent) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredEntry {
                entry,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }
}
