//! JSON-encoded cache entries over a raw key-value backend.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::entry::CachedComponent;
use crate::error::{CacheError, CacheResult};
use crate::store::CacheStore;

/// Byte-oriented key-value backend.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get_bytes(key).await?.is_some())
    }
}

/// In-process byte store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: DashMap<String, Vec<u8>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.values.get(key).map(|value| value.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.raw(key))
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Component cache that stores entries as JSON under a key prefix.
#[derive(Debug)]
pub struct KvCacheStore<B> {
    backend: B,
    prefix: String,
}

impl<B: KvBackend> KvCacheStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            prefix: String::new(),
        }
    }

    /// Namespace every key as `prefix:key`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl<B: KvBackend> CacheStore for KvCacheStore<B> {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedComponent>> {
        match self.backend.get_bytes(&self.full_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn has(&self, key: &str) -> CacheResult<bool> {
        self.backend.exists(&self.full_key(key)).await
    }

    async fn set(&self, key: &str, entry: CachedComponent) -> CacheResult<()> {
        let bytes = serde_json::to_vec(&entry).map_err(CacheError::from)?;
        self.backend.set_bytes(&self.full_key(key), bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_through_json() {
        let store = KvCacheStore::new(MemoryKv::new()).with_prefix("ssr");
        store
            .set("Card::1", CachedComponent::new("<b>1</b>").with_module("Card.vue"))
            .await
            .unwrap();

        assert_eq!(store.backend().keys(), vec!["ssr:Card::1".to_string()]);
        let raw = store.backend().raw("ssr:Card::1").unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["html"], "<b>1</b>");

        let entry = store.get("Card::1").await.unwrap().unwrap();
        assert_eq!(entry.modules.len(), 1);
        assert!(store.has("Card::1").await.unwrap());
        assert!(!store.has("Card::2").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let kv = MemoryKv::new();
        kv.set_bytes("k", b"not json".to_vec()).await.unwrap();
        let store = KvCacheStore::new(kv);

        let err = store.get("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
