//! Render options.

use std::fmt;
use std::sync::Arc;

use edge_cache::CacheStore;
use edge_core::{LifecycleObserver, RendererConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_SYNC_WRITES};

/// Per-render settings.
#[derive(Clone)]
pub struct RenderOptions {
    /// Synchronous steps before the walk yields to the scheduler.
    pub max_sync_writes: usize,
    /// Target chunk size for streamed output, in bytes.
    pub chunk_size: usize,
    /// Component cache. Caching is off when unset.
    pub cache: Option<Arc<dyn CacheStore>>,
    pub observer: Option<Arc<dyn LifecycleObserver>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_sync_writes: DEFAULT_MAX_SYNC_WRITES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache: None,
            observer: None,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            max_sync_writes: config.max_sync_writes,
            chunk_size: config.chunk_size,
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_max_sync_writes(mut self, max: usize) -> Self {
        self.max_sync_writes = max;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("max_sync_writes", &self.max_sync_writes)
            .field("chunk_size", &self.chunk_size)
            .field("cache", &self.cache.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
