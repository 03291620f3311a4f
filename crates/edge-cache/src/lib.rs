//! Component render cache for the edge streaming SSR engine.
//!
//! This crate provides:
//! - `CacheStore` - Pluggable store contract (`get` / `has` / `set`)
//! - `CachedComponent` - Rendered markup plus the modules it used
//! - `InMemoryStore` - Concurrent in-process store with optional TTL
//! - `KvCacheStore` - JSON-encoded entries on top of a raw key-value backend
//! - `component_cache_key` - Effective key composition (`name::key`)
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{CacheStore, CachedComponent, InMemoryStore, component_cache_key};
//!
//! let store = InMemoryStore::new();
//! let key = component_cache_key("ProductCard", "sku-42");
//! store.set(&key, CachedComponent::new("<div>...</div>").with_module("ProductCard.vue")).await?;
//! assert!(store.has(&key).await?);
//! ```

mod entry;
mod error;
mod kv;
mod store;

pub use entry::*;
pub use error::*;
pub use kv::*;
pub use store::*;
