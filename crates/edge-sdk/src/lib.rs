//! Public SDK for the edge streaming render engine.
//!
//! This crate re-exports every engine crate:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let card = ComponentFn::new(|input| {
//!     Ok(Rendered::ready(RenderNode::text(input.props["title"].to_string())))
//! })
//! .named("Card")
//! .with_module("components/Card.vue")
//! .with_cache_key(|props| props["id"].as_str().map(String::from))
//! .into_arc();
//!
//! let app = move |_ctx: &mut RenderContext| {
//!     Ok(RenderNode::element("main").with_child(RenderNode::component(card.clone(), props)))
//! };
//! let renderer = Renderer::new(manifest, Arc::new(app), RendererConfig::default())
//!     .with_cache(Arc::new(InMemoryStore::new()));
//! let page = renderer.render_to_string(&mut RenderContext::new("/")).await?;
//! ```

pub use edge_cache;
pub use edge_core;
pub use edge_devalue;
pub use edge_manifest;
pub use edge_observability;
pub use edge_server;
pub use edge_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_cache::{CacheError, CacheStore, CachedComponent, InMemoryStore, KvCacheStore, MemoryKv};
    pub use edge_core::{
        Attribute, Component, ComponentFn, ComponentInput, LifecycleObserver, RenderContext,
        RenderError, RenderNode, RenderPhase, Rendered, RendererConfig, RequestId,
    };
    pub use edge_devalue::{serialize, to_value, Serializer, Value};
    pub use edge_manifest::{
        ClientManifest, DependencyResolver, DependencySet, ManifestEntry, ManifestError,
        ResolverOptions,
    };
    pub use edge_observability::{LogFormat, MetricsCollector, RenderMetrics, StructuredLogger};
    pub use edge_server::{
        AppEntry, HtmlTemplate, LazyRenderer, ManifestLoader, RenderRequest, RenderedPage, Renderer,
        RequestHandler, ServerError,
    };
    pub use edge_streaming::{render_to_stream, render_to_string, RenderOptions, RenderStream};
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use serde_json::json;

    // === Prelude Tests ===

    #[tokio::test]
    async fn test_prelude_renders_cached_page() {
        let card = ComponentFn::new(|input| {
            Ok(Rendered::ready(RenderNode::text(
                input.props["title"].as_str().unwrap_or_default().to_string(),
            )))
        })
        .named("Card")
        .with_module("components/Card.vue")
        .with_cache_key(|props| props["id"].as_str().map(String::from))
        .into_arc();

        let app = move |_ctx: &mut RenderContext| -> Result<RenderNode, RenderError> {
            Ok(RenderNode::element("main").with_child(RenderNode::component(
                card.clone(),
                json!({"id": "1", "title": "Boots"}),
            )))
        };
        let manifest = ClientManifest::new()
            .with_entry("app.mjs", ManifestEntry::new("app.mjs").entry())
            .with_entry("components/Card.vue", ManifestEntry::new("card.mjs").with_css("card.css"));
        let store = Arc::new(InMemoryStore::new());
        let renderer = Renderer::new(manifest, Arc::new(app), RendererConfig::default()).with_cache(store.clone());

        let page = renderer.render_to_string(&mut RenderContext::new("/")).await.unwrap();
        assert_eq!(page.html, "<main>Boots</main>");
        assert!(page.styles.contains("/card.css"));
        assert!(store.has("Card::1").await.unwrap());

        let again = renderer.render_to_string(&mut RenderContext::new("/")).await.unwrap();
        assert_eq!(again.html, page.html);
        assert_eq!(again.stats.cache_hits, 1);
        assert!(again.styles.contains("/card.css"));
    }
}
