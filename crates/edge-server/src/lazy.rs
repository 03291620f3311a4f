//! Memoized renderer construction.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use edge_cache::CacheStore;
use edge_core::RendererConfig;
use edge_manifest::ClientManifest;
use tokio::sync::OnceCell;

use crate::error::ServerError;
use crate::renderer::{AppEntry, Renderer};

/// Constructs a renderer on first use.
#[async_trait]
pub trait RendererLoader: Send + Sync {
    async fn load(&self) -> Result<Renderer, ServerError>;
}

/// Loads the client manifest from disk.
pub struct ManifestLoader {
    path: PathBuf,
    app: Arc<dyn AppEntry>,
    config: RendererConfig,
    cache: Option<Arc<dyn CacheStore>>,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>, app: Arc<dyn AppEntry>, config: RendererConfig) -> Self {
        Self {
            path: path.into(),
            app,
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[async_trait]
impl RendererLoader for ManifestLoader {
    async fn load(&self) -> Result<Renderer, ServerError> {
        let manifest = ClientManifest::from_path(&self.path).await?;
        if manifest.is_empty() {
            return Err(ServerError::unavailable(format!(
                "client manifest {} has no modules",
                self.path.display()
            )));
        }
        let renderer = Renderer::new(manifest, self.app.clone(), self.config.clone());
        Ok(match &self.cache {
            Some(cache) => renderer.with_cache(cache.clone()),
            None => renderer,
        })
    }
}

/// A renderer built once and shared by every request.
///
/// A failed load is not memoized; the next request tries again.
pub struct LazyRenderer {
    cell: OnceCell<Arc<Renderer>>,
    loader: Arc<dyn RendererLoader>,
}

impl LazyRenderer {
    pub fn new(loader: impl RendererLoader + 'static) -> Self {
        Self::from_loader(Arc::new(loader))
    }

    pub fn from_loader(loader: Arc<dyn RendererLoader>) -> Self {
        Self {
            cell: OnceCell::new(),
            loader,
        }
    }

    /// Already built.
    pub fn ready(renderer: Renderer) -> Self {
        struct Unreachable;

        #[async_trait]
        impl RendererLoader for Unreachable {
            async fn load(&self) -> Result<Renderer, ServerError> {
                Err(ServerError::unavailable("renderer was provided up front"))
            }
        }

        Self {
            cell: OnceCell::new_with(Some(Arc::new(renderer))),
            loader: Arc::new(Unreachable),
        }
    }

    pub async fn get(&self) -> Result<Arc<Renderer>, ServerError> {
        let renderer = self
            .cell
            .get_or_try_init(|| async {
                tracing::debug!("Loading renderer");
                match self.loader.load().await {
                    Ok(renderer) => Ok(Arc::new(renderer)),
                    Err(err) => {
                        tracing::warn!(error = %err, "Renderer load failed");
                        Err(err)
                    }
                }
            })
            .await?;
        Ok(renderer.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use edge_core::{RenderContext, RenderError, RenderNode};
    use edge_manifest::ManifestEntry;

    fn app(_: &mut RenderContext) -> Result<RenderNode, RenderError> {
        Ok(RenderNode::text("ok"))
    }

    struct FlakyLoader {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RendererLoader for FlakyLoader {
        async fn load(&self) -> Result<Renderer, ServerError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ServerError::unavailable("server bundle is not available"));
            }
            let manifest = ClientManifest::new().with_entry("app.js", ManifestEntry::new("app.js").entry());
            Ok(Renderer::new(manifest, Arc::new(app), RendererConfig::new()))
        }
    }

    // === Lazy Tests ===

    #[tokio::test]
    async fn test_retry_after_failure_then_memoize() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let lazy = LazyRenderer::new(FlakyLoader {
            attempts: attempts.clone(),
        });

        assert!(matches!(lazy.get().await, Err(ServerError::Unavailable(_))));
        assert!(!lazy.is_loaded());

        let first = lazy.get().await.unwrap();
        let second = lazy.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(lazy.is_loaded());
    }

    #[tokio::test]
    async fn test_ready_renderer() {
        let renderer = Renderer::new(ClientManifest::new(), Arc::new(app), RendererConfig::new());
        let lazy = LazyRenderer::ready(renderer);
        assert!(lazy.is_loaded());
        assert!(lazy.get().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_manifest_file() {
        let loader = ManifestLoader::new(
            "/nonexistent/client.manifest.json",
            Arc::new(app),
            RendererConfig::new(),
        );
        let lazy = LazyRenderer::new(loader);
        assert!(matches!(lazy.get().await, Err(ServerError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_manifest_loader_reads_file() {
        let path = std::env::temp_dir().join(format!("edge-server-manifest-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"{"app.mjs": {"file": "app.mjs", "isEntry": true}}"#)
            .await
            .unwrap();

        let lazy = LazyRenderer::new(ManifestLoader::new(&path, Arc::new(app), RendererConfig::new()));
        let renderer = lazy.get().await.unwrap();
        assert_eq!(renderer.resolver().entrypoints(), ["app.mjs".to_string()]);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
