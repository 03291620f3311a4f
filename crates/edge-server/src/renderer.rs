//! Page renderer.

use std::mem;
use std::sync::Arc;

use edge_cache::CacheStore;
use edge_core::{RenderContext, RenderError, RenderNode, RendererConfig};
use edge_devalue::serialize;
use edge_manifest::{
    render_scripts, render_styles, ClientManifest, DependencyResolver, DependencySet,
    ResolverOptions, ScriptDep, ScriptKind, StyleDep,
};
use edge_streaming::{RenderMachine, RenderOptions, RenderStats, RenderStream};

use crate::state::{client_state, inline_state_script};
use crate::template::HtmlTemplate;

/// Builds the root tree of the application for one request.
pub trait AppEntry: Send + Sync {
    fn create(&self, context: &mut RenderContext) -> Result<RenderNode, RenderError>;
}

impl<F> AppEntry for F
where
    F: Fn(&mut RenderContext) -> Result<RenderNode, RenderError> + Send + Sync,
{
    fn create(&self, context: &mut RenderContext) -> Result<RenderNode, RenderError> {
        self(context)
    }
}

/// A rendered page, split into the pieces the document is assembled from.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    /// Head tags contributed by components.
    pub head_tags: String,
    pub resource_hints: String,
    pub styles: String,
    /// CSS contributed by components, without the `<style>` wrapper.
    pub inline_styles: String,
    pub scripts: String,
    pub stats: RenderStats,
}

/// Renders the application against one client manifest.
pub struct Renderer {
    resolver: Arc<DependencyResolver>,
    app: Arc<dyn AppEntry>,
    config: RendererConfig,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(manifest: ClientManifest, app: Arc<dyn AppEntry>, config: RendererConfig) -> Self {
        let mut resolver_options = ResolverOptions::new();
        if let Some(path) = &config.public_path {
            resolver_options = resolver_options.with_public_path(path.clone());
        }
        Self::with_resolver(
            Arc::new(DependencyResolver::new(manifest, resolver_options)),
            app,
            config,
        )
    }

    /// Share an existing resolver and its memo tables.
    pub fn with_resolver(resolver: Arc<DependencyResolver>, app: Arc<dyn AppEntry>, config: RendererConfig) -> Self {
        let options = RenderOptions::from_config(&config);
        Self {
            resolver,
            app,
            config,
            options,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.options = self.options.with_cache(cache);
        self
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Server-render the application into a buffered page.
    pub async fn render_to_string(&self, context: &mut RenderContext) -> Result<RenderedPage, RenderError> {
        self.render_with(context, self.options.clone()).await
    }

    /// Like `render_to_string`, with per-request options.
    pub async fn render_with(
        &self,
        context: &mut RenderContext,
        options: RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        let root = self.app.create(context)?;
        let mut machine = RenderMachine::new(root, mem::take(context), options);
        let result = machine.run_to_string().await;
        let stats = machine.stats().clone();
        *context = machine.into_context();
        let html = result?;

        Ok(RenderedPage {
            html,
            head_tags: context.head_tags().to_string(),
            resource_hints: context.render_resource_hints(&self.resolver),
            styles: context.render_styles(&self.resolver),
            inline_styles: context.inline_styles().to_string(),
            scripts: context.render_scripts(&self.resolver),
            stats,
        })
    }

    /// Server-render the application as a chunk stream of its markup.
    pub fn render_to_stream(&self, mut context: RenderContext) -> Result<RenderStream, RenderError> {
        let root = self.app.create(&mut context)?;
        Ok(RenderStream::new(root, context, self.options.clone()))
    }

    /// Client-only page: an empty mount point with entry styles and scripts.
    pub fn render_spa_shell(&self) -> RenderedPage {
        let manifest = self.resolver.manifest();
        let mut deps = DependencySet::new();
        for id in self.resolver.entrypoints() {
            let Some(entry) = manifest.get(id) else {
                continue;
            };
            for css in &entry.css {
                deps.styles.insert(css.clone(), StyleDep { path: css.clone() });
            }
            if !entry.file.is_empty() {
                let kind = if entry.file.ends_with(".js") {
                    ScriptKind::Script
                } else {
                    ScriptKind::Module
                };
                deps.scripts.insert(
                    id.clone(),
                    ScriptDep {
                        path: entry.file.clone(),
                        kind,
                    },
                );
            }
        }

        let public_path = self.resolver.public_path();
        RenderedPage {
            html: format!("<div id=\"{}\"></div>", self.config.app_id),
            styles: render_styles(&deps, public_path),
            scripts: render_scripts(&deps, public_path),
            ..RenderedPage::default()
        }
    }

    /// Assemble the HTML document for a rendered page.
    pub fn document(&self, page: &RenderedPage, context: &RenderContext) -> String {
        let mut head = String::new();
        head.push_str(&page.head_tags);
        head.push_str(&page.resource_hints);
        head.push_str(&page.styles);
        if !page.inline_styles.is_empty() {
            head.push_str("<style>");
            head.push_str(&page.inline_styles);
            head.push_str("</style>");
        }

        let state = inline_state_script(&self.config.global_name, &serialize(&client_state(context)));
        let app = format!("{}{}{}", page.html, state, page.scripts);

        HtmlTemplate::new().with_head(head).with_app(app).render()
    }
}
