//! Per-request render context.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use edge_devalue::Value;
use edge_manifest::{DependencyResolver, DependencySet, ModuleId};

use crate::lifecycle::TimingContext;

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, sequence))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a single render.
///
/// Created per request and handed to the render machine, which records the
/// modules every rendered component belongs to. The resolved dependency set
/// is computed once, on first use, from those modules plus the manifest
/// entrypoints.
#[derive(Debug)]
pub struct RenderContext {
    pub request_id: RequestId,
    /// Request URL (path and query).
    pub url: String,
    /// Client-only render requested.
    pub no_ssr: bool,
    /// Manifest ids of every module used during the render.
    pub registered_modules: BTreeSet<ModuleId>,
    /// Application state shipped to the client.
    pub payload: Option<Value>,
    pub timing: TimingContext,
    /// Set when the application issued a redirect; no document is sent.
    pub redirected: bool,
    /// Fatal error message recorded by the application.
    pub error: Option<String>,
    dependencies: OnceLock<Arc<DependencySet>>,
    styles: String,
    head: String,
}

impl RenderContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::generate(),
            url: url.into(),
            no_ssr: false,
            registered_modules: BTreeSet::new(),
            payload: None,
            timing: TimingContext::new(),
            redirected: false,
            error: None,
            dependencies: OnceLock::new(),
            styles: String::new(),
            head: String::new(),
        }
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    pub fn with_no_ssr(mut self, no_ssr: bool) -> Self {
        self.no_ssr = no_ssr;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Record that a module was used. Returns `true` if it was new.
    pub fn register_module(&mut self, id: impl Into<ModuleId>) -> bool {
        self.registered_modules.insert(id.into())
    }

    /// Record every module of a replayed cache entry.
    pub fn register_modules<I>(&mut self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<ModuleId>,
    {
        self.registered_modules
            .extend(ids.into_iter().map(Into::into));
    }

    /// Dependencies of this request, resolved on first call.
    ///
    /// Modules registered after the first call are not reflected.
    pub fn request_dependencies(&self, resolver: &DependencyResolver) -> Arc<DependencySet> {
        self.dependencies
            .get_or_init(|| resolver.resolve_request(&self.registered_modules))
            .clone()
    }

    pub fn render_styles(&self, resolver: &DependencyResolver) -> String {
        edge_manifest::render_styles(&self.request_dependencies(resolver), resolver.public_path())
    }

    pub fn render_preload_links(&self, resolver: &DependencyResolver) -> String {
        edge_manifest::render_preload_links(
            &self.request_dependencies(resolver),
            resolver.public_path(),
        )
    }

    pub fn render_prefetch_links(&self, resolver: &DependencyResolver) -> String {
        edge_manifest::render_prefetch_links(
            &self.request_dependencies(resolver),
            resolver.public_path(),
        )
    }

    pub fn render_resource_hints(&self, resolver: &DependencyResolver) -> String {
        edge_manifest::render_resource_hints(
            &self.request_dependencies(resolver),
            resolver.public_path(),
        )
    }

    pub fn render_scripts(&self, resolver: &DependencyResolver) -> String {
        edge_manifest::render_scripts(&self.request_dependencies(resolver), resolver.public_path())
    }

    /// Append inline CSS collected during the render.
    pub fn push_style(&mut self, css: &str) {
        self.styles.push_str(css);
    }

    /// Append markup destined for the document head.
    pub fn push_head(&mut self, html: &str) {
        self.head.push_str(html);
    }

    pub fn inline_styles(&self) -> &str {
        &self.styles
    }

    pub fn head_tags(&self) -> &str {
        &self.head
    }

    pub fn mark_redirected(&mut self) {
        self.redirected = true;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new("/")
    }
}
