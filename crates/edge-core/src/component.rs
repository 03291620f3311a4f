//! Component descriptor contract.
//!
//! A component turns props and slot children into a render subtree, either
//! immediately or after an asynchronous step such as data prefetching.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::node::RenderNode;

/// Result of resolving a component.
pub enum Rendered {
    /// Subtree available now.
    Ready(RenderNode),
    /// Subtree available once the future settles. The walk pauses at this
    /// node until then.
    Deferred(BoxFuture<'static, Result<RenderNode, RenderError>>),
}

impl Rendered {
    pub fn ready(node: RenderNode) -> Self {
        Self::Ready(node)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<RenderNode, RenderError>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }
}

impl fmt::Debug for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Everything a component sees when it renders.
pub struct ComponentInput<'a> {
    pub props: &'a serde_json::Value,
    pub children: &'a [RenderNode],
    /// Name of the nearest enclosing component, if any.
    pub parent: Option<&'a str>,
    pub context: &'a mut RenderContext,
}

/// A component descriptor.
pub trait Component: Send + Sync {
    /// Stable name. Required for caching.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Client manifest id of the module that defines this component.
    fn module_id(&self) -> Option<&str> {
        None
    }

    /// Deterministic cache key for these props. `None` bypasses the cache.
    fn cache_key(&self, _props: &serde_json::Value) -> Option<String> {
        None
    }

    fn render(&self, input: ComponentInput<'_>) -> Result<Rendered, RenderError>;
}

type RenderFn = dyn Fn(ComponentInput<'_>) -> Result<Rendered, RenderError> + Send + Sync;
type CacheKeyFn = dyn Fn(&serde_json::Value) -> Option<String> + Send + Sync;

/// Closure-backed component.
///
/// ```ignore
/// let greeting = ComponentFn::new(|input| {
///     let name = input.props["name"].as_str().unwrap_or("world");
///     Ok(Rendered::ready(RenderNode::text(format!("Hello, {}", name))))
/// })
/// .named("Greeting")
/// .with_module("components/Greeting.vue")
/// .with_cache_key(|props| props["name"].as_str().map(String::from));
/// ```
#[derive(Clone)]
pub struct ComponentFn {
    name: Option<String>,
    module_id: Option<String>,
    cache_key: Option<Arc<CacheKeyFn>>,
    render: Arc<RenderFn>,
}

impl ComponentFn {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(ComponentInput<'_>) -> Result<Rendered, RenderError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            module_id: None,
            cache_key: None,
            render: Arc::new(render),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    pub fn with_cache_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Option<String> + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(key));
        self
    }

    pub fn into_arc(self) -> Arc<dyn Component> {
        Arc::new(self)
    }
}

impl Component for ComponentFn {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    fn cache_key(&self, props: &serde_json::Value) -> Option<String> {
        self.cache_key.as_ref().and_then(|key| key(props))
    }

    fn render(&self, input: ComponentInput<'_>) -> Result<Rendered, RenderError> {
        (self.render)(input)
    }
}

impl fmt::Debug for ComponentFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFn")
            .field("name", &self.name)
            .field("module_id", &self.module_id)
            .field("cacheable", &self.cache_key.is_some())
            .finish()
    }
}
