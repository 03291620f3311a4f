//! Explicit-stack render walk.
//!
//! The tree is walked depth-first with a `Vec` of frames instead of native
//! recursion, so nesting depth is bounded only by memory. Asynchronous work
//! (deferred components, cache lookups and cache writes) is parked on the
//! stack as an `Awaiting` frame and polled in place; the walk resumes when it
//! settles.

use std::collections::BTreeSet;
use std::future::Future;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use edge_cache::{component_cache_key, CacheError, CacheStore, CachedComponent};
use edge_core::{
    escape_comment, escape_html, Attribute, Component, ComponentInput, LifecycleObserver,
    RenderContext, RenderError, RenderNode, RenderPhase, Rendered,
};
use futures::future::BoxFuture;
use futures::task::AtomicWaker;
use futures::FutureExt;
use serde::Serialize;

use crate::budget::WriteBudget;
use crate::chunk::take_chunk;
use crate::options::RenderOptions;

const ANONYMOUS: &str = "<anonymous>";

/// Outcome of a single render step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
}

/// Counters collected during a render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub components: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_bypasses: usize,
    /// Forced yields after a run of synchronous steps.
    pub yields: usize,
    /// Bytes written to the main output.
    pub bytes: usize,
    /// Deepest frame stack observed.
    pub max_depth: usize,
}

/// Cancellation signal shared between a render and its consumer.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the render. Pending asynchronous work is dropped.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.waker.wake();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn register(&self, waker: &Waker) {
        self.inner.waker.register(waker);
    }
}

struct PendingComponent {
    descriptor: Arc<dyn Component>,
    props: serde_json::Value,
    children: Vec<RenderNode>,
}

enum Suspension {
    /// Deferred component resolution.
    Component {
        label: String,
        future: BoxFuture<'static, Result<RenderNode, RenderError>>,
    },
    CacheLookup {
        key: String,
        lookup: BoxFuture<'static, Result<Option<CachedComponent>, CacheError>>,
        pending: Option<PendingComponent>,
    },
    /// Write of a finished caching slot; `html` is emitted once stored.
    CacheStore {
        key: String,
        store: BoxFuture<'static, Result<(), CacheError>>,
        html: String,
    },
}

enum Settled {
    Component {
        label: String,
        result: Result<RenderNode, RenderError>,
    },
    CacheLookup {
        key: String,
        result: Result<Option<CachedComponent>, CacheError>,
        pending: Option<PendingComponent>,
    },
    CacheStore {
        key: String,
        result: Result<(), CacheError>,
        html: String,
    },
}

impl Suspension {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Settled> {
        match self {
            Self::Component { label, future } => {
                future.as_mut().poll(cx).map(|result| Settled::Component {
                    label: mem::take(label),
                    result,
                })
            }
            Self::CacheLookup {
                key,
                lookup,
                pending,
            } => lookup.as_mut().poll(cx).map(|result| Settled::CacheLookup {
                key: mem::take(key),
                result,
                pending: pending.take(),
            }),
            Self::CacheStore { key, store, html } => {
                store.as_mut().poll(cx).map(|result| Settled::CacheStore {
                    key: mem::take(key),
                    result,
                    html: mem::take(html),
                })
            }
        }
    }
}

enum Frame {
    Element {
        children: std::vec::IntoIter<RenderNode>,
        close_tag: String,
    },
    Fragment {
        children: std::vec::IntoIter<RenderNode>,
    },
    /// Restores the enclosing component name on pop.
    Component { previous_active: Option<String> },
    /// Output below this frame goes to the innermost cache slot.
    CachingComponent { key: String },
    Awaiting(Suspension),
}

#[derive(Debug, Default)]
struct CacheSlot {
    html: String,
    modules: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MachineState {
    Running,
    Done,
    Failed,
    Cancelled,
}

/// Single-pass render of one tree.
pub struct RenderMachine {
    stack: Vec<Frame>,
    context: RenderContext,
    cache: Option<Arc<dyn CacheStore>>,
    observer: Option<Arc<dyn LifecycleObserver>>,
    output: String,
    slots: Vec<CacheSlot>,
    active: Option<String>,
    budget: WriteBudget,
    cancel: CancelHandle,
    stats: RenderStats,
    state: MachineState,
}

impl RenderMachine {
    pub fn new(root: RenderNode, context: RenderContext, options: RenderOptions) -> Self {
        let mut machine = Self {
            stack: Vec::new(),
            context,
            cache: options.cache,
            observer: options.observer,
            output: String::new(),
            slots: Vec::new(),
            active: None,
            budget: WriteBudget::new(options.max_sync_writes),
            cancel: CancelHandle::new(),
            stats: RenderStats::default(),
            state: MachineState::Running,
        };
        machine.push_subtree(root);
        machine.notify(RenderPhase::Start);
        machine
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop rendering. Further polls report `RenderError::Cancelled`.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.state == MachineState::Running {
            self.halt(MachineState::Cancelled);
            self.notify(RenderPhase::Cancelled);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == MachineState::Cancelled || self.cancel.is_cancelled()
    }

    /// No further steps will run.
    pub fn is_finished(&self) -> bool {
        self.state != MachineState::Running
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }

    pub fn into_context(self) -> RenderContext {
        self.context
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Bytes produced but not yet taken.
    pub fn buffered(&self) -> usize {
        self.output.len()
    }

    pub fn take_output(&mut self) -> String {
        mem::take(&mut self.output)
    }

    pub(crate) fn take_chunk(&mut self, max: usize) -> String {
        take_chunk(&mut self.output, max)
    }

    pub(crate) fn mark_first_chunk(&mut self) {
        self.context.timing.mark_first_chunk();
        self.notify(RenderPhase::FirstChunk);
    }

    /// Advance the walk by one step.
    pub fn poll_step(&mut self, cx: &mut Context<'_>) -> Poll<Result<Step, RenderError>> {
        self.cancel.register(cx.waker());
        match self.state {
            MachineState::Running => {}
            MachineState::Cancelled => return Poll::Ready(Err(RenderError::Cancelled)),
            MachineState::Done | MachineState::Failed => return Poll::Ready(Ok(Step::Done)),
        }
        if self.cancel.is_cancelled() {
            self.halt(MachineState::Cancelled);
            self.notify(RenderPhase::Cancelled);
            return Poll::Ready(Err(RenderError::Cancelled));
        }

        let result = match self.stack.last_mut() {
            None => {
                self.complete();
                return Poll::Ready(Ok(Step::Done));
            }
            Some(Frame::Awaiting(suspension)) => match suspension.poll(cx) {
                Poll::Pending => {
                    self.budget.reset();
                    return Poll::Pending;
                }
                Poll::Ready(settled) => {
                    self.stack.pop();
                    self.settle(settled)
                }
            },
            Some(Frame::Element { children, .. } | Frame::Fragment { children }) => {
                match children.next() {
                    Some(child) => self.enter(child),
                    None => self.pop_frame(),
                }
            }
            Some(_) => self.pop_frame(),
        };

        match result {
            Ok(()) => Poll::Ready(Ok(Step::Continue)),
            Err(err) => {
                self.fail(&err);
                Poll::Ready(Err(err))
            }
        }
    }

    /// Run steps until at least `target` bytes are buffered or the walk
    /// ends, yielding once every `max_sync_writes` synchronous steps.
    pub fn poll_fill(&mut self, cx: &mut Context<'_>, target: usize) -> Poll<Result<(), RenderError>> {
        loop {
            if self.output.len() >= target {
                return Poll::Ready(Ok(()));
            }
            match self.poll_step(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Ready(Ok(Step::Done)) => return Poll::Ready(Ok(())),
                Poll::Ready(Ok(Step::Continue)) => {}
            }
            if self.budget.tick(cx).is_pending() {
                self.stats.yields += 1;
                return Poll::Pending;
            }
        }
    }

    /// Render to completion and return everything not yet taken.
    pub async fn run_to_string(&mut self) -> Result<String, RenderError> {
        futures::future::poll_fn(|cx| self.poll_fill(cx, usize::MAX)).await?;
        Ok(self.take_output())
    }

    fn push_frame(&mut self, frame: Frame) {
        self.stack.push(frame);
        self.stats.max_depth = self.stats.max_depth.max(self.stack.len());
    }

    /// Queue a component's subtree for the next step instead of entering it
    /// here, so nested components never grow the native stack.
    fn push_subtree(&mut self, node: RenderNode) {
        self.push_frame(Frame::Fragment {
            children: vec![node].into_iter(),
        });
    }

    fn enter(&mut self, node: RenderNode) -> Result<(), RenderError> {
        match node {
            RenderNode::Text(text) => self.write(&escape_html(&text)),
            RenderNode::RawMarkup(markup) => self.write(&markup),
            RenderNode::Comment(text) => self.write(&format!("<!--{}-->", escape_comment(&text))),
            RenderNode::Element {
                tag,
                attributes,
                children,
                self_closing,
            } => {
                self.write(&open_tag(&tag, &attributes));
                if !self_closing {
                    self.push_frame(Frame::Element {
                        children: children.into_iter(),
                        close_tag: format!("</{}>", tag),
                    });
                }
            }
            RenderNode::Fragment(children) => self.push_frame(Frame::Fragment {
                children: children.into_iter(),
            }),
            RenderNode::Component {
                descriptor,
                props,
                children,
                cache_key,
            } => {
                return self.enter_component(
                    PendingComponent {
                        descriptor,
                        props,
                        children,
                    },
                    cache_key,
                )
            }
        }
        Ok(())
    }

    fn enter_component(
        &mut self,
        component: PendingComponent,
        explicit_key: Option<String>,
    ) -> Result<(), RenderError> {
        if let Some(cache) = &self.cache {
            let key = component.descriptor.name().and_then(|name| {
                explicit_key
                    .or_else(|| component.descriptor.cache_key(&component.props))
                    .map(|key| component_cache_key(name, &key))
            });
            match key {
                Some(key) => {
                    let cache = Arc::clone(cache);
                    let lookup_key = key.clone();
                    let lookup = async move { cache.get(&lookup_key).await }.boxed();
                    self.push_frame(Frame::Awaiting(Suspension::CacheLookup {
                        key,
                        lookup,
                        pending: Some(component),
                    }));
                    return Ok(());
                }
                None => self.stats.cache_bypasses += 1,
            }
        }
        self.render_component(component)
    }

    fn render_component(&mut self, component: PendingComponent) -> Result<(), RenderError> {
        let PendingComponent {
            descriptor,
            props,
            children,
        } = component;

        if let Some(module) = descriptor.module_id() {
            self.register_module(module);
        }
        let name = descriptor.name().map(str::to_string);
        let previous_active = mem::replace(&mut self.active, name.clone());
        self.stats.components += 1;

        let rendered = descriptor.render(ComponentInput {
            props: &props,
            children: &children,
            parent: previous_active.as_deref(),
            context: &mut self.context,
        });
        self.push_frame(Frame::Component { previous_active });

        match rendered? {
            Rendered::Ready(node) => {
                self.push_subtree(node);
                Ok(())
            }
            Rendered::Deferred(future) => {
                let label = name.unwrap_or_else(|| ANONYMOUS.to_string());
                self.context.timing.mark_component_start(&label);
                self.push_frame(Frame::Awaiting(Suspension::Component { label, future }));
                Ok(())
            }
        }
    }

    fn settle(&mut self, settled: Settled) -> Result<(), RenderError> {
        match settled {
            Settled::Component { label, result } => {
                self.context.timing.mark_component_resolved(&label);
                self.push_subtree(result?);
                Ok(())
            }
            Settled::CacheLookup {
                key,
                result,
                pending,
            } => match result.map_err(|err| cache_error(&key, err))? {
                Some(hit) => {
                    self.stats.cache_hits += 1;
                    tracing::debug!(key = %key, bytes = hit.html.len(), "Component cache hit");
                    for module in &hit.modules {
                        self.register_module(module);
                    }
                    self.write(&hit.html);
                    self.notify(RenderPhase::CacheHit(key));
                    Ok(())
                }
                None => {
                    self.stats.cache_misses += 1;
                    tracing::debug!(key = %key, "Component cache miss");
                    self.push_frame(Frame::CachingComponent { key });
                    self.slots.push(CacheSlot::default());
                    match pending {
                        Some(component) => self.render_component(component),
                        None => Ok(()),
                    }
                }
            },
            Settled::CacheStore { key, result, html } => {
                result.map_err(|err| cache_error(&key, err))?;
                self.write(&html);
                Ok(())
            }
        }
    }

    fn pop_frame(&mut self) -> Result<(), RenderError> {
        match self.stack.pop() {
            Some(Frame::Element { close_tag, .. }) => self.write(&close_tag),
            Some(Frame::Component { previous_active }) => self.active = previous_active,
            Some(Frame::CachingComponent { key }) => self.finish_caching(key),
            _ => {}
        }
        Ok(())
    }

    fn finish_caching(&mut self, key: String) {
        let slot = self.slots.pop().unwrap_or_default();
        match &self.cache {
            Some(cache) => {
                let cache = Arc::clone(cache);
                let entry = CachedComponent {
                    html: slot.html.clone(),
                    modules: slot.modules,
                };
                let store_key = key.clone();
                let store = async move { cache.set(&store_key, entry).await }.boxed();
                self.push_frame(Frame::Awaiting(Suspension::CacheStore {
                    key,
                    store,
                    html: slot.html,
                }));
            }
            None => self.write(&slot.html),
        }
    }

    fn register_module(&mut self, id: &str) {
        self.context.register_module(id);
        for slot in &mut self.slots {
            slot.modules.insert(id.to_string());
        }
    }

    fn write(&mut self, html: &str) {
        match self.slots.last_mut() {
            Some(slot) => slot.html.push_str(html),
            None => {
                self.stats.bytes += html.len();
                self.output.push_str(html);
            }
        }
    }

    fn complete(&mut self) {
        self.state = MachineState::Done;
        self.context.timing.mark_complete();
        tracing::debug!(
            request_id = %self.context.request_id,
            bytes = self.stats.bytes,
            components = self.stats.components,
            "Render complete"
        );
        self.notify(RenderPhase::Completion);
    }

    fn fail(&mut self, err: &RenderError) {
        self.halt(MachineState::Failed);
        tracing::warn!(request_id = %self.context.request_id, error = %err, "Render failed");
        self.notify(RenderPhase::Error(err.to_string()));
    }

    fn halt(&mut self, state: MachineState) {
        self.state = state;
        self.stack.clear();
        self.slots.clear();
    }

    fn notify(&self, phase: RenderPhase) {
        if let Some(observer) = &self.observer {
            observer.on_phase(phase, self.context.timing.elapsed());
        }
    }
}

fn open_tag(tag: &str, attributes: &[Attribute]) -> String {
    let mut out = format!("<{}", tag);
    for attribute in attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        if let Some(value) = &attribute.value {
            out.push_str("=\"");
            out.push_str(&escape_html(value));
            out.push('"');
        }
    }
    out.push('>');
    out
}

fn cache_error(key: &str, err: CacheError) -> RenderError {
    RenderError::Cache(format!("{}: {}", key, err))
}

/// Render a tree to a single string.
///
/// The context is handed to the render and restored afterwards, also when
/// the render fails.
pub async fn render_to_string(
    root: RenderNode,
    context: &mut RenderContext,
    options: RenderOptions,
) -> Result<String, RenderError> {
    let mut machine = RenderMachine::new(root, mem::take(context), options);
    let result = machine.run_to_string().await;
    *context = machine.into_context();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use edge_cache::{CacheResult, InMemoryStore};
    use edge_core::ComponentFn;
    use serde_json::json;

    fn leaf(name: &str, html: &str) -> Arc<dyn Component> {
        let html = html.to_string();
        ComponentFn::new(move |_| Ok(Rendered::ready(RenderNode::raw(html.clone()))))
            .named(name)
            .into_arc()
    }

    fn counted_price(renders: Arc<AtomicUsize>) -> Arc<dyn Component> {
        ComponentFn::new(move |input| {
            renders.fetch_add(1, Ordering::SeqCst);
            let sku = input.props["sku"].as_str().unwrap_or_default().to_string();
            Ok(Rendered::ready(
                RenderNode::element("span")
                    .with_attr("class", "price")
                    .with_child(RenderNode::text(sku)),
            ))
        })
        .named("Price")
        .with_module("Price.vue")
        .with_cache_key(|props| props["sku"].as_str().map(String::from))
        .into_arc()
    }

    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        gets: AtomicUsize,
        sets: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for CountingStore {
        async fn get(&self, key: &str) -> CacheResult<Option<CachedComponent>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, entry: CachedComponent) -> CacheResult<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, entry).await
        }
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<CachedComponent>> {
            Err(CacheError::storage("backend down"))
        }

        async fn set(&self, _key: &str, _entry: CachedComponent) -> CacheResult<()> {
            Err(CacheError::storage("backend down"))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        phases: Mutex<Vec<RenderPhase>>,
    }

    impl LifecycleObserver for RecordingObserver {
        fn on_phase(&self, phase: RenderPhase, _elapsed: Duration) {
            self.phases.lock().unwrap().push(phase);
        }
    }

    async fn render(root: RenderNode, options: RenderOptions) -> (Result<String, RenderError>, RenderContext) {
        let mut ctx = RenderContext::new("/test");
        let result = render_to_string(root, &mut ctx, options).await;
        (result, ctx)
    }

    // === Markup Tests ===

    #[tokio::test]
    async fn test_element_with_text() {
        let root = RenderNode::element("div").with_child(RenderNode::text("hi"));
        let (html, _) = render(root, RenderOptions::default()).await;
        assert_eq!(html.unwrap(), "<div>hi</div>");
    }

    #[tokio::test]
    async fn test_attributes_and_escaping() {
        let root = RenderNode::element("a")
            .with_attr("href", "/?a=1&b=\"2\"")
            .with_bool_attr("hidden")
            .with_child(RenderNode::text("<x>"));
        let (html, _) = render(root, RenderOptions::default()).await;
        assert_eq!(
            html.unwrap(),
            "<a href=\"/?a=1&amp;b=&quot;2&quot;\" hidden>&lt;x&gt;</a>"
        );
    }

    #[tokio::test]
    async fn test_void_comment_raw_fragment() {
        let root = RenderNode::fragment([
            RenderNode::void_element("br"),
            RenderNode::comment("note-->"),
            RenderNode::raw("<b>raw</b>"),
            RenderNode::fragment([RenderNode::text("a"), RenderNode::text("b")]),
        ]);
        let (html, _) = render(root, RenderOptions::default()).await;
        assert_eq!(html.unwrap(), "<br><!--note--><b>raw</b>ab");
    }

    #[tokio::test]
    async fn test_empty_tree() {
        let (html, _) = render(RenderNode::empty(), RenderOptions::default()).await;
        assert_eq!(html.unwrap(), "");
    }

    // === Component Tests ===

    #[tokio::test]
    async fn test_component_parent_and_modules() {
        let card = ComponentFn::new(|input| {
            Ok(Rendered::ready(RenderNode::text(
                input.parent.unwrap_or("none").to_string(),
            )))
        })
        .named("Card")
        .with_module("Card.vue")
        .into_arc();

        let layout = ComponentFn::new(move |input| {
            Ok(Rendered::ready(
                RenderNode::element("div")
                    .with_child(RenderNode::component(card.clone(), json!({})))
                    .with_children(input.children.to_vec()),
            ))
        })
        .named("Layout")
        .with_module("Layout.vue")
        .into_arc();

        let root = RenderNode::fragment([
            RenderNode::component(layout, json!({})).with_child(RenderNode::text("!")),
            RenderNode::text("|"),
        ]);
        let (html, ctx) = render(root, RenderOptions::default()).await;

        assert_eq!(html.unwrap(), "<div>Layout!</div>|");
        assert!(ctx.registered_modules.contains("Card.vue"));
        assert!(ctx.registered_modules.contains("Layout.vue"));
    }

    #[tokio::test]
    async fn test_component_contributes_head() {
        let titled = ComponentFn::new(|mut input| {
            input.context.push_head("<title>Shop</title>");
            input.context.push_style(".shop{}");
            Ok(Rendered::ready(RenderNode::text("body")))
        })
        .into_arc();

        let (html, ctx) = render(RenderNode::component(titled, json!(null)), RenderOptions::default()).await;
        assert_eq!(html.unwrap(), "body");
        assert_eq!(ctx.head_tags(), "<title>Shop</title>");
        assert_eq!(ctx.inline_styles(), ".shop{}");
    }

    #[tokio::test]
    async fn test_deferred_component_keeps_order() {
        let reviews = ComponentFn::new(|_| {
            Ok(Rendered::deferred(async {
                tokio::task::yield_now().await;
                Ok(RenderNode::element("ul").with_child(RenderNode::text("5 stars")))
            }))
        })
        .named("Reviews")
        .into_arc();

        let root = RenderNode::fragment([
            RenderNode::text("a"),
            RenderNode::component(reviews, json!({})),
            RenderNode::text("c"),
        ]);
        let (html, ctx) = render(root, RenderOptions::default()).await;

        assert_eq!(html.unwrap(), "a<ul>5 stars</ul>c");
        assert!(ctx.timing.component_timing("Reviews").is_some());
    }

    #[tokio::test]
    async fn test_component_error_aborts() {
        let broken = ComponentFn::new(|_| Err(RenderError::component("Broken", "nope")))
            .named("Broken")
            .into_arc();
        let root = RenderNode::fragment([
            RenderNode::text("before"),
            RenderNode::component(broken, json!({})),
            RenderNode::text("after"),
        ]);

        let (result, ctx) = render(root, RenderOptions::default()).await;
        match result {
            Err(RenderError::Component { name, message }) => {
                assert_eq!(name, "Broken");
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ctx.url, "/test");
    }

    #[tokio::test]
    async fn test_deferred_error_aborts() {
        let broken = ComponentFn::new(|_| {
            Ok(Rendered::deferred(async {
                Err(RenderError::Stream("fetch failed".to_string()))
            }))
        })
        .into_arc();

        let (result, _) = render(RenderNode::component(broken, json!({})), RenderOptions::default()).await;
        assert!(result.unwrap_err().to_string().contains("fetch failed"));
    }

    // === Writer Tests ===

    #[tokio::test]
    async fn test_small_budget_yields_same_output() {
        let children: Vec<RenderNode> = (0..50).map(|i| RenderNode::text(i.to_string())).collect();
        let expected: String = (0..50).map(|i| i.to_string()).collect();

        let mut machine = RenderMachine::new(
            RenderNode::fragment(children),
            RenderContext::default(),
            RenderOptions::new().with_max_sync_writes(4),
        );
        let html = machine.run_to_string().await.unwrap();

        assert_eq!(html, expected);
        assert!(machine.stats().yields > 0);
        assert!(machine.is_finished());
    }

    #[tokio::test]
    async fn test_deep_nesting_uses_explicit_stack() {
        let depth = 20_000;
        let mut node = RenderNode::empty();
        for _ in 0..depth {
            node = RenderNode::element("div").with_child(node);
        }

        let mut machine = RenderMachine::new(node, RenderContext::default(), RenderOptions::default());
        let html = machine.run_to_string().await.unwrap();

        assert_eq!(html.len(), depth * "<div></div>".len());
        assert!(html.starts_with("<div><div>"));
        assert!(html.ends_with("</div></div>"));
        assert!(machine.stats().max_depth >= depth);
    }

    struct Countdown;

    impl Component for Countdown {
        fn name(&self) -> Option<&str> {
            Some("Countdown")
        }

        fn render(&self, input: ComponentInput<'_>) -> Result<Rendered, RenderError> {
            let remaining = input.props.as_u64().unwrap_or(0);
            if remaining == 0 {
                return Ok(Rendered::ready(RenderNode::text("liftoff")));
            }
            Ok(Rendered::ready(RenderNode::component(
                Arc::new(Countdown),
                json!(remaining - 1),
            )))
        }
    }

    #[tokio::test]
    async fn test_deep_component_chain_uses_explicit_stack() {
        let depth = 20_000u64;
        let root = RenderNode::component(Arc::new(Countdown), json!(depth));

        let mut machine = RenderMachine::new(root, RenderContext::default(), RenderOptions::default());
        let html = machine.run_to_string().await.unwrap();

        assert_eq!(html, "liftoff");
        assert_eq!(machine.stats().components, depth as usize + 1);
        assert!(machine.stats().max_depth >= depth as usize);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let mut machine = RenderMachine::new(
            RenderNode::text("never"),
            RenderContext::default(),
            RenderOptions::default(),
        );
        machine.cancel();
        let err = machine.run_to_string().await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(machine.is_cancelled());
        assert_eq!(machine.buffered(), 0);
    }

    // === Cache Tests ===

    #[tokio::test]
    async fn test_cache_hit_renders_once() {
        let renders = Arc::new(AtomicUsize::new(0));
        let price = counted_price(renders.clone());
        let store = Arc::new(InMemoryStore::new());
        let options = RenderOptions::new().with_cache(store.clone());

        let tree = || RenderNode::element("p").with_child(RenderNode::component(price.clone(), json!({"sku": "A-1"})));

        let mut first = RenderMachine::new(tree(), RenderContext::default(), options.clone());
        let first_html = first.run_to_string().await.unwrap();
        assert_eq!(first.stats().cache_misses, 1);

        let mut second = RenderMachine::new(tree(), RenderContext::default(), options);
        let second_html = second.run_to_string().await.unwrap();

        assert_eq!(first_html, "<p><span class=\"price\">A-1</span></p>");
        assert_eq!(first_html, second_html);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(second.stats().cache_hits, 1);
        assert!(second.context().registered_modules.contains("Price.vue"));

        let entry = store.get("Price::A-1").await.unwrap().unwrap();
        assert_eq!(entry.html, "<span class=\"price\">A-1</span>");
        assert!(entry.modules.contains("Price.vue"));
    }

    #[tokio::test]
    async fn test_bypass_never_touches_store() {
        let store = Arc::new(CountingStore::default());
        let options = RenderOptions::new().with_cache(store.clone());

        let uncacheable = ComponentFn::new(|_| Ok(Rendered::ready(RenderNode::text("x"))))
            .named("Clock")
            .with_cache_key(|_| None)
            .into_arc();
        let anonymous = ComponentFn::new(|_| Ok(Rendered::ready(RenderNode::text("y")))).into_arc();

        let root = RenderNode::fragment([
            RenderNode::component(uncacheable, json!({})),
            RenderNode::component(anonymous, json!({})).with_cache_key("ignored"),
        ]);
        let mut machine = RenderMachine::new(root, RenderContext::default(), options);
        assert_eq!(machine.run_to_string().await.unwrap(), "xy");

        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert_eq!(machine.stats().cache_bypasses, 2);
    }

    #[tokio::test]
    async fn test_explicit_node_key() {
        let store = Arc::new(InMemoryStore::new());
        let banner = leaf("Banner", "<aside>sale</aside>");
        let root = RenderNode::component(banner, json!({})).with_cache_key("spring");

        let (html, _) = render(root, RenderOptions::new().with_cache(store.clone())).await;
        assert_eq!(html.unwrap(), "<aside>sale</aside>");
        assert!(store.has("Banner::spring").await.unwrap());
    }

    #[tokio::test]
    async fn test_nested_caching() {
        let store = Arc::new(InMemoryStore::new());
        let inner = ComponentFn::new(|_| Ok(Rendered::ready(RenderNode::raw("<em>inner</em>"))))
            .named("Inner")
            .with_module("inner.vue")
            .with_cache_key(|_| Some("i".to_string()))
            .into_arc();
        let outer = ComponentFn::new(move |_| {
            Ok(Rendered::ready(
                RenderNode::element("section").with_child(RenderNode::component(inner.clone(), json!({}))),
            ))
        })
        .named("Outer")
        .with_module("outer.vue")
        .with_cache_key(|_| Some("o".to_string()))
        .into_arc();

        let root = RenderNode::fragment([
            RenderNode::text("<"),
            RenderNode::component(outer, json!({})),
            RenderNode::text(">"),
        ]);
        let (html, _) = render(root, RenderOptions::new().with_cache(store.clone())).await;
        assert_eq!(html.unwrap(), "&lt;<section><em>inner</em></section>&gt;");

        let outer_entry = store.get("Outer::o").await.unwrap().unwrap();
        assert_eq!(outer_entry.html, "<section><em>inner</em></section>");
        assert!(outer_entry.modules.contains("outer.vue"));
        assert!(outer_entry.modules.contains("inner.vue"));

        let inner_entry = store.get("Inner::i").await.unwrap().unwrap();
        assert_eq!(inner_entry.html, "<em>inner</em>");
        assert_eq!(inner_entry.modules.len(), 1);
    }

    #[tokio::test]
    async fn test_inner_hit_inside_outer_miss() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(
                "Inner::i",
                CachedComponent::new("<em>cached</em>").with_module("inner.vue"),
            )
            .await
            .unwrap();

        let inner = ComponentFn::new(|_| Ok(Rendered::ready(RenderNode::raw("<em>fresh</em>"))))
            .named("Inner")
            .with_cache_key(|_| Some("i".to_string()))
            .into_arc();
        let outer = ComponentFn::new(move |_| {
            Ok(Rendered::ready(RenderNode::fragment([
                RenderNode::text("o:"),
                RenderNode::component(inner.clone(), json!({})),
            ])))
        })
        .named("Outer")
        .with_cache_key(|_| Some("o".to_string()))
        .into_arc();

        let (html, ctx) = render(
            RenderNode::component(outer, json!({})),
            RenderOptions::new().with_cache(store.clone()),
        )
        .await;

        assert_eq!(html.unwrap(), "o:<em>cached</em>");
        assert!(ctx.registered_modules.contains("inner.vue"));
        let outer_entry = store.get("Outer::o").await.unwrap().unwrap();
        assert_eq!(outer_entry.html, "o:<em>cached</em>");
        assert!(outer_entry.modules.contains("inner.vue"));
    }

    #[tokio::test]
    async fn test_cache_failure_is_render_error() {
        let price = counted_price(Arc::new(AtomicUsize::new(0)));
        let root = RenderNode::component(price, json!({"sku": "B"}));

        let (result, _) = render(root, RenderOptions::new().with_cache(Arc::new(FailingStore))).await;
        match result {
            Err(RenderError::Cache(message)) => {
                assert!(message.starts_with("Price::B"));
                assert!(message.contains("backend down"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_observer_sees_lifecycle() {
        let observer = Arc::new(RecordingObserver::default());
        let store = Arc::new(InMemoryStore::new());
        store
            .set("Banner::x", CachedComponent::new("<b>hit</b>"))
            .await
            .unwrap();

        let root = RenderNode::component(leaf("Banner", "<b>miss</b>"), json!({})).with_cache_key("x");
        let options = RenderOptions::new()
            .with_cache(store)
            .with_observer(observer.clone());
        let (html, _) = render(root, options).await;
        assert_eq!(html.unwrap(), "<b>hit</b>");

        let phases = observer.phases.lock().unwrap().clone();
        assert_eq!(
            phases,
            vec![
                RenderPhase::Start,
                RenderPhase::CacheHit("Banner::x".to_string()),
                RenderPhase::Completion,
            ]
        );
    }
}
