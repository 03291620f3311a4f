//! Render lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle phases of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPhase {
    /// Render started.
    Start,
    /// First chunk handed to the consumer.
    FirstChunk,
    /// A component subtree was replayed from the cache.
    CacheHit(String),
    /// Render completed successfully.
    Completion,
    /// Render aborted by an error.
    Error(String),
    /// Consumer went away before the render finished.
    Cancelled,
}

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark. Later marks with the same name win.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Record the first chunk, once.
    pub fn mark_first_chunk(&mut self) {
        self.marks
            .entry("first_chunk".to_string())
            .or_insert_with(Instant::now);
    }

    pub fn mark_complete(&mut self) {
        self.mark("complete");
    }

    pub fn mark_component_start(&mut self, component: &str) {
        self.mark(&format!("component_{}_start", component));
    }

    pub fn mark_component_resolved(&mut self, component: &str) {
        self.mark(&format!("component_{}_resolved", component));
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        self.since_start("first_chunk")
    }

    /// Total render time, or elapsed time while still rendering.
    pub fn total_time(&self) -> Duration {
        self.since_start("complete")
            .unwrap_or_else(|| self.elapsed())
    }

    /// Resolution time of an asynchronous component.
    pub fn component_timing(&self, component: &str) -> Option<ComponentTiming> {
        let start = self.marks.get(&format!("component_{}_start", component))?;
        let resolved = self
            .marks
            .get(&format!("component_{}_resolved", component))?;

        Some(ComponentTiming {
            name: component.to_string(),
            start: start.duration_since(self.start),
            resolved: resolved.duration_since(self.start),
            duration: resolved.duration_since(*start),
        })
    }

    fn since_start(&self, mark: &str) -> Option<Duration> {
        self.marks.get(mark).map(|t| t.duration_since(self.start))
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing of an asynchronous component resolution.
#[derive(Debug, Clone)]
pub struct ComponentTiming {
    pub name: String,
    /// Time from render start to the component being reached.
    pub start: Duration,
    /// Time from render start to its subtree becoming available.
    pub resolved: Duration,
    pub duration: Duration,
}

/// Observer trait for lifecycle events.
pub trait LifecycleObserver: Send + Sync {
    /// Called when a lifecycle phase occurs.
    fn on_phase(&self, phase: RenderPhase, elapsed: Duration);
}
