//! Request-scoped observability for the render engine.
//!
//! This crate provides:
//! - `StructuredLogger` - JSON or human log lines with request context,
//!   usable as a render `LifecycleObserver`
//! - `MetricsCollector` / `RenderMetrics` - Per-request render metrics

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

pub use edge_core::{RequestId, TimingContext};
