//! Per-request render metrics.

use std::time::{Duration, Instant};

use edge_core::RequestId;
use serde::{Deserialize, Serialize};

/// Component cache outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounts {
    pub hits: usize,
    pub misses: usize,
    pub bypasses: usize,
}

impl CacheCounts {
    pub fn new(hits: usize, misses: usize, bypasses: usize) -> Self {
        Self {
            hits,
            misses,
            bypasses,
        }
    }

    /// Hits over lookups, `None` when nothing was looked up.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            None
        } else {
            Some(self.hits as f64 / lookups as f64)
        }
    }
}

/// Metrics for a single render request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMetrics {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Time to first emitted chunk (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_chunk_us: Option<u64>,
    /// Total render duration (microseconds).
    pub total_duration_us: u64,
    pub bytes: usize,
    pub chunks: usize,
    pub components: usize,
    pub cache: CacheCounts,
    /// Forced scheduler yields.
    pub yields: usize,
    /// Modules registered during the render.
    pub modules: usize,
    /// The SPA shell was served instead of a server render.
    pub spa_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl RenderMetrics {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Request: {}", self.request_id));
        if let Some(route) = &self.route {
            lines.push(format!("  Route: {}", route));
        }
        if let Some(ttfc) = self.time_to_first_chunk_us {
            lines.push(format!(
                "  Time to first chunk: {}us ({:.2}ms)",
                ttfc,
                ttfc as f64 / 1000.0
            ));
        }
        lines.push(format!(
            "  Total: {}us ({:.2}ms)",
            self.total_duration_us,
            self.total_duration_us as f64 / 1000.0
        ));
        lines.push(format!("  Output: {} bytes in {} chunks", self.bytes, self.chunks));
        lines.push(format!(
            "  Components: {} (cache {} hit / {} miss / {} bypass)",
            self.components, self.cache.hits, self.cache.misses, self.cache.bypasses
        ));
        lines.push(format!("  Modules: {}", self.modules));
        if self.spa_fallback {
            lines.push("  [spa fallback]".to_string());
        }
        lines.join("\n")
    }
}

/// Collector for render metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    route: Option<String>,
    start: Instant,
    first_chunk: Option<Instant>,
    bytes: usize,
    chunks: usize,
    components: usize,
    cache: CacheCounts,
    yields: usize,
    modules: usize,
}

impl MetricsCollector {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            route: None,
            start: Instant::now(),
            first_chunk: None,
            bytes: 0,
            chunks: 0,
            components: 0,
            cache: CacheCounts::default(),
            yields: 0,
            modules: 0,
        }
    }

    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Record one emitted chunk.
    pub fn record_chunk(&mut self, bytes: usize) {
        if self.first_chunk.is_none() {
            self.first_chunk = Some(Instant::now());
        }
        self.bytes += bytes;
        self.chunks += 1;
    }

    /// Record render counters once the walk has finished.
    pub fn record_render(&mut self, components: usize, cache: CacheCounts, yields: usize) {
        self.components = components;
        self.cache = cache;
        self.yields = yields;
    }

    pub fn record_modules(&mut self, modules: usize) {
        self.modules = modules;
    }

    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        self.first_chunk.map(|t| t.duration_since(self.start))
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finalize(self, status_code: Option<u16>, spa_fallback: bool) -> RenderMetrics {
        let start = self.start;
        RenderMetrics {
            request_id: self.request_id.to_string(),
            route: self.route,
            time_to_first_chunk_us: self
                .first_chunk
                .map(|t| t.duration_since(start).as_micros() as u64),
            total_duration_us: start.elapsed().as_micros() as u64,
            bytes: self.bytes,
            chunks: self.chunks,
            components: self.components,
            cache: self.cache,
            yields: self.yields,
            modules: self.modules,
            spa_fallback,
            status_code,
        }
    }
}
