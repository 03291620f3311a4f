//! Renderer configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_GLOBAL_NAME: &str = "__EDGE__";
pub const DEFAULT_APP_ID: &str = "__app";
/// Consecutive synchronous render steps before the writer yields.
pub const DEFAULT_MAX_SYNC_WRITES: usize = 800;
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
pub const DEFAULT_PAYLOAD_PATH: &str = "/payload.js";
pub const DEFAULT_NO_SSR_HEADER: &str = "x-edge-no-ssr";

/// Configuration shared by every render of a renderer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// URL prefix for client assets. Falls back to the manifest's.
    pub public_path: Option<String>,
    /// Window property holding the serialized state.
    pub global_name: String,
    /// Id of the element the application mounts on.
    pub app_id: String,
    pub max_sync_writes: usize,
    /// Target size of streamed chunks, in bytes.
    pub chunk_size: usize,
    /// Base URL under which static payloads are served.
    pub static_assets_base: Option<String>,
    pub payload_path: String,
    /// Request header that selects the client-only renderer.
    pub no_ssr_header: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            public_path: None,
            global_name: DEFAULT_GLOBAL_NAME.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            max_sync_writes: DEFAULT_MAX_SYNC_WRITES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            static_assets_base: None,
            payload_path: DEFAULT_PAYLOAD_PATH.to_string(),
            no_ssr_header: DEFAULT_NO_SSR_HEADER.to_string(),
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = Some(path.into());
        self
    }

    pub fn with_global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = name.into();
        self
    }

    pub fn with_app_id(mut self, id: impl Into<String>) -> Self {
        self.app_id = id.into();
        self
    }

    pub fn with_max_sync_writes(mut self, max: usize) -> Self {
        self.max_sync_writes = max;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_static_assets_base(mut self, base: impl Into<String>) -> Self {
        self.static_assets_base = Some(base.into());
        self
    }
}
