//! CLI configuration.

use anyhow::{Context, Result};
use edge_core::RendererConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default client manifest path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    /// Renderer settings.
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Component cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Component cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache components across repeated renders.
    #[serde(default)]
    pub enabled: bool,

    /// Entry lifetime in seconds. Entries never expire when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(&content, path)
    }

    /// Parse config text; `origin` picks the format by extension.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if origin.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", origin))
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", origin))
        }
    }
}
