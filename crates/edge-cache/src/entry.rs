//! Cache entries and keys.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Rendered output of a component subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedComponent {
    /// Markup of the whole subtree, nested cached output included.
    pub html: String,
    /// Manifest ids of every module used while rendering the subtree.
    #[serde(default)]
    pub modules: BTreeSet<String>,
}

impl CachedComponent {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            modules: BTreeSet::new(),
        }
    }

    pub fn with_module(mut self, id: impl Into<String>) -> Self {
        self.modules.insert(id.into());
        self
    }

    pub fn with_modules<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.modules.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Store key for a component invocation.
pub fn component_cache_key(name: &str, key: &str) -> String {
    format!("{}::{}", name, key)
}
