//! Resolved resource sets.

use indexmap::IndexMap;
use serde::Serialize;

use crate::files::PreloadKind;

/// How a script is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Module,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptDep {
    pub path: String,
    pub kind: ScriptKind,
}

impl ScriptDep {
    pub fn is_module(&self) -> bool {
        self.kind == ScriptKind::Module
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleDep {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadDep {
    pub path: String,
    pub kind: Option<PreloadKind>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefetchDep {
    pub path: String,
}

/// Resources in first-seen order.
///
/// A module's own script is keyed by its module id; stylesheets and assets
/// are keyed by file path.
/// Merging overwrites entries with the same path but keeps their position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencySet {
    pub scripts: IndexMap<String, ScriptDep>,
    pub styles: IndexMap<String, StyleDep>,
    pub preload: IndexMap<String, PreloadDep>,
    pub prefetch: IndexMap<String, PrefetchDep>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
            && self.styles.is_empty()
            && self.preload.is_empty()
            && self.prefetch.is_empty()
    }

    /// Union with another set, entry by entry.
    pub fn merge(&mut self, other: &DependencySet) {
        extend(&mut self.scripts, &other.scripts);
        extend(&mut self.styles, &other.styles);
        extend(&mut self.preload, &other.preload);
        extend(&mut self.prefetch, &other.prefetch);
    }

    /// Fold every resource of `other` into the prefetch map.
    pub fn merge_as_prefetch(&mut self, other: &DependencySet) {
        let entries = other
            .scripts
            .iter()
            .map(|(key, dep)| (key, &dep.path))
            .chain(other.styles.iter().map(|(key, dep)| (key, &dep.path)))
            .chain(other.preload.iter().map(|(key, dep)| (key, &dep.path)))
            .chain(other.prefetch.iter().map(|(key, dep)| (key, &dep.path)));
        for (key, path) in entries {
            self.prefetch
                .insert(key.clone(), PrefetchDep { path: path.clone() });
        }
    }

    /// Drop prefetch entries that are already preloaded.
    pub fn dedupe_prefetch(&mut self) {
        let preload = &self.preload;
        self.prefetch.retain(|path, _| !preload.contains_key(path));
    }
}

fn extend<V: Clone>(into: &mut IndexMap<String, V>, from: &IndexMap<String, V>) {
    for (key, value) in from {
        into.insert(key.clone(), value.clone());
    }
}
