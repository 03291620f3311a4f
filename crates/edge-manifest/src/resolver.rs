//! Memoized dependency resolution over a client manifest.

use std::sync::Arc;

use dashmap::DashMap;

use crate::deps::{DependencySet, PreloadDep, PrefetchDep, ScriptDep, ScriptKind, StyleDep};
use crate::files::{ensure_trailing_slash, file_extension, is_module, preload_kind, PreloadKind};
use crate::manifest::{ClientManifest, ModuleId};

/// Decides whether a file is preloaded, given its preload kind.
pub type PreloadPredicate = Arc<dyn Fn(&str, Option<PreloadKind>) -> bool + Send + Sync>;

/// Decides whether a file is prefetched.
pub type PrefetchPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Resolver configuration.
#[derive(Clone)]
pub struct ResolverOptions {
    /// Prefix for every emitted URL. Falls back to the manifest's own
    /// public path, then `/`.
    pub public_path: Option<String>,
    pub should_preload: PreloadPredicate,
    pub should_prefetch: PrefetchPredicate,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            public_path: None,
            should_preload: Arc::new(|_, kind| {
                matches!(
                    kind,
                    Some(PreloadKind::Module | PreloadKind::Script | PreloadKind::Style)
                )
            }),
            should_prefetch: Arc::new(|_| true),
        }
    }
}

impl std::fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("public_path", &self.public_path)
            .finish_non_exhaustive()
    }
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = Some(path.into());
        self
    }

    pub fn with_preload_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str, Option<PreloadKind>) -> bool + Send + Sync + 'static,
    {
        self.should_preload = Arc::new(filter);
        self
    }

    pub fn with_prefetch_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.should_prefetch = Arc::new(filter);
        self
    }
}

/// Resolves modules to the scripts, styles and hints the client needs.
///
/// Results are memoized per module and per distinct module set for the
/// lifetime of the manifest.
pub struct DependencyResolver {
    manifest: ClientManifest,
    options: ResolverOptions,
    public_path: String,
    entrypoints: Vec<ModuleId>,
    dynamic_entrypoints: Vec<ModuleId>,
    modules: DashMap<ModuleId, Arc<DependencySet>>,
    sets: DashMap<String, Arc<DependencySet>>,
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("public_path", &self.public_path)
            .field("modules", &self.manifest.len())
            .field("entrypoints", &self.entrypoints)
            .finish()
    }
}

impl DependencyResolver {
    pub fn new(manifest: ClientManifest, options: ResolverOptions) -> Self {
        let mut resolver = Self {
            manifest: ClientManifest::default(),
            options,
            public_path: String::new(),
            entrypoints: Vec::new(),
            dynamic_entrypoints: Vec::new(),
            modules: DashMap::new(),
            sets: DashMap::new(),
        };
        resolver.update_manifest(manifest);
        resolver
    }

    /// Replace the manifest, dropping every memoized result.
    pub fn update_manifest(&mut self, manifest: ClientManifest) {
        self.entrypoints = manifest
            .iter()
            .filter(|(_, entry)| entry.is_entry)
            .map(|(id, _)| id.clone())
            .collect();
        self.dynamic_entrypoints = manifest
            .iter()
            .filter(|(_, entry)| entry.is_dynamic_entry)
            .map(|(id, _)| id.clone())
            .collect();
        let public_path = self
            .options
            .public_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .or(manifest.public_path())
            .unwrap_or("/");
        self.public_path = ensure_trailing_slash(public_path);
        self.manifest = manifest;
        self.modules.clear();
        self.sets.clear();
        tracing::debug!(
            modules = self.manifest.len(),
            entrypoints = self.entrypoints.len(),
            public_path = %self.public_path,
            "Dependency resolver ready"
        );
    }

    pub fn manifest(&self) -> &ClientManifest {
        &self.manifest
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    /// Modules flagged as initial entrypoints.
    pub fn entrypoints(&self) -> &[ModuleId] {
        &self.entrypoints
    }

    /// Modules flagged as lazily loaded entrypoints.
    pub fn dynamic_entrypoints(&self) -> &[ModuleId] {
        &self.dynamic_entrypoints
    }

    /// Transitive dependencies of a single module.
    ///
    /// Unknown ids resolve to an empty set.
    pub fn resolve_module(&self, id: &str) -> Arc<DependencySet> {
        let mut path = Vec::new();
        self.resolve_on_path(id, &mut path).0
    }

    /// Returns the module's set together with the shallowest ancestor depth
    /// at which an import cycle was cut, if any.
    fn resolve_on_path(&self, id: &str, path: &mut Vec<ModuleId>) -> (Arc<DependencySet>, Option<usize>) {
        if let Some(hit) = self.modules.get(id) {
            return (hit.value().clone(), None);
        }

        let Some(meta) = self.manifest.get(id) else {
            tracing::debug!(module = id, "Module not in client manifest");
            let empty = Arc::new(DependencySet::default());
            self.modules.insert(id.to_string(), empty.clone());
            return (empty, None);
        };

        let depth = path.len();
        let mut deps = DependencySet::default();

        if !meta.file.is_empty() {
            let kind = if is_module(&meta.file) {
                ScriptKind::Module
            } else {
                ScriptKind::Script
            };
            deps.scripts.insert(
                id.to_string(),
                ScriptDep {
                    path: meta.file.clone(),
                    kind,
                },
            );
            deps.preload.insert(
                id.to_string(),
                PreloadDep {
                    path: meta.file.clone(),
                    kind: Some(match kind {
                        ScriptKind::Module => PreloadKind::Module,
                        ScriptKind::Script => PreloadKind::Script,
                    }),
                    extension: None,
                },
            );
        }

        for css in &meta.css {
            deps.styles.insert(css.clone(), StyleDep { path: css.clone() });
            deps.preload.insert(
                css.clone(),
                PreloadDep {
                    path: css.clone(),
                    kind: Some(PreloadKind::Style),
                    extension: None,
                },
            );
            deps.prefetch
                .insert(css.clone(), PrefetchDep { path: css.clone() });
        }

        for asset in &meta.assets {
            let extension = file_extension(asset);
            deps.preload.insert(
                asset.clone(),
                PreloadDep {
                    path: asset.clone(),
                    kind: preload_kind(extension),
                    extension: Some(extension.to_string()),
                },
            );
            deps.prefetch
                .insert(asset.clone(), PrefetchDep { path: asset.clone() });
        }

        path.push(id.to_string());
        let mut cut: Option<usize> = None;
        for import in &meta.imports {
            if let Some(position) = path.iter().position(|ancestor| ancestor == import) {
                tracing::trace!(module = id, import = %import, "Import cycle cut");
                cut = Some(cut.map_or(position, |current| current.min(position)));
                continue;
            }
            let (imported, imported_cut) = self.resolve_on_path(import, path);
            if let Some(position) = imported_cut {
                cut = Some(cut.map_or(position, |current| current.min(position)));
            }
            deps.merge(&imported);
        }
        path.pop();

        let should_preload = self.options.should_preload.as_ref();
        deps.preload
            .retain(|_, dep| should_preload(&dep.path, dep.kind));

        let deps = Arc::new(deps);
        // A cut at this module's own depth is closed by this expansion.
        let cut = cut.filter(|&position| position < depth);
        if cut.is_none() {
            self.modules.insert(id.to_string(), deps.clone());
        }
        (deps, cut)
    }

    /// Union of the dependencies of every module in `ids`, with dynamic
    /// imports folded in as prefetch candidates.
    pub fn resolve_module_set<I, S>(&self, ids: I) -> Arc<DependencySet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !ordered.iter().any(|seen| seen == id) {
                ordered.push(id.to_string());
            }
        }

        let mut sorted: Vec<&str> = ordered.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let key = sorted.join(",");

        if let Some(hit) = self.sets.get(&key) {
            return hit.value().clone();
        }

        let mut all = DependencySet::default();
        for id in &ordered {
            all.merge(&self.resolve_module(id));
            if let Some(meta) = self.manifest.get(id) {
                for dynamic in &meta.dynamic_imports {
                    all.merge_as_prefetch(&self.resolve_module(dynamic));
                }
            }
        }

        all.dedupe_prefetch();
        let should_prefetch = self.options.should_prefetch.as_ref();
        all.prefetch.retain(|_, dep| should_prefetch(&dep.path));

        let all = Arc::new(all);
        self.sets.insert(key, all.clone());
        all
    }

    /// Dependencies of a request: the entrypoints plus every module the
    /// render touched.
    pub fn resolve_request<I, S>(&self, modules: I) -> Arc<DependencySet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = self
            .entrypoints
            .iter()
            .cloned()
            .chain(modules.into_iter().map(|id| id.as_ref().to_string()))
            .collect();
        self.resolve_module_set(ids)
    }

    /// Number of memoized modules and module sets.
    pub fn memo_sizes(&self) -> (usize, usize) {
        (self.modules.len(), self.sets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    fn example_manifest() -> ClientManifest {
        ClientManifest::new()
            .with_entry("A", ManifestEntry::new("a.js").with_import("B"))
            .with_entry("B", ManifestEntry::new("b.js").with_css("b.css"))
    }

    fn resolver(manifest: ClientManifest) -> DependencyResolver {
        DependencyResolver::new(manifest, ResolverOptions::default())
    }

    // === Module Resolution Tests ===

    #[test]
    fn test_example_scenario() {
        let resolver = resolver(example_manifest());
        let deps = resolver.resolve_module_set(["A"]);

        let scripts: Vec<_> = deps
            .scripts
            .iter()
            .map(|(id, dep)| (id.as_str(), dep.path.as_str()))
            .collect();
        assert_eq!(scripts, vec![("A", "a.js"), ("B", "b.js")]);
        assert_eq!(deps.styles.keys().collect::<Vec<_>>(), vec!["b.css"]);
        assert!(deps.preload.contains_key("A"));
        assert!(deps.preload.contains_key("B"));
        assert!(deps.preload.contains_key("b.css"));
        assert!(deps.prefetch.is_empty());
    }

    #[test]
    fn test_unknown_module_is_empty() {
        let resolver = resolver(example_manifest());
        assert!(resolver.resolve_module("missing").is_empty());
        assert!(resolver.resolve_module_set(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_script_kind_by_extension() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry("m", ManifestEntry::new("entry.mjs"))
                .with_entry("s", ManifestEntry::new("legacy.js")),
        );
        assert_eq!(resolver.resolve_module("m").scripts["m"].kind, ScriptKind::Module);
        assert_eq!(resolver.resolve_module("s").scripts["s"].kind, ScriptKind::Script);
        assert_eq!(
            resolver.resolve_module("m").preload["m"].kind,
            Some(PreloadKind::Module)
        );
    }

    #[test]
    fn test_assets_classified() {
        let resolver = resolver(
            ClientManifest::new().with_entry(
                "A",
                ManifestEntry::new("a.js")
                    .with_asset("logo.png")
                    .with_asset("inter.woff2"),
            ),
        );
        let deps = resolver.resolve_module("A");
        // Images and fonts are rejected by the default preload filter.
        assert!(!deps.preload.contains_key("logo.png"));
        assert!(deps.prefetch.contains_key("logo.png"));
        assert!(deps.prefetch.contains_key("inter.woff2"));
    }

    #[test]
    fn test_custom_preload_filter() {
        let options = ResolverOptions::new().with_preload_filter(|_, kind| {
            matches!(kind, Some(PreloadKind::Font | PreloadKind::Script))
        });
        let resolver = DependencyResolver::new(
            ClientManifest::new().with_entry(
                "A",
                ManifestEntry::new("a.js")
                    .with_css("a.css")
                    .with_asset("inter.woff2"),
            ),
            options,
        );
        let deps = resolver.resolve_module_set(["A"]);
        let font = &deps.preload["inter.woff2"];
        assert_eq!(font.kind, Some(PreloadKind::Font));
        assert_eq!(font.extension.as_deref(), Some("woff2"));
        assert!(!deps.preload.contains_key("a.css"));
        // Rejected preloads remain prefetch candidates.
        assert!(deps.prefetch.contains_key("a.css"));
    }

    #[test]
    fn test_prefetch_filter() {
        let options = ResolverOptions::new().with_prefetch_filter(|path| !path.ends_with(".png"));
        let resolver = DependencyResolver::new(
            ClientManifest::new().with_entry(
                "A",
                ManifestEntry::new("a.js")
                    .with_asset("logo.png")
                    .with_asset("bg.svg"),
            ),
            options,
        );
        let deps = resolver.resolve_module_set(["A"]);
        assert!(!deps.prefetch.contains_key("logo.png"));
        assert!(deps.prefetch.contains_key("bg.svg"));
    }

    // === Module Set Tests ===

    #[test]
    fn test_dynamic_imports_become_prefetch() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry("A", ManifestEntry::new("a.js").with_dynamic_import("C"))
                .with_entry("C", ManifestEntry::new("c.js").with_css("c.css")),
        );
        let deps = resolver.resolve_module_set(["A"]);
        assert!(!deps.scripts.contains_key("C"));
        assert!(!deps.styles.contains_key("c.css"));
        assert_eq!(deps.prefetch["C"].path, "c.js");
        assert!(deps.prefetch.contains_key("c.css"));
    }

    #[test]
    fn test_preload_and_prefetch_disjoint() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry(
                    "A",
                    ManifestEntry::new("a.js")
                        .with_import("S")
                        .with_dynamic_import("C"),
                )
                .with_entry("C", ManifestEntry::new("c.js").with_import("S"))
                .with_entry("S", ManifestEntry::new("s.js").with_css("s.css")),
        );
        let deps = resolver.resolve_module_set(["A"]);
        for key in deps.prefetch.keys() {
            assert!(!deps.preload.contains_key(key), "{} hinted twice", key);
        }
        assert!(deps.prefetch.contains_key("C"));
        assert!(!deps.prefetch.contains_key("s.css"));
    }

    #[test]
    fn test_superset_property() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry("A", ManifestEntry::new("a.js").with_css("a.css"))
                .with_entry("B", ManifestEntry::new("b.js").with_import("C"))
                .with_entry("C", ManifestEntry::new("c.js").with_css("c.css")),
        );
        let small = resolver.resolve_module_set(["A"]);
        let large = resolver.resolve_module_set(["A", "B"]);
        for key in small.scripts.keys() {
            assert!(large.scripts.contains_key(key));
        }
        for key in small.styles.keys() {
            assert!(large.styles.contains_key(key));
        }
        assert!(large.styles.contains_key("c.css"));
    }

    #[test]
    fn test_set_memoized_independent_of_order() {
        let resolver = resolver(example_manifest());
        let first = resolver.resolve_module_set(["A", "B"]);
        let second = resolver.resolve_module_set(["B", "A", "B"]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.memo_sizes().1, 1);
    }

    #[test]
    fn test_module_memoized() {
        let resolver = resolver(example_manifest());
        let first = resolver.resolve_module("A");
        let second = resolver.resolve_module("A");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_import_cycle_terminates() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry("A", ManifestEntry::new("a.js").with_import("B"))
                .with_entry("B", ManifestEntry::new("b.js").with_import("A").with_css("b.css"))
                .with_entry("C", ManifestEntry::new("c.js").with_import("C")),
        );
        let a = resolver.resolve_module("A");
        assert!(a.scripts.contains_key("A"));
        assert!(a.scripts.contains_key("B"));

        // B was cut short while resolving A, so it is resolved afresh.
        let b = resolver.resolve_module("B");
        assert!(b.scripts.contains_key("A"));
        assert!(b.styles.contains_key("b.css"));

        let c = resolver.resolve_module("C");
        assert_eq!(c.scripts.len(), 1);
    }

    #[test]
    fn test_request_includes_entrypoints() {
        let resolver = resolver(
            ClientManifest::new()
                .with_entry("entry", ManifestEntry::new("entry.js").entry())
                .with_entry("page", ManifestEntry::new("page.js").dynamic_entry()),
        );
        assert_eq!(resolver.entrypoints(), ["entry".to_string()]);
        assert_eq!(resolver.dynamic_entrypoints(), ["page".to_string()]);

        let deps = resolver.resolve_request(["page"]);
        assert!(deps.scripts.contains_key("entry"));
        assert!(deps.scripts.contains_key("page"));
    }

    // === Public Path Tests ===

    #[test]
    fn test_public_path_resolution() {
        assert_eq!(resolver(example_manifest()).public_path(), "/");

        let explicit = DependencyResolver::new(
            example_manifest(),
            ResolverOptions::new().with_public_path("https://cdn.test/assets"),
        );
        assert_eq!(explicit.public_path(), "https://cdn.test/assets/");

        let legacy = ClientManifest::from_json(serde_json::json!({
            "publicPath": "/_nuxt",
            "all": ["app.js"],
            "initial": ["app.js"]
        }))
        .unwrap();
        assert_eq!(resolver(legacy).public_path(), "/_nuxt/");
    }

    #[test]
    fn test_update_manifest_invalidates() {
        let mut resolver = resolver(example_manifest());
        resolver.resolve_module_set(["A"]);
        assert_ne!(resolver.memo_sizes(), (0, 0));

        resolver.update_manifest(ClientManifest::new().with_entry("A", ManifestEntry::new("v2.js")));
        assert_eq!(resolver.memo_sizes(), (0, 0));
        assert_eq!(resolver.resolve_module("A").scripts["A"].path, "v2.js");
    }
}
