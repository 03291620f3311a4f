//! Client manifest model.
//!
//! The canonical shape maps a module id to its build output. The older
//! bundle-oriented shape (`publicPath`/`all`/`initial`/`async`/`modules`) is
//! detected by its `all` and `initial` keys and normalized on load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::files::{is_css, is_js};

/// Opaque module identifier as emitted by the build tool.
pub type ModuleId = String;

/// Errors produced while loading a client manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Invalid manifest - {0}")]
    Structure(String),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

/// Build output for a single module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestEntry {
    /// Primary output file; may be empty.
    pub file: String,
    pub css: Vec<String>,
    pub assets: Vec<String>,
    pub imports: Vec<ModuleId>,
    pub dynamic_imports: Vec<ModuleId>,
    pub is_entry: bool,
    pub is_dynamic_entry: bool,
}

impl ManifestEntry {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn with_css(mut self, file: impl Into<String>) -> Self {
        self.css.push(file.into());
        self
    }

    pub fn with_asset(mut self, file: impl Into<String>) -> Self {
        self.assets.push(file.into());
        self
    }

    pub fn with_import(mut self, id: impl Into<ModuleId>) -> Self {
        self.imports.push(id.into());
        self
    }

    pub fn with_dynamic_import(mut self, id: impl Into<ModuleId>) -> Self {
        self.dynamic_imports.push(id.into());
        self
    }

    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    pub fn dynamic_entry(mut self) -> Self {
        self.is_dynamic_entry = true;
        self
    }
}

/// Canonical client manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientManifest {
    entries: BTreeMap<ModuleId, ManifestEntry>,
    /// Public path recovered from a legacy manifest.
    public_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyManifest {
    #[serde(rename = "publicPath")]
    public_path: Option<String>,
    all: Vec<String>,
    initial: Vec<String>,
    #[serde(rename = "async")]
    async_files: Vec<String>,
    modules: BTreeMap<String, Vec<usize>>,
}

fn legacy_id(file: &str) -> ModuleId {
    format!("_{}", file)
}

impl ClientManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn with_entry(mut self, id: impl Into<ModuleId>, entry: ManifestEntry) -> Self {
        self.entries.insert(id.into(), entry);
        self
    }

    pub fn insert(&mut self, id: impl Into<ModuleId>, entry: ManifestEntry) {
        self.entries.insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &ManifestEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Public path carried by a legacy manifest, if any.
    pub fn public_path(&self) -> Option<&str> {
        self.public_path.as_deref()
    }

    /// Parse a manifest from JSON, normalizing the legacy shape.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ManifestError> {
        let object = value.as_object().ok_or_else(|| {
            ManifestError::Structure("expected a JSON object at the top level".to_string())
        })?;

        if object.contains_key("all") && object.contains_key("initial") {
            let legacy: LegacyManifest = serde_json::from_value(value)?;
            return Self::from_legacy(legacy);
        }

        let entries: BTreeMap<ModuleId, ManifestEntry> = serde_json::from_value(value)?;
        Ok(Self {
            entries,
            public_path: None,
        })
    }

    pub fn from_json_str(input: &str) -> Result<Self, ManifestError> {
        Self::from_json(serde_json::from_str(input)?)
    }

    /// Read and parse a manifest file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let manifest = Self::from_json_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            modules = manifest.len(),
            "Loaded client manifest"
        );
        Ok(manifest)
    }

    fn from_legacy(legacy: LegacyManifest) -> Result<Self, ManifestError> {
        let mut entries: BTreeMap<ModuleId, ManifestEntry> = legacy
            .all
            .iter()
            .filter(|file| is_js(file))
            .map(|file| (legacy_id(file), ManifestEntry::new(file.clone())))
            .collect();

        let first_file = legacy.initial.iter().find(|file| is_js(file));
        let first = first_file.map(|file| legacy_id(file));
        if let (Some(file), Some(id)) = (first_file, &first) {
            if !entries.contains_key(id) {
                return Err(ManifestError::Structure(format!(
                    "initial entrypoint not in `all`: {}",
                    file
                )));
            }
        }

        for file in &legacy.initial {
            if is_js(file) {
                let entry = entries.get_mut(&legacy_id(file)).ok_or_else(|| {
                    ManifestError::Structure(format!("initial entrypoint not in `all`: {}", file))
                })?;
                entry.is_entry = true;
            } else if let Some(first_entry) = first.as_ref().and_then(|id| entries.get_mut(id)) {
                // Orphaned initial stylesheets and assets hang off the first entrypoint.
                if is_css(file) {
                    first_entry.css.push(file.clone());
                } else {
                    first_entry.assets.push(file.clone());
                }
            }
        }

        for file in &legacy.async_files {
            let id = legacy_id(file);
            if is_js(file) {
                let entry = entries.get_mut(&id).ok_or_else(|| {
                    ManifestError::Structure(format!("async module not in `all`: {}", file))
                })?;
                entry.is_dynamic_entry = true;
            } else if first.is_some() {
                let mut entry = ManifestEntry::default();
                if is_css(file) {
                    entry.css.push(file.clone());
                } else {
                    entry.assets.push(file.clone());
                }
                entries.insert(id.clone(), entry);
            } else {
                continue;
            }
            if let Some(first_entry) = first.as_ref().and_then(|first| entries.get_mut(first)) {
                first_entry.dynamic_imports.push(id);
            }
        }

        for (module_id, indices) in &legacy.modules {
            let mut module = ManifestEntry::default();
            for &index in indices {
                let file = legacy.all.get(index).ok_or_else(|| {
                    ManifestError::Structure(format!(
                        "module `{}` references missing file index {}",
                        module_id, index
                    ))
                })?;
                if is_js(file) {
                    let id = legacy_id(file);
                    entries
                        .entry(id.clone())
                        .or_insert_with(|| ManifestEntry::new(file.clone()));
                    module.imports.push(id);
                } else if is_css(file) {
                    module.css.push(file.clone());
                } else {
                    module.assets.push(file.clone());
                }
            }
            entries.insert(module_id.clone(), module);
        }

        Ok(Self {
            entries,
            public_path: legacy.public_path,
        })
    }
}

impl FromIterator<(ModuleId, ManifestEntry)> for ClientManifest {
    fn from_iter<T: IntoIterator<Item = (ModuleId, ManifestEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            public_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Canonical Manifest Tests ===

    #[test]
    fn test_parse_canonical() {
        let manifest = ClientManifest::from_json(json!({
            "entry.ts": {
                "file": "entry.js",
                "css": ["entry.css"],
                "imports": ["shared"],
                "dynamicImports": ["page.vue"],
                "isEntry": true,
                "src": "entry.ts"
            },
            "shared": { "file": "shared.js" },
            "page.vue": { "file": "page.js", "isDynamicEntry": true }
        }))
        .unwrap();

        assert_eq!(manifest.len(), 3);
        let entry = manifest.get("entry.ts").unwrap();
        assert_eq!(entry.file, "entry.js");
        assert_eq!(entry.css, vec!["entry.css"]);
        assert_eq!(entry.imports, vec!["shared"]);
        assert_eq!(entry.dynamic_imports, vec!["page.vue"]);
        assert!(entry.is_entry);
        assert!(manifest.get("page.vue").unwrap().is_dynamic_entry);
        assert_eq!(manifest.public_path(), None);
    }

    #[test]
    fn test_missing_fields_default() {
        let manifest = ClientManifest::from_json_str(r#"{"x": {}}"#).unwrap();
        assert_eq!(manifest.get("x"), Some(&ManifestEntry::default()));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = ClientManifest::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ManifestError::Structure(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = ClientManifest::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    // === Legacy Manifest Tests ===

    #[test]
    fn test_legacy_normalization() {
        let manifest = ClientManifest::from_json(json!({
            "publicPath": "/_nuxt/",
            "all": ["app.js", "vendor.js", "app.css", "logo.png", "page.js", "page.css"],
            "initial": ["app.js", "vendor.js", "app.css", "logo.png"],
            "async": ["page.js", "lazy.css"],
            "modules": {
                "abc123": [4, 5]
            }
        }))
        .unwrap();

        assert_eq!(manifest.public_path(), Some("/_nuxt/"));

        let app = manifest.get("_app.js").unwrap();
        assert_eq!(app.file, "app.js");
        assert!(app.is_entry);
        assert_eq!(app.css, vec!["app.css"]);
        assert_eq!(app.assets, vec!["logo.png"]);
        assert_eq!(app.dynamic_imports, vec!["_page.js", "_lazy.css"]);

        assert!(manifest.get("_vendor.js").unwrap().is_entry);
        assert!(manifest.get("_page.js").unwrap().is_dynamic_entry);

        let lazy = manifest.get("_lazy.css").unwrap();
        assert_eq!(lazy.file, "");
        assert_eq!(lazy.css, vec!["lazy.css"]);

        let module = manifest.get("abc123").unwrap();
        assert_eq!(module.file, "");
        assert_eq!(module.imports, vec!["_page.js"]);
        assert_eq!(module.css, vec!["page.css"]);
    }

    #[test]
    fn test_legacy_initial_not_in_all() {
        let err = ClientManifest::from_json(json!({
            "all": ["app.js"],
            "initial": ["main.js"]
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid manifest - initial entrypoint not in `all`: main.js"
        );
    }

    #[test]
    fn test_legacy_async_not_in_all() {
        let err = ClientManifest::from_json(json!({
            "all": ["app.js"],
            "initial": ["app.js"],
            "async": ["lazy.js"]
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid manifest - async module not in `all`: lazy.js"
        );
    }

    #[test]
    fn test_legacy_bad_module_index() {
        let err = ClientManifest::from_json(json!({
            "all": ["app.js"],
            "initial": ["app.js"],
            "modules": { "m": [3] }
        }))
        .unwrap_err();
        assert!(matches!(err, ManifestError::Structure(_)));
    }

    #[test]
    fn test_builder() {
        let manifest = ClientManifest::new().with_entry(
            "A",
            ManifestEntry::new("a.js")
                .with_css("a.css")
                .with_import("B")
                .with_dynamic_import("C")
                .entry(),
        );
        let a = manifest.get("A").unwrap();
        assert!(a.is_entry);
        assert_eq!(a.imports, vec!["B"]);
        assert!(!manifest.contains("B"));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = ClientManifest::from_path("/definitely/not/here/manifest.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
