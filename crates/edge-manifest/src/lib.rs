//! Client asset manifest model and dependency resolution for streaming SSR.
//!
//! This crate provides:
//! - `ClientManifest` - Canonical per-module manifest (legacy shape normalized)
//! - `DependencyResolver` - Memoized script/style/preload/prefetch closure
//! - `DependencySet` - The four resource maps for a module or module set
//! - `render_styles` / `render_resource_hints` / `render_scripts` - Link tags
//!
//! # Example
//!
//! ```ignore
//! use edge_manifest::{ClientManifest, DependencyResolver, ResolverOptions};
//!
//! let manifest = ClientManifest::from_json_str(r#"{
//!     "A": { "file": "a.js", "imports": ["B"], "isEntry": true },
//!     "B": { "file": "b.js", "css": ["b.css"] }
//! }"#)?;
//! let resolver = DependencyResolver::new(manifest, ResolverOptions::default());
//!
//! let deps = resolver.resolve_module_set(["A"]);
//! let head = edge_manifest::render_resource_hints(&deps, resolver.public_path());
//! ```

mod deps;
mod files;
mod links;
mod manifest;
mod resolver;

pub use deps::*;
pub use files::*;
pub use links::*;
pub use manifest::*;
pub use resolver::*;
