//! HTML link and script tags for a resolved dependency set.

use crate::deps::DependencySet;
use crate::files::{file_extension, is_css, is_js, PreloadKind};

fn attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// `<link rel="stylesheet">` for every style.
pub fn render_styles(deps: &DependencySet, public_path: &str) -> String {
    deps.styles
        .values()
        .map(|style| {
            format!(
                r#"<link rel="stylesheet" href="{}{}">"#,
                public_path,
                attr(&style.path)
            )
        })
        .collect()
}

/// Preload hints; module scripts use `modulepreload`.
pub fn render_preload_links(deps: &DependencySet, public_path: &str) -> String {
    let mut out = String::new();
    for dep in deps.preload.values() {
        let rel = match dep.kind {
            Some(PreloadKind::Module) => "modulepreload",
            _ => "preload",
        };
        out.push_str(&format!(
            r#"<link rel="{}" href="{}{}""#,
            rel,
            public_path,
            attr(&dep.path)
        ));
        if let Some(kind) = dep.kind {
            out.push_str(&format!(r#" as="{}""#, kind.as_str()));
        }
        match dep.kind {
            Some(PreloadKind::Font) => {
                let extension = dep
                    .extension
                    .as_deref()
                    .unwrap_or_else(|| file_extension(&dep.path));
                out.push_str(&format!(r#" type="font/{}" crossorigin"#, attr(extension)));
            }
            Some(PreloadKind::Module) => out.push_str(" crossorigin"),
            _ => {}
        }
        out.push('>');
    }
    out
}

/// Prefetch hints for resources that may be needed later.
pub fn render_prefetch_links(deps: &DependencySet, public_path: &str) -> String {
    deps.prefetch
        .values()
        .map(|dep| {
            let rel = if is_css(&dep.path) {
                "prefetch stylesheet"
            } else {
                "prefetch"
            };
            let as_script = if is_js(&dep.path) { r#" as="script""# } else { "" };
            format!(
                r#"<link rel="{}"{} href="{}{}">"#,
                rel,
                as_script,
                public_path,
                attr(&dep.path)
            )
        })
        .collect()
}

/// Preload hints followed by prefetch hints.
pub fn render_resource_hints(deps: &DependencySet, public_path: &str) -> String {
    let mut out = render_preload_links(deps, public_path);
    out.push_str(&render_prefetch_links(deps, public_path));
    out
}

/// Script tags; module scripts get `type="module"`, classic scripts `defer`.
pub fn render_scripts(deps: &DependencySet, public_path: &str) -> String {
    deps.scripts
        .values()
        .map(|script| {
            if script.is_module() {
                format!(
                    r#"<script type="module" src="{}{}" crossorigin></script>"#,
                    public_path,
                    attr(&script.path)
                )
            } else {
                format!(
                    r#"<script src="{}{}" defer crossorigin></script>"#,
                    public_path,
                    attr(&script.path)
                )
            }
        })
        .collect()
}
