//! Deps command - resolve module dependencies against a client manifest.

use anyhow::{Context as _, Result};
use edge_manifest::{
    render_prefetch_links, render_preload_links, render_scripts, render_styles, ClientManifest,
    DependencyResolver, ResolverOptions,
};

use crate::commands::{DepsArgs, DepsFormat};
use crate::context::Context;

/// Execute the deps command.
pub async fn run(args: DepsArgs, ctx: &Context) -> Result<()> {
    let manifest_path = ctx.manifest_path(args.manifest.as_deref())?;
    let manifest = ClientManifest::from_path(&manifest_path)
        .await
        .with_context(|| format!("Failed to load client manifest: {}", manifest_path.display()))?;

    for id in &args.modules {
        if !manifest.contains(id) {
            ctx.output
                .warn(&format!("Module '{}' is not in the manifest", id));
        }
    }

    let mut options = ResolverOptions::new();
    if let Some(path) = args
        .public_path
        .as_ref()
        .or(ctx.config.renderer.public_path.as_ref())
    {
        options = options.with_public_path(path.clone());
    }
    let resolver = DependencyResolver::new(manifest, options);

    let deps = if args.no_entries {
        resolver.resolve_module_set(&args.modules)
    } else {
        resolver.resolve_request(&args.modules)
    };
    let public_path = resolver.public_path();

    match args.format {
        DepsFormat::Json => ctx.output.json(&*deps),
        DepsFormat::Links => {
            for html in [
                render_preload_links(&deps, public_path),
                render_prefetch_links(&deps, public_path),
                render_styles(&deps, public_path),
                render_scripts(&deps, public_path),
            ] {
                if !html.is_empty() {
                    println!("{}", html);
                }
            }
        }
        DepsFormat::Summary => {
            if !args.no_entries {
                ctx.output.header("Entrypoints");
                for id in resolver.entrypoints() {
                    ctx.output.list_item(id);
                }
            }

            ctx.output.header(&format!("Scripts ({})", deps.scripts.len()));
            for dep in deps.scripts.values() {
                let kind = if dep.is_module() { "module" } else { "script" };
                ctx.output.list_item(&format!("{} [{}]", dep.path, kind));
            }

            ctx.output.header(&format!("Styles ({})", deps.styles.len()));
            for dep in deps.styles.values() {
                ctx.output.list_item(&dep.path);
            }

            ctx.output.header(&format!("Preload ({})", deps.preload.len()));
            for dep in deps.preload.values() {
                let kind = dep.kind.map_or_else(|| "-".to_string(), |kind| kind.to_string());
                ctx.output.list_item(&format!("{} [{}]", dep.path, kind));
            }

            ctx.output.header(&format!("Prefetch ({})", deps.prefetch.len()));
            for dep in deps.prefetch.values() {
                ctx.output.list_item(&dep.path);
            }
        }
    }

    Ok(())
}
