//! Render command - render a page from a manifest and a JSON tree.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use edge_cache::InMemoryStore;
use edge_core::{RenderContext, RenderError, RenderNode, RendererConfig};
use edge_devalue::Value;
use edge_manifest::ClientManifest;
use edge_observability::{LogFormat, RenderMetrics};
use edge_server::{split_payload_url, LazyRenderer, RenderRequest, Renderer, RequestHandler};

use crate::commands::RenderArgs;
use crate::context::Context;
use crate::output::{format_bytes, format_micros};
use crate::tree::TreeSpec;

/// Execute the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let manifest_path = ctx.manifest_path(args.manifest.as_deref())?;
    ctx.output
        .debug(&format!("Loading manifest {}", manifest_path.display()));
    let manifest = ClientManifest::from_path(&manifest_path)
        .await
        .with_context(|| format!("Failed to load client manifest: {}", manifest_path.display()))?;

    let tree_path = ctx.resolve_path(&args.tree);
    let tree_json = tokio::fs::read_to_string(&tree_path)
        .await
        .with_context(|| format!("Failed to read render tree: {}", tree_path.display()))?;
    let tree = TreeSpec::from_json_str(&tree_json)
        .with_context(|| format!("Invalid render tree: {}", tree_path.display()))?;

    let payload = match &args.payload {
        Some(path) => Some(read_payload(ctx, path).await?),
        None => None,
    };

    let mut config = ctx.config.renderer.clone();
    if let Some(size) = args.chunk_size {
        config = config.with_chunk_size(size);
    }

    let app = move |context: &mut RenderContext| -> Result<RenderNode, RenderError> {
        if let Some(payload) = &payload {
            context.payload = Some(Value::from(payload.clone()));
        }
        Ok(tree.to_node())
    };
    let mut renderer = Renderer::new(manifest, Arc::new(app), config.clone());
    if args.cache || ctx.config.cache.enabled {
        let store = match ctx.config.cache.ttl_secs {
            Some(secs) => InMemoryStore::new().with_ttl(Duration::from_secs(secs)),
            None => InMemoryStore::new(),
        };
        renderer = renderer.with_cache(Arc::new(store));
    }

    if args.stream {
        return stream(renderer, &args, &config, ctx).await;
    }

    let format = if ctx.output.is_json() {
        LogFormat::Json
    } else {
        LogFormat::Human
    };
    let handler = RequestHandler::new(LazyRenderer::ready(renderer), config.clone()).with_log_format(format);

    let (url, is_payload) = split_payload_url(&args.url, &config);
    let mut request = RenderRequest::new(url).with_no_ssr(args.spa);
    request.is_payload = is_payload;

    let mut last = None;
    let mut runs = Vec::with_capacity(args.repeat.max(1));
    for run in 0..args.repeat.max(1) {
        let handled = handler.handle_render_request(request.clone()).await?;
        ctx.output.debug(&format!(
            "Run {}: {} in {}",
            run + 1,
            format_bytes(handled.metrics.bytes as u64),
            format_micros(handled.metrics.total_duration_us)
        ));
        runs.push(handled.metrics);
        last = handled.response;
    }

    match last {
        Some(response) => write_body(ctx, args.output.as_deref(), response.body()).await?,
        None => ctx.output.warn("The application redirected; no document was rendered"),
    }

    report(ctx, &runs);
    Ok(())
}

async fn read_payload(ctx: &Context, path: &str) -> Result<serde_json::Value> {
    let path = ctx.resolve_path(path);
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read payload: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid payload JSON: {}", path.display()))
}

async fn stream(renderer: Renderer, args: &RenderArgs, config: &RendererConfig, ctx: &Context) -> Result<()> {
    let context = RenderRequest::new(args.url.clone()).context();
    let mut stream = renderer.render_to_stream(context)?;

    let mut body = String::new();
    let mut chunks = 0usize;
    while let Some(chunk) = stream.read(config.chunk_size).await? {
        chunks += 1;
        ctx.output
            .debug(&format!("Chunk {}: {}", chunks, format_bytes(chunk.len() as u64)));
        if args.output.is_some() {
            body.push_str(&chunk);
        } else {
            print!("{}", chunk);
        }
    }
    if args.output.is_some() {
        write_body(ctx, args.output.as_deref(), &body).await?;
    } else {
        println!();
    }

    let stats = stream.stats();
    if ctx.output.is_json() {
        ctx.output.json(stats);
        return Ok(());
    }
    ctx.output.header("Stream");
    ctx.output.kv("Chunks", &chunks.to_string());
    ctx.output.kv("Bytes", &format_bytes(stats.bytes as u64));
    ctx.output.kv("Components", &stats.components.to_string());
    ctx.output.kv("Yields", &stats.yields.to_string());
    Ok(())
}

async fn write_body(ctx: &Context, output: Option<&str>, body: &str) -> Result<()> {
    match output {
        Some(path) => {
            let path = ctx.resolve_path(path);
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            ctx.output.success(&format!(
                "Wrote {} to {}",
                format_bytes(body.len() as u64),
                path.display()
            ));
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn report(ctx: &Context, runs: &[RenderMetrics]) {
    if ctx.output.is_json() {
        ctx.output.json(&runs);
        return;
    }

    let Some(last) = runs.last() else {
        return;
    };
    ctx.output.header("Render");
    ctx.output.info(&last.to_summary());
    if runs.len() > 1 {
        let total: u64 = runs.iter().map(|m| m.total_duration_us).sum();
        ctx.output.kv("Runs", &runs.len().to_string());
        ctx.output
            .kv("Average", &format_micros(total / runs.len() as u64));
        ctx.output.kv(
            "Cache hits (last run)",
            &last.cache.hits.to_string(),
        );
    }
}
