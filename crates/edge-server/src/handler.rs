//! Request to response.

use std::sync::Arc;
use std::time::Duration;

use edge_core::RendererConfig;
use edge_observability::{CacheCounts, LogFormat, LogLevel, MetricsCollector, RenderMetrics, StructuredLogger};
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};

use crate::error::ServerError;
use crate::lazy::LazyRenderer;
use crate::request::RenderRequest;
use crate::state::{client_state, render_payload};

pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";
pub const PAYLOAD_CONTENT_TYPE: &str = "text/javascript;charset=UTF-8";

/// Outcome of one handled request.
#[derive(Debug)]
pub struct HandledRequest {
    /// `None` when the application redirected and no document is sent.
    pub response: Option<Response<String>>,
    pub metrics: RenderMetrics,
}

/// Turns requests into rendered documents or payloads.
///
/// A request carrying the client-only header, or a server render that fails,
/// is answered with the client-only shell.
pub struct RequestHandler {
    renderer: LazyRenderer,
    config: RendererConfig,
    log_format: LogFormat,
}

impl RequestHandler {
    pub fn new(renderer: LazyRenderer, config: RendererConfig) -> Self {
        Self {
            renderer,
            config,
            log_format: LogFormat::Json,
        }
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub async fn handle<B>(&self, request: &http::Request<B>) -> Result<HandledRequest, ServerError> {
        self.handle_render_request(RenderRequest::from_http(request, &self.config))
            .await
    }

    pub async fn handle_render_request(&self, request: RenderRequest) -> Result<HandledRequest, ServerError> {
        let mut context = request.context();
        let logger = Arc::new(
            StructuredLogger::new(context.request_id.clone())
                .with_route(request.url.clone())
                .with_format(self.log_format),
        );
        let mut metrics = MetricsCollector::new(context.request_id.clone());
        metrics.set_route(request.url.clone());

        let renderer = self.renderer.get().await?;

        let mut spa_fallback = context.no_ssr;
        let page = if context.no_ssr {
            renderer.render_spa_shell()
        } else {
            let options = renderer.options().clone().with_observer(logger.clone());
            match renderer.render_with(&mut context, options).await {
                Ok(page) => page,
                Err(err) => {
                    logger
                        .builder(LogLevel::Error, "server render failed, serving client-only shell")
                        .field("error", err.to_string())
                        .emit();
                    spa_fallback = true;
                    context.no_ssr = true;
                    renderer.render_spa_shell()
                }
            }
        };

        let stats = &page.stats;
        metrics.record_render(
            stats.components,
            CacheCounts::new(stats.cache_hits, stats.cache_misses, stats.cache_bypasses),
            stats.yields,
        );
        metrics.record_modules(context.registered_modules.len());

        if context.redirected {
            logger.info("redirected, no document sent");
            return Ok(HandledRequest {
                response: None,
                metrics: metrics.finalize(None, spa_fallback),
            });
        }
        if let Some(message) = context.error.take() {
            return Err(ServerError::Application(message));
        }

        let (body, content_type) = if request.is_payload {
            (render_payload(&request.url, &client_state(&context)), PAYLOAD_CONTENT_TYPE)
        } else {
            (renderer.document(&page, &context), HTML_CONTENT_TYPE)
        };
        metrics.record_chunk(body.len());

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, content_type)
            .body(body)?;
        let metrics = metrics.finalize(Some(StatusCode::OK.as_u16()), spa_fallback);

        logger
            .builder(LogLevel::Info, "request complete")
            .field_u64("bytes", metrics.bytes as u64)
            .field_bool("spa_fallback", spa_fallback)
            .duration_ms("total", Duration::from_micros(metrics.total_duration_us))
            .emit();

        Ok(HandledRequest {
            response: Some(response),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{ComponentFn, RenderContext, RenderError, RenderNode, Rendered};
    use edge_devalue::Value;
    use edge_manifest::{ClientManifest, ManifestEntry};
    use serde_json::json;

    use crate::renderer::Renderer;

    fn shop(context: &mut RenderContext) -> Result<RenderNode, RenderError> {
        let url = context.url.clone();
        match url.as_str() {
            "/redirect" => context.mark_redirected(),
            "/oops" => context.set_error("product not found"),
            "/cart" => context.payload = Some(Value::record([("items", Value::from(3))])),
            _ => {}
        }
        if url == "/broken" {
            let broken = ComponentFn::new(|_| Err(RenderError::component("Price", "no price")))
                .named("Price")
                .into_arc();
            return Ok(RenderNode::component(broken, json!({})));
        }
        Ok(RenderNode::element("main").with_child(RenderNode::text(url)))
    }

    fn config() -> RendererConfig {
        RendererConfig::new()
            .with_public_path("/assets")
            .with_static_assets_base("/_static/v1")
    }

    fn handler() -> RequestHandler {
        let manifest = ClientManifest::new()
            .with_entry("app.mjs", ManifestEntry::new("app.mjs").with_css("app.css").entry());
        let renderer = Renderer::new(manifest, Arc::new(shop), config());
        RequestHandler::new(LazyRenderer::ready(renderer), config())
    }

    fn get(uri: &str) -> http::Request<()> {
        http::Request::builder().uri(uri).body(()).unwrap()
    }

    fn content_type(response: &Response<String>) -> &str {
        response.headers()[CONTENT_TYPE].to_str().unwrap()
    }

    // === Document Tests ===

    #[tokio::test]
    async fn test_server_rendered_document() {
        let handled = handler().handle(&get("/products")).await.unwrap();
        let response = handled.response.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), HTML_CONTENT_TYPE);
        let body = response.body();
        assert!(body.contains("<main>/products</main>"));
        assert!(body.contains("href=\"/assets/app.css\""));
        assert!(body.contains("window.__EDGE__={}"));
        assert!(!handled.metrics.spa_fallback);
        assert_eq!(handled.metrics.bytes, body.len());
    }

    #[tokio::test]
    async fn test_no_ssr_header_serves_shell() {
        let request = http::Request::builder()
            .uri("/products")
            .header("x-edge-no-ssr", "1")
            .body(())
            .unwrap();
        let handled = handler().handle(&request).await.unwrap();
        let body = handled.response.unwrap().into_body();

        assert!(body.contains("<div id=\"__app\"></div>"));
        assert!(!body.contains("<main>"));
        assert!(body.contains("window.__EDGE__={serverRendered:false}"));
        assert!(handled.metrics.spa_fallback);
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_shell() {
        let handled = handler().handle(&get("/broken")).await.unwrap();
        let body = handled.response.unwrap().into_body();

        assert!(body.contains("<div id=\"__app\"></div>"));
        assert!(handled.metrics.spa_fallback);
    }

    // === Early Exit Tests ===

    #[tokio::test]
    async fn test_redirect_sends_nothing() {
        let handled = handler().handle(&get("/redirect")).await.unwrap();
        assert!(handled.response.is_none());
        assert!(handled.metrics.status_code.is_none());
    }

    #[tokio::test]
    async fn test_application_error() {
        let err = handler().handle(&get("/oops")).await.unwrap_err();
        assert!(matches!(err, ServerError::Application(message) if message == "product not found"));
    }

    // === Payload Tests ===

    #[tokio::test]
    async fn test_payload_request() {
        let handled = handler().handle(&get("/_static/v1/cart/payload.js")).await.unwrap();
        let response = handled.response.unwrap();

        assert_eq!(content_type(&response), PAYLOAD_CONTENT_TYPE);
        assert_eq!(response.body(), "__EDGE_JSONP__(\"\\u002Fcart\", {items:3})");
    }
}
