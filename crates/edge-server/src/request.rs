//! Render inputs derived from an HTTP request.

use edge_core::{RenderContext, RendererConfig, RequestId};

/// Header carrying an upstream request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What a single request asks the renderer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Application URL, with any static payload prefix and suffix removed.
    pub url: String,
    /// The request targets a static payload, answered with JSONP.
    pub is_payload: bool,
    /// Client-only rendering was requested.
    pub no_ssr: bool,
    pub request_id: Option<RequestId>,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_payload: false,
            no_ssr: false,
            request_id: None,
        }
    }

    pub fn with_no_ssr(mut self, no_ssr: bool) -> Self {
        self.no_ssr = no_ssr;
        self
    }

    pub fn from_http<B>(request: &http::Request<B>, config: &RendererConfig) -> Self {
        let raw = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let (url, is_payload) = split_payload_url(raw, config);
        let headers = request.headers();
        let no_ssr = headers
            .get(config.no_ssr_header.as_str())
            .is_some_and(|value| !value.is_empty());
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(RequestId::from_string);

        Self {
            url,
            is_payload,
            no_ssr,
            request_id,
        }
    }

    /// Fresh render context for this request.
    pub fn context(&self) -> RenderContext {
        let context = RenderContext::new(self.url.clone()).with_no_ssr(self.no_ssr);
        match &self.request_id {
            Some(id) => context.with_request_id(id.clone()),
            None => context,
        }
    }
}

/// Strip the static payload prefix and suffix from `url`.
///
/// Returns the application URL and whether this was a payload request.
pub fn split_payload_url(url: &str, config: &RendererConfig) -> (String, bool) {
    if let Some(base) = config.static_assets_base.as_deref() {
        let path = url
            .strip_prefix(base)
            .and_then(|rest| rest.strip_suffix(config.payload_path.as_str()));
        if let Some(path) = path {
            let path = if path.is_empty() { "/" } else { path };
            return (path.to_string(), true);
        }
    }
    (url.to_string(), false)
}
