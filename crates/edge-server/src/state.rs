//! Client state hand-off.

use edge_core::RenderContext;
use edge_devalue::{serialize, Value};

/// Name of the JSONP callback that receives static payloads.
pub const PAYLOAD_CALLBACK: &str = "__EDGE_JSONP__";

/// A self-removing script that assigns `expression` to `window.<global>`.
pub fn inline_state_script(global: &str, expression: &str) -> String {
    format!(
        "<script>window.{}={};document.currentScript.remove()</script>",
        global, expression
    )
}

/// JSONP body for a static payload request.
pub fn render_payload(url: &str, payload: &Value) -> String {
    format!(
        "{}({}, {})",
        PAYLOAD_CALLBACK,
        serialize(&Value::from(url)),
        serialize(payload)
    )
}

/// State handed to the client for this request.
///
/// Server renders carry the payload the application set on the context, or
/// an empty record. Client-only renders carry `{serverRendered: false}`.
pub fn client_state(context: &RenderContext) -> Value {
    if context.no_ssr {
        return Value::record([("serverRendered", Value::Bool(false))]);
    }
    context
        .payload
        .clone()
        .unwrap_or_else(|| Value::record(Vec::<(&str, Value)>::new()))
}
