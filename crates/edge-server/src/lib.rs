//! Request orchestration for the render engine.
//!
//! This crate provides:
//! - `Renderer` - Buffered, streamed and client-only page rendering
//! - `LazyRenderer` - Memoized renderer construction with retry after failure
//! - `HtmlTemplate` - The HTML document shell
//! - `RenderRequest` - Render inputs derived from an HTTP request
//! - `RequestHandler` - Request to response, with payload and SPA fallback

mod error;
mod handler;
mod lazy;
mod renderer;
mod request;
mod state;
mod template;

pub use error::*;
pub use handler::*;
pub use lazy::*;
pub use renderer::*;
pub use request::*;
pub use state::*;
pub use template::*;
