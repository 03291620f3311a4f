//! Core abstractions for the edge streaming SSR engine.
//!
//! This crate provides the fundamental types and traits:
//! - `RenderNode` - Render instruction tree
//! - `Component` trait - Component descriptor contract
//! - `RenderContext` - Per-request render state
//! - `RendererConfig` - Renderer configuration
//! - `RenderError` - Render failure taxonomy
//! - `TimingContext` / `RenderPhase` - Render lifecycle tracking

mod component;
mod config;
mod context;
mod error;
mod escape;
mod lifecycle;
mod node;

pub use component::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use escape::*;
pub use lifecycle::*;
pub use node::*;
