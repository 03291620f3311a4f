//! Stack-based streaming render engine.
//!
//! This crate turns a render instruction tree into ordered HTML chunks:
//! - `RenderMachine` - Explicit frame stack walk with async suspension
//! - `WriteBudget` - Cooperative yield after a run of synchronous steps
//! - `RenderStream` - Pull-based chunk stream with cancellation
//! - `render_to_string` - Buffered rendering
//!
//! Components that report a name and a cache key are replayed from the
//! configured `CacheStore` on a hit and buffered into it on a miss.

mod budget;
mod chunk;
mod machine;
mod options;
mod stream;

pub use budget::*;
pub use machine::*;
pub use options::*;
pub use stream::*;
