//! Serializes application state into self-reconstructing script literals.
//!
//! The output of [`serialize`] is a single expression which, evaluated in a
//! fresh script environment, rebuilds a value structurally equal to the
//! input:
//! - `Value` - A shared value graph (records, arrays, sets, maps, dates, ...)
//! - `Serializer` - Two-pass serializer with bounded diagnostics
//! - `serialize` - Convenience entry point with default limits
//!
//! Values referenced more than once are emitted once and bound to a short
//! name inside an immediately-invoked function, so shared and cyclic
//! (non-function) graphs survive the trip.
//!
//! # Example
//!
//! ```ignore
//! use edge_devalue::{serialize, Value};
//!
//! let user = Value::record([("name", Value::from("Ada"))]);
//! let state = Value::record([("owner", user.clone()), ("editor", user)]);
//!
//! assert_eq!(
//!     serialize(&state),
//!     r#"(function(a){a.name="Ada";return {owner:a,editor:a}}({}))"#
//! );
//! ```

mod escape;
mod names;
mod serialize;
mod value;

pub use serialize::*;
pub use value::*;
