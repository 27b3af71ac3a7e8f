//! Built-in JavaScript handler loader using boa_engine.
//!
//! Evaluates a CommonJS-style module (`module.exports = { handler }`) in a
//! fresh context and invokes the exported `handler(input)` with JSON I/O.

mod console;
pub mod loader;
mod prelude;

pub use loader::{JsHandler, JsHandlerConfig, JsHandlerLoader};
