//! Built-in Python handler loader.
//!
//! Runs `function.py` in a `python3` child process. The module is imported
//! once at load time; each invocation sends one JSON line on stdin and reads
//! one JSON reply line from stdout. Anything the module prints goes to the
//! child's stderr and is re-emitted through tracing.

mod bootstrap;
pub mod loader;

pub use loader::{PythonHandler, PythonHandlerConfig, PythonHandlerLoader};
