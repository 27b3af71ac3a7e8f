//! # xfunction: a single-shot function runner
//!
//! `xfunction` reads one JSON input document, invokes a user-supplied
//! `handler` with it, and writes exactly one JSON output document:
//!
//! - an object result is written as-is;
//! - any other result is wrapped as `{"output": <result>}`;
//! - any failure (unreadable input, missing module, a throwing handler, an
//!   unserializable result) is written as `{"error": "<message>"}`.
//!
//! The process exit status never reflects a logical failure; callers inspect
//! the output document for an `error` field.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xfunction::{Runner, RunnerConfig};
//!
//! // /app/input.json + /app/function.{js,py} -> /app/output.json
//! Runner::new(RunnerConfig::default().with_detected_handler()).run().unwrap();
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `builtin-handler-js` | Loads `.js` handler modules with the Boa engine (default) |
//! | `builtin-handler-python` | Loads `.py` handler modules in a `python3` child process (default) |
//! | `dylib-handler` | Loads `.so`/`.dylib`/`.dll` handler modules via `libloading` |

pub mod config;
pub mod document;
pub mod error;
pub mod handler;
pub mod runner;

pub use config::RunnerConfig;
pub use document::OutputDocument;
pub use error::{ErrorKind, RunnerError, RunnerResult};
pub use handler::{FnHandler, Handler, HandlerError, HandlerLoader, HandlerRegistry, HandlerResolver, ModuleKind};
pub use runner::{Runner, RunnerBuilder};
