pub mod handler;
pub mod json;

pub use handler::{FnHandler, Handler, HandlerError, HandlerLoader, ModuleKind, HANDLER_ENTRY_POINT};
