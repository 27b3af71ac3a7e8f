use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the entry point every handler module must expose.
pub const HANDLER_ENTRY_POINT: &str = "handler";

// ================================
// Handler Trait
// ================================

/// User-supplied function invoked with the decoded input document
///
/// All handler implementations (embedded JS, Python subprocesses, shared
/// libraries, registered Rust closures) must implement this trait
pub trait Handler {
    /// Invoke the handler
    ///
    /// # Parameters
    /// - `input`: the decoded input document, passed by value
    ///
    /// # Returns
    /// - `Ok(Value)`: the raw handler result, not yet normalized
    /// - `Err(HandlerError)`: the handler failed or its result could not be serialized
    fn invoke(&mut self, input: Value) -> Result<Value, HandlerError>;
}

/// Resolves a handler module at a location into a callable [`Handler`]
pub trait HandlerLoader {
    /// Module kind this loader understands
    fn module_kind(&self) -> ModuleKind;

    /// Load the module and resolve its `handler` entry point
    fn load(&self, location: &Path) -> Result<Box<dyn Handler>, HandlerError>;
}

// ================================
// Enums
// ================================

/// Handler module kind, derived from the module location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// JavaScript source evaluated by the embedded engine
    JavaScript,
    /// Python source run by an external interpreter
    Python,
    /// Native shared library exposing a C ABI entry point
    Dylib,
    /// Anything else
    Unknown,
}

impl ModuleKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("js") | Some("cjs") => ModuleKind::JavaScript,
            Some("py") => ModuleKind::Python,
            Some("so") | Some("dylib") | Some("dll") => ModuleKind::Dylib,
            _ => ModuleKind::Unknown,
        }
    }
}

/// Handler errors
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler module not found: {0}")]
    ModuleNotFound(String),

    #[error("Handler module too large (max {max} bytes, got {actual} bytes)")]
    ModuleTooLarge { max: usize, actual: usize },

    #[error("Failed to load handler module: {0}")]
    LoadFailed(String),

    #[error("Handler module does not export a callable named `{0}`")]
    MissingEntryPoint(String),

    #[error("Unsupported handler module: {0}")]
    UnsupportedModule(String),

    /// Raised by the handler itself; displays the bare message
    #[error("{0}")]
    Execution(String),

    #[error("Function execution timed out")]
    Timeout,

    #[error("Failed to serialize handler result: {0}")]
    Serialization(String),
}

impl HandlerError {
    /// Whether the error happened while resolving the module rather than running it
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            HandlerError::ModuleNotFound(_)
                | HandlerError::ModuleTooLarge { .. }
                | HandlerError::LoadFailed(_)
                | HandlerError::MissingEntryPoint(_)
                | HandlerError::UnsupportedModule(_)
        )
    }
}

// ================================
// Closure adapter
// ================================

/// Adapts a Rust closure into a [`Handler`]
pub struct FnHandler<F>
where
    F: FnMut(Value) -> Result<Value, HandlerError>,
{
    func: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(Value) -> Result<Value, HandlerError>,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: FnMut(Value) -> Result<Value, HandlerError>,
{
    fn invoke(&mut self, input: Value) -> Result<Value, HandlerError> {
        (self.func)(input)
    }
}
