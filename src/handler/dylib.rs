//! Native shared-library handler loader.
//!
//! Library contract (C ABI):
//! - `xfunction_handler_abi_version() -> u32` (optional, must match)
//! - `handler(input_json: *const c_char) -> *mut c_char`, returning
//!   `{"result": <value>}` or `{"error": "<message>"}`
//! - `handler_free(ptr: *mut c_char)` to release the returned string

use std::ffi::{c_char, CStr, CString};
use std::path::Path;

use libloading::Library;
use serde::Deserialize;
use serde_json::Value;
use xfunction_types::{
    json, Handler, HandlerError, HandlerLoader, ModuleKind, HANDLER_ENTRY_POINT,
};

const CURRENT_ABI_VERSION: u32 = 1;

type InvokeFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type FreeFn = unsafe extern "C" fn(*mut c_char);

pub struct DylibHandlerLoader {
    abi_version: u32,
}

impl Default for DylibHandlerLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DylibHandlerLoader {
    pub fn new() -> Self {
        Self {
            abi_version: CURRENT_ABI_VERSION,
        }
    }

    unsafe fn load_library(&self, library: Library) -> Result<DylibHandler, HandlerError> {
        if let Ok(version_fn) =
            library.get::<unsafe extern "C" fn() -> u32>(b"xfunction_handler_abi_version\0")
        {
            let version = version_fn();
            if version != self.abi_version {
                return Err(HandlerError::LoadFailed(format!(
                    "ABI version mismatch: expected {}, got {}",
                    self.abi_version, version
                )));
            }
        }

        let invoke = *library
            .get::<InvokeFn>(b"handler\0")
            .map_err(|_| HandlerError::MissingEntryPoint(HANDLER_ENTRY_POINT.to_string()))?;
        let free = *library
            .get::<FreeFn>(b"handler_free\0")
            .map_err(|e| HandlerError::LoadFailed(format!("Missing export `handler_free`: {}", e)))?;

        Ok(DylibHandler {
            invoke,
            free,
            _library: library,
        })
    }
}

impl HandlerLoader for DylibHandlerLoader {
    fn module_kind(&self) -> ModuleKind {
        ModuleKind::Dylib
    }

    fn load(&self, location: &Path) -> Result<Box<dyn Handler>, HandlerError> {
        if !location.exists() {
            return Err(HandlerError::ModuleNotFound(location.display().to_string()));
        }

        tracing::debug!(module = %location.display(), "Loading shared-library handler");

        // SAFETY: loading runs the library's initializers; the library is the
        // user's handler module and is trusted like any other handler code.
        unsafe {
            let library = Library::new(location)
                .map_err(|e| HandlerError::LoadFailed(format!("Failed to load library: {}", e)))?;
            Ok(Box::new(self.load_library(library)?))
        }
    }
}

/// Symbols resolved from a loaded library; the library outlives them
struct DylibHandler {
    invoke: InvokeFn,
    free: FreeFn,
    _library: Library,
}

impl Handler for DylibHandler {
    fn invoke(&mut self, input: Value) -> Result<Value, HandlerError> {
        let input_json =
            serde_json::to_string(&input).map_err(|e| HandlerError::Serialization(e.to_string()))?;
        let input_c =
            CString::new(input_json).map_err(|e| HandlerError::Serialization(e.to_string()))?;

        // SAFETY: `input_c` stays alive across the call; the returned pointer
        // is owned by the library and handed back through `handler_free`.
        let text = unsafe {
            let raw = (self.invoke)(input_c.as_ptr());
            if raw.is_null() {
                return Err(HandlerError::Execution("Handler returned a null pointer".into()));
            }
            let text = CStr::from_ptr(raw).to_str().map(str::to_owned);
            (self.free)(raw);
            text
        }
        .map_err(|e| HandlerError::Execution(format!("Handler returned invalid UTF-8: {}", e)))?;

        parse_envelope(&text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Failure { error: String },
    Success { result: Value },
}

fn parse_envelope(text: &str) -> Result<Value, HandlerError> {
    let envelope: Envelope = json::from_str_unbounded(text).map_err(|e| {
        HandlerError::Execution(format!("Handler returned a malformed envelope: {}", e))
    })?;
    match envelope {
        Envelope::Success { result } => Ok(result),
        Envelope::Failure { error } => Err(HandlerError::Execution(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_result() {
        assert_eq!(parse_envelope(r#"{"result":{"a":1}}"#).unwrap(), json!({ "a": 1 }));
        assert_eq!(parse_envelope(r#"{"result":null}"#).unwrap(), Value::Null);
    }

    #[test]
    fn test_envelope_error() {
        let err = parse_envelope(r#"{"error":"boom"}"#).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_envelope_deeply_nested_result() {
        let depth = 200;
        let text = format!(r#"{{"result":{}{}}}"#, "[".repeat(depth), "]".repeat(depth));
        assert!(parse_envelope(&text).unwrap().is_array());
    }

    #[test]
    fn test_envelope_malformed() {
        assert!(matches!(parse_envelope("{}"), Err(HandlerError::Execution(_))));
        assert!(matches!(parse_envelope("not json"), Err(HandlerError::Execution(_))));
    }

    #[test]
    fn test_missing_library() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DylibHandlerLoader::new();
        assert_eq!(loader.module_kind(), ModuleKind::Dylib);
        match loader.load(&dir.path().join("libhandler.so")).err().unwrap() {
            HandlerError::ModuleNotFound(location) => assert!(location.ends_with("libhandler.so")),
            other => panic!("Expected ModuleNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_not_a_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libhandler.so");
        std::fs::write(&path, b"definitely not an object file").unwrap();
        let err = DylibHandlerLoader::new().load(&path).err().unwrap();
        assert!(matches!(err, HandlerError::LoadFailed(_)), "got: {:?}", err);
    }
}
