use std::path::Path;

use boa_engine::{Context, Source};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use xfunction_types::{
    json, Handler, HandlerError, HandlerLoader, ModuleKind, HANDLER_ENTRY_POINT,
};

use crate::console::{self, ConsoleLine};
use crate::prelude;

/// JavaScript loader configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsHandlerConfig {
    /// Max module source length (bytes)
    pub max_module_bytes: usize,

    /// Iterations a single loop may run before the engine aborts it
    pub loop_iteration_limit: u64,

    /// Max nested call depth
    pub recursion_limit: usize,

    /// Forward `console.*` output to tracing
    pub capture_console: bool,
}

impl Default for JsHandlerConfig {
    fn default() -> Self {
        Self {
            max_module_bytes: 1024 * 1024, // 1MB
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            capture_console: true,
        }
    }
}

/// Loads `function.js`-style modules into a boa context
pub struct JsHandlerLoader {
    config: JsHandlerConfig,
}

impl Default for JsHandlerLoader {
    fn default() -> Self {
        Self::new(JsHandlerConfig::default())
    }
}

impl JsHandlerLoader {
    pub fn new(config: JsHandlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JsHandlerConfig {
        &self.config
    }

    /// Evaluate module source and resolve its exported `handler`.
    pub fn load_source(&self, code: &str) -> Result<JsHandler, HandlerError> {
        if code.len() > self.config.max_module_bytes {
            return Err(HandlerError::ModuleTooLarge {
                max: self.config.max_module_bytes,
                actual: code.len(),
            });
        }

        let mut context = Context::default();
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.config.loop_iteration_limit);
        limits.set_recursion_limit(self.config.recursion_limit);

        context
            .eval(Source::from_bytes(&prelude::globals(self.config.capture_console)))
            .map_err(|e| HandlerError::LoadFailed(format!("Failed to install globals: {}", e)))?;

        let mut handler = JsHandler { context };

        let evaluated = handler
            .context
            .eval(Source::from_bytes(&prelude::wrap_module(code)));
        handler.drain_console();
        evaluated.map_err(|e| HandlerError::LoadFailed(e.to_string()))?;

        let exported = handler
            .context
            .eval(Source::from_bytes(&prelude::entry_point_check(HANDLER_ENTRY_POINT)))
            .map_err(|e| HandlerError::LoadFailed(e.to_string()))?;
        if exported.as_boolean() != Some(true) {
            return Err(HandlerError::MissingEntryPoint(HANDLER_ENTRY_POINT.to_string()));
        }

        Ok(handler)
    }
}

impl HandlerLoader for JsHandlerLoader {
    fn module_kind(&self) -> ModuleKind {
        ModuleKind::JavaScript
    }

    fn load(&self, location: &Path) -> Result<Box<dyn Handler>, HandlerError> {
        let code = std::fs::read_to_string(location).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                HandlerError::ModuleNotFound(location.display().to_string())
            }
            _ => HandlerError::LoadFailed(format!("{}: {}", location.display(), e)),
        })?;

        tracing::debug!(
            module = %location.display(),
            bytes = code.len(),
            "Evaluating JavaScript handler module"
        );

        Ok(Box::new(self.load_source(&code)?))
    }
}

/// Result envelope produced by the invocation snippet
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Envelope {
    Ok {
        #[serde(default)]
        logs: Vec<ConsoleLine>,
        #[serde(default)]
        output: Value,
    },
    Error {
        message: String,
        #[serde(default)]
        logs: Vec<ConsoleLine>,
    },
    Unserializable {
        message: String,
        #[serde(default)]
        logs: Vec<ConsoleLine>,
    },
}

/// A loaded module whose `handler` export can be invoked
pub struct JsHandler {
    context: Context,
}

impl JsHandler {
    fn drain_console(&mut self) {
        if let Ok(raw) = eval_to_string(&mut self.context, prelude::DRAIN_CONSOLE) {
            if let Ok(lines) = serde_json::from_str::<Vec<ConsoleLine>>(&raw) {
                console::emit(&lines);
            }
        }
    }
}

impl Handler for JsHandler {
    fn invoke(&mut self, input: Value) -> Result<Value, HandlerError> {
        // JSON text wrapped once more as a string literal, parsed in-engine
        let input_json = serde_json::to_string(&input)
            .map_err(|e| HandlerError::Serialization(e.to_string()))?;
        let input_literal = serde_json::to_string(&input_json)
            .map_err(|e| HandlerError::Serialization(e.to_string()))?;

        let code = prelude::invocation(HANDLER_ENTRY_POINT, &input_literal);
        let raw = match eval_to_string(&mut self.context, &code) {
            Ok(raw) => raw,
            Err(message) => {
                // uncatchable engine errors (runtime limits) skip the envelope
                self.drain_console();
                return Err(HandlerError::Execution(message));
            }
        };

        let envelope: Envelope = json::from_str_unbounded(&raw).map_err(|e| {
            HandlerError::Serialization(format!("Failed to parse result: {}", e))
        })?;

        match envelope {
            Envelope::Ok { logs, output } => {
                console::emit(&logs);
                Ok(output)
            }
            Envelope::Error { message, logs } => {
                console::emit(&logs);
                Err(HandlerError::Execution(message))
            }
            Envelope::Unserializable { message, logs } => {
                console::emit(&logs);
                Err(HandlerError::Serialization(message))
            }
        }
    }
}

fn eval_to_string(context: &mut Context, code: &str) -> Result<String, String> {
    let result = context
        .eval(Source::from_bytes(code))
        .map_err(|e| e.to_string())?;
    result
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| "JS result is not a string".to_string())
}

// ================================
// Tests
// ================================
