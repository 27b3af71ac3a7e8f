//! Handler resolution
//!
//! Turns the configured module location into a callable [`Handler`]. Natively
//! registered handlers win; otherwise the loader registered for the module's
//! [`ModuleKind`] is used.

#[cfg(feature = "dylib-handler")]
pub mod dylib;
pub mod registry;

use std::collections::HashMap;
use std::path::Path;

pub use registry::{HandlerFactory, HandlerRegistry};
pub use xfunction_types::{
    FnHandler, Handler, HandlerError, HandlerLoader, ModuleKind, HANDLER_ENTRY_POINT,
};

#[cfg(feature = "dylib-handler")]
pub use dylib::DylibHandlerLoader;
#[cfg(feature = "builtin-handler-js")]
pub use xfunction_handler_js::{JsHandlerConfig, JsHandlerLoader};
#[cfg(feature = "builtin-handler-python")]
pub use xfunction_handler_python::{PythonHandlerConfig, PythonHandlerLoader};

use crate::config::RunnerConfig;

/// Handler resolver - one loader per module kind plus a registry
pub struct HandlerResolver {
    /// Loaders registered by module kind
    loaders: HashMap<ModuleKind, Box<dyn HandlerLoader>>,

    /// Natively registered handlers
    registry: HandlerRegistry,
}

impl HandlerResolver {
    /// Create a resolver with every built-in loader enabled at compile time
    #[cfg_attr(
        not(any(feature = "builtin-handler-js", feature = "builtin-handler-python")),
        allow(unused_variables, unused_mut)
    )]
    pub fn new(config: &RunnerConfig) -> Self {
        let mut resolver = Self::new_empty();

        #[cfg(feature = "builtin-handler-js")]
        resolver.register_loader(Box::new(JsHandlerLoader::new(config.js.clone())));

        #[cfg(feature = "builtin-handler-python")]
        resolver.register_loader(Box::new(
            PythonHandlerLoader::new(config.python.clone()).with_timeout(config.timeout()),
        ));

        #[cfg(feature = "dylib-handler")]
        resolver.register_loader(Box::new(DylibHandlerLoader::new()));

        resolver
    }

    /// Create a resolver with no loaders
    pub fn new_empty() -> Self {
        Self {
            loaders: HashMap::new(),
            registry: HandlerRegistry::new(),
        }
    }

    /// Register a loader, replacing any loader for the same module kind
    pub fn register_loader(&mut self, loader: Box<dyn HandlerLoader>) {
        self.loaders.insert(loader.module_kind(), loader);
    }

    pub fn has_loader(&self, kind: ModuleKind) -> bool {
        self.loaders.contains_key(&kind)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Resolve the module at `location` into a ready-to-invoke handler
    pub fn resolve(&self, location: &Path) -> Result<Box<dyn Handler>, HandlerError> {
        if let Some(handler) = self.registry.instantiate(location) {
            tracing::debug!(module = %location.display(), "Using registered handler");
            return Ok(handler);
        }

        let kind = ModuleKind::from_path(location);
        let loader = self.loaders.get(&kind).ok_or_else(|| {
            HandlerError::UnsupportedModule(format!(
                "no loader for {:?} module {}",
                kind,
                location.display()
            ))
        })?;
        loader.load(location)
    }
}
