use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use xfunction_types::{FnHandler, Handler, HandlerError};

/// Produces a fresh handler instance for each run
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Registered plugin table of Rust handlers, keyed by module location
///
/// A registered location shadows whatever file sits at that path.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<PathBuf, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for the module at `location`
    pub fn register<F>(&mut self, location: impl Into<PathBuf>, factory: F)
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.factories.insert(location.into(), Box::new(factory));
    }

    /// Register a plain function as the module at `location`
    pub fn register_fn<F>(&mut self, location: impl Into<PathBuf>, func: F)
    where
        F: Fn(Value) -> Result<Value, HandlerError> + Clone + Send + Sync + 'static,
    {
        self.register(location, move || Box::new(FnHandler::new(func.clone())) as Box<dyn Handler>);
    }

    pub fn contains(&self, location: &Path) -> bool {
        self.factories.contains_key(location)
    }

    pub fn instantiate(&self, location: &Path) -> Option<Box<dyn Handler>> {
        self.factories.get(location).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.is_empty());

        registry.register_fn("/app/function.js", |input: Value| Ok(json!({ "echo": input })));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(Path::new("/app/function.js")));

        let mut handler = registry.instantiate(Path::new("/app/function.js")).unwrap();
        assert_eq!(handler.invoke(json!(1)).unwrap(), json!({ "echo": 1 }));
    }

    #[test]
    fn test_unknown_location() {
        let registry = HandlerRegistry::new();
        assert!(registry.instantiate(Path::new("/app/other.js")).is_none());
    }

    #[test]
    fn test_factory_yields_fresh_instances() {
        let mut registry = HandlerRegistry::new();
        registry.register("counter", || {
            let mut calls = 0u64;
            Box::new(FnHandler::new(move |_input: Value| {
                calls += 1;
                Ok(json!(calls))
            })) as Box<dyn Handler>
        });

        let mut first = registry.instantiate(Path::new("counter")).unwrap();
        assert_eq!(first.invoke(Value::Null).unwrap(), json!(1));
        assert_eq!(first.invoke(Value::Null).unwrap(), json!(2));

        let mut second = registry.instantiate(Path::new("counter")).unwrap();
        assert_eq!(second.invoke(Value::Null).unwrap(), json!(1));
    }

    #[test]
    fn test_registering_twice_replaces() {
        let mut registry = HandlerRegistry::new();
        registry.register_fn("m", |_| Ok(json!("old")));
        registry.register_fn("m", |_| Ok(json!("new")));
        assert_eq!(registry.len(), 1);
        let mut handler = registry.instantiate(Path::new("m")).unwrap();
        assert_eq!(handler.invoke(Value::Null).unwrap(), json!("new"));
    }
}
