//! The runner: read input → resolve handler → invoke → write one document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use xfunction_types::{json, Handler, HandlerError, HandlerLoader};

use crate::config::RunnerConfig;
use crate::document::{OutputDocument, FALLBACK_ERROR_DOCUMENT};
use crate::error::{RunnerError, RunnerResult};
use crate::handler::HandlerResolver;

/// Executes one handler run described by a [`RunnerConfig`]
pub struct Runner {
    config: RunnerConfig,
    resolver: HandlerResolver,
}

impl Runner {
    /// Runner with the built-in loaders for `config`
    pub fn new(config: RunnerConfig) -> Self {
        let resolver = HandlerResolver::new(&config);
        Self { config, resolver }
    }

    pub fn builder(config: RunnerConfig) -> RunnerBuilder {
        RunnerBuilder::new(config)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &HandlerResolver {
        &self.resolver
    }

    /// Run once and write the output document.
    ///
    /// Failures before the write are turned into an error document; the only
    /// error returned is a failed write of that document.
    pub fn run(&self) -> RunnerResult<()> {
        let span = tracing::info_span!(
            "run",
            handler = %self.config.handler_path.display(),
        );
        let _enter = span.enter();

        let text = self.render(self.execute());

        let path = &self.config.output_path;
        fs::write(path, &text).map_err(|source| RunnerError::OutputWrite {
            path: path.clone(),
            source,
        })?;
        tracing::info!(output = %path.display(), bytes = text.len(), "Output document written");
        Ok(())
    }

    /// Read, resolve, invoke and normalize without touching the output file
    pub fn execute(&self) -> RunnerResult<OutputDocument> {
        let input = self.read_input()?;

        let mut handler = self
            .resolver
            .resolve(&self.config.handler_path)
            .map_err(RunnerError::Load)?;
        tracing::debug!("Handler resolved");

        let result = self.invoke(handler.as_mut(), input)?;
        Ok(OutputDocument::from_result(result))
    }

    /// Serialize an outcome, falling back to an error document
    pub fn render(&self, outcome: RunnerResult<OutputDocument>) -> String {
        match outcome.and_then(|document| document.render(self.config.max_output_bytes)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), error = %e, "Run failed");
                OutputDocument::from_outcome(Err(e))
                    .render(None)
                    .unwrap_or_else(|_| FALLBACK_ERROR_DOCUMENT.to_string())
            }
        }
    }

    fn read_input(&self) -> RunnerResult<Value> {
        let path = &self.config.input_path;
        let text = fs::read_to_string(path).map_err(|source| RunnerError::InputRead {
            path: path.clone(),
            source,
        })?;
        let input = json::from_str_unbounded(&text).map_err(|source| RunnerError::InputParse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(input = %path.display(), bytes = text.len(), "Input document loaded");
        Ok(input)
    }

    fn invoke(&self, handler: &mut dyn Handler, input: Value) -> RunnerResult<Value> {
        let timeout = self.config.timeout();
        let start_time = Instant::now();

        let result = handler.invoke(input);

        // No preemption: a handler that overran is rejected after it returns
        let execution_time = start_time.elapsed();
        if execution_time > timeout {
            return Err(RunnerError::Handler(HandlerError::Timeout));
        }
        tracing::debug!(elapsed_ms = execution_time.as_millis() as u64, "Handler returned");

        result.map_err(RunnerError::Handler)
    }
}

/// Builder for [`Runner`] with extra loaders or registered handlers
pub struct RunnerBuilder {
    config: RunnerConfig,
    resolver: HandlerResolver,
}

impl RunnerBuilder {
    pub fn new(config: RunnerConfig) -> Self {
        let resolver = HandlerResolver::new(&config);
        Self { config, resolver }
    }

    /// Register a Rust function as the module at `location`
    pub fn register_fn<F>(mut self, location: impl Into<PathBuf>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, HandlerError> + Clone + Send + Sync + 'static,
    {
        self.resolver.registry_mut().register_fn(location, func);
        self
    }

    /// Register a handler factory as the module at `location`
    pub fn register_handler<F>(mut self, location: impl Into<PathBuf>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.resolver.registry_mut().register(location, factory);
        self
    }

    pub fn loader(mut self, loader: Box<dyn HandlerLoader>) -> Self {
        self.resolver.register_loader(loader);
        self
    }

    pub fn build(self) -> Runner {
        Runner {
            config: self.config,
            resolver: self.resolver,
        }
    }
}
