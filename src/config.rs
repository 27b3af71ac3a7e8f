//! Runner configuration.
//!
//! [`RunnerConfig::default`] points at the fixed container locations the
//! host mounts (`/app/input.json`, `/app/function.js`, `/app/output.json`).
//! Embedders and tests relocate them with the `with_*` builders.
//! The host mounts `/app/function.py` instead for Python handlers;
//! [`RunnerConfig::with_detected_handler`] picks whichever is present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "builtin-handler-js")]
use xfunction_handler_js::JsHandlerConfig;
#[cfg(feature = "builtin-handler-python")]
use xfunction_handler_python::PythonHandlerConfig;

pub const DEFAULT_INPUT_PATH: &str = "/app/input.json";
pub const DEFAULT_OUTPUT_PATH: &str = "/app/output.json";
pub const DEFAULT_HANDLER_PATH: &str = "/app/function.js";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Module file names looked up next to `handler_path`, in order
pub const HANDLER_FILE_NAMES: &[&str] = &["function.js", "function.py"];

/// Configuration for a single run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Input document location
    pub input_path: PathBuf,

    /// Output document location, overwritten on every run
    pub output_path: PathBuf,

    /// Handler module location
    pub handler_path: PathBuf,

    /// Wall-clock budget for one handler invocation (milliseconds)
    pub timeout_ms: u64,

    /// Max serialized output document size (bytes); `None` is unbounded
    pub max_output_bytes: Option<usize>,

    /// JavaScript loader limits
    #[cfg(feature = "builtin-handler-js")]
    pub js: JsHandlerConfig,

    /// Python interpreter settings
    #[cfg(feature = "builtin-handler-python")]
    pub python: PythonHandlerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            handler_path: PathBuf::from(DEFAULT_HANDLER_PATH),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: None,
            #[cfg(feature = "builtin-handler-js")]
            js: JsHandlerConfig::default(),
            #[cfg(feature = "builtin-handler-python")]
            python: PythonHandlerConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Same file names as the default layout, rooted at `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            input_path: dir.join("input.json"),
            output_path: dir.join("output.json"),
            handler_path: dir.join("function.js"),
            ..Self::default()
        }
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_handler_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.handler_path = path.into();
        self
    }

    /// Sub-millisecond remainders round up, so a non-zero timeout never becomes zero
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = Some(max);
        self
    }

    #[cfg(feature = "builtin-handler-js")]
    pub fn with_js_config(mut self, js: JsHandlerConfig) -> Self {
        self.js = js;
        self
    }

    #[cfg(feature = "builtin-handler-python")]
    pub fn with_python_config(mut self, python: PythonHandlerConfig) -> Self {
        self.python = python;
        self
    }

    /// Point `handler_path` at the first module in [`HANDLER_FILE_NAMES`]
    /// present in its directory; unchanged when it already exists or none do.
    pub fn with_detected_handler(mut self) -> Self {
        if self.handler_path.exists() {
            return self;
        }
        let detected = self.handler_path.parent().and_then(|dir| {
            HANDLER_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.exists())
        });
        if let Some(path) = detected {
            self.handler_path = path;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_fixed_locations() {
        let config = RunnerConfig::default();
        assert_eq!(config.input_path, PathBuf::from("/app/input.json"));
        assert_eq!(config.output_path, PathBuf::from("/app/output.json"));
        assert_eq!(config.handler_path, PathBuf::from("/app/function.js"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_output_bytes, None);
    }

    #[test]
    fn test_in_dir_keeps_file_names() {
        let config = RunnerConfig::in_dir("/tmp/job-1");
        assert_eq!(config.input_path, PathBuf::from("/tmp/job-1/input.json"));
        assert_eq!(config.output_path, PathBuf::from("/tmp/job-1/output.json"));
        assert_eq!(config.handler_path, PathBuf::from("/tmp/job-1/function.js"));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_builders() {
        let config = RunnerConfig::default()
            .with_input_path("/data/in.json")
            .with_handler_path("/data/handler.so")
            .with_timeout(Duration::from_secs(5))
            .with_max_output_bytes(64);
        assert_eq!(config.input_path, PathBuf::from("/data/in.json"));
        assert_eq!(config.handler_path, PathBuf::from("/data/handler.so"));
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.max_output_bytes, Some(64));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "output_path": "/out/result.json", "timeout_ms": 2000 }"#)
                .unwrap();
        assert_eq!(config.output_path, PathBuf::from("/out/result.json"));
        assert_eq!(config.input_path, PathBuf::from(DEFAULT_INPUT_PATH));
        assert_eq!(config.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_sub_second_timeouts_are_kept() {
        let config = RunnerConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.timeout(), Duration::from_millis(500));

        let config = RunnerConfig::default().with_timeout(Duration::from_micros(10));
        assert_eq!(config.timeout(), Duration::from_millis(1));

        let config = RunnerConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(config.timeout(), Duration::ZERO);
    }

    #[test]
    fn test_detected_handler_prefers_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::in_dir(dir.path());
        std::fs::write(&config.handler_path, "exports.handler = () => 1;").unwrap();
        std::fs::write(dir.path().join("function.py"), "def handler(d):\n    return 1\n").unwrap();

        let detected = config.clone().with_detected_handler();
        assert_eq!(detected.handler_path, config.handler_path);
    }

    #[test]
    fn test_detected_handler_falls_back_to_python_module() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("function.py"), "def handler(d):\n    return 1\n").unwrap();

        let config = RunnerConfig::in_dir(dir.path()).with_detected_handler();
        assert_eq!(config.handler_path, dir.path().join("function.py"));
    }

    #[test]
    fn test_detected_handler_without_modules_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::in_dir(dir.path()).with_detected_handler();
        assert_eq!(config.handler_path, dir.path().join("function.js"));
    }

    #[test]
    #[cfg(feature = "builtin-handler-js")]
    fn test_deserialize_nested_js_limits() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "js": { "loop_iteration_limit": 50 } }"#).unwrap();
        assert_eq!(config.js.loop_iteration_limit, 50);
        assert_eq!(config.js.max_module_bytes, JsHandlerConfig::default().max_module_bytes);
    }
}
