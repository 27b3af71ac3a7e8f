use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use xfunction_types::{
    json, Handler, HandlerError, HandlerLoader, ModuleKind, HANDLER_ENTRY_POINT,
};

use crate::bootstrap::BOOTSTRAP;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Python loader configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonHandlerConfig {
    /// Interpreter executable, looked up on `PATH` when relative
    pub interpreter: PathBuf,

    /// Max module source length (bytes)
    pub max_module_bytes: usize,
}

impl Default for PythonHandlerConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            max_module_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Loads `function.py`-style modules into a child interpreter
pub struct PythonHandlerLoader {
    config: PythonHandlerConfig,
    timeout: Duration,
}

impl Default for PythonHandlerLoader {
    fn default() -> Self {
        Self::new(PythonHandlerConfig::default())
    }
}

impl PythonHandlerLoader {
    pub fn new(config: PythonHandlerConfig) -> Self {
        Self {
            config,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Deadline for the module import and for each reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &PythonHandlerConfig {
        &self.config
    }

    /// Start the interpreter, import the module and resolve its `handler`.
    pub fn spawn(&self, location: &Path) -> Result<PythonHandler, HandlerError> {
        let mut child = Command::new(&self.config.interpreter)
            .arg("-c")
            .arg(BOOTSTRAP)
            .arg(location)
            .arg(HANDLER_ENTRY_POINT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                HandlerError::LoadFailed(format!(
                    "Failed to start {}: {}",
                    self.config.interpreter.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(stderr);
        }

        let mut handler = PythonHandler {
            child,
            stdin,
            replies: stdout.map(read_replies),
            timeout: self.timeout,
        };

        let reply = handler.next_reply().map_err(|e| match e {
            HandlerError::Execution(message) => HandlerError::LoadFailed(message),
            other => other,
        })?;
        match reply {
            Reply::Ready => Ok(handler),
            Reply::LoadError { message } => Err(HandlerError::LoadFailed(message)),
            Reply::MissingEntryPoint => {
                Err(HandlerError::MissingEntryPoint(HANDLER_ENTRY_POINT.to_string()))
            }
            other => Err(HandlerError::LoadFailed(format!(
                "Unexpected reply while loading module: {:?}",
                other
            ))),
        }
    }
}

impl HandlerLoader for PythonHandlerLoader {
    fn module_kind(&self) -> ModuleKind {
        ModuleKind::Python
    }

    fn load(&self, location: &Path) -> Result<Box<dyn Handler>, HandlerError> {
        let metadata = fs::metadata(location).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => HandlerError::ModuleNotFound(location.display().to_string()),
            _ => HandlerError::LoadFailed(format!("{}: {}", location.display(), e)),
        })?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.config.max_module_bytes {
            return Err(HandlerError::ModuleTooLarge {
                max: self.config.max_module_bytes,
                actual: size,
            });
        }

        tracing::debug!(
            module = %location.display(),
            interpreter = %self.config.interpreter.display(),
            "Starting Python handler module"
        );

        Ok(Box::new(self.spawn(location)?))
    }
}

/// Reply line written by the driver
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Reply {
    Ready,
    LoadError {
        message: String,
    },
    MissingEntryPoint,
    Ok {
        #[serde(default)]
        output: Value,
    },
    Error {
        message: String,
    },
    Unserializable {
        message: String,
    },
}

/// A running interpreter with the module imported
///
/// The child is killed when the handler is dropped.
pub struct PythonHandler {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Option<Receiver<io::Result<String>>>,
    timeout: Duration,
}

impl PythonHandler {
    fn next_reply(&mut self) -> Result<Reply, HandlerError> {
        let replies = self
            .replies
            .as_ref()
            .ok_or_else(|| HandlerError::Execution("Python interpreter output is closed".into()))?;

        let line = match replies.recv_timeout(self.timeout) {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                return Err(HandlerError::Execution(format!(
                    "Failed to read from Python interpreter: {}",
                    e
                )))
            }
            Err(RecvTimeoutError::Timeout) => {
                let _ = self.child.kill();
                return Err(HandlerError::Timeout);
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(HandlerError::Execution(self.exit_message()));
            }
        };

        json::from_str_unbounded(&line).map_err(|e| {
            HandlerError::Execution(format!("Malformed reply from Python interpreter: {}", e))
        })
    }

    fn exit_message(&mut self) -> String {
        match self.child.wait() {
            Ok(status) => format!("Python interpreter exited unexpectedly ({})", status),
            Err(e) => format!("Python interpreter exited unexpectedly: {}", e),
        }
    }
}

impl Handler for PythonHandler {
    fn invoke(&mut self, input: Value) -> Result<Value, HandlerError> {
        let mut line =
            serde_json::to_string(&input).map_err(|e| HandlerError::Serialization(e.to_string()))?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| HandlerError::Execution("Python interpreter input is closed".into()))?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(|e| {
                HandlerError::Execution(format!("Failed to send input to Python interpreter: {}", e))
            })?;

        match self.next_reply()? {
            Reply::Ok { output } => Ok(output),
            Reply::Error { message } => Err(HandlerError::Execution(message)),
            Reply::Unserializable { message } => Err(HandlerError::Serialization(message)),
            other => Err(HandlerError::Execution(format!(
                "Unexpected reply from Python interpreter: {:?}",
                other
            ))),
        }
    }
}

impl Drop for PythonHandler {
    fn drop(&mut self) {
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn read_replies(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn forward_stderr(stderr: ChildStderr) {
    thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            tracing::info!(target: "xfunction::handler", "{}", line);
        }
    });
}

// ================================
// Tests
// ================================
