//! Runner error types.
//!
//! - [`RunnerError`]: every way a run can fail, converted into an error document.
//! - [`ErrorKind`]: coarse classification by cause, used in logs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use xfunction_types::HandlerError;

/// Convenience alias for runner-level results.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Failure cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Load,
    Handler,
    Serialization,
    Output,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Input => "input",
            ErrorKind::Load => "load",
            ErrorKind::Handler => "handler",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Output => "output",
        }
    }
}

/// Runner errors
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to read input file {}: {source}", .path.display())]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Input file {} is not valid JSON: {source}", .path.display())]
    InputParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Load(HandlerError),
    #[error(transparent)]
    Handler(HandlerError),
    #[error("Failed to serialize output document: {0}")]
    Serialization(String),
    #[error("Output document too large (max {max} bytes, got {actual} bytes)")]
    OutputTooLarge { max: usize, actual: usize },
    #[error("Failed to write output file {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::InputRead { .. } | RunnerError::InputParse { .. } => ErrorKind::Input,
            RunnerError::Load(_) => ErrorKind::Load,
            RunnerError::Handler(HandlerError::Serialization(_)) => ErrorKind::Serialization,
            RunnerError::Handler(_) => ErrorKind::Handler,
            RunnerError::Serialization(_) | RunnerError::OutputTooLarge { .. } => {
                ErrorKind::Serialization
            }
            RunnerError::OutputWrite { .. } => ErrorKind::Output,
        }
    }
}

impl From<HandlerError> for RunnerError {
    fn from(value: HandlerError) -> Self {
        if value.is_load_error() {
            RunnerError::Load(value)
        } else {
            RunnerError::Handler(value)
        }
    }
}
