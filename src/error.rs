//! Error kinds raised by the registry and plugin lifecycle.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, GitvendError>;

/// Every failure the core can report.
///
/// Variants carry enough context (paths, the rendered command line, raw
/// output) that the message alone is sufficient to diagnose the problem.
#[derive(Error, Debug)]
pub enum GitvendError {
    /// Source path missing or not a recognised repository.
    #[error("{} is not a valid source: {reason}", path.display())]
    Validation { path: PathBuf, reason: String },

    /// Commit log output did not have the expected record shape.
    #[error("unable to parse commit log ({reason}):\n{output}")]
    Parse { reason: String, output: String },

    /// Persisted state unreadable, malformed or unwritable.
    #[error("plugin store {}: {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    /// External command could not be launched or exited unsuccessfully.
    #[error("`{command}` failed: {reason}")]
    Execution { command: String, reason: String },

    /// An expected working directory is absent.
    #[error("directory {} does not exist", path.display())]
    Directory { path: PathBuf },
}

impl GitvendError {
    pub(crate) fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn execution(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Execution {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
