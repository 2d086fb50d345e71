//! Error types for command execution

use thiserror::Error;

/// Unified error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn `{command}`: {reason}")]
    SpawnFailed {
        /// The command line that could not be started
        command: String,
        /// The reason for the spawn failure
        reason: String,
    },

    /// Program not found on PATH
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The program that was not found
        command: String,
    },

    /// I/O error while reading output or waiting for the process
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify a spawn-time I/O error
    pub fn from_spawn(command: &crate::Command, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::CommandNotFound {
                command: command.get_program().to_string_lossy().into_owned(),
            }
        } else {
            Self::SpawnFailed {
                command: command.display(),
                reason: err.to_string(),
            }
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
