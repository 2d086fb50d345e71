//! Process exit types

use crate::event::{LogSource, OutputLine};

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Status of a process that exited normally with `code`
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            #[cfg(unix)]
            signal: None,
        }
    }

    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => {
                #[cfg(unix)]
                {
                    if let Some(signal) = self.signal {
                        return write!(f, "terminated by signal {}", signal);
                    }
                }
                write!(f, "terminated without exit code")
            }
        }
    }
}

/// Exit status plus the combined captured output of a process
#[derive(Debug, Clone)]
pub struct ExitResult {
    /// How the process ended
    pub status: ExitStatus,
    /// Stdout and stderr interleaved in arrival order, newline separated
    pub output: String,
    /// The same output split per line with its source
    pub lines: Vec<OutputLine>,
}

impl ExitResult {
    /// Build a result from a status and already-combined output
    pub fn new(status: ExitStatus, output: impl Into<String>) -> Self {
        let output = output.into();
        let lines = output
            .lines()
            .map(|line| OutputLine::stdout(line.to_string()))
            .collect();
        Self {
            status,
            output,
            lines,
        }
    }

    /// Returns true if the process exited with code 0
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Lines the process wrote to stdout, in order
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|l| l.source == LogSource::Stdout)
            .map(|l| l.line.as_str())
    }
}
