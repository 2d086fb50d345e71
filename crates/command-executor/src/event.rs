//! Output lines captured from a process

/// Source of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// A single line read from a captured process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Which pipe the line came from
    pub source: LogSource,
    /// The line without its trailing newline
    pub line: String,
}

impl OutputLine {
    /// Create a line from stdout
    pub fn stdout(line: String) -> Self {
        Self {
            source: LogSource::Stdout,
            line,
        }
    }

    /// Create a line from stderr
    pub fn stderr(line: String) -> Self {
        Self {
            source: LogSource::Stderr,
            line,
        }
    }
}
