//! Local process executor

use crate::command::Command;
use crate::error::{Error, Result};
use crate::event::OutputLine;
use crate::process::{ExitResult, ExitStatus};
use async_process::Stdio;
use futures::stream::{self, StreamExt};
use futures_lite::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Runs commands as local child processes
#[derive(Debug, Clone)]
pub struct Executor {
    /// Name used to tag log lines
    name: String,
}

impl Executor {
    /// Create a new executor
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Run a command with stdout and stderr attached to the operator's console
    ///
    /// Output is not buffered; it appears as the process writes it.
    pub async fn run(&self, command: Command) -> Result<ExitStatus> {
        debug!(executor = %self.name, "Running: {}", command.display());

        let mut cmd = command.prepare();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd
            .status()
            .await
            .map_err(|e| Error::from_spawn(&command, e))?;

        Ok(status.into())
    }

    /// Run a command and capture stdout and stderr into one combined buffer
    pub async fn output(&self, command: Command) -> Result<ExitResult> {
        debug!(executor = %self.name, "Capturing: {}", command.display());

        let mut cmd = command.prepare();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Error::from_spawn(&command, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not captured"))?;

        let stdout_lines = BufReader::new(stdout)
            .split(b'\n')
            .map(|line| line.map(|bytes| OutputLine::stdout(decode_line(bytes))));
        let stderr_lines = BufReader::new(stderr)
            .split(b'\n')
            .map(|line| line.map(|bytes| OutputLine::stderr(decode_line(bytes))));

        let mut merged = stream::select(stdout_lines, stderr_lines);
        let mut lines = Vec::new();
        let mut read_error = None;
        while let Some(line) = merged.next().await {
            match line {
                Ok(line) => lines.push(line),
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }
        // Close the pipes before reaping so a blocked writer cannot stall us.
        drop(merged);

        let status = child.status().await;
        if let Some(e) = read_error {
            return Err(e.into());
        }
        let status: ExitStatus = status?.into();
        let output = lines
            .iter()
            .map(|l| l.line.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(executor = %self.name, "{} finished with {}", command.display(), status);

        Ok(ExitResult {
            status,
            output,
            lines,
        })
    }
}

/// Decode one captured line, replacing invalid UTF-8 and dropping a trailing `\r`
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"ok\xff".to_vec()), "ok\u{FFFD}");
        assert_eq!(decode_line(b"healthy\r".to_vec()), "healthy");
    }
}
