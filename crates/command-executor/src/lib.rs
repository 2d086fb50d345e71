//! Async local command execution
//!
//! This crate runs host processes for the orchestration layer. Commands can
//! either stream their output straight to the operator's console or have
//! their stdout and stderr captured into a single combined buffer.
//!
//! # Example
//!
//! ```no_run
//! use command_executor::{Command, Executor};
//!
//! # fn main() -> command_executor::Result<()> {
//! smol::block_on(async {
//!     let executor = Executor::new("docker");
//!     let mut cmd = Command::new("docker");
//!     cmd.args(["ps", "--format", "{{.Names}}"]);
//!     let result = executor.output(cmd).await?;
//!     for name in result.stdout_lines() {
//!         println!("{}", name);
//!     }
//!     Ok(())
//! })
//! # }
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod event;
pub mod executor;
pub mod process;

pub use command::Command;
pub use error::{Error, Result};
pub use event::{LogSource, OutputLine};
pub use executor::Executor;
pub use process::{ExitResult, ExitStatus};
