//! In-container command probe.

use super::HealthChecker;
use crate::error::ProbeError;
use crate::executors::ContainerRuntime;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Healthy iff `sh -c <command>` exits zero inside the container
pub struct CommandHealthCheck {
    container: String,
    command: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl CommandHealthCheck {
    /// Probe `container` by running `command` in it
    pub fn new(
        container: impl Into<String>,
        command: impl Into<String>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            container: container.into(),
            command: command.into(),
            runtime,
        }
    }
}

#[async_trait]
impl HealthChecker for CommandHealthCheck {
    async fn check(&self) -> Result<(), ProbeError> {
        debug!("Probing container {} with `{}`", self.container, self.command);

        let result = self
            .runtime
            .exec_captured(&self.container, &self.command)
            .await
            .map_err(|e| ProbeError::CommandFailed {
                output: String::new(),
                reason: e.to_string(),
            })?;

        if result.success() {
            Ok(())
        } else {
            Err(ProbeError::CommandFailed {
                output: result.output,
                reason: result.status.to_string(),
            })
        }
    }

    fn describe(&self) -> String {
        format!("`{}` in {}", self.command, self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRuntime, RuntimeCall};

    #[test]
    fn test_failed_check_carries_output_and_exit_status() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.script_command("pg_isready", [2, 0]);
        let check = CommandHealthCheck::new("db-1", "pg_isready", runtime.clone());

        smol::block_on(async {
            match check.check().await {
                Err(ProbeError::CommandFailed { output, reason }) => {
                    assert_eq!(output, "not ready");
                    assert_eq!(reason, "exit status 2");
                }
                other => panic!("expected CommandFailed, got {other:?}"),
            }

            check.check().await.unwrap();
        });

        let exec_call = RuntimeCall::ExecCaptured {
            container: "db-1".to_string(),
            command: "pg_isready".to_string(),
        };
        assert_eq!(runtime.calls(), vec![exec_call.clone(), exec_call]);
        assert_eq!(check.describe(), "`pg_isready` in db-1");
    }
}
