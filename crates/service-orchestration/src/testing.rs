//! In-memory collaborators for driving the pipeline without Docker or git.

use crate::config::{ContainerConfig, ServiceConfig};
use crate::error::{CloneError, ContainerError};
use crate::executors::ContainerRuntime;
use crate::repository::RepoCloner;
use async_trait::async_trait;
use command_executor::{ExitResult, ExitStatus};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// A call observed by [`FakeRuntime`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    /// `run_container` for the named container
    RunContainer(String),
    /// `compose_up` for the named service
    ComposeUp(String),
    /// Streaming exec
    Exec {
        /// Target container
        container: String,
        /// Shell command
        command: String,
        /// Host-side working directory
        working_dir: Option<PathBuf>,
    },
    /// Captured exec, as used by command probes
    ExecCaptured {
        /// Target container
        container: String,
        /// Shell command
        command: String,
    },
    /// Container listing with the given filter
    List(String),
}

#[derive(Default)]
struct RuntimeState {
    containers: Vec<String>,
    scripts: HashMap<String, VecDeque<i32>>,
    failing_compose: HashSet<String>,
    calls: Vec<RuntimeCall>,
}

/// Scriptable [`ContainerRuntime`]
///
/// Started containers and compose projects become listable under their
/// name. Commands exit 0 unless scripted; a script's last exit code sticks.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    /// Runtime with no running containers
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime that already lists `names` as running
    pub fn with_containers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let runtime = Self::new();
        runtime.lock().containers = names.into_iter().map(Into::into).collect();
        runtime
    }

    /// Successive exit codes for `command`; the last one repeats
    pub fn script_command(&self, command: impl Into<String>, codes: impl IntoIterator<Item = i32>) {
        self.lock()
            .scripts
            .insert(command.into(), codes.into_iter().collect());
    }

    /// Make `command` always exit 1
    pub fn fail_command(&self, command: impl Into<String>) {
        self.script_command(command, [1]);
    }

    /// Make `compose_up` fail for `service`
    pub fn fail_compose(&self, service: impl Into<String>) {
        self.lock().failing_compose.insert(service.into());
    }

    /// Every call in the order it was made
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    /// Commands passed to streaming exec, in order
    pub fn executed_commands(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::Exec { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_exit_code(state: &mut RuntimeState, command: &str) -> i32 {
        match state.scripts.get_mut(command) {
            Some(codes) if codes.len() > 1 => codes.pop_front().unwrap_or(0),
            Some(codes) => codes.front().copied().unwrap_or(0),
            None => 0,
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run_container(
        &self,
        container: &ContainerConfig,
        _global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError> {
        let mut state = self.lock();
        state
            .calls
            .push(RuntimeCall::RunContainer(container.name.clone()));
        state.containers.push(container.name.clone());
        Ok(())
    }

    async fn compose_up(
        &self,
        service: &ServiceConfig,
        _global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError> {
        let mut state = self.lock();
        state.calls.push(RuntimeCall::ComposeUp(service.name.clone()));
        if state.failing_compose.contains(&service.name) {
            return Err(ContainerError::Compose {
                service: service.name.clone(),
                reason: ExitStatus::from_code(1).to_string(),
            });
        }
        state.containers.push(service.name.clone());
        Ok(())
    }

    async fn exec(
        &self,
        container: &str,
        command: &str,
        working_dir: Option<&Path>,
    ) -> Result<ExitStatus, ContainerError> {
        let mut state = self.lock();
        state.calls.push(RuntimeCall::Exec {
            container: container.to_string(),
            command: command.to_string(),
            working_dir: working_dir.map(Path::to_path_buf),
        });
        Ok(ExitStatus::from_code(Self::next_exit_code(
            &mut state, command,
        )))
    }

    async fn exec_captured(
        &self,
        container: &str,
        command: &str,
    ) -> Result<ExitResult, ContainerError> {
        let mut state = self.lock();
        state.calls.push(RuntimeCall::ExecCaptured {
            container: container.to_string(),
            command: command.to_string(),
        });
        let code = Self::next_exit_code(&mut state, command);
        let output = if code == 0 { "ok" } else { "not ready" };
        Ok(ExitResult::new(ExitStatus::from_code(code), output))
    }

    async fn list_containers(&self, name_filter: &str) -> Result<Vec<String>, ContainerError> {
        let mut state = self.lock();
        state.calls.push(RuntimeCall::List(name_filter.to_string()));
        Ok(state
            .containers
            .iter()
            .filter(|name| name.contains(name_filter))
            .cloned()
            .collect())
    }
}

/// [`RepoCloner`] that records attempts instead of running git
#[derive(Default)]
pub struct FakeCloner {
    failing: HashSet<String>,
    delay: Option<Duration>,
    attempts: Mutex<Vec<String>>,
}

impl FakeCloner {
    /// Cloner where every clone succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the clone of `service` fail
    pub fn failing(mut self, service: impl Into<String>) -> Self {
        self.failing.insert(service.into());
        self
    }

    /// Make every clone take `delay` before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Services whose clone ran to completion, in completion order
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RepoCloner for FakeCloner {
    async fn clone_repo(&self, service: &ServiceConfig) -> Result<(), CloneError> {
        if let Some(delay) = self.delay {
            smol::Timer::after(delay).await;
        }

        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(service.name.clone());

        if self.failing.contains(&service.name) {
            Err(CloneError::Failed {
                repo: service.repo.clone(),
                reason: ExitStatus::from_code(128).to_string(),
            })
        } else {
            Ok(())
        }
    }
}
