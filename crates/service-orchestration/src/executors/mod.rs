//! Container runtime collaborator.
//!
//! The pipeline never shells out to the container engine directly; it goes
//! through [`ContainerRuntime`], which the Docker CLI implements and tests
//! replace with fakes.

mod compose;
mod docker;

pub use compose::find_compose_files;
pub use docker::DockerRuntime;

use crate::config::{ContainerConfig, ServiceConfig};
use crate::error::{ContainerError, ContainerResolutionError};
use async_trait::async_trait;
use command_executor::{ExitResult, ExitStatus};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Blocking-style operations against the container engine
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build or pull the image, then run the container detached
    async fn run_container(
        &self,
        container: &ContainerConfig,
        global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError>;

    /// Bring up the compose project rooted at the service directory
    async fn compose_up(
        &self,
        service: &ServiceConfig,
        global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError>;

    /// Run `sh -c <command>` in a container, streaming output to the console
    ///
    /// `working_dir` is applied to the host-side process.
    async fn exec(
        &self,
        container: &str,
        command: &str,
        working_dir: Option<&Path>,
    ) -> Result<ExitStatus, ContainerError>;

    /// Run `sh -c <command>` in a container and capture combined output
    async fn exec_captured(&self, container: &str, command: &str)
    -> Result<ExitResult, ContainerError>;

    /// Names of running containers whose name contains `name_filter`
    async fn list_containers(&self, name_filter: &str) -> Result<Vec<String>, ContainerError>;
}

/// Find the running container for a service
///
/// An exact name match wins. Otherwise the first container the runtime
/// lists is used and the ambiguity is logged.
pub async fn resolve_container(
    runtime: &dyn ContainerRuntime,
    service_name: &str,
) -> Result<String, ContainerResolutionError> {
    let candidates = runtime
        .list_containers(service_name)
        .await
        .map_err(|e| ContainerResolutionError::Runtime {
            service: service_name.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(exact) = candidates.iter().find(|name| name.as_str() == service_name) {
        debug!("Resolved {} to container {}", service_name, exact);
        return Ok(exact.clone());
    }

    match candidates.as_slice() {
        [] => Err(ContainerResolutionError::NotFound(service_name.to_string())),
        [only] => {
            debug!("Resolved {} to container {}", service_name, only);
            Ok(only.clone())
        }
        [first, ..] => {
            warn!(
                "{} containers match service {}: {}; using {}",
                candidates.len(),
                service_name,
                candidates.join(", "),
                first
            );
            Ok(first.clone())
        }
    }
}
