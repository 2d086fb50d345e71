//! # Service orchestration
//!
//! Brings up a set of interdependent local services: clones their
//! repositories, starts their containers, waits for them to become healthy
//! and runs their post-up hooks.
//!
//! The pipeline is strictly linear. Only the clone phase runs concurrently;
//! every later phase handles one service at a time in dependency order.
//!
//! ## Example
//!
//! ```no_run
//! use service_orchestration::{
//!     DockerRuntime, GitCloner, HealthCheckDescriptor, Orchestrator, Plan, ServiceConfig,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> service_orchestration::Result<()> {
//! let plan = Plan {
//!     services: vec![ServiceConfig {
//!         name: "api".to_string(),
//!         repo: "git@github.com:acme/api.git".to_string(),
//!         path: "./services/api".into(),
//!         compose_file: Some("docker-compose".to_string()),
//!         health_check: Some(HealthCheckDescriptor::http("http://localhost:8080/health")),
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let orchestrator = Orchestrator::new(Arc::new(DockerRuntime::new()), Arc::new(GitCloner::new()));
//! let summary = smol::block_on(orchestrator.run(&plan))?;
//! println!("{} services up", summary.services.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod config;
mod dependency;
mod error;
mod executors;
mod health;
mod hooks;
mod orchestrator;
mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{
    BuildConfig, ContainerConfig, HealthCheckDescriptor, HookConfig, POST_UP, Plan, ServiceConfig,
};
pub use dependency::{DependencyGraph, resolve_services};
pub use error::{
    CloneError, ConfigError, ContainerError, ContainerResolutionError, HookError, ProbeError,
    TimeoutError,
};
pub use executors::{ContainerRuntime, DockerRuntime, find_compose_files, resolve_container};
pub use health::{
    CommandHealthCheck, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT, HTTP_PROBE_TIMEOUT,
    HealthCheckKind, HealthChecker, HttpHealthCheck, WaitPolicy, WaitState, Waiter,
    build_checker,
};
pub use hooks::{HookExecutor, hooks_for_trigger};
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
pub use repository::{ExistingRepoPolicy, GitCloner, RepoCloner, clone_all, default_key_path};

/// Error of a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration, dependency graph or service selection
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A repository could not be cloned
    #[error("Clone error: {0}")]
    Clone(#[from] CloneError),

    /// A container or compose project could not be started
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// A service has no running container
    #[error("Container resolution error: {0}")]
    ContainerResolution(#[from] ContainerResolutionError),

    /// A health check could not be built
    #[error("Invalid health check for {service}: {source}")]
    InvalidHealthCheck {
        /// Service or container name
        service: String,
        /// Why the descriptor was rejected
        #[source]
        source: ConfigError,
    },

    /// A service did not become healthy in time
    #[error("Service {service} failed health check: {source}")]
    HealthCheck {
        /// Service or container name
        service: String,
        /// Deadline details
        #[source]
        source: TimeoutError,
    },

    /// A post-up hook failed
    #[error("post-up hooks failed for {service}: {source}")]
    Hook {
        /// Service name
        service: String,
        /// The failing hook
        #[source]
        source: HookError,
    },
}

/// Result type for pipeline runs
pub type Result<T> = std::result::Result<T, Error>;
