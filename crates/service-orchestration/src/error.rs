//! Error taxonomy for the pipeline stages.
//!
//! Every stage returns its own error type. [`ProbeError`] is the only one
//! that is absorbed (by the waiter); the rest abort the run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid or unsupported configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Health check tag with no registered checker
    #[error("unsupported health check type: {0}")]
    UnsupportedType(String),

    /// Health check missing the field its variant needs
    #[error("health check type '{kind}' requires field '{field}'")]
    MissingField {
        /// Variant tag
        kind: String,
        /// Missing field name
        field: &'static str,
    },

    /// `dependsOn` names a service that is not declared
    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency {
        /// The declaring service
        service: String,
        /// The missing dependency
        dependency: String,
    },

    /// `dependsOn` forms a cycle
    #[error("circular dependency detected between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// A service selected by name does not exist
    #[error("unknown service: {0}")]
    UnknownService(String),
}

/// Repository acquisition failure
#[derive(Debug, Error)]
pub enum CloneError {
    /// The SSH key could not be loaded
    #[error("could not load SSH key {}: {reason}", .path.display())]
    AuthKey {
        /// Key file location
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The target directory already holds a repository
    #[error("clone target {} already contains a repository", .0.display())]
    PathExists(PathBuf),

    /// git reported a failure
    #[error("could not clone repo {repo}: {reason}")]
    Failed {
        /// Repository URL
        repo: String,
        /// Exit status or spawn error
        reason: String,
    },

    /// Filesystem error while preparing the target
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// No running container could be tied to a service
#[derive(Debug, Error)]
pub enum ContainerResolutionError {
    /// Nothing matched the service name
    #[error("no container found matching service name: {0}")]
    NotFound(String),

    /// The container runtime could not be queried
    #[error("failed to list containers for {service}: {reason}")]
    Runtime {
        /// Service being resolved
        service: String,
        /// Runtime failure
        reason: String,
    },
}

/// One failed probe; expected while a service is still starting
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// Connection, DNS, timeout or other transport failure
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// A response outside 200..300
    #[error("unhealthy status code: {0}")]
    UnhealthyStatus(u16),

    /// The in-container command exited non-zero or could not run
    #[error("command failed: {output} - {reason}")]
    CommandFailed {
        /// Combined stdout and stderr
        output: String,
        /// Exit status or exec error
        reason: String,
    },
}

/// The waiter's deadline passed before a probe succeeded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "timeout waiting for service after {elapsed:?} ({probes} probes){}",
    .last_error.as_ref().map(|e| format!(", last error: {e}")).unwrap_or_default()
)]
pub struct TimeoutError {
    /// Time since the wait started
    pub elapsed: Duration,
    /// Number of probes issued
    pub probes: u32,
    /// Error of the most recent probe, if any ran
    pub last_error: Option<ProbeError>,
}

/// A hook command failed; later hooks for the trigger did not run
#[derive(Debug, Error)]
#[error("hook '{hook}' failed in container {container}: {reason}")]
pub struct HookError {
    /// Hook name
    pub hook: String,
    /// Container the hook ran in
    pub container: String,
    /// Exit status or exec error
    pub reason: String,
}

/// Container runtime collaborator failure
#[derive(Debug, Error)]
pub enum ContainerError {
    /// `docker build` failed
    #[error("failed to build image for {name}: {reason}")]
    Build {
        /// Container name
        name: String,
        /// Failure detail
        reason: String,
    },

    /// `docker pull` failed
    #[error("failed to pull image {image}: {reason}")]
    Pull {
        /// Image reference
        image: String,
        /// Failure detail
        reason: String,
    },

    /// Neither an image nor a build context was configured
    #[error("container {0} needs either an image or a build context")]
    MissingImage(String),

    /// `docker run` failed
    #[error("failed to start container {name}: {reason}")]
    Run {
        /// Container name
        name: String,
        /// Failure detail
        reason: String,
    },

    /// No compose file matched the configured prefix
    #[error("no compose file found for service {service} (prefix '{prefix}')")]
    ComposeFileNotFound {
        /// Service name
        service: String,
        /// Configured prefix
        prefix: String,
    },

    /// The compose directory could not be scanned
    #[error("failed to scan {}: {reason}", .path.display())]
    Scan {
        /// Directory being scanned
        path: PathBuf,
        /// Failure detail
        reason: String,
    },

    /// `docker compose up` failed
    #[error("failed to run compose for service {service}: {reason}")]
    Compose {
        /// Service name
        service: String,
        /// Failure detail
        reason: String,
    },

    /// `docker exec` could not be started
    #[error("failed to exec in container {container}: {reason}")]
    Exec {
        /// Container name
        container: String,
        /// Failure detail
        reason: String,
    },

    /// `docker ps` failed
    #[error("failed to list containers: {0}")]
    List(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_mentions_last_probe() {
        let err = TimeoutError {
            elapsed: Duration::from_secs(60),
            probes: 20,
            last_error: Some(ProbeError::UnhealthyStatus(503)),
        };
        assert_eq!(
            err.to_string(),
            "timeout waiting for service after 60s (20 probes), last error: unhealthy status code: 503"
        );

        let err = TimeoutError {
            elapsed: Duration::from_secs(1),
            probes: 0,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "timeout waiting for service after 1s (0 probes)"
        );
    }

    #[test]
    fn test_cycle_lists_services() {
        let err = ConfigError::DependencyCycle(vec!["api".into(), "db".into()]);
        assert_eq!(err.to_string(), "circular dependency detected between: api, db");
    }
}
