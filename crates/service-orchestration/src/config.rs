//! Service configuration types.
//!
//! These are the already-parsed descriptors the pipeline reads. They are
//! built once from the configuration file and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Trigger name for hooks that run once a service is up and healthy
pub const POST_UP: &str = "post-up";

/// A service whose repository is cloned and whose containers are started
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Unique service name, also used to find its running container
    pub name: String,
    /// Repository URL (SSH)
    pub repo: String,
    /// Local checkout directory
    pub path: PathBuf,
    /// Services that must be brought up before this one
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Optional readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckDescriptor>,
    /// Environment passed to the compose project
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Prefix of the compose file inside `path`, e.g. `docker-compose`
    #[serde(
        default,
        rename = "compose-file",
        skip_serializing_if = "Option::is_none"
    )]
    pub compose_file: Option<String>,
    /// Commands run inside the service container at pipeline phases
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

/// A command run inside a service container when its trigger fires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookConfig {
    /// Hook name, used in logs and errors
    pub name: String,
    /// Phase tag, e.g. `post-up`; unknown tags are never selected
    pub trigger: String,
    /// Shell command executed with `sh -c`
    pub run: String,
}

/// Declarative health check; `kind` selects the checker variant
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckDescriptor {
    /// Variant tag: `http`, `command` (`tcp` is reserved)
    #[serde(rename = "type")]
    pub kind: String,
    /// Probe URL for `http`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Port for `tcp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Shell command for `command`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
}

impl HealthCheckDescriptor {
    /// HTTP probe against `url`
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            kind: "http".to_string(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// In-container command probe
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            cmd: Some(cmd.into()),
            ..Default::default()
        }
    }
}

/// A standalone container that is not backed by a cloned repository
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    /// Container name passed to `--name`
    pub name: String,
    /// Image to pull when there is no build context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Local build instead of pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    /// Port mappings in `host:container` form
    #[serde(default)]
    pub ports: Vec<String>,
    /// Volume mounts in `host:container` form
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Container environment, layered over the global environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Optional readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckDescriptor>,
}

/// Image build settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildConfig {
    /// Build context directory
    pub context: String,
    /// Dockerfile path, relative to the context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

impl ContainerConfig {
    /// Tag used for locally built images
    pub fn built_image_tag(&self) -> String {
        format!("{}:latest", self.name)
    }

    /// Environment with container values overriding `global`
    pub fn merged_env(&self, global: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        merge_env(global, &self.env)
    }
}

impl ServiceConfig {
    /// Environment with service values overriding `global`
    pub fn merged_env(&self, global: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        merge_env(global, &self.env)
    }
}

fn merge_env(
    global: &BTreeMap<String, String>,
    local: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = global.clone();
    env.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Everything one pipeline run operates on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Environment shared by every container and compose project
    pub global_env: BTreeMap<String, String>,
    /// Services in configuration-file order
    pub services: Vec<ServiceConfig>,
    /// Standalone containers
    pub containers: Vec<ContainerConfig>,
}
