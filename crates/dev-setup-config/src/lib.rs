//! # dev-setup configuration
//!
//! Parses `dev-setup.yaml` files and projects them into the orchestration
//! [`Plan`].
//!
//! ```yaml
//! globalEnv:
//!   STAGE: local
//! services:
//!   - name: api
//!     repo: git@github.com:acme/api.git
//!     path: ./services/api
//!     dependsOn: [db]
//!     compose-file: docker-compose
//!     healthCheck: { type: http, url: "http://localhost:8080/health" }
//!     hooks:
//!       - { name: migrate, trigger: post-up, run: "make migrate" }
//! docker:
//!   - name: redis
//!     image: redis:7
//!     ports: ["6379:6379"]
//! ```

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use service_orchestration::{ContainerConfig, Plan, ServiceConfig};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod parser;

pub use parser::{parse_file, parse_str, substitute_env_vars, validate};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "dev-setup.yaml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variables referenced without a default
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// The substitution pattern failed to compile
    #[error("Invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root of `dev-setup.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Environment shared by every container and compose project
    #[serde(default)]
    pub global_env: BTreeMap<String, String>,

    /// Services to clone and bring up, in file order
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Standalone containers
    #[serde(default)]
    pub docker: Vec<ContainerConfig>,
}

impl Config {
    /// Look up a service by name
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Project into the orchestration plan
    pub fn plan(&self) -> Plan {
        Plan {
            global_env: self.global_env.clone(),
            services: self.services.clone(),
            containers: self.docker.clone(),
        }
    }
}
