//! Maps health check descriptors to checker instances.

use super::{CommandHealthCheck, HealthChecker, HttpHealthCheck};
use crate::config::HealthCheckDescriptor;
use crate::error::ConfigError;
use crate::executors::ContainerRuntime;
use std::str::FromStr;
use std::sync::Arc;

/// Registered checker variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckKind {
    /// HTTP GET probe
    Http,
    /// In-container shell command
    Command,
}

impl FromStr for HealthCheckKind {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "http" => Ok(Self::Http),
            "command" => Ok(Self::Command),
            other => Err(ConfigError::UnsupportedType(other.to_string())),
        }
    }
}

/// Build the checker for `descriptor`, bound to `container`
///
/// HTTP checkers ignore the container; command checkers run inside it.
pub fn build_checker(
    descriptor: &HealthCheckDescriptor,
    container: &str,
    runtime: Arc<dyn ContainerRuntime>,
) -> Result<Box<dyn HealthChecker>, ConfigError> {
    let kind: HealthCheckKind = descriptor.kind.parse()?;

    let checker: Box<dyn HealthChecker> = match kind {
        HealthCheckKind::Http => {
            let url = required(descriptor, descriptor.url.as_deref(), "url")?;
            Box::new(HttpHealthCheck::new(url))
        }
        HealthCheckKind::Command => {
            let cmd = required(descriptor, descriptor.cmd.as_deref(), "cmd")?;
            Box::new(CommandHealthCheck::new(container, cmd, runtime))
        }
    };

    Ok(checker)
}

fn required<'a>(
    descriptor: &HealthCheckDescriptor,
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField {
            kind: descriptor.kind.clone(),
            field,
        }),
    }
}
