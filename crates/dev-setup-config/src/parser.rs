//! Configuration parser with environment variable substitution

use crate::{Config, ConfigError, Result};
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::path::Path;

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string
///
/// `${VAR}` references are substituted before the YAML is parsed;
/// comment-only lines are left alone.
pub fn parse_str(content: &str) -> Result<Config> {
    let content = substitute_env_vars(content)?;
    let config: Config = serde_yaml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Validate configuration
///
/// Health check types are not checked here; unknown types are rejected
/// when the checker is built.
pub fn validate(config: &Config) -> Result<()> {
    let mut names = HashSet::new();

    for service in &config.services {
        if service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Service with empty name".to_string(),
            ));
        }
        if !names.insert(service.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate service name '{}'",
                service.name
            )));
        }
        if service.repo.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Service '{}' has no repo",
                service.name
            )));
        }
        if service.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Service '{}' has no path",
                service.name
            )));
        }
        for hook in &service.hooks {
            if hook.name.trim().is_empty() || hook.run.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Service '{}' has a hook without name or run command",
                    service.name
                )));
            }
        }
    }

    // Check dependencies exist
    for service in &config.services {
        for dep in &service.depends_on {
            if !names.contains(dep.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Service '{}' depends on unknown service '{}'",
                    service.name, dep
                )));
            }
        }
    }

    let mut containers = HashSet::new();
    for container in &config.docker {
        if container.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Docker container with empty name".to_string(),
            ));
        }
        if !containers.insert(container.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate docker container name '{}'",
                container.name
            )));
        }
        let has_build = container
            .build
            .as_ref()
            .is_some_and(|b| !b.context.trim().is_empty());
        let has_image = container
            .image
            .as_ref()
            .is_some_and(|i| !i.trim().is_empty());
        if !has_build && !has_image {
            return Err(ConfigError::ValidationError(format!(
                "Docker container '{}' needs an image or a build context",
                container.name
            )));
        }
    }

    Ok(())
}

/// Substitute environment variables in a string
///
/// Supports `${VAR}` and `${VAR:-default}`. Every variable that is unset
/// and has no default is reported in one error. Lines whose first
/// non-blank character is `#` are copied verbatim, so commented-out
/// entries never require their variables.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let mut missing: Vec<String> = Vec::new();
    let mut result = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let substituted = re.replace_all(line, |cap: &Captures<'_>| {
            let var_expr = &cap[1];

            // Handle default values: ${VAR:-default}
            let (var_name, default_value) = match var_expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (var_expr, None),
            };

            match (std::env::var(var_name), default_value) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.to_string(),
                (Err(_), None) => {
                    if !missing.iter().any(|m| m == var_name) {
                        missing.push(var_name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });
        result.push_str(&substituted);
    }

    if !missing.is_empty() {
        return Err(ConfigError::EnvVarNotFound(missing.join(", ")));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // Use an existing environment variable that's likely to be set
        if let Ok(path) = std::env::var("PATH") {
            let result = substitute_env_vars("${PATH}").unwrap();
            assert_eq!(result, path);

            let result = substitute_env_vars("prefix-${PATH}-suffix").unwrap();
            assert_eq!(result, format!("prefix-{}-suffix", path));
        } else {
            println!("Skipping test - PATH is not set");
        }
    }

    #[test]
    fn test_env_var_with_default() {
        let result =
            substitute_env_vars("${MISSING_VAR_UNLIKELY_TO_EXIST:-default_value}").unwrap();
        assert_eq!(result, "default_value");

        let result = substitute_env_vars("url: ${MISSING_VAR_UNLIKELY_TO_EXIST:-}").unwrap();
        assert_eq!(result, "url: ");
    }

    #[test]
    fn test_missing_vars_reported_together() {
        let err = substitute_env_vars(
            "${DEV_SETUP_MISSING_A} ${DEV_SETUP_MISSING_B} ${DEV_SETUP_MISSING_A}",
        )
        .unwrap_err();

        match err {
            ConfigError::EnvVarNotFound(names) => {
                assert_eq!(names, "DEV_SETUP_MISSING_A, DEV_SETUP_MISSING_B")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_commented_out_reference_needs_no_variable() {
        let input = "services:\n  # token: ${DEV_SETUP_UNSET_TOKEN}\n  - name: api # ${HOME:-x}\n";
        let result = substitute_env_vars(input).unwrap();

        assert!(result.contains("# token: ${DEV_SETUP_UNSET_TOKEN}\n"));
        assert!(!result.contains("${HOME:-x}"));
    }

    #[test]
    fn test_parse_ignores_commented_out_service() {
        let yaml = r#"
services:
  - name: api
    repo: git@github.com:acme/api.git
    path: ./api
#  - name: billing
#    repo: ${DEV_SETUP_UNSET_BILLING_REPO}
#    path: ./billing
"#;

        let config = parse_str(yaml).unwrap();
        assert_eq!(config.services.len(), 1);
    }

    #[test]
    fn test_text_without_references_is_untouched() {
        let input = "services:\n  - name: api # $HOME is not a reference\n";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
services:
  - name: api
    repo: git@github.com:acme/api.git
    path: ./api
"#;

        let config = parse_str(yaml).unwrap();
        assert_eq!(config.services.len(), 1);
        assert!(config.docker.is_empty());
        assert!(config.global_env.is_empty());
        assert!(config.service("api").is_some());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let yaml = r#"
services:
  - name: api
    repo: git@github.com:acme/api.git
    path: ./api
    dependsOn: [db]
"#;

        let err = parse_str(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown service 'db'"), "{err}");
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let yaml = r#"
services:
  - { name: api, repo: a, path: ./a }
  - { name: api, repo: b, path: ./b }
"#;

        assert!(matches!(
            parse_str(yaml),
            Err(ConfigError::ValidationError(msg)) if msg.contains("Duplicate")
        ));
    }

    #[test]
    fn test_container_needs_image_or_build() {
        let yaml = r#"
docker:
  - name: redis
    ports: ["6379:6379"]
"#;

        assert!(matches!(
            parse_str(yaml),
            Err(ConfigError::ValidationError(msg)) if msg.contains("redis")
        ));
    }

    #[test]
    fn test_unknown_health_check_type_passes_validation() {
        let yaml = r#"
services:
  - name: db
    repo: git@github.com:acme/db.git
    path: ./db
    healthCheck:
      type: tcp
      port: 5432
"#;

        let config = parse_str(yaml).unwrap();
        let check = config.services[0].health_check.as_ref().unwrap();
        assert_eq!(check.kind, "tcp");
        assert_eq!(check.port, Some(5432));
    }
}
