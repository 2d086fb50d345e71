//! Trigger-gated hook execution.

use crate::config::{HookConfig, ServiceConfig};
use crate::error::HookError;
use crate::executors::ContainerRuntime;
use std::sync::Arc;
use tracing::{debug, info};

/// Hooks of `service` whose trigger equals `trigger`, in declaration order
///
/// Matching is exact and case-sensitive. Hooks with other triggers are
/// skipped silently.
pub fn hooks_for_trigger<'a>(
    service: &'a ServiceConfig,
    trigger: &'a str,
) -> impl Iterator<Item = &'a HookConfig> + 'a {
    service.hooks.iter().filter(move |hook| hook.trigger == trigger)
}

/// Runs a service's hooks inside its container
pub struct HookExecutor {
    runtime: Arc<dyn ContainerRuntime>,
}

impl HookExecutor {
    /// Create an executor that runs hooks through `runtime`
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Run every hook of `service` for `trigger` in `container`
    ///
    /// Hooks run one at a time with their output streamed to the console.
    /// The first failing hook ends the run; later hooks never start.
    pub async fn run_hooks(
        &self,
        service: &ServiceConfig,
        trigger: &str,
        container: &str,
    ) -> Result<(), HookError> {
        let mut ran = 0usize;

        for hook in hooks_for_trigger(service, trigger) {
            info!("Running {} hook '{}' for {}", trigger, hook.name, service.name);
            debug!("Hook command in {}: {}", container, hook.run);

            // The directory applies to the host-side exec process, not the shell inside the container.
            let status = self
                .runtime
                .exec(container, &hook.run, Some(&service.path))
                .await
                .map_err(|e| HookError {
                    hook: hook.name.clone(),
                    container: container.to_string(),
                    reason: e.to_string(),
                })?;

            if !status.success() {
                return Err(HookError {
                    hook: hook.name.clone(),
                    container: container.to_string(),
                    reason: status.to_string(),
                });
            }
            ran += 1;
        }

        if ran == 0 {
            debug!("No {} hooks for {}", trigger, service.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::POST_UP;
    use crate::testing::{FakeRuntime, RuntimeCall};
    use std::path::{Path, PathBuf};

    fn hook(name: &str, trigger: &str, run: &str) -> HookConfig {
        HookConfig {
            name: name.to_string(),
            trigger: trigger.to_string(),
            run: run.to_string(),
        }
    }

    fn service_with_hooks(hooks: Vec<HookConfig>) -> ServiceConfig {
        ServiceConfig {
            name: "api".to_string(),
            repo: "git@example.com:acme/api.git".to_string(),
            path: PathBuf::from("/work/api"),
            hooks,
            ..Default::default()
        }
    }

    fn mixed_triggers() -> ServiceConfig {
        service_with_hooks(vec![
            hook("migrate", "post-up", "make migrate"),
            hook("lint", "pre-up", "make lint"),
            hook("seed", "post-up", "make seed"),
        ])
    }

    #[test]
    fn test_filter_is_exact_and_ordered() {
        let service = service_with_hooks(vec![
            hook("a", "post-up", "a"),
            hook("b", "Post-Up", "b"),
            hook("c", "post-up ", "c"),
            hook("d", "post-up", "d"),
        ]);

        let names: Vec<_> = hooks_for_trigger(&service, POST_UP)
            .map(|h| h.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[smol_potat::test]
    async fn test_runs_matching_hooks_in_order() {
        let runtime = Arc::new(FakeRuntime::new());
        let executor = HookExecutor::new(runtime.clone());

        executor
            .run_hooks(&mixed_triggers(), POST_UP, "api-app-1")
            .await
            .unwrap();

        assert_eq!(runtime.executed_commands(), vec!["make migrate", "make seed"]);
        assert!(runtime.calls().iter().all(|call| match call {
            RuntimeCall::Exec {
                container,
                working_dir,
                ..
            } => container == "api-app-1" && working_dir.as_deref() == Some(Path::new("/work/api")),
            _ => true,
        }));
    }

    #[smol_potat::test]
    async fn test_first_failure_stops_remaining_hooks() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.fail_command("make migrate");
        let executor = HookExecutor::new(runtime.clone());

        let err = executor
            .run_hooks(&mixed_triggers(), POST_UP, "api-app-1")
            .await
            .unwrap_err();

        assert_eq!(err.hook, "migrate");
        assert_eq!(err.container, "api-app-1");
        assert_eq!(err.reason, "exit status 1");
        assert_eq!(runtime.executed_commands(), vec!["make migrate"]);
    }

    #[smol_potat::test]
    async fn test_unknown_trigger_runs_nothing() {
        let runtime = Arc::new(FakeRuntime::new());
        let executor = HookExecutor::new(runtime.clone());

        executor
            .run_hooks(&mixed_triggers(), "post-down", "api")
            .await
            .unwrap();

        assert!(runtime.calls().is_empty());
    }
}
