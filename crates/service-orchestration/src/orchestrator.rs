//! The linear bring-up pipeline.
//!
//! resolve -> clone (parallel) -> start containers -> resolve identities ->
//! health wait -> post-up hooks. Each step finishes before the next starts
//! and the first error ends the run. Nothing already started is undone.

use crate::config::{HealthCheckDescriptor, POST_UP, Plan, ServiceConfig};
use crate::dependency::resolve_services;
use crate::error::ConfigError;
use crate::executors::{ContainerRuntime, resolve_container};
use crate::health::{WaitPolicy, Waiter, build_checker};
use crate::hooks::{HookExecutor, hooks_for_trigger};
use crate::repository::{RepoCloner, clone_all};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict to these services and their transitive dependencies
    pub only: Vec<String>,
    /// Stop after cloning
    pub skip_containers: bool,
    /// Health wait cadence and deadline
    pub wait_policy: WaitPolicy,
}

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Services in the order they were processed
    pub services: Vec<String>,
    /// Standalone containers started
    pub containers: Vec<String>,
    /// Services whose compose project was brought up
    pub compose_projects: Vec<String>,
    /// Services and containers that passed their health check
    pub healthy: Vec<String>,
    /// Post-up hooks that ran
    pub hooks_run: usize,
}

/// Drives a [`Plan`] through the pipeline
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    cloner: Arc<dyn RepoCloner>,
    hooks: HookExecutor,
    options: RunOptions,
}

impl Orchestrator {
    /// Create an orchestrator with default options
    pub fn new(runtime: Arc<dyn ContainerRuntime>, cloner: Arc<dyn RepoCloner>) -> Self {
        Self {
            hooks: HookExecutor::new(runtime.clone()),
            runtime,
            cloner,
            options: RunOptions::default(),
        }
    }

    /// Replace the run options
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the whole pipeline for `plan`
    pub async fn run(&self, plan: &Plan) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        info!("Resolving services");
        let services = resolve_services(&plan.services, self.options.only.as_slice())?;
        summary.services = services.iter().map(|s| s.name.clone()).collect();
        info!("Service order: {}", summary.services.join(" -> "));

        info!("Cloning {} repositories", services.len());
        clone_all(self.cloner.clone(), &services).await?;

        if self.options.skip_containers {
            info!("Skipping container startup");
            return Ok(summary);
        }

        self.start_containers(plan, &services, &mut summary).await?;

        for service in &services {
            let container = resolve_container(self.runtime.as_ref(), &service.name).await?;
            info!("Service {} runs in container {}", service.name, container);
        }

        self.wait_until_healthy(plan, &services, &mut summary).await?;

        for service in &services {
            summary.hooks_run += self.run_post_up_hooks(service).await?;
        }

        info!("Environment is up");
        Ok(summary)
    }

    async fn start_containers(
        &self,
        plan: &Plan,
        services: &[ServiceConfig],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for container in &plan.containers {
            self.runtime
                .run_container(container, &plan.global_env)
                .await?;
            summary.containers.push(container.name.clone());
        }

        for service in services.iter().filter(|s| s.compose_file.is_some()) {
            info!("Starting compose project for {}", service.name);
            self.runtime.compose_up(service, &plan.global_env).await?;
            summary.compose_projects.push(service.name.clone());
        }

        Ok(())
    }

    async fn wait_until_healthy(
        &self,
        plan: &Plan,
        services: &[ServiceConfig],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let waiter = Waiter::new(self.options.wait_policy);

        for container in &plan.containers {
            let Some(descriptor) = &container.health_check else {
                continue;
            };
            self.wait_for(&waiter, &container.name, descriptor, &container.name)
                .await?;
            summary.healthy.push(container.name.clone());
        }

        for service in services {
            let Some(descriptor) = &service.health_check else {
                debug!("No health check for {}", service.name);
                continue;
            };
            let container = resolve_container(self.runtime.as_ref(), &service.name).await?;
            self.wait_for(&waiter, &service.name, descriptor, &container)
                .await?;
            summary.healthy.push(service.name.clone());
        }

        Ok(())
    }

    async fn wait_for(
        &self,
        waiter: &Waiter,
        name: &str,
        descriptor: &HealthCheckDescriptor,
        container: &str,
    ) -> Result<()> {
        let checker = build_checker(descriptor, container, self.runtime.clone()).map_err(
            |source: ConfigError| Error::InvalidHealthCheck {
                service: name.to_string(),
                source,
            },
        )?;

        info!("Waiting for {} to become healthy", name);
        waiter
            .wait(checker.as_ref())
            .await
            .map_err(|source| Error::HealthCheck {
                service: name.to_string(),
                source,
            })
    }

    async fn run_post_up_hooks(&self, service: &ServiceConfig) -> Result<usize> {
        let count = hooks_for_trigger(service, POST_UP).count();
        if count == 0 {
            return Ok(0);
        }

        let container = resolve_container(self.runtime.as_ref(), &service.name).await?;
        self.hooks
            .run_hooks(service, POST_UP, &container)
            .await
            .map_err(|source| Error::Hook {
                service: service.name.clone(),
                source,
            })?;
        Ok(count)
    }
}
