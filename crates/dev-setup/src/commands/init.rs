use anyhow::{Context, Result};
use dev_setup_config::parser;
use service_orchestration::{
    DockerRuntime, ExistingRepoPolicy, GitCloner, Orchestrator, RunOptions, RunSummary,
    WaitPolicy,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Flags of `dev-setup init`
#[derive(Debug, Clone)]
pub struct InitArgs {
    pub only: Vec<String>,
    pub skip_docker: bool,
    pub clean: bool,
    pub timeout: Duration,
    pub interval: Duration,
}

pub async fn run(config_path: &Path, args: InitArgs) -> Result<()> {
    let config = parser::parse_file(config_path)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    info!(
        "Loaded {} services and {} containers from {}",
        config.services.len(),
        config.docker.len(),
        config_path.display()
    );

    let cloner = GitCloner::new().with_policy(repo_policy(args.clean));
    let orchestrator = Orchestrator::new(Arc::new(DockerRuntime::new()), Arc::new(cloner))
        .with_options(run_options(&args));

    let summary = orchestrator
        .run(&config.plan())
        .await
        .context("Failed to set up environment")?;

    print_summary(&summary, args.skip_docker);
    Ok(())
}

fn repo_policy(clean: bool) -> ExistingRepoPolicy {
    if clean {
        ExistingRepoPolicy::Reclone
    } else {
        ExistingRepoPolicy::Skip
    }
}

fn run_options(args: &InitArgs) -> RunOptions {
    RunOptions {
        only: args.only.clone(),
        skip_containers: args.skip_docker,
        wait_policy: WaitPolicy {
            interval: args.interval,
            timeout: args.timeout,
        },
    }
}

fn print_summary(summary: &RunSummary, skip_docker: bool) {
    println!("✓ Cloned {} repositories", summary.services.len());
    if skip_docker {
        return;
    }
    if !summary.containers.is_empty() {
        println!("✓ Started containers: {}", summary.containers.join(", "));
    }
    if !summary.compose_projects.is_empty() {
        println!("✓ Compose projects up: {}", summary.compose_projects.join(", "));
    }
    if !summary.healthy.is_empty() {
        println!("✓ Healthy: {}", summary.healthy.join(", "));
    }
    println!("✓ Ran {} post-up hooks", summary.hooks_run);
}
