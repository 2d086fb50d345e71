//! Repository acquisition.
//!
//! Every service repository is cloned in its own task. All tasks run to
//! completion before the first failure, if any, is reported.

use crate::config::ServiceConfig;
use crate::error::CloneError;
use async_trait::async_trait;
use command_executor::{Command, Executor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What to do when the clone target already holds a repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingRepoPolicy {
    /// Report [`CloneError::PathExists`]
    #[default]
    Fail,
    /// Leave the checkout untouched and count it as cloned
    Skip,
    /// Delete the checkout and clone again
    Reclone,
}

/// Clones one service repository
#[async_trait]
pub trait RepoCloner: Send + Sync {
    /// Clone `service.repo` into `service.path`
    async fn clone_repo(&self, service: &ServiceConfig) -> Result<(), CloneError>;
}

/// `~/.ssh/id_rsa`, when a home directory is known
pub fn default_key_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa"))
}

/// Clones over SSH with the system `git`, using a fixed private key
pub struct GitCloner {
    executor: Executor,
    key_path: PathBuf,
    policy: ExistingRepoPolicy,
}

impl GitCloner {
    /// Cloner using the default key and [`ExistingRepoPolicy::Fail`]
    pub fn new() -> Self {
        Self::with_key(default_key_path().unwrap_or_else(|| PathBuf::from(".ssh/id_rsa")))
    }

    /// Cloner authenticating with the key at `key_path`
    pub fn with_key(key_path: impl Into<PathBuf>) -> Self {
        Self {
            executor: Executor::new("git"),
            key_path: key_path.into(),
            policy: ExistingRepoPolicy::default(),
        }
    }

    /// Set the existing-checkout policy
    pub fn with_policy(mut self, policy: ExistingRepoPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn load_key(&self) -> Result<(), CloneError> {
        let auth_error = |reason: String| CloneError::AuthKey {
            path: self.key_path.clone(),
            reason,
        };

        let contents = async_fs::read_to_string(&self.key_path)
            .await
            .map_err(|e| auth_error(e.to_string()))?;
        if !contents.contains("PRIVATE KEY") {
            return Err(auth_error("not a PEM private key".to_string()));
        }
        Ok(())
    }

    fn clone_command(&self, service: &ServiceConfig) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--progress"])
            .arg(&service.repo)
            .arg(&service.path)
            .env(
                "GIT_SSH_COMMAND",
                format!(
                    "ssh -i {} -o IdentitiesOnly=yes",
                    shell_quote(&self.key_path.to_string_lossy())
                ),
            );
        cmd
    }
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote `value` as one POSIX shell word; git runs `GIT_SSH_COMMAND` through `sh`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

#[async_trait]
impl RepoCloner for GitCloner {
    async fn clone_repo(&self, service: &ServiceConfig) -> Result<(), CloneError> {
        let existing = is_repository(&service.path);
        match (existing, self.policy) {
            (true, ExistingRepoPolicy::Fail) => {
                return Err(CloneError::PathExists(service.path.clone()));
            }
            (true, ExistingRepoPolicy::Skip) => {
                info!(
                    "Repository for {} already present at {}, skipping clone",
                    service.name,
                    service.path.display()
                );
                return Ok(());
            }
            _ => {}
        }

        self.load_key().await?;

        if existing {
            info!("Removing existing checkout {}", service.path.display());
            async_fs::remove_dir_all(&service.path).await?;
        }
        if let Some(parent) = service.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }

        info!("Cloning {} into {}", service.repo, service.path.display());
        let cmd = self.clone_command(service);
        debug!("{}", cmd.display());

        let status = self
            .executor
            .run(cmd)
            .await
            .map_err(|e| CloneError::Failed {
                repo: service.repo.clone(),
                reason: e.to_string(),
            })?;

        if status.success() {
            info!("Cloned {}", service.name);
            Ok(())
        } else {
            Err(CloneError::Failed {
                repo: service.repo.clone(),
                reason: status.to_string(),
            })
        }
    }
}

/// Clone every service concurrently
///
/// One task per service, no cap. Waits for all tasks, then returns the
/// first failure to arrive; later failures are logged and dropped.
pub async fn clone_all(
    cloner: Arc<dyn RepoCloner>,
    services: &[ServiceConfig],
) -> Result<(), CloneError> {
    if services.is_empty() {
        return Ok(());
    }

    let (errors_tx, errors_rx) = async_channel::bounded(services.len());

    let tasks: Vec<_> = services
        .iter()
        .cloned()
        .map(|service| {
            let cloner = cloner.clone();
            let errors_tx = errors_tx.clone();
            smol::spawn(async move {
                if let Err(e) = cloner.clone_repo(&service).await {
                    error!("Clone of {} failed: {}", service.name, e);
                    // Capacity equals the task count, so this never waits.
                    let _ = errors_tx.send(e).await;
                }
            })
        })
        .collect();
    drop(errors_tx);

    for task in tasks {
        task.await;
    }

    match errors_rx.try_recv() {
        Ok(first) => {
            let dropped = errors_rx.len();
            if dropped > 0 {
                debug!("{} further clone failure(s) not reported", dropped);
            }
            Err(first)
        }
        Err(_) => Ok(()),
    }
}
