//! Docker CLI implementation of the container runtime.

use super::{ContainerRuntime, find_compose_files};
use crate::config::{ContainerConfig, ServiceConfig};
use crate::error::ContainerError;
use async_trait::async_trait;
use command_executor::{Command, ExitResult, ExitStatus, Executor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Container runtime that shells out to the `docker` CLI
pub struct DockerRuntime {
    executor: Executor,
    binary: String,
}

impl DockerRuntime {
    /// Create a runtime using `docker` from PATH
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Create a runtime using a docker-compatible CLI, e.g. `podman`
    pub fn with_binary(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        Self {
            executor: Executor::new(format!("{}-runtime", binary)),
            binary,
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    /// Command that builds or pulls the image a container runs
    fn prepare_image_command(&self, container: &ContainerConfig) -> Result<Command, ContainerError> {
        let mut cmd = self.command();
        match (&container.build, &container.image) {
            (Some(build), _) if !build.context.is_empty() => {
                cmd.args(["build", "-t"]).arg(container.built_image_tag());
                if let Some(dockerfile) = &build.dockerfile {
                    cmd.arg("-f").arg(dockerfile);
                }
                cmd.arg(&build.context);
            }
            (_, Some(image)) => {
                cmd.arg("pull").arg(image);
            }
            _ => return Err(ContainerError::MissingImage(container.name.clone())),
        }
        Ok(cmd)
    }

    fn run_command(
        &self,
        container: &ContainerConfig,
        global_env: &BTreeMap<String, String>,
    ) -> Result<Command, ContainerError> {
        let image = match (&container.build, &container.image) {
            (Some(build), _) if !build.context.is_empty() => container.built_image_tag(),
            (_, Some(image)) => image.clone(),
            _ => return Err(ContainerError::MissingImage(container.name.clone())),
        };

        let mut cmd = self.command();
        cmd.args(["run", "-d", "--name"]).arg(&container.name);
        for port in &container.ports {
            cmd.arg("-p").arg(port);
        }
        for (key, value) in container.merged_env(global_env) {
            cmd.arg("-e").arg(format!("{}={}", key, value));
        }
        for volume in &container.volumes {
            cmd.arg("-v").arg(volume);
        }
        cmd.arg(image);
        Ok(cmd)
    }

    fn compose_command(
        &self,
        service: &ServiceConfig,
        compose_file: &Path,
        global_env: &BTreeMap<String, String>,
    ) -> Command {
        let mut cmd = self.command();
        cmd.args(["compose", "-p"])
            .arg(&service.name)
            .arg("-f")
            .arg(compose_file)
            .args(["up", "-d"])
            .envs(service.merged_env(global_env))
            .current_dir(&service.path);
        cmd
    }

    fn exec_command(&self, container: &str, command: &str) -> Command {
        let mut cmd = self.command();
        cmd.args(["exec", container, "sh", "-c", command]);
        cmd
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn run_container(
        &self,
        container: &ContainerConfig,
        global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError> {
        info!("Starting container with name {}", container.name);

        let prepare = self.prepare_image_command(container)?;
        let building = container
            .build
            .as_ref()
            .is_some_and(|build| !build.context.is_empty());
        let prepare_failed = |reason: String| {
            if building {
                ContainerError::Build {
                    name: container.name.clone(),
                    reason,
                }
            } else {
                ContainerError::Pull {
                    image: container.image.clone().unwrap_or_default(),
                    reason,
                }
            }
        };

        let status = self
            .executor
            .run(prepare)
            .await
            .map_err(|e| prepare_failed(e.to_string()))?;
        if !status.success() {
            return Err(prepare_failed(status.to_string()));
        }

        let status = self
            .executor
            .run(self.run_command(container, global_env)?)
            .await
            .map_err(|e| ContainerError::Run {
                name: container.name.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(ContainerError::Run {
                name: container.name.clone(),
                reason: status.to_string(),
            });
        }

        Ok(())
    }

    async fn compose_up(
        &self,
        service: &ServiceConfig,
        global_env: &BTreeMap<String, String>,
    ) -> Result<(), ContainerError> {
        let Some(prefix) = service.compose_file.as_deref() else {
            return Ok(());
        };

        let root = service.path.clone();
        let prefix_owned = prefix.to_string();
        let found = smol::unblock(move || find_compose_files(&root, &prefix_owned)).await?;
        let Some(compose_path) = found.first() else {
            return Err(ContainerError::ComposeFileNotFound {
                service: service.name.clone(),
                prefix: prefix.to_string(),
            });
        };

        // The command runs from the service directory, so pass the file relative to it.
        let relative: PathBuf = compose_path
            .strip_prefix(&service.path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| compose_path.clone());

        info!(
            "Starting Docker Compose for {} using {} in {}",
            service.name,
            relative.display(),
            service.path.display()
        );

        let status = self
            .executor
            .run(self.compose_command(service, &relative, global_env))
            .await
            .map_err(|e| ContainerError::Compose {
                service: service.name.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(ContainerError::Compose {
                service: service.name.clone(),
                reason: status.to_string(),
            });
        }

        Ok(())
    }

    async fn exec(
        &self,
        container: &str,
        command: &str,
        working_dir: Option<&Path>,
    ) -> Result<ExitStatus, ContainerError> {
        let mut cmd = self.exec_command(container, command);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        self.executor
            .run(cmd)
            .await
            .map_err(|e| ContainerError::Exec {
                container: container.to_string(),
                reason: e.to_string(),
            })
    }

    async fn exec_captured(
        &self,
        container: &str,
        command: &str,
    ) -> Result<ExitResult, ContainerError> {
        self.executor
            .output(self.exec_command(container, command))
            .await
            .map_err(|e| ContainerError::Exec {
                container: container.to_string(),
                reason: e.to_string(),
            })
    }

    async fn list_containers(&self, name_filter: &str) -> Result<Vec<String>, ContainerError> {
        let mut cmd = self.command();
        cmd.args(["ps", "--filter"])
            .arg(format!("name={}", name_filter))
            .args(["--format", "{{.Names}}"]);

        let result = self
            .executor
            .output(cmd)
            .await
            .map_err(|e| ContainerError::List(e.to_string()))?;
        if !result.success() {
            return Err(ContainerError::List(format!(
                "{}: {}",
                result.status, result.output
            )));
        }

        // docker prints config warnings on stderr even when `ps` succeeds
        Ok(result
            .stdout_lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use std::ffi::OsString;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_pull_then_run_with_ports_env_and_volumes() {
        let runtime = DockerRuntime::new();
        let container = ContainerConfig {
            name: "redis".to_string(),
            image: Some("redis:7".to_string()),
            ports: vec!["6379:6379".to_string()],
            volumes: vec!["./data:/data".to_string()],
            env: BTreeMap::from([("MODE".to_string(), "dev".to_string())]),
            ..Default::default()
        };
        let global = BTreeMap::from([("REGION".to_string(), "local".to_string())]);

        let prepare = runtime.prepare_image_command(&container).unwrap();
        assert_eq!(args(&prepare), ["pull", "redis:7"]);

        let run = runtime.run_command(&container, &global).unwrap();
        assert_eq!(
            args(&run),
            [
                "run", "-d", "--name", "redis", "-p", "6379:6379", "-e", "MODE=dev", "-e",
                "REGION=local", "-v", "./data:/data", "redis:7"
            ]
        );
    }

    #[test]
    fn test_build_context_takes_precedence_over_image() {
        let runtime = DockerRuntime::new();
        let container = ContainerConfig {
            name: "gateway".to_string(),
            image: Some("ignored:1".to_string()),
            build: Some(BuildConfig {
                context: "./gateway".to_string(),
                dockerfile: Some("Dockerfile.dev".to_string()),
            }),
            ..Default::default()
        };

        let prepare = runtime.prepare_image_command(&container).unwrap();
        assert_eq!(
            args(&prepare),
            ["build", "-t", "gateway:latest", "-f", "Dockerfile.dev", "./gateway"]
        );

        let run = runtime.run_command(&container, &BTreeMap::new()).unwrap();
        assert_eq!(args(&run).last().map(String::as_str), Some("gateway:latest"));
    }

    #[test]
    fn test_container_without_image_or_build_is_rejected() {
        let runtime = DockerRuntime::new();
        let container = ContainerConfig {
            name: "broken".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            runtime.prepare_image_command(&container),
            Err(ContainerError::MissingImage(name)) if name == "broken"
        ));
    }

    #[test]
    fn test_compose_command_runs_in_service_dir_with_env() {
        let runtime = DockerRuntime::new();
        let service = ServiceConfig {
            name: "api".to_string(),
            path: PathBuf::from("/work/api"),
            env: BTreeMap::from([("PORT".to_string(), "8080".to_string())]),
            ..Default::default()
        };
        let global = BTreeMap::from([("PORT".to_string(), "80".to_string())]);

        let cmd = runtime.compose_command(&service, Path::new("docker-compose.yml"), &global);

        assert_eq!(
            args(&cmd),
            ["compose", "-p", "api", "-f", "docker-compose.yml", "up", "-d"]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/work/api")));
        assert_eq!(
            cmd.get_envs().get(&OsString::from("PORT")),
            Some(&OsString::from("8080"))
        );
    }

    #[test]
    fn test_exec_command_uses_shell() {
        let runtime = DockerRuntime::with_binary("podman");
        let cmd = runtime.exec_command("api-1", "curl -f localhost/health");

        assert_eq!(cmd.get_program(), "podman");
        assert_eq!(
            args(&cmd),
            ["exec", "api-1", "sh", "-c", "curl -f localhost/health"]
        );
    }

    /// A stand-in `docker` script that appends `<args> @ <cwd>` to a log, then runs `body`
    #[cfg(unix)]
    struct FakeDocker {
        dir: tempfile::TempDir,
    }

    #[cfg(unix)]
    impl FakeDocker {
        fn new(body: &str) -> Self {
            use std::os::unix::fs::PermissionsExt;

            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let script = format!(
                "#!/bin/sh\nprintf '%s\\n' \"$* @ $(pwd)\" >> '{}'\n{}\nexit 0\n",
                log.display(),
                body
            );
            let path = dir.path().join("docker");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            Self { dir }
        }

        fn runtime(&self) -> DockerRuntime {
            DockerRuntime::with_binary(self.dir.path().join("docker").to_string_lossy().into_owned())
        }

        /// Logged invocations as `(args, cwd)`
        fn calls(&self) -> Vec<(String, PathBuf)> {
            std::fs::read_to_string(self.dir.path().join("calls.log"))
                .unwrap_or_default()
                .lines()
                .filter_map(|line| line.rsplit_once(" @ "))
                .map(|(args, cwd)| (args.to_string(), PathBuf::from(cwd)))
                .collect()
        }

        fn call_args(&self) -> Vec<String> {
            self.calls().into_iter().map(|(args, _)| args).collect()
        }
    }

    #[cfg(unix)]
    const EXEC_PASSTHROUGH: &str = r#"if [ "$1" = exec ]; then shift 2; exec "$@"; fi"#;

    #[cfg(unix)]
    fn same_dir(a: &Path, b: &Path) -> bool {
        std::fs::canonicalize(a).unwrap() == std::fs::canonicalize(b).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_ignores_stderr_warnings() {
        let docker = FakeDocker::new(
            r#"if [ "$1" = ps ]; then echo 'WARNING: Error loading config file: api/config.json' >&2; fi"#,
        );
        let runtime = docker.runtime();

        smol::block_on(async {
            assert!(runtime.list_containers("api").await.unwrap().is_empty());

            let err = crate::executors::resolve_container(&runtime, "api")
                .await
                .unwrap_err();
            assert!(
                matches!(err, crate::error::ContainerResolutionError::NotFound(ref name) if name == "api"),
                "{err:?}"
            );
        });

        assert_eq!(
            docker.call_args()[0],
            "ps --filter name=api --format {{.Names}}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_keeps_stdout_names_only() {
        let docker = FakeDocker::new(
            r#"if [ "$1" = ps ]; then echo 'WARNING: stale context' >&2; echo api-db-1; echo api-app-1; fi"#,
        );

        let names = smol::block_on(docker.runtime().list_containers("api")).unwrap();

        assert_eq!(names, ["api-db-1", "api-app-1"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_failure_is_list_error() {
        let docker = FakeDocker::new("echo 'Cannot connect to the Docker daemon' >&2; exit 1");

        let err = smol::block_on(docker.runtime().list_containers("api")).unwrap_err();

        match err {
            ContainerError::List(reason) => {
                assert!(reason.contains("exit status 1"), "{reason}");
                assert!(reason.contains("Cannot connect"), "{reason}");
            }
            other => panic!("expected List error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captured_tolerates_invalid_utf8() {
        let docker = FakeDocker::new(EXEC_PASSTHROUGH);

        let result =
            smol::block_on(docker.runtime().exec_captured("db", "printf 'ok\\377\\n'; exit 0"))
                .unwrap();

        assert!(result.success());
        assert!(result.output.contains("ok\u{FFFD}"), "{}", result.output);
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captured_reports_exit_code_and_output() {
        let docker = FakeDocker::new(EXEC_PASSTHROUGH);

        let result = smol::block_on(
            docker
                .runtime()
                .exec_captured("db", "echo not ready; echo refused >&2; exit 3"),
        )
        .unwrap();

        assert_eq!(result.status.code, Some(3));
        assert!(result.output.contains("not ready"));
        assert!(result.output.contains("refused"));
        assert_eq!(
            docker.call_args(),
            ["exec db sh -c echo not ready; echo refused >&2; exit 3"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_runs_in_host_working_dir() {
        let docker = FakeDocker::new(EXEC_PASSTHROUGH);
        let work = tempfile::tempdir().unwrap();

        let status =
            smol::block_on(docker.runtime().exec("api-1", "exit 4", Some(work.path()))).unwrap();

        assert_eq!(status.code, Some(4));
        let calls = docker.calls();
        assert_eq!(calls[0].0, "exec api-1 sh -c exit 4");
        assert!(same_dir(&calls[0].1, work.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_compose_up_uses_discovered_file_from_service_dir() {
        let docker = FakeDocker::new("");
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let service = ServiceConfig {
            name: "api".to_string(),
            path: repo.path().to_path_buf(),
            compose_file: Some("docker-compose".to_string()),
            ..Default::default()
        };

        smol::block_on(docker.runtime().compose_up(&service, &BTreeMap::new())).unwrap();

        let calls = docker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "compose -p api -f docker-compose.yml up -d");
        assert!(same_dir(&calls[0].1, repo.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_compose_failure_is_compose_error() {
        let docker = FakeDocker::new(r#"if [ "$1" = compose ]; then exit 1; fi"#);
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("docker-compose.dev.yml"), "services: {}\n").unwrap();
        let service = ServiceConfig {
            name: "api".to_string(),
            path: repo.path().to_path_buf(),
            compose_file: Some("docker-compose".to_string()),
            ..Default::default()
        };

        let err =
            smol::block_on(docker.runtime().compose_up(&service, &BTreeMap::new())).unwrap_err();

        assert!(
            matches!(err, ContainerError::Compose { ref service, .. } if service == "api"),
            "{err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_container_pulls_then_runs() {
        let docker = FakeDocker::new("");
        let container = ContainerConfig {
            name: "redis".to_string(),
            image: Some("redis:7".to_string()),
            ..Default::default()
        };

        smol::block_on(docker.runtime().run_container(&container, &BTreeMap::new())).unwrap();

        assert_eq!(
            docker.call_args(),
            ["pull redis:7", "run -d --name redis redis:7"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_pull_stops_before_run() {
        let docker = FakeDocker::new(r#"if [ "$1" = pull ]; then exit 1; fi"#);
        let container = ContainerConfig {
            name: "redis".to_string(),
            image: Some("redis:7".to_string()),
            ..Default::default()
        };

        let err = smol::block_on(docker.runtime().run_container(&container, &BTreeMap::new()))
            .unwrap_err();

        assert!(
            matches!(err, ContainerError::Pull { ref image, .. } if image == "redis:7"),
            "{err:?}"
        );
        assert_eq!(docker.call_args(), ["pull redis:7"]);
    }
}
