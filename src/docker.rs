#![allow(clippy::module_name_repetitions)]
//! Container runtime gateway: the narrow interface the toolchain operations run through,
//! and its implementation on top of the `docker` CLI.

pub mod runtime;
pub mod spec;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ToolchainError;
use crate::shell_join;
use crate::util::create_run_id;
use crate::util::exec::{ExecError, ExecRequest, ExecService, StdioMode};

pub use runtime::container_runtime_path;
pub use spec::{BindMount, ContainerRunSpec, PortBinding, RunMode, RunResult, APP_MOUNT};

/// Exit status `docker run` uses when the daemon could not create or start the container.
const DOCKER_RUN_DAEMON_ERROR: i32 = 125;

/// Operations the toolchain needs from a local container engine.
pub trait ContainerRuntime {
    /// Cheap daemon liveness check.
    fn is_running(&self) -> bool;

    /// Canonical `repository:tag` strings of all locally stored images.
    fn list_local_images(&self) -> Result<BTreeSet<String>, ToolchainError>;

    /// Run a container to termination (or until detached) and report its exit code.
    fn run(&self, spec: &ContainerRunSpec) -> Result<RunResult, ToolchainError>;

    /// Stop a running container. Callers treat failures as best-effort.
    fn stop(&self, container: &str) -> Result<(), ToolchainError>;

    fn network_exists(&self, name: &str) -> Result<bool, ToolchainError>;

    fn create_network(&self, name: &str) -> Result<(), ToolchainError>;
}

/// `ContainerRuntime` backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    runtime: PathBuf,
    queries: ExecService,
    run_timeout: Duration,
    verbose: bool,
}

impl DockerCli {
    /// Locate docker and make sure the daemon answers; fails fast otherwise.
    pub fn connect(
        query_timeout: Duration,
        run_timeout: Duration,
        verbose: bool,
    ) -> Result<Self, ToolchainError> {
        let runtime = container_runtime_path()
            .map_err(|e| ToolchainError::RuntimeUnavailable(e.to_string()))?;
        let cli = Self::with_runtime(runtime, query_timeout, run_timeout, verbose);
        if !cli.is_running() {
            return Err(ToolchainError::RuntimeUnavailable(format!(
                "`{} info` did not succeed",
                cli.runtime.display()
            )));
        }
        Ok(cli)
    }

    /// Build a gateway for an explicit docker binary without probing the daemon.
    pub fn with_runtime(
        runtime: PathBuf,
        query_timeout: Duration,
        run_timeout: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            runtime,
            queries: ExecService::new(query_timeout),
            run_timeout,
            verbose,
        }
    }

    pub fn runtime_path(&self) -> &Path {
        &self.runtime
    }

    fn log_command(&self, args: &[String]) {
        if self.verbose {
            let mut full = vec!["docker".to_string()];
            full.extend(args.iter().cloned());
            eprintln!("starknet-docker: docker: {}", shell_join(&full));
        }
    }

    fn query(&self, args: &[&str]) -> Result<crate::util::exec::ExecOutput, ExecError> {
        self.queries.run(
            ExecRequest::new(&self.runtime)
                .args(args.iter().copied())
                .stdio(StdioMode::Capture),
        )
    }

    fn query_error(&self, what: &str, e: impl std::fmt::Display) -> ToolchainError {
        ToolchainError::RuntimeUnavailable(format!("docker {what} failed: {e}"))
    }
}

impl ContainerRuntime for DockerCli {
    fn is_running(&self) -> bool {
        // We have no need for any info returned.
        self.queries
            .run(
                ExecRequest::new(&self.runtime)
                    .arg("info")
                    .stdio(StdioMode::Null),
            )
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn list_local_images(&self) -> Result<BTreeSet<String>, ToolchainError> {
        let out = self
            .query(&["image", "ls", "--format", "{{.Repository}}:{{.Tag}}"])
            .map_err(|e| self.query_error("image ls", e))?;
        if !out.status.success() {
            return Err(self.query_error("image ls", out.stderr.trim()));
        }
        Ok(parse_image_list(&out.stdout))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(image = %spec.image()))]
    fn run(&self, spec: &ContainerRunSpec) -> Result<RunResult, ToolchainError> {
        // Anonymous one-shot containers get a name so a timed-out run can be stopped.
        let generated = if spec.name().is_none() {
            Some(format!("starknet-docker-{}", create_run_id()))
        } else {
            None
        };
        let args = spec.docker_run_args(generated.as_deref());
        self.log_command(&args);

        let timeout = match spec.mode() {
            RunMode::Interactive { .. } => Duration::ZERO,
            RunMode::Attached | RunMode::Detached => self.run_timeout,
        };
        let image = spec.image().canonical();
        let result = ExecService::new(timeout).run(
            ExecRequest::new(&self.runtime)
                .args(args)
                .stdio(StdioMode::Inherit),
        );
        let out = match result {
            Ok(out) => out,
            Err(e) => {
                if let (ExecError::TimedOut { .. }, Some(name)) =
                    (&e, spec.name().or(generated.as_deref()))
                {
                    if let Err(stop_err) = self.stop(name) {
                        tracing::warn!(container = name, error = %stop_err, "failed to stop timed-out container");
                    }
                }
                return Err(ToolchainError::container_run(image, e));
            }
        };

        let exit_code = out.code();
        tracing::debug!(exit_code, elapsed_ms = out.duration.as_millis() as u64, "container finished");
        if exit_code == DOCKER_RUN_DAEMON_ERROR {
            return Err(ToolchainError::ContainerRun {
                image,
                reason: "docker could not create or start the container (exit status 125)"
                    .to_string(),
                source: None,
            });
        }
        Ok(RunResult {
            exit_code,
            duration: out.duration,
        })
    }

    fn stop(&self, container: &str) -> Result<(), ToolchainError> {
        let args = vec!["stop".to_string(), container.to_string()];
        self.log_command(&args);
        let out = self
            .queries
            .run(
                ExecRequest::new(&self.runtime)
                    .args(args)
                    .stdio(StdioMode::Capture),
            )
            .map_err(|e| ToolchainError::container_run(container, e))?;
        if out.status.success() {
            Ok(())
        } else {
            Err(ToolchainError::ContainerRun {
                image: container.to_string(),
                reason: format!("docker stop failed: {}", out.stderr.trim()),
                source: None,
            })
        }
    }

    fn network_exists(&self, name: &str) -> Result<bool, ToolchainError> {
        let out = self
            .query(&["network", "inspect", name])
            .map_err(|e| self.query_error("network inspect", e))?;
        Ok(out.status.success())
    }

    fn create_network(&self, name: &str) -> Result<(), ToolchainError> {
        let args = vec!["network".to_string(), "create".to_string(), name.to_string()];
        self.log_command(&args);
        let out = self
            .queries
            .run(
                ExecRequest::new(&self.runtime)
                    .args(args)
                    .stdio(StdioMode::Capture),
            )
            .map_err(|e| self.query_error("network create", e))?;
        if out.status.success() {
            return Ok(());
        }
        // Verify with brief retries to absorb races between concurrent creators
        for _ in 0..20 {
            if self.network_exists(name)? {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        Err(self.query_error("network create", out.stderr.trim()))
    }
}

/// Parse `docker image ls --format {{.Repository}}:{{.Tag}}` output, skipping dangling images.
pub fn parse_image_list(raw: &str) -> BTreeSet<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.contains("<none>"))
        .map(str::to_string)
        .collect()
}
