#![allow(clippy::module_name_repetitions)]
//! Per-operation container configuration and `docker run` argv rendering.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::image::ImageReference;

/// Fixed in-container mount point of the caller's project directory.
pub const APP_MOUNT: &str = "/app";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindMount {
    pub host: PathBuf,
    pub container: String,
}

impl BindMount {
    fn as_volume_arg(&self) -> String {
        format!("{}:{}", self.host.display(), self.container)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: u16,
    pub container_port: u16,
}

impl PortBinding {
    /// Publish `port` on the loopback interface only.
    pub fn loopback(port: u16) -> Self {
        Self {
            host_ip: "127.0.0.1".to_string(),
            host_port: port,
            container_port: port,
        }
    }

    fn as_publish_arg(&self) -> String {
        format!("{}:{}:{}", self.host_ip, self.host_port, self.container_port)
    }
}

/// How the container is attached to the invoking terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunMode {
    /// One-shot: output streams to stdout, the call returns when the container exits.
    #[default]
    Attached,
    /// Long-lived foreground container with stdin kept open (and a TTY when available).
    Interactive { tty: bool },
    /// Start in the background and return once the container is running.
    Detached,
}

/// Everything needed to run one container. Built once per operation, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRunSpec {
    image: ImageReference,
    command: Vec<String>,
    bind_mounts: BTreeSet<BindMount>,
    environment: BTreeMap<String, String>,
    network_mode: Option<String>,
    working_dir: Option<String>,
    name: Option<String>,
    ports: Vec<PortBinding>,
    mode: RunMode,
}

impl ContainerRunSpec {
    /// Start a spec for `image` with `project_dir` bound to [`APP_MOUNT`] and used as workdir.
    pub fn builder(image: &ImageReference, project_dir: &Path) -> ContainerRunSpecBuilder {
        let mut bind_mounts = BTreeSet::new();
        bind_mounts.insert(BindMount {
            host: project_dir.to_path_buf(),
            container: APP_MOUNT.to_string(),
        });
        ContainerRunSpecBuilder {
            spec: ContainerRunSpec {
                image: image.clone(),
                command: Vec::new(),
                bind_mounts,
                environment: BTreeMap::new(),
                network_mode: None,
                working_dir: Some(APP_MOUNT.to_string()),
                name: None,
                ports: Vec::new(),
                mode: RunMode::Attached,
            },
        }
    }

    pub fn image(&self) -> &ImageReference {
        &self.image
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn bind_mounts(&self) -> &BTreeSet<BindMount> {
        &self.bind_mounts
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn network_mode(&self) -> Option<&str> {
        self.network_mode.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ports(&self) -> &[PortBinding] {
        &self.ports
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Arguments following the `docker` binary. Containers are always auto-removed.
    ///
    /// `name_override` names an otherwise anonymous container (used by the gateway so a
    /// timed-out run can be stopped); a name fixed on the spec wins.
    pub fn docker_run_args(&self, name_override: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = vec!["run".to_string(), "--rm".to_string()];
        match self.mode {
            RunMode::Attached => {}
            RunMode::Interactive { tty } => {
                args.push("-i".to_string());
                if tty {
                    args.push("-t".to_string());
                }
            }
            RunMode::Detached => args.push("-d".to_string()),
        }
        if let Some(name) = self.name.as_deref().or(name_override) {
            args.push("--name".to_string());
            args.push(name.to_string());
        }
        if let Some(net) = &self.network_mode {
            args.push("--network".to_string());
            args.push(net.clone());
        }
        for port in &self.ports {
            args.push("-p".to_string());
            args.push(port.as_publish_arg());
        }
        for mount in &self.bind_mounts {
            args.push("-v".to_string());
            args.push(mount.as_volume_arg());
        }
        if let Some(wd) = &self.working_dir {
            args.push("-w".to_string());
            args.push(wd.clone());
        }
        for (k, v) in &self.environment {
            args.push("-e".to_string());
            args.push(format!("{k}={v}"));
        }
        args.push(self.image.canonical());
        args.extend(self.command.iter().cloned());
        args
    }

    /// Full command line including the `docker` program name, for previews.
    pub fn preview_args(&self) -> Vec<String> {
        let mut args = vec!["docker".to_string()];
        args.extend(self.docker_run_args(None));
        args
    }
}

pub struct ContainerRunSpecBuilder {
    spec: ContainerRunSpec,
}

impl ContainerRunSpecBuilder {
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.environment.insert(key.into(), value.into());
        self
    }

    pub fn network_mode(mut self, network: impl Into<String>) -> Self {
        self.spec.network_mode = Some(network.into());
        self
    }

    pub fn working_dir(mut self, dir: Option<String>) -> Self {
        self.spec.working_dir = dir;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    pub fn publish(mut self, port: PortBinding) -> Self {
        self.spec.ports.push(port);
        self
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.spec.mode = mode;
        self
    }

    pub fn build(self) -> ContainerRunSpec {
        self.spec
    }
}

/// Outcome of a container that ran to termination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub duration: Duration,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
