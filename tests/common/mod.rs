#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Duration;

use starknet_docker::{
    ContainerRunSpec, ContainerRuntime, ImageReference, Registry, RunResult, ToolchainError,
};

pub const CAIRO: &str = "trufflesuite/cairo-starknet-cli:0.7.0";
pub const DEVNET: &str = "shardlabs/starknet-devnet:0.1.20";

/// Records runs; exit codes are consumed front to back, defaulting to 0.
#[derive(Default)]
pub struct RecordingRuntime {
    pub local: RefCell<BTreeSet<String>>,
    pub runs: RefCell<Vec<ContainerRunSpec>>,
    pub exit_codes: RefCell<Vec<i32>>,
}

impl RecordingRuntime {
    pub fn with_local(images: &[&str]) -> Self {
        let rt = Self::default();
        rt.local
            .borrow_mut()
            .extend(images.iter().map(|s| s.to_string()));
        rt
    }
}

impl ContainerRuntime for RecordingRuntime {
    fn is_running(&self) -> bool {
        true
    }

    fn list_local_images(&self) -> Result<BTreeSet<String>, ToolchainError> {
        Ok(self.local.borrow().clone())
    }

    fn run(&self, spec: &ContainerRunSpec) -> Result<RunResult, ToolchainError> {
        self.runs.borrow_mut().push(spec.clone());
        let mut codes = self.exit_codes.borrow_mut();
        let exit_code = if codes.is_empty() { 0 } else { codes.remove(0) };
        Ok(RunResult {
            exit_code,
            duration: Duration::ZERO,
        })
    }

    fn stop(&self, _container: &str) -> Result<(), ToolchainError> {
        Ok(())
    }

    fn network_exists(&self, _name: &str) -> Result<bool, ToolchainError> {
        Ok(true)
    }

    fn create_network(&self, _name: &str) -> Result<(), ToolchainError> {
        Ok(())
    }
}

/// Registry knowing a fixed set of tags; pulls land in the paired runtime's store.
pub struct StaticRegistry<'a> {
    pub known: BTreeSet<String>,
    pub runtime: &'a RecordingRuntime,
    pub pulls: Cell<usize>,
}

impl<'a> StaticRegistry<'a> {
    pub fn new(known: &[&str], runtime: &'a RecordingRuntime) -> Self {
        Self {
            known: known.iter().map(|s| s.to_string()).collect(),
            runtime,
            pulls: Cell::new(0),
        }
    }
}

impl Registry for StaticRegistry<'_> {
    fn tag_exists(&self, image: &ImageReference) -> Result<bool, ToolchainError> {
        Ok(self.known.contains(&image.canonical()))
    }

    fn pull(&self, image: &ImageReference) -> Result<(), ToolchainError> {
        self.pulls.set(self.pulls.get() + 1);
        self.runtime.local.borrow_mut().insert(image.canonical());
        Ok(())
    }
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    std::fs::write(path, b"").expect("write");
}

/// Run the built binary against `project` with docker hidden and a clean environment.
pub fn run_cli(project: &Path, args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_starknet-docker");
    Command::new(bin)
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env("NO_COLOR", "1")
        .env("STARKNET_DOCKER_SKIP_DOCKER", "1")
        .env_remove("STARKNET_DOCKER_CONFIG")
        .env_remove("STARKNET_DOCKER_CAIRO_IMAGE")
        .env_remove("STARKNET_DOCKER_DEVNET_IMAGE")
        .env_remove("STARKNET_DOCKER_REGISTRY_URL")
        .output()
        .expect("run starknet-docker")
}

pub fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
