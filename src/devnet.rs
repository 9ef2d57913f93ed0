/*!
Local development network container lifecycle.

The devnet runs as a long-lived named container publishing its port on loopback and
attached to a dedicated docker network; toolchain containers targeting the development
network join that docker network and reach it by container name.
*/

use crate::config::Config;
use crate::docker::{ContainerRunSpec, ContainerRuntime, PortBinding, RunMode, RunResult};
use crate::errors::{Action, ToolchainError};
use crate::image::ImageReference;
use crate::registry::Registry;
use crate::resolver::ImageResolver;

/// Tag suffix of the arm64 devnet images.
pub const ARM64_TAG_SUFFIX: &str = "-arm";

/// Exit statuses of a foreground devnet stopped with Ctrl-C or `docker stop`.
const INTERRUPTED: [i32; 2] = [130, 143];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DevnetOptions {
    /// Use the `-arm` image variant.
    pub arm64: bool,
    /// Start in the background instead of attaching to the terminal.
    pub detach: bool,
    /// Allocate a TTY for a foreground devnet.
    pub tty: bool,
}

pub fn devnet_image(config: &Config, arm64: bool) -> ImageReference {
    if arm64 {
        config.devnet.image.with_tag_suffix(ARM64_TAG_SUFFIX)
    } else {
        config.devnet.image.clone()
    }
}

/// Named container, loopback port, shared docker network, no command arguments.
pub fn devnet_spec(config: &Config, opts: DevnetOptions) -> ContainerRunSpec {
    let mode = if opts.detach {
        RunMode::Detached
    } else {
        RunMode::Interactive { tty: opts.tty }
    };
    ContainerRunSpec::builder(&devnet_image(config, opts.arm64), &config.project_dir)
        .working_dir(None)
        .name(config.devnet.container_name.clone())
        .publish(PortBinding::loopback(config.devnet.port))
        .network_mode(config.devnet.policy.docker_network.clone())
        .mode(mode)
        .build()
}

pub struct Devnet<'a> {
    config: &'a Config,
    runtime: &'a dyn ContainerRuntime,
    resolver: ImageResolver<'a>,
}

impl<'a> Devnet<'a> {
    pub fn new(
        config: &'a Config,
        runtime: &'a dyn ContainerRuntime,
        registry: &'a dyn Registry,
    ) -> Self {
        Self {
            config,
            runtime,
            resolver: ImageResolver::new(runtime, registry),
        }
    }

    fn artifact(&self) -> &str {
        &self.config.devnet.container_name
    }

    /// Create the dedicated docker network unless it already exists.
    pub fn ensure_network(&self) -> Result<(), ToolchainError> {
        let name = &self.config.devnet.policy.docker_network;
        let exists = self
            .runtime
            .network_exists(name)
            .map_err(|e| e.for_action(Action::Devnet, self.artifact()))?;
        if !exists {
            tracing::info!(network = %name, "creating devnet docker network");
            self.runtime
                .create_network(name)
                .map_err(|e| e.for_action(Action::Devnet, self.artifact()))?;
        }
        Ok(())
    }

    /// Ensure network and image, then run the devnet container.
    ///
    /// In the foreground this returns when the devnet exits; detached it returns once the
    /// container has started.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn start(&self, opts: DevnetOptions) -> Result<RunResult, ToolchainError> {
        self.ensure_network()?;
        let spec = devnet_spec(self.config, opts);
        self.resolver.ensure_available(spec.image())?;

        let result = self
            .runtime
            .run(&spec)
            .map_err(|e| e.for_action(Action::Devnet, self.artifact()))?;
        let clean_stop = !opts.detach && INTERRUPTED.contains(&result.exit_code);
        if !result.success() && !clean_stop {
            return Err(ToolchainError::exit_status(
                Action::Devnet,
                self.artifact(),
                result.exit_code,
            ));
        }
        Ok(result)
    }

    /// Stop the devnet container. Best effort: callers report failures as warnings.
    pub fn stop(&self) -> Result<(), ToolchainError> {
        self.runtime.stop(self.artifact())
    }
}
