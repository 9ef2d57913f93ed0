use std::path::Path;
use std::time::Duration;

use starknet_docker::devnet::devnet_image;
use starknet_docker::util::exec::{ExecRequest, ExecService, StdioMode};
use starknet_docker::{ContainerRuntime, DockerCli};

use crate::cli::Cli;

const QUERY_TIMEOUT: Duration = Duration::from_secs(15);

fn value(use_color: bool, s: &str) -> String {
    starknet_docker::paint(use_color, "\x1b[34;1m", s)
}

fn yes_no(use_color: bool, b: bool) -> String {
    value(use_color, if b { "yes" } else { "no" })
}

/// Print environment diagnostics to stderr. Never fails: problems are reported inline.
pub(crate) fn run_doctor(cli: &Cli, project_dir: &Path) {
    let use_err = starknet_docker::color_enabled_stderr();
    eprintln!("starknet-docker doctor");
    eprintln!();
    eprintln!("  version: v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  build:   {} ({}, {}, rustc {})",
        env!("STARKNET_DOCKER_BUILD_DATE"),
        env!("STARKNET_DOCKER_BUILD_TARGET"),
        env!("STARKNET_DOCKER_BUILD_PROFILE"),
        env!("STARKNET_DOCKER_BUILD_RUSTC")
    );
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!("  project: {}", value(use_err, &project_dir.display().to_string()));
    eprintln!();

    let docker = match starknet_docker::container_runtime_path() {
        Ok(path) => {
            eprintln!("  docker: {}", value(use_err, &path.display().to_string()));
            let version = ExecService::new(QUERY_TIMEOUT)
                .run(
                    ExecRequest::new(&path)
                        .arg("--version")
                        .stdio(StdioMode::Capture),
                )
                .map(|out| out.stdout.trim().to_string())
                .unwrap_or_default();
            if !version.is_empty() {
                eprintln!("  docker --version: {version}");
            }
            let gateway = DockerCli::with_runtime(path, QUERY_TIMEOUT, QUERY_TIMEOUT, cli.verbose);
            let running = gateway.is_running();
            eprintln!("  docker daemon running: {}", yes_no(use_err, running));
            running.then_some(gateway)
        }
        Err(e) => {
            starknet_docker::log_warn_stderr(use_err, &format!("  docker: not found ({e})"));
            None
        }
    };
    eprintln!();

    let config = match starknet_docker::config::load(project_dir, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            starknet_docker::log_error_stderr(use_err, &format!("  config: {e}"));
            eprintln!();
            eprintln!("doctor: completed diagnostics.");
            return;
        }
    };
    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(built-in defaults)".to_string());
    eprintln!("  config:   {}", value(use_err, &source));
    eprintln!("  registry: {}", config.registry_url);
    eprintln!(
        "  networks: {} (default: {})",
        config.networks.selectors().collect::<Vec<_>>().join(", "),
        config.networks.default_selector()
    );
    eprintln!();

    let local = docker.as_ref().and_then(|d| d.list_local_images().ok());
    let images = [
        ("cairo", config.cairo_image.canonical()),
        ("devnet", devnet_image(&config, false).canonical()),
        ("devnet-arm64", devnet_image(&config, true).canonical()),
    ];
    for (label, image) in &images {
        match &local {
            Some(set) => eprintln!(
                "  {label}: {image} (local: {})",
                yes_no(use_err, set.contains(image))
            ),
            None => eprintln!("  {label}: {image}"),
        }
    }
    if let Some(d) = &docker {
        let network = &config.devnet.policy.docker_network;
        let exists = d.network_exists(network).unwrap_or(false);
        eprintln!("  devnet network {network}: {}", yes_no(use_err, exists));
    }
    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}
