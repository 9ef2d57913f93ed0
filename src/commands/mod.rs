use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use starknet_docker::config;
use starknet_docker::devnet::{devnet_image, devnet_spec};
use starknet_docker::network::TargetNetwork;
use starknet_docker::project::Project;
use starknet_docker::toolchain::batch;
use starknet_docker::{
    resolve_network, shell_join, warn_print, BatchReport, Config, ContainerRunSpec, Devnet,
    DevnetOptions, DockerCli, DockerHubRegistry, FunctionCallKind, Operation, ToolchainError,
    ToolchainOperations,
};

use crate::cli::{Cli, Command, DevnetCmd, FunctionArgs};
use crate::doctor::run_doctor;

/// Timeout for docker queries (`info`, `images`, `network`, `stop`).
const DOCKER_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// What a toolchain subcommand runs: one container, or one per file of a project directory.
enum Plan {
    One(Operation),
    CompileAll { disable_hints: bool },
    DeployAll { inputs: Vec<String> },
    TestAll,
}

impl Plan {
    fn from_command(command: &Command) -> Option<Plan> {
        let plan = match command.clone() {
            Command::Compile {
                contract: Some(contract),
                disable_hints,
            } => Plan::One(Operation::Compile {
                contract,
                disable_hints,
            }),
            Command::Compile {
                contract: None,
                disable_hints,
            } => Plan::CompileAll { disable_hints },
            Command::Deploy {
                contract: Some(contract),
                inputs,
            } => Plan::One(Operation::Deploy { contract, inputs }),
            Command::Deploy {
                contract: None,
                inputs,
            } => Plan::DeployAll { inputs },
            Command::Call(args) => Plan::One(function_call(FunctionCallKind::Call, args)),
            Command::Invoke(args) => Plan::One(function_call(FunctionCallKind::Invoke, args)),
            Command::TxStatus {
                hash,
                contract,
                error_message,
            } => Plan::One(Operation::TxStatus {
                hash,
                contract,
                error_message,
            }),
            Command::CreateAccount { account } => Plan::One(Operation::CreateAccount { account }),
            Command::Test { file: Some(file) } => Plan::One(Operation::Test { file }),
            Command::Test { file: None } => Plan::TestAll,
            Command::Devnet { .. } | Command::Images { .. } | Command::Doctor => return None,
        };
        Some(plan)
    }

    fn uses_network(&self) -> bool {
        match self {
            Plan::One(op) => op.uses_network(),
            Plan::DeployAll { .. } => true,
            Plan::CompileAll { .. } | Plan::TestAll => false,
        }
    }

    /// Expand directory-wide plans into the operations they would run, in order.
    fn operations(self, project: &Project<'_>) -> Result<Vec<Operation>, ToolchainError> {
        let ops = match self {
            Plan::One(op) => vec![op],
            Plan::CompileAll { disable_hints } => project
                .contract_sources()?
                .into_iter()
                .map(|contract| Operation::Compile {
                    contract,
                    disable_hints,
                })
                .collect(),
            Plan::DeployAll { inputs } => project
                .compiled_artifacts()?
                .into_iter()
                .map(|contract| Operation::Deploy {
                    contract,
                    inputs: inputs.clone(),
                })
                .collect(),
            Plan::TestAll => project
                .test_files()?
                .into_iter()
                .map(|file| Operation::Test { file })
                .collect(),
        };
        Ok(ops)
    }
}

fn function_call(kind: FunctionCallKind, args: FunctionArgs) -> Operation {
    Operation::FunctionCall {
        kind,
        contract: args.contract,
        address: args.address,
        function: args.function,
        inputs: args.inputs,
    }
}

/// Entry point for every subcommand; errors carry the exit code.
pub(crate) fn run(cli: &Cli) -> Result<(), ToolchainError> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    if matches!(cli.command, Command::Doctor) {
        run_doctor(cli, &project_dir);
        return Ok(());
    }

    let config = config::load(&project_dir, cli.config.as_deref())?;
    if let Some(source) = &config.source {
        tracing::debug!(config = %source.display(), "loaded configuration");
    }
    match &cli.command {
        Command::Images { json } => run_images(&config, *json),
        Command::Devnet { command } => run_devnet(cli, &config, command),
        command => match Plan::from_command(command) {
            Some(plan) => run_plan(cli, &config, plan),
            None => Ok(()),
        },
    }
}

fn resolve_project_dir(explicit: Option<&Path>) -> Result<PathBuf, ToolchainError> {
    let dir = match explicit {
        Some(p) => p.to_path_buf(),
        None => env::current_dir()?,
    };
    dir.canonicalize().map_err(|e| {
        ToolchainError::config(format!("project directory {}: {e}", dir.display()))
    })
}

fn connect(cli: &Cli, config: &Config) -> Result<(DockerCli, DockerHubRegistry), ToolchainError> {
    let docker = DockerCli::connect(DOCKER_QUERY_TIMEOUT, config.timeouts.run, cli.verbose)?;
    let registry = DockerHubRegistry::new(
        &config.registry_url,
        docker.runtime_path().to_path_buf(),
        config.timeouts.registry,
        config.timeouts.pull,
    )?;
    Ok((docker, registry))
}

fn print_preview(spec: &ContainerRunSpec) {
    eprintln!("starknet-docker: docker: {}", shell_join(&spec.preview_args()));
}

fn print_dry_run_note() {
    eprintln!("starknet-docker: dry-run requested; not executing Docker.");
}

fn resolve_target(cli: &Cli, config: &Config, report: bool) -> Result<TargetNetwork, ToolchainError> {
    let resolution = resolve_network(cli.network.as_deref(), &config.networks);
    if report {
        if let Some(fallback) = &resolution.fallback {
            warn_print(&format!(
                "{fallback}; using the default network '{}'",
                resolution.selector
            ));
        }
        starknet_docker::log_info_stderr(
            starknet_docker::color_enabled_stderr(),
            &format!(
                "starknet-docker: network: {} ({})",
                resolution.selector,
                resolution.descriptor.id()
            ),
        );
    }
    config.devnet.policy.target(resolution.descriptor)
}

fn run_plan(cli: &Cli, config: &Config, plan: Plan) -> Result<(), ToolchainError> {
    let target = resolve_target(cli, config, plan.uses_network())?;

    if cli.dry_run {
        let ops = plan.operations(&Project::new(config))?;
        if ops.is_empty() {
            warn_print("no files to process");
        }
        for op in &ops {
            print_preview(&op.build_spec(config, &target));
        }
        print_dry_run_note();
        return Ok(());
    }

    let (docker, registry) = connect(cli, config)?;
    let ops = ToolchainOperations::new(config, target, &docker, &registry);
    match plan {
        Plan::One(Operation::Compile {
            contract,
            disable_hints,
        }) => batch::compile_one(&ops, &contract, disable_hints).map(drop),
        Plan::One(op) => {
            if matches!(op, Operation::CreateAccount { .. }) {
                Project::new(config).ensure_accounts_dir()?;
            }
            ops.run(&op).map(drop)
        }
        Plan::CompileAll { disable_hints } => finish(batch::compile_all(&ops, disable_hints)?),
        Plan::DeployAll { inputs } => finish(batch::deploy_all(&ops, &inputs)?),
        Plan::TestAll => finish(batch::test_all(&ops)?),
    }
}

/// Print the batch summary and turn it into the overall result.
fn finish(report: BatchReport) -> Result<(), ToolchainError> {
    if report.total() > 0 {
        let use_err = starknet_docker::color_enabled_stderr();
        let summary = format!(
            "starknet-docker: {}: {} succeeded, {} failed",
            report.action(),
            report.succeeded().len(),
            report.failed().len()
        );
        if report.is_success() {
            starknet_docker::log_info_stderr(use_err, &summary);
        } else {
            let failed: Vec<&str> = report.failed().iter().map(|f| f.item.as_str()).collect();
            starknet_docker::log_warn_stderr(
                use_err,
                &format!("{summary} ({})", failed.join(", ")),
            );
        }
    }
    report.outcome()
}

fn run_devnet(cli: &Cli, config: &Config, command: &DevnetCmd) -> Result<(), ToolchainError> {
    let use_err = starknet_docker::color_enabled_stderr();
    match *command {
        DevnetCmd::Start { arm64, detach } => {
            let opts = DevnetOptions {
                arm64,
                detach,
                tty: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
            };
            if cli.dry_run {
                eprintln!(
                    "starknet-docker: docker network: {} (created if missing)",
                    config.devnet.policy.docker_network
                );
                print_preview(&devnet_spec(config, opts));
                print_dry_run_note();
                return Ok(());
            }
            let (docker, registry) = connect(cli, config)?;
            starknet_docker::log_info_stderr(
                use_err,
                &format!(
                    "starknet-docker: starting devnet {} on 127.0.0.1:{}",
                    devnet_image(config, arm64),
                    config.devnet.port
                ),
            );
            Devnet::new(config, &docker, &registry).start(opts)?;
            if detach {
                starknet_docker::log_info_stderr(
                    use_err,
                    "starknet-docker: devnet is running in the background; stop it with `starknet-docker devnet stop`",
                );
            }
            Ok(())
        }
        DevnetCmd::Stop => {
            let name = &config.devnet.container_name;
            if cli.dry_run {
                let args = vec!["docker".to_string(), "stop".to_string(), name.clone()];
                eprintln!("starknet-docker: docker: {}", shell_join(&args));
                print_dry_run_note();
                return Ok(());
            }
            let (docker, registry) = connect(cli, config)?;
            match Devnet::new(config, &docker, &registry).stop() {
                Ok(()) => starknet_docker::log_info_stderr(
                    use_err,
                    &format!("starknet-docker: stopped {name}"),
                ),
                Err(e) => warn_print(&format!("could not stop {name}: {e}")),
            }
            Ok(())
        }
    }
}

fn run_images(config: &Config, json: bool) -> Result<(), ToolchainError> {
    let cairo = config.cairo_image.canonical();
    let devnet = devnet_image(config, false).canonical();
    let devnet_arm = devnet_image(config, true).canonical();

    if json {
        let doc = serde_json::json!({
            "cairo": cairo,
            "devnet": devnet,
            "devnet_arm64": devnet_arm,
            "registry": config.registry_url,
        });
        println!("{doc:#}");
        return Ok(());
    }

    let use_err = starknet_docker::color_enabled_stderr();
    starknet_docker::log_info_stderr(use_err, "starknet-docker images");
    eprintln!("  registry: {}", config.registry_url);
    eprintln!();
    // stdout: one `name image` pair per line, no colors
    println!("cairo {cairo}");
    println!("devnet {devnet}");
    println!("devnet-arm64 {devnet_arm}");
    Ok(())
}
