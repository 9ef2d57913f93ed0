//! Per-action container specs for the StarkNet CLI image.
//!
//! Builders are pure: identical inputs always render byte-identical specs.

use crate::config::Config;
use crate::docker::spec::ContainerRunSpecBuilder;
use crate::docker::ContainerRunSpec;
use crate::errors::Action;
use crate::network::{TargetNetwork, WalletPolicy};
use crate::project::artifact_stem;

pub const ENV_NETWORK: &str = "STARKNET_NETWORK";
pub const ENV_WALLET: &str = "STARKNET_WALLET";
pub const ENV_ACCOUNT_DIR: &str = "STARKNET_ACCOUNT_DIR";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionCallKind {
    Call,
    Invoke,
}

impl FunctionCallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCallKind::Call => "call",
            FunctionCallKind::Invoke => "invoke",
        }
    }
}

/// One toolchain action with its inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Compile one source file from the contracts directory.
    Compile {
        contract: String,
        disable_hints: bool,
    },
    CreateAccount {
        account: Option<String>,
    },
    /// Deploy one compiled artifact from the build directory.
    Deploy {
        contract: String,
        inputs: Vec<String>,
    },
    FunctionCall {
        kind: FunctionCallKind,
        contract: String,
        address: String,
        function: String,
        inputs: Vec<String>,
    },
    TxStatus {
        hash: String,
        contract: Option<String>,
        error_message: bool,
    },
    /// Run one pytest file from the tests directory.
    Test {
        file: String,
    },
}

/// `name` with `ext` appended unless already present.
fn with_extension(name: &str, ext: &str) -> String {
    if name.ends_with(ext) {
        name.to_string()
    } else {
        format!("{name}{ext}")
    }
}

impl Operation {
    pub fn action(&self) -> Action {
        match self {
            Operation::Compile { .. } => Action::Compile,
            Operation::CreateAccount { .. } => Action::CreateAccount,
            Operation::Deploy { .. } => Action::Deploy,
            Operation::FunctionCall {
                kind: FunctionCallKind::Call,
                ..
            } => Action::Call,
            Operation::FunctionCall {
                kind: FunctionCallKind::Invoke,
                ..
            } => Action::Invoke,
            Operation::TxStatus { .. } => Action::TxStatus,
            Operation::Test { .. } => Action::Test,
        }
    }

    /// Name of the file, contract or transaction the action is about, for diagnostics.
    pub fn artifact(&self) -> String {
        match self {
            Operation::Compile { contract, .. } => with_extension(contract, ".cairo"),
            Operation::CreateAccount { account } => account
                .clone()
                .unwrap_or_else(|| "the default account".to_string()),
            Operation::Deploy { contract, .. } => with_extension(contract, ".json"),
            Operation::FunctionCall {
                contract, function, ..
            } => format!("{contract}.{function}"),
            Operation::TxStatus { hash, .. } => hash.clone(),
            Operation::Test { file } => file.clone(),
        }
    }

    /// Whether the container needs the resolved network at all.
    pub fn uses_network(&self) -> bool {
        !matches!(self, Operation::Compile { .. } | Operation::Test { .. })
    }

    /// Render the container spec for this action against `target`.
    pub fn build_spec(&self, config: &Config, target: &TargetNetwork) -> ContainerRunSpec {
        let builder = ContainerRunSpec::builder(&config.cairo_image, &config.project_dir);
        match self {
            Operation::Compile {
                contract,
                disable_hints,
            } => {
                let file = with_extension(contract, ".cairo");
                let output = format!("{}.json", artifact_stem(&file));
                let mut command = vec![
                    "starknet-compile".to_string(),
                    format!("{}/{}", config.contracts_dir, file),
                    "--output".to_string(),
                    format!("{}/{}", config.build_dir, output),
                    "--abi".to_string(),
                    format!("{}/{}", config.build_abis_dir(), output),
                ];
                if *disable_hints {
                    command.push("--disable_hint_validation".to_string());
                }
                builder.command(command).build()
            }
            Operation::Test { file } => builder
                .command(["pytest".to_string(), format!("{}/{}", config.tests_dir, file)])
                .build(),
            Operation::CreateAccount { account } => {
                let mut command = starknet("deploy_account");
                let mut builder = builder
                    .env(ENV_WALLET, config.wallet.clone())
                    .env(ENV_ACCOUNT_DIR, config.accounts_dir.clone());
                match target {
                    TargetNetwork::Public { network_id } => {
                        builder = builder.env(ENV_NETWORK, network_id.clone());
                    }
                    TargetNetwork::Development {
                        gateways,
                        docker_network,
                        ..
                    } => {
                        // Accounts are always wallet-backed, whatever the devnet wallet policy.
                        push_gateways(&mut command, &gateways.gateway_url, &gateways.feeder_gateway_url);
                        builder = builder.network_mode(docker_network.clone());
                    }
                }
                if let Some(name) = account {
                    command.push("--account".to_string());
                    command.push(name.clone());
                }
                builder.command(command).build()
            }
            Operation::Deploy { contract, inputs } => {
                let mut command = starknet("deploy");
                let builder = apply_network(builder, config, target, &mut command);
                command.push("--contract".to_string());
                command.push(format!(
                    "{}/{}",
                    config.build_dir,
                    with_extension(contract, ".json")
                ));
                push_inputs(&mut command, inputs);
                builder.command(command).build()
            }
            Operation::FunctionCall {
                kind,
                contract,
                address,
                function,
                inputs,
            } => {
                let mut command = starknet(kind.as_str());
                let builder = apply_network(builder, config, target, &mut command);
                command.extend([
                    "--address".to_string(),
                    address.clone(),
                    "--abi".to_string(),
                    format!(
                        "{}/{}",
                        config.build_abis_dir(),
                        with_extension(contract, ".json")
                    ),
                    "--function".to_string(),
                    function.clone(),
                ]);
                push_inputs(&mut command, inputs);
                builder.command(command).build()
            }
            Operation::TxStatus {
                hash,
                contract,
                error_message,
            } => {
                let mut command = starknet("tx_status");
                let builder = apply_network(builder, config, target, &mut command);
                command.push("--hash".to_string());
                command.push(hash.clone());
                if let Some(c) = contract {
                    command.push("--contract".to_string());
                    command.push(format!(
                        "{}/{}",
                        config.build_dir,
                        with_extension(c, ".json")
                    ));
                }
                if *error_message {
                    command.push("--error_message".to_string());
                }
                builder.command(command).build()
            }
        }
    }
}

fn starknet(subcommand: &str) -> Vec<String> {
    vec!["starknet".to_string(), subcommand.to_string()]
}

fn push_gateways(command: &mut Vec<String>, gateway: &str, feeder: &str) {
    command.extend([
        "--gateway_url".to_string(),
        gateway.to_string(),
        "--feeder_gateway_url".to_string(),
        feeder.to_string(),
    ]);
}

fn push_inputs(command: &mut Vec<String>, inputs: &[String]) {
    if !inputs.is_empty() {
        command.push("--inputs".to_string());
        command.extend(inputs.iter().cloned());
    }
}

/// Network wiring shared by deploy, call/invoke and tx_status.
///
/// Public networks are selected through `STARKNET_NETWORK`. The development network gets
/// explicit gateway flags and joins the devnet's docker network; without a wallet it gets
/// `--no_wallet` and no account configuration.
fn apply_network(
    builder: ContainerRunSpecBuilder,
    config: &Config,
    target: &TargetNetwork,
    command: &mut Vec<String>,
) -> ContainerRunSpecBuilder {
    match target {
        TargetNetwork::Public { network_id } => builder
            .env(ENV_NETWORK, network_id.clone())
            .env(ENV_WALLET, config.wallet.clone())
            .env(ENV_ACCOUNT_DIR, config.accounts_dir.clone()),
        TargetNetwork::Development {
            gateways,
            docker_network,
            wallet,
        } => {
            push_gateways(command, &gateways.gateway_url, &gateways.feeder_gateway_url);
            let builder = builder.network_mode(docker_network.clone());
            match wallet {
                WalletPolicy::NoWallet => {
                    command.push("--no_wallet".to_string());
                    builder
                }
                WalletPolicy::UseWallet => builder
                    .env(ENV_WALLET, config.wallet.clone())
                    .env(ENV_ACCOUNT_DIR, config.accounts_dir.clone()),
            }
        }
    }
}
