use std::path::Path;

use starknet_docker::network::GatewayUrls;
use starknet_docker::{Config, FunctionCallKind, Operation, TargetNetwork, WalletPolicy};

fn devnet(wallet: WalletPolicy) -> TargetNetwork {
    TargetNetwork::Development {
        gateways: GatewayUrls {
            gateway_url: "http://starknet-devnet:5000/gateway".to_string(),
            feeder_gateway_url: "http://starknet-devnet:5000/feeder_gateway".to_string(),
        },
        docker_network: "starknet-devnet".to_string(),
        wallet,
    }
}

fn invoke() -> Operation {
    Operation::FunctionCall {
        kind: FunctionCallKind::Invoke,
        contract: "counter".to_string(),
        address: "0x1".to_string(),
        function: "increase".to_string(),
        inputs: vec!["5".to_string()],
    }
}

#[test]
fn unit_specs_are_deterministic() {
    let cfg = Config::defaults(Path::new("/work/proj")).expect("cfg");
    let target = devnet(WalletPolicy::NoWallet);
    assert_eq!(
        invoke().build_spec(&cfg, &target).preview_args(),
        invoke().build_spec(&cfg, &target).preview_args()
    );
}

#[test]
fn unit_create_account_on_devnet_ignores_no_wallet_policy() {
    let cfg = Config::defaults(Path::new("/work/proj")).expect("cfg");
    let spec = Operation::CreateAccount { account: None }
        .build_spec(&cfg, &devnet(WalletPolicy::NoWallet));
    assert!(!spec.command().iter().any(|a| a == "--no_wallet"));
    assert!(spec.environment().contains_key("STARKNET_WALLET"));
    assert!(!spec.environment().contains_key("STARKNET_NETWORK"));
    assert_eq!(spec.network_mode(), Some("starknet-devnet"));
}

#[test]
fn unit_wallet_policy_controls_devnet_invoke() {
    let cfg = Config::defaults(Path::new("/work/proj")).expect("cfg");
    let without = invoke().build_spec(&cfg, &devnet(WalletPolicy::NoWallet));
    assert!(without.command().iter().any(|a| a == "--no_wallet"));
    assert!(without.environment().is_empty());

    let with = invoke().build_spec(&cfg, &devnet(WalletPolicy::UseWallet));
    assert!(!with.command().iter().any(|a| a == "--no_wallet"));
    assert_eq!(
        with.environment().get("STARKNET_ACCOUNT_DIR").map(String::as_str),
        Some("starknet_accounts")
    );
    assert_eq!(with.command().last().map(String::as_str), Some("5"));
}
