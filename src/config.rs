/*!
Project configuration.

`starknet-docker.yaml` in the project directory (or `--config` / `STARKNET_DOCKER_CONFIG`)
is parsed with serde_yaml on top of built-in defaults. A `.env` file next to it is loaded
first, and `STARKNET_DOCKER_*` environment overrides are applied last. The result is an
immutable `Config` shared read-only by every operation.
*/

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Deserializer};

use crate::errors::ToolchainError;
use crate::image::ImageReference;
use crate::network::{DevnetPolicy, NetworkDescriptor, NetworkTable, WalletPolicy};
use crate::registry::DEFAULT_REGISTRY_URL;
use crate::util::normalize_relative;

pub const CONFIG_FILE_NAME: &str = "starknet-docker.yaml";
pub const DEFAULT_WALLET: &str = "starkware.starknet.wallets.open_zeppelin.OpenZeppelinAccount";

pub const ENV_CONFIG: &str = "STARKNET_DOCKER_CONFIG";
pub const ENV_CAIRO_IMAGE: &str = "STARKNET_DOCKER_CAIRO_IMAGE";
pub const ENV_DEVNET_IMAGE: &str = "STARKNET_DOCKER_DEVNET_IMAGE";
pub const ENV_REGISTRY_URL: &str = "STARKNET_DOCKER_REGISTRY_URL";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkEntry {
    pub network_id: String,
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub feeder_gateway_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ImageEntry {
    pub repository: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Compilers {
    pub cairo: ImageEntry,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DevnetEntry {
    pub repository: String,
    pub version: String,
    pub network_id: String,
    pub docker_network: String,
    pub container_name: String,
    pub port: u16,
    pub use_wallet: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(deserialize_with = "humantime_duration")]
    pub registry: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub pull: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub run: Duration,
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

/// On-disk shape of `starknet-docker.yaml`; every field is optional.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub contracts_directory: String,
    pub contracts_build_directory: String,
    pub starknet_accounts_directory: String,
    pub tests_directory: String,
    pub networks: BTreeMap<String, NetworkEntry>,
    pub default_network: String,
    pub compilers: Compilers,
    pub devnet: DevnetEntry,
    pub wallet: String,
    pub timeouts: Timeouts,
    pub registry_url: String,
}

impl Default for ImageEntry {
    fn default() -> Self {
        Self {
            repository: "trufflesuite/cairo-starknet-cli".to_string(),
            version: "0.7.0".to_string(),
        }
    }
}

impl Default for DevnetEntry {
    fn default() -> Self {
        Self {
            repository: "shardlabs/starknet-devnet".to_string(),
            version: "0.1.20".to_string(),
            network_id: "devnet".to_string(),
            docker_network: "starknet-devnet".to_string(),
            container_name: "starknet-devnet".to_string(),
            port: 5000,
            use_wallet: false,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            registry: Duration::from_secs(10),
            pull: Duration::from_secs(10 * 60),
            run: Duration::from_secs(30 * 60),
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "testnet".to_string(),
            NetworkEntry {
                network_id: "alpha-goerli".to_string(),
                gateway_url: None,
                feeder_gateway_url: None,
            },
        );
        networks.insert(
            "devnet".to_string(),
            NetworkEntry {
                network_id: "devnet".to_string(),
                gateway_url: Some("http://starknet-devnet:5000/gateway".to_string()),
                feeder_gateway_url: Some("http://starknet-devnet:5000/feeder_gateway".to_string()),
            },
        );
        Self {
            contracts_directory: "contracts/starknet".to_string(),
            contracts_build_directory: "build/starknet-contracts".to_string(),
            starknet_accounts_directory: "starknet_accounts".to_string(),
            tests_directory: "test/starknet".to_string(),
            networks,
            default_network: "testnet".to_string(),
            compilers: Compilers::default(),
            devnet: DevnetEntry::default(),
            wallet: DEFAULT_WALLET.to_string(),
            timeouts: Timeouts::default(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

/// Devnet container settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevnetSettings {
    pub image: ImageReference,
    pub container_name: String,
    pub port: u16,
    pub policy: DevnetPolicy,
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    /// Project-relative directories, rendered the same on the host and under `/app`.
    pub contracts_dir: String,
    pub build_dir: String,
    pub accounts_dir: String,
    pub tests_dir: String,
    pub networks: NetworkTable,
    pub cairo_image: ImageReference,
    pub devnet: DevnetSettings,
    pub wallet: String,
    pub timeouts: Timeouts,
    pub registry_url: String,
    /// Config file that was read, when one existed.
    pub source: Option<PathBuf>,
}

impl Config {
    /// Built-in defaults for `project_dir`, without consulting the filesystem or environment.
    pub fn defaults(project_dir: &Path) -> Result<Self, ToolchainError> {
        Self::from_raw(RawConfig::default(), project_dir, None, |_| None)
    }

    /// Validate `raw` and apply overrides looked up through `env`.
    pub fn from_raw<F>(
        raw: RawConfig,
        project_dir: &Path,
        source: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ToolchainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let override_of = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut descriptors = BTreeMap::new();
        for (selector, entry) in &raw.networks {
            let has_gateway = entry.gateway_url.is_some() || entry.feeder_gateway_url.is_some();
            if has_gateway && entry.network_id != raw.devnet.network_id {
                return Err(ToolchainError::config(format!(
                    "network '{selector}': gateway_url/feeder_gateway_url are only allowed for the development network '{}'",
                    raw.devnet.network_id
                )));
            }
            descriptors.insert(
                selector.clone(),
                NetworkDescriptor::new(
                    entry.network_id.clone(),
                    entry.gateway_url.clone(),
                    entry.feeder_gateway_url.clone(),
                )?,
            );
        }
        let networks = NetworkTable::new(descriptors, raw.default_network.clone())?;

        let cairo_image = match override_of(ENV_CAIRO_IMAGE) {
            Some(r) => ImageReference::parse(&r)?,
            None => ImageReference::new(
                raw.compilers.cairo.repository.clone(),
                raw.compilers.cairo.version.clone(),
            )?,
        };
        let devnet_image = match override_of(ENV_DEVNET_IMAGE) {
            Some(r) => ImageReference::parse(&r)?,
            None => ImageReference::new(raw.devnet.repository.clone(), raw.devnet.version.clone())?,
        };

        if raw.devnet.container_name.trim().is_empty() || raw.devnet.docker_network.trim().is_empty()
        {
            return Err(ToolchainError::config(
                "devnet.container_name and devnet.docker_network must not be empty",
            ));
        }
        if raw.wallet.trim().is_empty() {
            return Err(ToolchainError::config("wallet must not be empty"));
        }

        let registry_url = override_of(ENV_REGISTRY_URL).unwrap_or(raw.registry_url);
        url::Url::parse(&registry_url).map_err(|e| {
            ToolchainError::config(format!("invalid registry_url '{registry_url}': {e}"))
        })?;

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            contracts_dir: project_relative("contracts_directory", &raw.contracts_directory)?,
            build_dir: project_relative("contracts_build_directory", &raw.contracts_build_directory)?,
            accounts_dir: project_relative(
                "starknet_accounts_directory",
                &raw.starknet_accounts_directory,
            )?,
            tests_dir: project_relative("tests_directory", &raw.tests_directory)?,
            networks,
            cairo_image,
            devnet: DevnetSettings {
                image: devnet_image,
                container_name: raw.devnet.container_name,
                port: raw.devnet.port,
                policy: DevnetPolicy {
                    network_id: raw.devnet.network_id,
                    docker_network: raw.devnet.docker_network,
                    wallet: if raw.devnet.use_wallet {
                        WalletPolicy::UseWallet
                    } else {
                        WalletPolicy::NoWallet
                    },
                },
            },
            wallet: raw.wallet,
            timeouts: raw.timeouts,
            registry_url,
            source,
        })
    }

    pub fn build_abis_dir(&self) -> String {
        format!("{}/abis", self.build_dir)
    }
}

/// Directories are shared between host and container, so they must stay inside the project.
fn project_relative(field: &str, value: &str) -> Result<String, ToolchainError> {
    let normalized = normalize_relative(value);
    let path = Path::new(&normalized);
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ToolchainError::config(format!(
            "{field} must be a path inside the project directory, got '{value}'"
        )));
    }
    Ok(normalized)
}

fn parse_file(path: &Path) -> anyhow::Result<RawConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load `.env`, the config file and environment overrides for `project_dir`.
///
/// An explicitly named config file must exist; the default one is optional.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Config, ToolchainError> {
    match dotenvy::from_path(project_dir.join(".env")) {
        Ok(()) => tracing::debug!(dir = %project_dir.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => {
            return Err(ToolchainError::config(format!(
                "failed to load {}: {e}",
                project_dir.join(".env").display()
            )))
        }
    }

    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG).filter(|v| !v.is_empty()).map(PathBuf::from));
    let (path, required) = match explicit {
        Some(p) if p.is_absolute() => (p, true),
        Some(p) => (project_dir.join(p), true),
        None => (project_dir.join(CONFIG_FILE_NAME), false),
    };

    let (raw, source) = if path.is_file() || required {
        let raw = parse_file(&path).map_err(|e| ToolchainError::config(format!("{e:#}")))?;
        (raw, Some(path))
    } else {
        (RawConfig::default(), None)
    };
    Config::from_raw(raw, project_dir, source, |k| std::env::var(k).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_mirror_truffle_layout() {
        let cfg = Config::defaults(Path::new("/p")).expect("defaults");
        assert_eq!(cfg.contracts_dir, "contracts/starknet");
        assert_eq!(cfg.build_dir, "build/starknet-contracts");
        assert_eq!(cfg.build_abis_dir(), "build/starknet-contracts/abis");
        assert_eq!(cfg.accounts_dir, "starknet_accounts");
        assert_eq!(cfg.cairo_image.canonical(), "trufflesuite/cairo-starknet-cli:0.7.0");
        assert_eq!(cfg.devnet.image.canonical(), "shardlabs/starknet-devnet:0.1.20");
        assert_eq!(cfg.networks.default_selector(), "testnet");
        assert_eq!(cfg.networks.default_descriptor().id(), "alpha-goerli");
        assert_eq!(cfg.devnet.policy.wallet, WalletPolicy::NoWallet);
        assert_eq!(cfg.timeouts.pull, Duration::from_secs(600));
    }

    #[test]
    fn test_yaml_overrides_merge_with_defaults() {
        let raw: RawConfig = serde_yaml::from_str(
            r#"
contracts_directory: ./src/cairo/
compilers:
  cairo:
    repository: example/cairo
    version: "0.9.1"
timeouts:
  pull: 90s
devnet:
  use_wallet: true
"#,
        )
        .expect("yaml");
        let cfg = Config::from_raw(raw, Path::new("/p"), None, no_env).expect("config");
        assert_eq!(cfg.contracts_dir, "src/cairo");
        assert_eq!(cfg.cairo_image.canonical(), "example/cairo:0.9.1");
        assert_eq!(cfg.timeouts.pull, Duration::from_secs(90));
        assert_eq!(cfg.timeouts.run, Duration::from_secs(1800));
        assert_eq!(cfg.devnet.policy.wallet, WalletPolicy::UseWallet);
        assert_eq!(cfg.devnet.port, 5000);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<RawConfig>("contract_dir: x\n").is_err());
    }

    #[test]
    fn test_env_overrides_win_and_blank_values_are_ignored() {
        let env = |k: &str| match k {
            ENV_CAIRO_IMAGE => Some(" local/cairo:dev ".to_string()),
            ENV_DEVNET_IMAGE => Some("   ".to_string()),
            _ => None,
        };
        let cfg = Config::from_raw(RawConfig::default(), Path::new("/p"), None, env).expect("cfg");
        assert_eq!(cfg.cairo_image.canonical(), "local/cairo:dev");
        assert_eq!(cfg.devnet.image.canonical(), "shardlabs/starknet-devnet:0.1.20");
    }

    #[test]
    fn test_half_configured_gateway_is_config_error() {
        let raw: RawConfig = serde_yaml::from_str(
            r#"
networks:
  testnet:
    network_id: alpha-goerli
  local:
    network_id: devnet
    gateway_url: http://starknet-devnet:5000/gateway
"#,
        )
        .expect("yaml");
        let err = Config::from_raw(raw, Path::new("/p"), None, no_env).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_gateways_on_public_network_are_config_error() {
        let raw: RawConfig = serde_yaml::from_str(
            r#"
networks:
  testnet:
    network_id: alpha-goerli
  local:
    network_id: my-local
    gateway_url: http://localhost:5050/gateway
    feeder_gateway_url: http://localhost:5050/feeder_gateway
"#,
        )
        .expect("yaml");
        let err = Config::from_raw(raw, Path::new("/p"), None, no_env).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("'local'"), "{err}");
    }

    #[test]
    fn test_gateways_follow_configured_development_id() {
        let raw: RawConfig = serde_yaml::from_str(
            r#"
devnet:
  network_id: my-local
networks:
  testnet:
    network_id: alpha-goerli
  local:
    network_id: my-local
    gateway_url: http://localhost:5050/gateway
    feeder_gateway_url: http://localhost:5050/feeder_gateway
"#,
        )
        .expect("yaml");
        Config::from_raw(raw, Path::new("/p"), None, no_env).expect("valid");
    }

    #[test]
    fn test_directories_must_stay_inside_project() {
        let raw = RawConfig {
            contracts_build_directory: "../outside".to_string(),
            ..RawConfig::default()
        };
        let err = Config::from_raw(raw, Path::new("/p"), None, no_env).expect_err("invalid");
        assert!(err.to_string().contains("contracts_build_directory"), "{err}");
    }

    #[test]
    fn test_missing_default_network_is_config_error() {
        let raw = RawConfig {
            default_network: "mainnet".to_string(),
            ..RawConfig::default()
        };
        assert!(Config::from_raw(raw, Path::new("/p"), None, no_env).is_err());
    }

    #[test]
    fn test_load_reads_yaml_from_project_dir() {
        let dir = tempfile::tempdir().expect("tmpdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "tests_directory: tests/cairo\n",
        )
        .expect("write");
        let cfg = load(dir.path(), None).expect("load");
        assert_eq!(cfg.tests_dir, "tests/cairo");
        assert_eq!(cfg.source.as_deref(), Some(dir.path().join(CONFIG_FILE_NAME).as_path()));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let err = load(dir.path(), Some(Path::new("nope.yaml"))).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("nope.yaml"), "{err}");
    }
}
