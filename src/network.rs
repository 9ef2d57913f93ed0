//! Network selection: selector → descriptor resolution with default fallback, and the
//! development-network policy that changes how toolchain containers are configured.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::ToolchainError;

/// Explicit gateway endpoints; always present as a pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayUrls {
    pub gateway_url: String,
    pub feeder_gateway_url: String,
}

/// One named deployment target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDescriptor {
    id: String,
    gateways: Option<GatewayUrls>,
}

impl NetworkDescriptor {
    /// Public network reached through the toolchain's built-in endpoints.
    pub fn public(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gateways: None,
        }
    }

    /// Construct from optional URLs; exactly one of the two being set is rejected.
    pub fn new(
        id: impl Into<String>,
        gateway_url: Option<String>,
        feeder_gateway_url: Option<String>,
    ) -> Result<Self, ToolchainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ToolchainError::config("network id must not be empty"));
        }
        let gateways = match (gateway_url, feeder_gateway_url) {
            (None, None) => None,
            (Some(gateway_url), Some(feeder_gateway_url)) => Some(GatewayUrls {
                gateway_url,
                feeder_gateway_url,
            }),
            _ => {
                return Err(ToolchainError::config(format!(
                    "network {id}: gateway_url and feeder_gateway_url must be set together"
                )))
            }
        };
        Ok(Self { id, gateways })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gateways(&self) -> Option<&GatewayUrls> {
        self.gateways.as_ref()
    }
}

/// Selector name → descriptor, plus the default selector. Read-only once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkTable {
    networks: BTreeMap<String, NetworkDescriptor>,
    default_selector: String,
}

impl NetworkTable {
    pub fn new(
        networks: BTreeMap<String, NetworkDescriptor>,
        default_selector: impl Into<String>,
    ) -> Result<Self, ToolchainError> {
        let default_selector = default_selector.into();
        if !networks.contains_key(&default_selector) {
            return Err(ToolchainError::config(format!(
                "default network '{default_selector}' is not defined in networks"
            )));
        }
        Ok(Self {
            networks,
            default_selector,
        })
    }

    pub fn get(&self, selector: &str) -> Option<&NetworkDescriptor> {
        self.networks.get(selector)
    }

    pub fn default_selector(&self) -> &str {
        &self.default_selector
    }

    pub fn default_descriptor(&self) -> &NetworkDescriptor {
        // Presence of the default is checked in `new`.
        &self.networks[&self.default_selector]
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }
}

/// Why the default network was used instead of the requested one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fallback {
    NoSelector,
    Unknown(String),
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::NoSelector => f.write_str("no network specified"),
            Fallback::Unknown(s) => write!(f, "network '{s}' is not configured"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub selector: &'a str,
    pub descriptor: &'a NetworkDescriptor,
    pub fallback: Option<Fallback>,
}

/// Resolve `selector` against `table`. Absent or unknown selectors resolve to the default and
/// report the fallback; this never fails.
pub fn resolve_network<'a>(selector: Option<&str>, table: &'a NetworkTable) -> Resolution<'a> {
    let requested = selector.map(str::trim).filter(|s| !s.is_empty());
    if let Some(name) = requested {
        if let Some((key, descriptor)) = table.networks.get_key_value(name) {
            return Resolution {
                selector: key,
                descriptor,
                fallback: None,
            };
        }
    }
    Resolution {
        selector: &table.default_selector,
        descriptor: table.default_descriptor(),
        fallback: Some(match requested {
            Some(name) => Fallback::Unknown(name.to_string()),
            None => Fallback::NoSelector,
        }),
    }
}

/// Whether toolchain commands on the development network use the account wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalletPolicy {
    UseWallet,
    NoWallet,
}

/// Development-network settings shared by the devnet container and the operations joining it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevnetPolicy {
    pub network_id: String,
    pub docker_network: String,
    pub wallet: WalletPolicy,
}

/// How toolchain containers reach the resolved network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetNetwork {
    /// Selected through the `STARKNET_NETWORK` environment variable.
    Public { network_id: String },
    /// Explicit gateway flags on the shared docker network of the devnet container.
    Development {
        gateways: GatewayUrls,
        docker_network: String,
        wallet: WalletPolicy,
    },
}

impl DevnetPolicy {
    pub fn is_development(&self, descriptor: &NetworkDescriptor) -> bool {
        descriptor.id() == self.network_id
    }

    /// Classify a resolved descriptor. The development network must carry gateway URLs.
    pub fn target(&self, descriptor: &NetworkDescriptor) -> Result<TargetNetwork, ToolchainError> {
        if !self.is_development(descriptor) {
            return Ok(TargetNetwork::Public {
                network_id: descriptor.id().to_string(),
            });
        }
        let gateways = descriptor.gateways().cloned().ok_or_else(|| {
            ToolchainError::config(format!(
                "development network {} requires gateway_url and feeder_gateway_url",
                descriptor.id()
            ))
        })?;
        Ok(TargetNetwork::Development {
            gateways,
            docker_network: self.docker_network.clone(),
            wallet: self.wallet,
        })
    }
}
