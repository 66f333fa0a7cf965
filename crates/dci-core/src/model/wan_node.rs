// ── WAN node domain type ──

use std::collections::BTreeSet;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LifecycleState;

/// A WAN edge router (DC gateway or provider edge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanNode {
    pub id: Uuid,
    pub name: String,
    pub vendor: Vendor,
    pub connection: ConnectionProfile,
    #[serde(default)]
    pub presets: WanNodePresets,
    #[serde(default)]
    pub roles: BTreeSet<WanNodeRole>,
    /// BGP AS number; required for L3VPN route distinguishers.
    #[serde(default)]
    pub as_number: Option<u32>,
    #[serde(default)]
    pub state: LifecycleState,
}

impl WanNode {
    pub fn host(&self) -> &str {
        &self.connection.endpoint().host
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Vendor {
    Huawei,
    Juniper,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum WanNodeRole {
    #[serde(rename = "dcgw")]
    #[strum(serialize = "dcgw")]
    DcGateway,
    #[serde(rename = "pe")]
    #[strum(serialize = "pe")]
    ProviderEdge,
}

/// How configuration is pushed to a node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigureMode {
    Netconf,
    SshCli,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(serialize_with = "super::secret::serialize")]
    pub password: SecretString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliEndpoint {
    #[serde(flatten)]
    pub endpoint: DeviceEndpoint,
    /// Privilege (enable/super) password.
    #[serde(default, serialize_with = "super::secret::option::serialize")]
    pub enable_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionProfile {
    Netconf(DeviceEndpoint),
    SshCli(CliEndpoint),
}

impl ConnectionProfile {
    pub fn mode(&self) -> ConfigureMode {
        match self {
            Self::Netconf(_) => ConfigureMode::Netconf,
            Self::SshCli(_) => ConfigureMode::SshCli,
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        match self {
            Self::Netconf(e) => e,
            Self::SshCli(c) => &c.endpoint,
        }
    }
}

/// Per-node values provisioned out of band and referenced by templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WanNodePresets {
    pub srv6_locator: Option<String>,
    pub srv6_locator_arg: Option<String>,
    pub vxlan_nve_interface: Option<String>,
    pub vxlan_nve_address: Option<String>,
    pub vxlan_nve_peer_address: Option<String>,
    pub wan_vpn_bd_interface: Option<String>,
    pub access_vpn_bd_interface: Option<String>,
}
