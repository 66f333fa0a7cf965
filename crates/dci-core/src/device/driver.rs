// ── Device driver contract ──

use std::collections::BTreeSet;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::device::transaction::ApplyOutcome;
use crate::error::CoreError;
use crate::model::{Vendor, WanNode};

/// Whether a template installs or removes its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Create,
    Delete,
}

/// One VPN instance of an EVPN splice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnInstance {
    pub name: String,
    pub route_distinguisher: String,
    pub route_target: String,
    pub bridge_domain: u32,
}

/// WAN VPN (EVPN VPLS over SRv6 BE) spliced to an access VPN (EVPN VXLAN).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceTemplate {
    pub wan_vpn: VpnInstance,
    pub access_vpn: VpnInstance,
    /// VNI of the site's virtual network.
    pub access_vni: u32,
    pub splicing_vlan_id: u32,
}

/// MX bridge domains joining a TF virtual network to the DCI fabric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2DciTemplate {
    pub vn_name: String,
    pub vn_vni: u32,
    pub vn_route_target: String,
    pub inter_vlan_id: u32,
    pub dci_vni: u32,
}

/// EVPN type-5 static route for one site subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3DciTemplate {
    pub subnet: Ipv4Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    Ingress,
    Egress,
}

/// L3VPN instance over SRv6 best effort on one PE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3vpnTemplate {
    pub vpn_name: String,
    pub route_distinguisher: String,
    pub route_target: String,
    pub subnet: Ipv4Net,
    pub opcode: u32,
    pub role: NodeRole,
}

/// Vendor-neutral description of a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "kebab-case")]
pub enum ConfigTemplate {
    EvpnVplsSrv6Splice(SpliceTemplate),
    L2EvpnDci(L2DciTemplate),
    L3EvpnDci(L3DciTemplate),
    L3vpnSrv6(L3vpnTemplate),
}

impl ConfigTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EvpnVplsSrv6Splice(_) => "evpn-vpls-srv6-splice",
            Self::L2EvpnDci(_) => "l2-evpn-dci",
            Self::L3EvpnDci(_) => "l3-evpn-dci",
            Self::L3vpnSrv6(_) => "l3vpn-srv6",
        }
    }
}

/// Identifiers a node's live configuration already uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedIdentifiers {
    pub vlans: BTreeSet<u32>,
    pub vnis: BTreeSet<u32>,
    pub bridge_domains: BTreeSet<u32>,
}

/// Renders templates for one vendor and pushes them through a transaction
/// executor. A driver instance is bound to one WAN node.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// The node this driver talks to.
    fn node(&self) -> &WanNode;

    /// Round-trip a harmless request.
    async fn liveness(&self) -> Result<(), CoreError>;

    async fn apply(
        &self,
        template: &ConfigTemplate,
        action: Action,
    ) -> Result<ApplyOutcome, CoreError>;

    async fn used_identifiers(&self) -> Result<UsedIdentifiers, CoreError>;
}

pub(crate) fn unsupported(node: &WanNode, template: &ConfigTemplate) -> CoreError {
    CoreError::UnsupportedCapability {
        device: node.name.clone(),
        capability: format!("{} template on {}", template.name(), node.vendor),
    }
}

/// A preset the template needs but the node does not carry.
pub(crate) fn preset<'a>(node: &'a WanNode, value: Option<&'a String>, field: &str) -> Result<&'a str, CoreError> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::Validation {
            message: format!("WAN node '{}' has no '{field}' preset", node.name),
        })
}
