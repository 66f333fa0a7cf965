// VNC API wire types
//
// Only the subset of the Tungsten Fabric schema the DCI controller reads or
// writes. Unknown fields are ignored on the way in; optional fields are
// omitted on the way out so the API server applies its own defaults.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain every DCI object is created under.
pub const DEFAULT_DOMAIN: &str = "default-domain";

/// IPAM shared by every DCI virtual network in a project.
pub const DEFAULT_IPAM: &str = "dci-controller-default-ipam";

/// Route target applied when the caller does not supply one.
pub const DEFAULT_ROUTE_TARGET: &str = "target:100:100";

// ── Request / response envelopes ────────────────────────────────────

/// `POST /fqname-to-id` request body.
#[derive(Debug, Clone, Serialize)]
pub struct FqNameToIdRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub fq_name: &'a [String],
}

/// `POST /fqname-to-id` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct FqNameToIdResponse {
    pub uuid: Uuid,
}

/// `{"virtual-network": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetworkEnvelope {
    #[serde(rename = "virtual-network")]
    pub virtual_network: VirtualNetwork,
}

/// `{"network-ipam": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIpamEnvelope {
    #[serde(rename = "network-ipam")]
    pub network_ipam: NetworkIpam,
}

// ── Virtual network ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub fq_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_properties: Option<VirtualNetworkProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_target_list: Option<RouteTargetList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_allocation_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_ipam_refs: Vec<NetworkIpamRef>,
    /// Auto-assigned network id; doubles as the VXLAN VNI in automatic
    /// identifier mode.
    #[serde(default, skip_serializing)]
    pub virtual_network_network_id: Option<u32>,
}

impl VirtualNetwork {
    /// Display name (last fq-name component).
    pub fn name(&self) -> Option<&str> {
        self.fq_name.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetworkProperties {
    pub forwarding_mode: ForwardingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan_network_identifier: Option<u32>,
}

/// Virtual network forwarding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingMode {
    L2,
    L3,
    L2L3,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTargetList {
    #[serde(default)]
    pub route_target: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIpamRef {
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub attr: VnSubnets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VnSubnets {
    #[serde(default)]
    pub ipam_subnets: Vec<IpamSubnet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpamSubnet {
    pub subnet: Subnet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allocation_pools: Vec<AllocationPool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subnet {
    pub ip_prefix: String,
    pub ip_prefix_len: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPool {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub vrouter_specific_pool: bool,
}

// ── Network IPAM ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkIpam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub fq_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_ipam_mgmt: Option<IpamManagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipam_subnet_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpamManagement {
    pub ipam_method: String,
}

// ── Caller-facing request ───────────────────────────────────────────

/// What the caller asks for when creating a DCI virtual network.
#[derive(Debug, Clone)]
pub struct VirtualNetworkSpec {
    pub name: String,
    /// `a.b.c.d/len`
    pub subnet_cidr: String,
    /// `"start,end"` pool restricting vRouter address allocation.
    pub allocation_pool: Option<String>,
    /// Full `target:A:N` string; [`DEFAULT_ROUTE_TARGET`] when absent.
    pub route_target: Option<String>,
    pub forwarding_mode: ForwardingMode,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn network_id_is_read_but_never_written() {
        let vn: VirtualNetwork = serde_json::from_value(json!({
            "uuid": "2d6ad4c8-0b62-4bbf-9e5b-4f4fa1b7a7a1",
            "fq_name": ["default-domain", "admin", "ns-dcn-l2vpn-a"],
            "virtual_network_network_id": 7,
            "some_unknown_field": true
        }))
        .unwrap();
        assert_eq!(vn.virtual_network_network_id, Some(7));
        assert_eq!(vn.name(), Some("ns-dcn-l2vpn-a"));

        let out = serde_json::to_value(&vn).unwrap();
        assert!(out.get("virtual_network_network_id").is_none());
    }

    #[test]
    fn forwarding_mode_wire_names() {
        assert_eq!(serde_json::to_value(ForwardingMode::L2L3).unwrap(), json!("l2_l3"));
        assert_eq!(serde_json::to_value(ForwardingMode::L2).unwrap(), json!("l2"));
    }
}
