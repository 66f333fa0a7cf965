// ── Slicing records ──
//
// One record per provisioned interconnect. Created only when every remote
// step of a create flow succeeded; flipped to INACTIVE when a delete stops
// part-way; removed when a delete completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LifecycleState;

/// Kind of interconnect, without its identifiers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SlicingKind {
    /// EVPN VPLS over SRv6 best-effort WAN spliced to an EVPN VXLAN access VPN.
    EvpnVplsSrv6Be,
    L2EvpnDci,
    L3EvpnDci,
    L3vpnSrv6,
}

/// SRv6 path selection for L3VPN slicings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RoutingType {
    /// Best effort.
    Be,
    /// Traffic engineering.
    Te,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnIdentifiers {
    pub route_distinguisher: String,
    pub route_target: String,
    pub bridge_domain: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceIdentifiers {
    pub wan_vpn: VpnIdentifiers,
    pub access_vpn: VpnIdentifiers,
}

/// Per-kind identifiers needed to rebuild teardown templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SlicingDetail {
    EvpnVplsSrv6Be {
        splicing_vlan_id: u32,
        east: SpliceIdentifiers,
        west: SpliceIdentifiers,
    },
    L2EvpnDci {
        inter_vlan_id: u32,
        dci_vni: u32,
    },
    L3EvpnDci,
    L3vpnSrv6 {
        routing_type: RoutingType,
        route_target: String,
        opcode: u32,
        east_route_distinguisher: String,
        west_route_distinguisher: String,
    },
}

impl SlicingDetail {
    pub fn kind(&self) -> SlicingKind {
        match self {
            Self::EvpnVplsSrv6Be { .. } => SlicingKind::EvpnVplsSrv6Be,
            Self::L2EvpnDci { .. } => SlicingKind::L2EvpnDci,
            Self::L3EvpnDci => SlicingKind::L3EvpnDci,
            Self::L3vpnSrv6 { .. } => SlicingKind::L3vpnSrv6,
        }
    }
}

/// What was provisioned on one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRecord {
    pub site_id: Uuid,
    pub wan_node_id: Uuid,
    pub subnet_cidr: String,
    #[serde(default)]
    pub allocation_pool: Option<String>,
    pub vn_name: String,
    pub vn_id: Uuid,
    #[serde(default)]
    pub vni: Option<u32>,
    #[serde(default)]
    pub vn_route_target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicingRecord {
    pub id: Uuid,
    pub name: String,
    pub state: LifecycleState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub east: LegRecord,
    pub west: LegRecord,
    pub detail: SlicingDetail,
}

impl SlicingRecord {
    pub fn kind(&self) -> SlicingKind {
        self.detail.kind()
    }
}

/// List filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlicingFilter {
    pub state: Option<LifecycleState>,
    pub kind: Option<SlicingKind>,
    pub east_site: Option<Uuid>,
    pub west_site: Option<Uuid>,
}

impl SlicingFilter {
    pub fn matches(&self, record: &SlicingRecord) -> bool {
        self.state.is_none_or(|s| s == record.state)
            && self.kind.is_none_or(|k| k == record.kind())
            && self.east_site.is_none_or(|id| id == record.east.site_id)
            && self.west_site.is_none_or(|id| id == record.west.site_id)
    }
}
