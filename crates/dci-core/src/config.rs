// ── Runtime configuration ──
//
// Everything the core needs to know that isn't inventory: allocation
// ranges, naming, and remote-call tuning. Built by the CLI from a profile
// and passed to constructors; the core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use dci_api::{TlsMode, TransportConfig};

use crate::allocator::IdRange;

/// TLS verification strategy for SDN controller endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (lab controllers with self-signed certs).
    DangerAcceptInvalid,
}

/// Identifier ranges and route-target/distinguisher numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationConfig {
    /// VLAN stitching the WAN and access VPNs on the edge node.
    pub splicing_vlan: IdRange,
    pub bridge_domain: IdRange,
    /// Inter-VLAN id on the MX DCI bridge domains.
    pub dci_vlan: IdRange,
    /// VXLAN VNI on the MX face-to-DCI bridge domains.
    pub dci_vni: IdRange,
    pub rd_admin: u32,
    pub rt_admin: u32,
    /// Assigned-number range for RDs and RTs.
    pub rd_rt_value: IdRange,
    /// `N` in `target:N:N` for L2 DCI virtual networks.
    pub vn_route_target: IdRange,
    /// Assigned-number range for L3VPN node RDs (`<asn>:<n>`).
    pub node_rd_value: IdRange,
    pub opcode: IdRange,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            splicing_vlan: IdRange::new(3, 4094),
            bridge_domain: IdRange::new(3, 4095),
            dci_vlan: IdRange::new(1000, 2000),
            dci_vni: IdRange::new(1000, 2000),
            rd_admin: 12345,
            rt_admin: 54321,
            rd_rt_value: IdRange::new(1, 10240),
            vn_route_target: IdRange::new(1000, 2000),
            node_rd_value: IdRange::new(1, 999),
            opcode: IdRange::new(100, 999),
        }
    }
}

/// Name prefixes. Remote object names are `prefix + slicing name`, so a
/// delete can rebuild them from the record alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    pub vn_prefix: String,
    pub wan_vpn_prefix: String,
    pub access_vpn_prefix: String,
    pub l2_dci_vn_prefix: String,
    pub l3_dci_vn_prefix: String,
    pub l3vpn_srv6_vn_prefix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            vn_prefix: "ns-dcn-l2vpn-".into(),
            wan_vpn_prefix: "ns-wan-l2vpn-".into(),
            access_vpn_prefix: "ns-an-l2vpn-".into(),
            l2_dci_vn_prefix: "dci-controller-L2EVPNDCI-".into(),
            l3_dci_vn_prefix: "dci-controller-setup-".into(),
            l3vpn_srv6_vn_prefix: "dcictl-L3VPNSRv6-".into(),
        }
    }
}

/// Device session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub connect_timeout: Duration,
    /// Deadline for each RPC or CLI exchange.
    pub operation_timeout: Duration,
    /// Substring whose presence in CLI output marks a rejected push.
    pub cli_error_marker: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(60),
            cli_error_marker: "Error".into(),
        }
    }
}

impl DeviceConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::System,
            timeout: self.operation_timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

/// SDN controller HTTP tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdnConfig {
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for SdnConfig {
    fn default() -> Self {
        Self {
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SdnConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
        }
    }
}

/// Top-level runtime configuration handed to the slicing manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub allocation: AllocationConfig,
    pub naming: NamingConfig,
    pub device: DeviceConfig,
    pub sdn: SdnConfig,
    /// Attempts per idempotent teardown step (minimum 1).
    pub teardown_retries: u32,
    /// Pause between teardown attempts.
    pub retry_backoff: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            allocation: AllocationConfig::default(),
            naming: NamingConfig::default(),
            device: DeviceConfig::default(),
            sdn: SdnConfig::default(),
            teardown_retries: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}
