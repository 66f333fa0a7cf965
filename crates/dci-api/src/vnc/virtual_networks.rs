// Virtual network and IPAM endpoints.

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::vnc::client::VncClient;
use crate::vnc::models::{
    AllocationPool, DEFAULT_IPAM, DEFAULT_ROUTE_TARGET, IpamManagement, IpamSubnet,
    NetworkIpam, NetworkIpamEnvelope, NetworkIpamRef, RouteTargetList, Subnet, VirtualNetwork,
    VirtualNetworkEnvelope, VirtualNetworkProperties, VirtualNetworkSpec, VnSubnets,
};

const VN: &str = "virtual-network";
const IPAM: &str = "network-ipam";

impl VncClient {
    /// Look up the shared DCI IPAM, creating it with user-defined subnets
    /// on first use. Returns its fq-name.
    pub async fn ensure_default_ipam(&self) -> Result<Vec<String>, Error> {
        let fq_name = self.fq_name(DEFAULT_IPAM);
        match self.fq_name_to_id(IPAM, &fq_name).await {
            Ok(_) => return Ok(fq_name),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        info!(ipam = DEFAULT_IPAM, project = self.project(), "creating default IPAM");
        let body = NetworkIpamEnvelope {
            network_ipam: NetworkIpam {
                fq_name: fq_name.clone(),
                parent_type: Some("project".into()),
                network_ipam_mgmt: Some(IpamManagement {
                    ipam_method: "dhcp".into(),
                }),
                ipam_subnet_method: Some("user-defined-subnet".into()),
                ..NetworkIpam::default()
            },
        };
        let url = self.url("network-ipams")?;
        let _: NetworkIpamEnvelope = self.post(url, &body, IPAM, DEFAULT_IPAM).await?;
        Ok(fq_name)
    }

    /// Create a virtual network bound to the default IPAM with one
    /// user-defined subnet. Returns the UUID assigned by the API server.
    pub async fn create_virtual_network(&self, spec: &VirtualNetworkSpec) -> Result<Uuid, Error> {
        let ipam = self.ensure_default_ipam().await?;
        let vn = build_virtual_network(self.fq_name(&spec.name), ipam, spec)?;

        info!(vn = %spec.name, subnet = %spec.subnet_cidr, "creating virtual network");
        let url = self.url("virtual-networks")?;
        let created: VirtualNetworkEnvelope = self
            .post(url, &VirtualNetworkEnvelope { virtual_network: vn }, VN, &spec.name)
            .await?;

        created
            .virtual_network
            .uuid
            .ok_or_else(|| Error::Deserialization {
                message: "create response carried no uuid".into(),
                body: String::new(),
            })
    }

    /// Read a virtual network by UUID.
    pub async fn get_virtual_network(&self, id: Uuid) -> Result<VirtualNetwork, Error> {
        let url = self.url(&format!("virtual-network/{id}"))?;
        let env: VirtualNetworkEnvelope = self.get(url, VN, &id.to_string()).await?;
        Ok(env.virtual_network)
    }

    /// Read a virtual network by its name in the configured project.
    pub async fn virtual_network_by_name(&self, name: &str) -> Result<VirtualNetwork, Error> {
        let id = self.fq_name_to_id(VN, &self.fq_name(name)).await?;
        self.get_virtual_network(id).await
    }

    /// VXLAN network identifier assigned to a virtual network.
    ///
    /// The API server allocates it in automatic identifier mode and exposes
    /// it as `virtual_network_network_id`.
    pub async fn virtual_network_vni(&self, id: Uuid) -> Result<u32, Error> {
        self.get_virtual_network(id)
            .await?
            .virtual_network_network_id
            .ok_or_else(|| Error::NotFound {
                resource: "virtual-network VNI",
                identifier: id.to_string(),
            })
    }

    /// Delete a virtual network by name.
    ///
    /// Returns `Ok(false)` when the network was already absent. Still
    /// referenced networks surface as [`Error::RefsExist`].
    pub async fn delete_virtual_network(&self, name: &str) -> Result<bool, Error> {
        let id = match self.fq_name_to_id(VN, &self.fq_name(name)).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => {
                warn!(vn = name, "virtual network not found, nothing to delete");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        info!(vn = name, %id, "deleting virtual network");
        let url = self.url(&format!("virtual-network/{id}"))?;
        match self.delete(url, VN, name).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                warn!(vn = name, "virtual network vanished before delete");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn build_virtual_network(
    fq_name: Vec<String>,
    ipam: Vec<String>,
    spec: &VirtualNetworkSpec,
) -> Result<VirtualNetwork, Error> {
    let subnet = parse_subnet(&spec.subnet_cidr)?;
    let allocation_pools = spec
        .allocation_pool
        .as_deref()
        .map(parse_allocation_pool)
        .transpose()?
        .into_iter()
        .collect();

    Ok(VirtualNetwork {
        fq_name,
        parent_type: Some("project".into()),
        virtual_network_properties: Some(VirtualNetworkProperties {
            forwarding_mode: spec.forwarding_mode,
            vxlan_network_identifier: None,
        }),
        route_target_list: Some(RouteTargetList {
            route_target: vec![
                spec.route_target
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ROUTE_TARGET.to_owned()),
            ],
        }),
        address_allocation_mode: Some("user-defined-subnet-only".into()),
        network_ipam_refs: vec![NetworkIpamRef {
            to: ipam,
            uuid: None,
            attr: VnSubnets {
                ipam_subnets: vec![IpamSubnet {
                    subnet,
                    allocation_pools,
                }],
            },
        }],
        ..VirtualNetwork::default()
    })
}

fn parse_subnet(cidr: &str) -> Result<Subnet, Error> {
    let invalid = || Error::InvalidInput {
        message: format!("invalid subnet CIDR '{cidr}'"),
    };
    let (prefix, len) = cidr.split_once('/').ok_or_else(invalid)?;
    let ip_prefix_len = len.trim().parse::<u8>().map_err(|_| invalid())?;
    Ok(Subnet {
        ip_prefix: prefix.trim().to_owned(),
        ip_prefix_len,
    })
}

fn parse_allocation_pool(pool: &str) -> Result<AllocationPool, Error> {
    let (start, end) = pool.split_once(',').ok_or_else(|| Error::InvalidInput {
        message: format!("allocation pool must be 'start,end', got '{pool}'"),
    })?;
    Ok(AllocationPool {
        start: start.trim().to_owned(),
        end: end.trim().to_owned(),
        vrouter_specific_pool: true,
    })
}
