// ── Slicing saga tasks ──
//
// Create:  create-east-vn → create-west-vn → configure-east-wan-node → configure-west-wan-node
// Delete:  unconfigure-east-wan-node → unconfigure-west-wan-node → delete-east-vn → delete-west-vn
//
// Every task reads the flow plan from the store under `plan`. VN tasks
// publish `<side>_vn_id` / `<side>_vni`; node tasks read the VNI back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dci_api::vnc::{ForwardingMode, VirtualNetworkSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::device::{
    Action, ConfigTemplate, DeviceDriver, L2DciTemplate, L3DciTemplate, L3vpnTemplate, NodeRole,
    SpliceTemplate, VpnInstance,
};
use crate::error::CoreError;
use crate::model::{SlicingDetail, SpliceIdentifiers};
use crate::retry::retry_idempotent;
use crate::saga::{ProvisioningStore, Task, TaskOutputs};
use crate::sdn::SdnClient;
use crate::slicing::naming::SlicingNames;

pub const PLAN: &str = "plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    East,
    West,
}

impl Side {
    pub fn vn_id_key(self) -> &'static str {
        match self {
            Self::East => "east_vn_id",
            Self::West => "west_vn_id",
        }
    }

    pub fn vni_key(self) -> &'static str {
        match self {
            Self::East => "east_vni",
            Self::West => "west_vni",
        }
    }
}

/// Per-site inputs of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegPlan {
    pub subnet_cidr: String,
    pub allocation_pool: Option<String>,
    /// Full `target:A:N` for the virtual network, if the kind sets one.
    pub vn_route_target: Option<String>,
}

/// Everything a flow needs to know up front: names and allocated
/// identifiers. Rebuilt from the record for a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicingPlan {
    pub name: String,
    pub names: SlicingNames,
    pub detail: SlicingDetail,
    pub east: LegPlan,
    pub west: LegPlan,
}

impl SlicingPlan {
    pub fn leg(&self, side: Side) -> &LegPlan {
        match side {
            Side::East => &self.east,
            Side::West => &self.west,
        }
    }

    fn forwarding_mode(&self) -> ForwardingMode {
        match self.detail {
            SlicingDetail::EvpnVplsSrv6Be { .. } | SlicingDetail::L2EvpnDci { .. } => {
                ForwardingMode::L2
            }
            SlicingDetail::L3EvpnDci | SlicingDetail::L3vpnSrv6 { .. } => ForwardingMode::L2L3,
        }
    }

    pub fn vn_spec(&self, side: Side) -> VirtualNetworkSpec {
        let leg = self.leg(side);
        VirtualNetworkSpec {
            name: self.names.vn.clone(),
            subnet_cidr: leg.subnet_cidr.clone(),
            allocation_pool: leg.allocation_pool.clone(),
            route_target: leg.vn_route_target.clone(),
            forwarding_mode: self.forwarding_mode(),
        }
    }

    /// Device template for one side. `vni` is the side's VN VNI.
    pub fn template(&self, side: Side, vni: Option<u32>) -> Result<ConfigTemplate, CoreError> {
        let need_vni = || {
            vni.ok_or_else(|| CoreError::Internal(format!("no {side} VNI for '{}'", self.name)))
        };
        let leg = self.leg(side);

        Ok(match &self.detail {
            SlicingDetail::EvpnVplsSrv6Be {
                splicing_vlan_id,
                east,
                west,
            } => {
                let ids: &SpliceIdentifiers = match side {
                    Side::East => east,
                    Side::West => west,
                };
                ConfigTemplate::EvpnVplsSrv6Splice(SpliceTemplate {
                    wan_vpn: VpnInstance {
                        name: self.names.wan_vpn.clone(),
                        route_distinguisher: ids.wan_vpn.route_distinguisher.clone(),
                        route_target: ids.wan_vpn.route_target.clone(),
                        bridge_domain: ids.wan_vpn.bridge_domain,
                    },
                    access_vpn: VpnInstance {
                        name: self.names.access_vpn.clone(),
                        route_distinguisher: ids.access_vpn.route_distinguisher.clone(),
                        route_target: ids.access_vpn.route_target.clone(),
                        bridge_domain: ids.access_vpn.bridge_domain,
                    },
                    access_vni: need_vni()?,
                    splicing_vlan_id: *splicing_vlan_id,
                })
            }
            SlicingDetail::L2EvpnDci {
                inter_vlan_id,
                dci_vni,
            } => ConfigTemplate::L2EvpnDci(L2DciTemplate {
                vn_name: self.names.vn.clone(),
                vn_vni: need_vni()?,
                vn_route_target: leg.vn_route_target.clone().ok_or_else(|| {
                    CoreError::Internal(format!("no {side} VN route target for '{}'", self.name))
                })?,
                inter_vlan_id: *inter_vlan_id,
                dci_vni: *dci_vni,
            }),
            SlicingDetail::L3EvpnDci => ConfigTemplate::L3EvpnDci(L3DciTemplate {
                subnet: parse_subnet(&leg.subnet_cidr)?,
            }),
            SlicingDetail::L3vpnSrv6 {
                route_target,
                opcode,
                east_route_distinguisher,
                west_route_distinguisher,
                ..
            } => ConfigTemplate::L3vpnSrv6(L3vpnTemplate {
                vpn_name: self.names.vn.clone(),
                route_distinguisher: match side {
                    Side::East => east_route_distinguisher.clone(),
                    Side::West => west_route_distinguisher.clone(),
                },
                route_target: route_target.clone(),
                subnet: parse_subnet(&leg.subnet_cidr)?,
                opcode: *opcode,
                role: match side {
                    Side::East => NodeRole::Ingress,
                    Side::West => NodeRole::Egress,
                },
            }),
        })
    }
}

fn parse_subnet(cidr: &str) -> Result<ipnet::Ipv4Net, CoreError> {
    cidr.trim().parse().map_err(|_| CoreError::Validation {
        message: format!("invalid subnet CIDR '{cidr}'"),
    })
}

/// Bounded retries for idempotent teardown calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

async fn delete_vn(
    sdn: &dyn SdnClient,
    name: &str,
    retry: RetryPolicy,
) -> Result<bool, CoreError> {
    retry_idempotent("delete virtual network", retry.attempts, retry.backoff, || {
        sdn.delete_virtual_network(name)
    })
    .await
}

async fn remove_config(
    driver: &dyn DeviceDriver,
    template: &ConfigTemplate,
    retry: RetryPolicy,
) -> Result<(), CoreError> {
    retry_idempotent("remove device config", retry.attempts, retry.backoff, || async {
        driver.apply(template, Action::Delete).await.map(|_| ())
    })
    .await
}

// ── Create VN ───────────────────────────────────────────────────────

pub struct CreateVirtualNetwork {
    name: String,
    side: Side,
    sdn: Arc<dyn SdnClient>,
    retry: RetryPolicy,
}

impl CreateVirtualNetwork {
    pub fn new(side: Side, sdn: Arc<dyn SdnClient>, retry: RetryPolicy) -> Self {
        Self {
            name: format!("create-{side}-vn"),
            side,
            sdn,
            retry,
        }
    }
}

#[async_trait]
impl Task for CreateVirtualNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn provides(&self) -> &[&'static str] {
        match self.side {
            Side::East => &["east_vn_id", "east_vni"],
            Side::West => &["west_vn_id", "west_vni"],
        }
    }

    async fn execute(&self, store: &ProvisioningStore) -> Result<TaskOutputs, CoreError> {
        let plan: SlicingPlan = store.get(PLAN)?;
        let spec = plan.vn_spec(self.side);
        let id = self.sdn.create_virtual_network(&spec).await?;

        let vni = match self.sdn.virtual_network_vni(id).await {
            Ok(vni) => vni,
            Err(e) => {
                // Not completed, so the orchestrator won't revert us.
                warn!(vn = %spec.name, side = %self.side, error = %e, "VNI read failed, removing network");
                if let Err(cleanup) = delete_vn(self.sdn.as_ref(), &spec.name, self.retry).await {
                    warn!(vn = %spec.name, error = %cleanup, "cleanup delete failed");
                }
                return Err(e);
            }
        };

        info!(vn = %spec.name, side = %self.side, %id, vni, "virtual network created");
        TaskOutputs::new()
            .with(self.side.vn_id_key(), id)?
            .with(self.side.vni_key(), vni)
    }

    async fn revert(
        &self,
        store: &ProvisioningStore,
        _outputs: Option<&TaskOutputs>,
    ) -> Result<(), CoreError> {
        let plan: SlicingPlan = store.get(PLAN)?;
        delete_vn(self.sdn.as_ref(), &plan.names.vn, self.retry).await?;
        Ok(())
    }
}

// ── Configure node ──────────────────────────────────────────────────

pub struct ConfigureWanNode {
    name: String,
    side: Side,
    driver: Arc<dyn DeviceDriver>,
    retry: RetryPolicy,
}

impl ConfigureWanNode {
    pub fn new(side: Side, driver: Arc<dyn DeviceDriver>, retry: RetryPolicy) -> Self {
        Self {
            name: format!("configure-{side}-wan-node"),
            side,
            driver,
            retry,
        }
    }

    fn template(&self, store: &ProvisioningStore) -> Result<ConfigTemplate, CoreError> {
        let plan: SlicingPlan = store.get(PLAN)?;
        plan.template(self.side, store.get_opt(self.side.vni_key())?)
    }
}

#[async_trait]
impl Task for ConfigureWanNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, store: &ProvisioningStore) -> Result<TaskOutputs, CoreError> {
        let template = self.template(store)?;
        self.driver.apply(&template, Action::Create).await?;
        info!(
            node = %self.driver.node().name,
            side = %self.side,
            template = template.name(),
            "WAN node configured"
        );
        Ok(TaskOutputs::new())
    }

    async fn revert(
        &self,
        store: &ProvisioningStore,
        _outputs: Option<&TaskOutputs>,
    ) -> Result<(), CoreError> {
        let template = self.template(store)?;
        remove_config(self.driver.as_ref(), &template, self.retry).await
    }
}

// ── Teardown ────────────────────────────────────────────────────────

pub struct UnconfigureWanNode {
    name: String,
    side: Side,
    driver: Arc<dyn DeviceDriver>,
    retry: RetryPolicy,
}

impl UnconfigureWanNode {
    pub fn new(side: Side, driver: Arc<dyn DeviceDriver>, retry: RetryPolicy) -> Self {
        Self {
            name: format!("unconfigure-{side}-wan-node"),
            side,
            driver,
            retry,
        }
    }
}

#[async_trait]
impl Task for UnconfigureWanNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, store: &ProvisioningStore) -> Result<TaskOutputs, CoreError> {
        let plan: SlicingPlan = store.get(PLAN)?;
        let template = plan.template(self.side, store.get_opt(self.side.vni_key())?)?;
        remove_config(self.driver.as_ref(), &template, self.retry).await?;
        info!(node = %self.driver.node().name, side = %self.side, "WAN node unconfigured");
        Ok(TaskOutputs::new())
    }

    async fn revert(&self, _: &ProvisioningStore, _: Option<&TaskOutputs>) -> Result<(), CoreError> {
        Ok(())
    }
}

pub struct DeleteVirtualNetwork {
    name: String,
    side: Side,
    sdn: Arc<dyn SdnClient>,
    retry: RetryPolicy,
}

impl DeleteVirtualNetwork {
    pub fn new(side: Side, sdn: Arc<dyn SdnClient>, retry: RetryPolicy) -> Self {
        Self {
            name: format!("delete-{side}-vn"),
            side,
            sdn,
            retry,
        }
    }
}

#[async_trait]
impl Task for DeleteVirtualNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, store: &ProvisioningStore) -> Result<TaskOutputs, CoreError> {
        let plan: SlicingPlan = store.get(PLAN)?;
        let existed = delete_vn(self.sdn.as_ref(), &plan.names.vn, self.retry).await?;
        info!(vn = %plan.names.vn, side = %self.side, existed, "virtual network deleted");
        Ok(TaskOutputs::new())
    }

    async fn revert(&self, _: &ProvisioningStore, _: Option<&TaskOutputs>) -> Result<(), CoreError> {
        Ok(())
    }
}

// ── Graphs ──────────────────────────────────────────────────────────

/// Clients and drivers for both sites of one flow.
#[derive(Clone)]
pub struct FlowParticipants {
    pub east_sdn: Arc<dyn SdnClient>,
    pub west_sdn: Arc<dyn SdnClient>,
    pub east_driver: Arc<dyn DeviceDriver>,
    pub west_driver: Arc<dyn DeviceDriver>,
}

pub fn create_graph(p: &FlowParticipants, retry: RetryPolicy) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(CreateVirtualNetwork::new(Side::East, Arc::clone(&p.east_sdn), retry)),
        Box::new(CreateVirtualNetwork::new(Side::West, Arc::clone(&p.west_sdn), retry)),
        Box::new(ConfigureWanNode::new(Side::East, Arc::clone(&p.east_driver), retry)),
        Box::new(ConfigureWanNode::new(Side::West, Arc::clone(&p.west_driver), retry)),
    ]
}

pub fn delete_graph(p: &FlowParticipants, retry: RetryPolicy) -> Vec<Box<dyn Task>> {
    vec![
        Box::new(UnconfigureWanNode::new(Side::East, Arc::clone(&p.east_driver), retry)),
        Box::new(UnconfigureWanNode::new(Side::West, Arc::clone(&p.west_driver), retry)),
        Box::new(DeleteVirtualNetwork::new(Side::East, Arc::clone(&p.east_sdn), retry)),
        Box::new(DeleteVirtualNetwork::new(Side::West, Arc::clone(&p.west_sdn), retry)),
    ]
}

/// Store seed for a flow.
pub fn seed_store(plan: &SlicingPlan) -> Result<ProvisioningStore, CoreError> {
    let mut store = ProvisioningStore::new();
    store.insert(PLAN, plan)?;
    Ok(store)
}

/// Store seed for a teardown: the plan plus what the create flow produced.
pub fn seed_teardown_store(
    plan: &SlicingPlan,
    east: (Uuid, Option<u32>),
    west: (Uuid, Option<u32>),
) -> Result<ProvisioningStore, CoreError> {
    let mut store = seed_store(plan)?;
    for (side, (vn_id, vni)) in [(Side::East, east), (Side::West, west)] {
        store.insert(side.vn_id_key(), vn_id)?;
        if let Some(vni) = vni {
            store.insert(side.vni_key(), vni)?;
        }
    }
    Ok(store)
}
