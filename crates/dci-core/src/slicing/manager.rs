// ── Network slicing manager ──
//
// Entry point for slicing lifecycle operations. Resolves inventory,
// allocates identifiers against live device usage, builds the create or
// delete task graph and hands it to the orchestrator. Holds the record
// lock for the whole flow.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::allocator::{IdentifierAllocator, POOL_BRIDGE_DOMAIN, POOL_VLAN, POOL_VNI};
use crate::config::CoreConfig;
use crate::device::{DeviceDriver, DriverProvider, DriverRegistry, UsedIdentifiers};
use crate::error::CoreError;
use crate::model::{
    LegRecord, LifecycleState, Site, SlicingDetail, SlicingFilter, SlicingRecord,
    SpliceIdentifiers, VpnIdentifiers, WanNode,
};
use crate::repository::{InventoryRepository, SlicingRepository, SlicingUpdate};
use crate::saga::{CompletedFlow, Orchestrator, ProvisioningStore};
use crate::sdn::{SdnProvider, VncSdnProvider};
use crate::slicing::naming::SlicingNames;
use crate::slicing::params::{CreateSlicingParams, KindParams, LegParams};
use crate::slicing::tasks::{self, FlowParticipants, LegPlan, RetryPolicy, Side, SlicingPlan};

/// Remote-system factories the manager draws clients from.
#[derive(Clone)]
pub struct Backends {
    pub sdn: Arc<dyn SdnProvider>,
    pub drivers: Arc<dyn DriverProvider>,
}

impl Backends {
    /// VNC clients per site and the built-in device drivers over TCP.
    pub fn live(config: &CoreConfig) -> Self {
        Self {
            sdn: Arc::new(VncSdnProvider::new(config.sdn.clone())),
            drivers: Arc::new(DriverRegistry::tcp(&config.device)),
        }
    }
}

/// One end of a flow, resolved from inventory.
struct Leg {
    site: Site,
    node: WanNode,
    driver: Arc<dyn DeviceDriver>,
}

pub struct NetworkSlicingManager {
    slicings: Arc<dyn SlicingRepository>,
    inventory: Arc<dyn InventoryRepository>,
    backends: Backends,
    config: CoreConfig,
    seed: Option<u64>,
}

impl NetworkSlicingManager {
    pub fn new(
        slicings: Arc<dyn SlicingRepository>,
        inventory: Arc<dyn InventoryRepository>,
        backends: Backends,
        config: CoreConfig,
    ) -> Self {
        Self {
            slicings,
            inventory,
            backends,
            config,
            seed: None,
        }
    }

    /// Draw identifiers from a seeded generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.teardown_retries.max(1),
            backoff: self.config.retry_backoff,
        }
    }

    fn allocator(&self) -> IdentifierAllocator {
        let config = self.config.allocation.clone();
        match self.seed {
            Some(seed) => IdentifierAllocator::seeded(config, seed),
            None => IdentifierAllocator::new(config),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn get_slicing(&self, id: Uuid) -> Result<SlicingRecord, CoreError> {
        self.slicings.get(id).await
    }

    pub async fn find_slicing(&self, name: &str) -> Result<SlicingRecord, CoreError> {
        self.slicings
            .find_by_name(name)
            .await?
            .ok_or_else(|| CoreError::ResourceNotFound {
                resource: "slicing".into(),
                identifier: name.to_owned(),
            })
    }

    pub async fn list_slicings(&self, filter: &SlicingFilter) -> Result<Vec<SlicingRecord>, CoreError> {
        self.slicings.list(filter).await
    }

    /// Open a session to the node and run its liveness probe.
    pub async fn ping_wan_node(&self, id: Uuid) -> Result<(), CoreError> {
        let node = self.inventory.wan_node(id).await?;
        let driver = self.backends.drivers.driver_for(&node)?;
        driver.liveness().await?;
        info!(node = %node.name, host = node.host(), "WAN node reachable");
        Ok(())
    }

    /// Authenticated round-trip to the site's SDN controller.
    pub async fn ping_site(&self, id: Uuid) -> Result<(), CoreError> {
        let site = self.inventory.site(id).await?;
        self.backends.sdn.client_for(&site)?.ping().await?;
        info!(site = %site.name, controller = %site.sdn.base_url(), "SDN controller reachable");
        Ok(())
    }

    // ── Create ───────────────────────────────────────────────────────

    pub async fn create_slicing(
        &self,
        east_site: &Site,
        west_site: &Site,
        params: CreateSlicingParams,
    ) -> Result<SlicingRecord, CoreError> {
        params.validate()?;
        let kind = params.kind.kind();
        let names = SlicingNames::derive(&self.config.naming, kind, &params.name)?;
        if east_site.id == west_site.id {
            return Err(CoreError::Validation {
                message: format!("east and west are the same site '{}'", east_site.name),
            });
        }

        let _lock = self.slicings.lock_for_update(&params.name).await?;
        if self.slicings.find_by_name(&params.name).await?.is_some() {
            return Err(CoreError::Conflict {
                message: format!("slicing '{}' already exists", params.name),
            });
        }

        let east = self.resolve_leg(east_site, &params.east).await?;
        let west = self.resolve_leg(west_site, &params.west).await?;
        info!(
            slicing = %params.name,
            %kind,
            east = %east.node.name,
            west = %west.node.name,
            "creating slicing"
        );

        let plan = self.plan(&params, names, &east, &west).await?;
        let participants = FlowParticipants {
            east_sdn: self.backends.sdn.client_for(&east.site)?,
            west_sdn: self.backends.sdn.client_for(&west.site)?,
            east_driver: Arc::clone(&east.driver),
            west_driver: Arc::clone(&west.driver),
        };

        let orchestrator = Orchestrator::new(format!("create-{}", params.name));
        let completed = orchestrator
            .run(tasks::create_graph(&participants, self.retry()), tasks::seed_store(&plan)?)
            .await?;

        let record = match build_record(&plan, &east, &west, completed.store()) {
            Ok(record) => record,
            Err(e) => return Err(undo(completed, "build-record", e).await),
        };
        if let Err(e) = self.slicings.create(&record).await {
            return Err(undo(completed, "persist-record", e).await);
        }

        info!(slicing = %record.name, id = %record.id, %kind, "slicing created");
        Ok(record)
    }

    async fn resolve_leg(&self, site: &Site, leg: &LegParams) -> Result<Leg, CoreError> {
        if site.state == LifecycleState::Inactive {
            return Err(CoreError::Validation {
                message: format!("site '{}' is inactive", site.name),
            });
        }
        let node_id = match leg.wan_node {
            Some(id) if site.wan_nodes.contains(&id) => id,
            Some(id) => {
                return Err(CoreError::Validation {
                    message: format!("WAN node {id} does not belong to site '{}'", site.name),
                });
            }
            None => *site.wan_nodes.first().ok_or_else(|| CoreError::Validation {
                message: format!("site '{}' has no WAN nodes", site.name),
            })?,
        };
        let node = self.inventory.wan_node(node_id).await?;
        if node.state == LifecycleState::Inactive {
            return Err(CoreError::Validation {
                message: format!("WAN node '{}' is inactive", node.name),
            });
        }
        let driver = self.backends.drivers.driver_for(&node)?;
        Ok(Leg {
            site: site.clone(),
            node,
            driver,
        })
    }

    /// Allocate every identifier the kind needs and assemble the plan.
    async fn plan(
        &self,
        params: &CreateSlicingParams,
        names: SlicingNames,
        east: &Leg,
        west: &Leg,
    ) -> Result<SlicingPlan, CoreError> {
        let alloc = &self.config.allocation;
        let mut ids = self.allocator();
        let mut vn_route_target = None;

        let detail = match &params.kind {
            KindParams::EvpnVplsSrv6Be => {
                let (ue, uw) = used_on_both(east, west).await?;
                let splicing_vlan_id = ids.allocate(POOL_VLAN, alloc.splicing_vlan, &ue.vlans, &uw.vlans)?;
                let east_ids = splice_identifiers(&mut ids, &self.config, &ue, &uw)?;
                let west_ids = splice_identifiers(&mut ids, &self.config, &ue, &uw)?;
                SlicingDetail::EvpnVplsSrv6Be {
                    splicing_vlan_id,
                    east: east_ids,
                    west: west_ids,
                }
            }
            KindParams::L2EvpnDci => {
                let (ue, uw) = used_on_both(east, west).await?;
                let inter_vlan_id = ids.allocate(POOL_VLAN, alloc.dci_vlan, &ue.vlans, &uw.vlans)?;
                let dci_vni = ids.allocate(POOL_VNI, alloc.dci_vni, &ue.vnis, &uw.vnis)?;
                vn_route_target = Some(ids.vn_route_target());
                SlicingDetail::L2EvpnDci {
                    inter_vlan_id,
                    dci_vni,
                }
            }
            KindParams::L3EvpnDci => SlicingDetail::L3EvpnDci,
            KindParams::L3vpnSrv6 {
                routing_type,
                route_target,
            } => {
                vn_route_target = Some(format!("target:{route_target}"));
                SlicingDetail::L3vpnSrv6 {
                    routing_type: *routing_type,
                    route_target: route_target.clone(),
                    opcode: ids.opcode(),
                    east_route_distinguisher: ids.node_route_distinguisher(as_number(&east.node)?)?,
                    west_route_distinguisher: ids.node_route_distinguisher(as_number(&west.node)?)?,
                }
            }
        };

        let leg = |p: &LegParams| LegPlan {
            subnet_cidr: p.subnet_cidr.clone(),
            allocation_pool: p.allocation_pool.clone(),
            vn_route_target: vn_route_target.clone(),
        };
        Ok(SlicingPlan {
            name: params.name.clone(),
            names,
            detail,
            east: leg(&params.east),
            west: leg(&params.west),
        })
    }

    // ── Delete ───────────────────────────────────────────────────────

    /// Tear down every remote object of `record`. A partial teardown keeps
    /// the record as INACTIVE; deleting it again resumes.
    pub async fn delete_slicing(&self, record: &SlicingRecord) -> Result<(), CoreError> {
        let _lock = self.slicings.lock_for_update(&record.name).await?;
        let record = self.slicings.get(record.id).await?;
        info!(slicing = %record.name, id = %record.id, kind = %record.kind(), "deleting slicing");

        let east_site = self.inventory.site(record.east.site_id).await?;
        let west_site = self.inventory.site(record.west.site_id).await?;
        let east_node = self.inventory.wan_node(record.east.wan_node_id).await?;
        let west_node = self.inventory.wan_node(record.west.wan_node_id).await?;

        let participants = FlowParticipants {
            east_sdn: self.backends.sdn.client_for(&east_site)?,
            west_sdn: self.backends.sdn.client_for(&west_site)?,
            east_driver: self.backends.drivers.driver_for(&east_node)?,
            west_driver: self.backends.drivers.driver_for(&west_node)?,
        };
        let plan = plan_from_record(&self.config, &record);
        let store = tasks::seed_teardown_store(
            &plan,
            (record.east.vn_id, record.east.vni),
            (record.west.vn_id, record.west.vni),
        )?;

        let orchestrator = Orchestrator::new(format!("delete-{}", record.name));
        match orchestrator
            .teardown(tasks::delete_graph(&participants, self.retry()), store)
            .await
        {
            Ok(_) => match self.slicings.delete(record.id).await {
                Ok(()) => {
                    info!(slicing = %record.name, id = %record.id, "slicing deleted");
                    Ok(())
                }
                Err(e) => {
                    // remote side is gone; the record must not stay ACTIVE
                    warn!(slicing = %record.name, error = %e, "record removal failed, marking inactive");
                    let inactive = SlicingUpdate {
                        state: Some(LifecycleState::Inactive),
                    };
                    if let Err(mark) = self.slicings.update(record.id, inactive).await {
                        error!(slicing = %record.name, error = %mark, "cannot mark record inactive");
                    }
                    Err(e)
                }
            },
            Err(failure) => {
                warn!(
                    slicing = %record.name,
                    failed_task = %failure.failed_task,
                    completed = ?failure.completed,
                    error = %failure.cause,
                    "teardown incomplete, marking inactive"
                );
                self.slicings
                    .update(
                        record.id,
                        SlicingUpdate {
                            state: Some(LifecycleState::Inactive),
                        },
                    )
                    .await?;
                Err(CoreError::TeardownIncomplete {
                    slicing: record.name.clone(),
                    failed_task: failure.failed_task,
                    cause: Box::new(failure.cause),
                })
            }
        }
    }
}

async fn used_on_both(east: &Leg, west: &Leg) -> Result<(UsedIdentifiers, UsedIdentifiers), CoreError> {
    let ue = east.driver.used_identifiers().await?;
    let uw = west.driver.used_identifiers().await?;
    Ok((ue, uw))
}

/// RD/RT and bridge domain for the WAN and access VPN of one site.
fn splice_identifiers(
    ids: &mut IdentifierAllocator,
    config: &CoreConfig,
    used_east: &UsedIdentifiers,
    used_west: &UsedIdentifiers,
) -> Result<SpliceIdentifiers, CoreError> {
    let mut vpn = || -> Result<VpnIdentifiers, CoreError> {
        Ok(VpnIdentifiers {
            route_distinguisher: ids.route_distinguisher()?,
            route_target: ids.route_target()?,
            bridge_domain: ids.allocate(
                POOL_BRIDGE_DOMAIN,
                config.allocation.bridge_domain,
                &used_east.bridge_domains,
                &used_west.bridge_domains,
            )?,
        })
    };
    Ok(SpliceIdentifiers {
        wan_vpn: vpn()?,
        access_vpn: vpn()?,
    })
}

fn as_number(node: &WanNode) -> Result<u32, CoreError> {
    node.as_number.ok_or_else(|| CoreError::Validation {
        message: format!("WAN node '{}' has no AS number", node.name),
    })
}

/// Roll back a flow whose remote steps all succeeded but whose result
/// could not be recorded.
async fn undo(completed: CompletedFlow, step: &str, cause: CoreError) -> CoreError {
    warn!(step, error = %cause, "recording failed, rolling back");
    let unreverted = completed.rollback().await;
    CoreError::PartialProvisioningFailure {
        failed_task: step.to_owned(),
        cause: Box::new(cause),
        unreverted,
    }
}

fn build_record(
    plan: &SlicingPlan,
    east: &Leg,
    west: &Leg,
    store: &ProvisioningStore,
) -> Result<SlicingRecord, CoreError> {
    let leg = |side: Side, leg: &Leg| -> Result<LegRecord, CoreError> {
        let p = plan.leg(side);
        Ok(LegRecord {
            site_id: leg.site.id,
            wan_node_id: leg.node.id,
            subnet_cidr: p.subnet_cidr.clone(),
            allocation_pool: p.allocation_pool.clone(),
            vn_name: plan.names.vn.clone(),
            vn_id: store.get(side.vn_id_key())?,
            vni: store.get_opt(side.vni_key())?,
            vn_route_target: p.vn_route_target.clone(),
        })
    };
    let now = Utc::now();
    Ok(SlicingRecord {
        id: Uuid::new_v4(),
        name: plan.name.clone(),
        state: LifecycleState::Active,
        created_at: now,
        updated_at: now,
        east: leg(Side::East, east)?,
        west: leg(Side::West, west)?,
        detail: plan.detail.clone(),
    })
}

fn plan_from_record(config: &CoreConfig, record: &SlicingRecord) -> SlicingPlan {
    let leg = |l: &LegRecord| LegPlan {
        subnet_cidr: l.subnet_cidr.clone(),
        allocation_pool: l.allocation_pool.clone(),
        vn_route_target: l.vn_route_target.clone(),
    };
    SlicingPlan {
        name: record.name.clone(),
        names: SlicingNames::for_record(&config.naming, record),
        detail: record.detail.clone(),
        east: leg(&record.east),
        west: leg(&record.west),
    }
}
