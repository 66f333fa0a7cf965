//! Slicing command handlers.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tabled::Tabled;
use uuid::Uuid;

use dci_core::{
    CreateSlicingParams, InventoryRepository, KindParams, LegParams, LegRecord, LifecycleState,
    RoutingType, SlicingDetail, SlicingFilter, SlicingKind, SlicingRecord,
};

use crate::cli::{
    CreateSlicingArgs, GlobalOpts, KindArg, RoutingTypeArg, SlicingsArgs, SlicingsCommand, StateArg,
};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Arg conversions ─────────────────────────────────────────────────

impl From<KindArg> for SlicingKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::EvpnVplsSrv6Be => Self::EvpnVplsSrv6Be,
            KindArg::L2EvpnDci => Self::L2EvpnDci,
            KindArg::L3EvpnDci => Self::L3EvpnDci,
            KindArg::L3vpnSrv6 => Self::L3vpnSrv6,
        }
    }
}

impl From<StateArg> for LifecycleState {
    fn from(s: StateArg) -> Self {
        match s {
            StateArg::Active => Self::Active,
            StateArg::Inactive => Self::Inactive,
        }
    }
}

impl From<RoutingTypeArg> for RoutingType {
    fn from(r: RoutingTypeArg) -> Self {
        match r {
            RoutingTypeArg::Be => Self::Be,
            RoutingTypeArg::Te => Self::Te,
        }
    }
}

/// `--from-file` document: the create request plus the two sites.
#[derive(Debug, Deserialize)]
struct SlicingRequest {
    east_site: String,
    west_site: String,
    #[serde(flatten)]
    params: CreateSlicingParams,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SlicingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "East")]
    east: String,
    #[tabled(rename = "West")]
    west: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Created")]
    created: String,
}

/// Site and node names for display; falls back to the UUID.
struct Names(HashMap<Uuid, String>);

impl Names {
    async fn load(inventory: &dyn InventoryRepository) -> Result<Self, CliError> {
        let mut map = HashMap::new();
        for site in inventory.sites().await? {
            map.insert(site.id, site.name);
        }
        for node in inventory.wan_nodes().await? {
            map.insert(node.id, node.name);
        }
        Ok(Self(map))
    }

    fn of(&self, id: Uuid) -> String {
        self.0.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }
}

fn row(record: &SlicingRecord, names: &Names, color: bool) -> SlicingRow {
    SlicingRow {
        id: record.id.to_string(),
        name: record.name.clone(),
        kind: record.kind().to_string(),
        east: names.of(record.east.site_id),
        west: names.of(record.west.site_id),
        state: output::paint_state(record.state, color),
        created: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn leg_pairs(side: &'static str, leg: &LegRecord, names: &Names) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        (side, format!("{} via {}", names.of(leg.site_id), names.of(leg.wan_node_id))),
        ("  Subnet", leg.subnet_cidr.clone()),
        ("  VN", format!("{} ({})", leg.vn_name, leg.vn_id)),
    ];
    if let Some(pool) = &leg.allocation_pool {
        pairs.push(("  Pool", pool.clone()));
    }
    if let Some(vni) = leg.vni {
        pairs.push(("  VNI", vni.to_string()));
    }
    if let Some(rt) = &leg.vn_route_target {
        pairs.push(("  VN Route Target", rt.clone()));
    }
    pairs
}

fn detail(record: &SlicingRecord, names: &Names) -> String {
    let mut pairs = vec![
        ("ID", record.id.to_string()),
        ("Name", record.name.clone()),
        ("Kind", record.kind().to_string()),
        ("State", record.state.to_string()),
        ("Created", record.created_at.to_rfc3339()),
        ("Updated", record.updated_at.to_rfc3339()),
    ];
    pairs.extend(leg_pairs("East", &record.east, names));
    pairs.extend(leg_pairs("West", &record.west, names));

    match &record.detail {
        SlicingDetail::EvpnVplsSrv6Be {
            splicing_vlan_id,
            east,
            west,
        } => {
            pairs.push(("Splicing VLAN", splicing_vlan_id.to_string()));
            for (label, ids) in [
                ("East WAN VPN", &east.wan_vpn),
                ("East Access VPN", &east.access_vpn),
                ("West WAN VPN", &west.wan_vpn),
                ("West Access VPN", &west.access_vpn),
            ] {
                pairs.push((
                    label,
                    format!(
                        "rd {} rt {} bd {}",
                        ids.route_distinguisher, ids.route_target, ids.bridge_domain
                    ),
                ));
            }
        }
        SlicingDetail::L2EvpnDci {
            inter_vlan_id,
            dci_vni,
        } => {
            pairs.push(("Inter VLAN", inter_vlan_id.to_string()));
            pairs.push(("DCI VNI", dci_vni.to_string()));
        }
        SlicingDetail::L3EvpnDci => {}
        SlicingDetail::L3vpnSrv6 {
            routing_type,
            route_target,
            opcode,
            east_route_distinguisher,
            west_route_distinguisher,
        } => {
            pairs.push(("Routing Type", routing_type.to_string()));
            pairs.push(("Route Target", route_target.clone()));
            pairs.push(("Opcode", opcode.to_string()));
            pairs.push(("Ingress RD", east_route_distinguisher.clone()));
            pairs.push(("Egress RD", west_route_distinguisher.clone()));
        }
    }
    output::detail_block(&pairs)
}

fn spinner(message: String, global: &GlobalOpts) -> Option<ProgressBar> {
    if global.quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    Some(bar)
}

// ── Create request assembly ─────────────────────────────────────────

async fn node_id(
    inventory: &dyn InventoryRepository,
    identifier: Option<&str>,
) -> Result<Option<Uuid>, CliError> {
    match identifier {
        Some(i) => Ok(Some(util::resolve_wan_node(inventory, i).await?.id)),
        None => Ok(None),
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String, CliError> {
    value.ok_or_else(|| CliError::Validation {
        field: flag.into(),
        reason: "required".into(),
    })
}

async fn request_from_args(
    inventory: &dyn InventoryRepository,
    args: CreateSlicingArgs,
) -> Result<SlicingRequest, CliError> {
    if let Some(path) = &args.from_file {
        return util::read_document(path);
    }

    let kind = match args.kind.map(SlicingKind::from) {
        Some(SlicingKind::EvpnVplsSrv6Be) => KindParams::EvpnVplsSrv6Be,
        Some(SlicingKind::L2EvpnDci) => KindParams::L2EvpnDci,
        Some(SlicingKind::L3EvpnDci) => KindParams::L3EvpnDci,
        Some(SlicingKind::L3vpnSrv6) => KindParams::L3vpnSrv6 {
            routing_type: args.routing_type.into(),
            route_target: args.route_target.ok_or_else(|| CliError::Validation {
                field: "route-target".into(),
                reason: "required for l3vpn-srv6 slicings".into(),
            })?,
        },
        None => {
            return Err(CliError::Validation {
                field: "kind".into(),
                reason: "required".into(),
            });
        }
    };

    let east = LegParams {
        subnet_cidr: required(args.east_subnet, "east-subnet")?,
        allocation_pool: args.east_pool,
        wan_node: node_id(inventory, args.east_node.as_deref()).await?,
    };
    let west = LegParams {
        subnet_cidr: required(args.west_subnet, "west-subnet")?,
        allocation_pool: args.west_pool,
        wan_node: node_id(inventory, args.west_node.as_deref()).await?,
    };

    Ok(SlicingRequest {
        east_site: required(args.east, "east")?,
        west_site: required(args.west, "west")?,
        params: CreateSlicingParams {
            name: required(args.name, "name")?,
            kind,
            east,
            west,
        },
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SlicingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let inventory: &dyn InventoryRepository = ctx.store.as_ref();
    match args.command {
        SlicingsCommand::List {
            state,
            kind,
            east,
            west,
        } => {
            let mut filter = SlicingFilter {
                state: state.map(Into::into),
                kind: kind.map(Into::into),
                ..SlicingFilter::default()
            };
            if let Some(east) = east {
                filter.east_site = Some(util::resolve_site(inventory, &east).await?.id);
            }
            if let Some(west) = west {
                filter.west_site = Some(util::resolve_site(inventory, &west).await?.id);
            }

            let records = ctx.manager.list_slicings(&filter).await?;
            let names = Names::load(inventory).await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &records,
                |r| row(r, &names, color),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SlicingsCommand::Show { slicing } => {
            let record = util::resolve_slicing(&ctx.manager, &slicing).await?;
            let names = Names::load(inventory).await?;
            let out = output::render_single(&global.output, &record, |r| detail(r, &names), |r| r.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SlicingsCommand::Create(args) => {
            let request = request_from_args(inventory, args).await?;
            let east = util::resolve_site(inventory, &request.east_site).await?;
            let west = util::resolve_site(inventory, &request.west_site).await?;

            let bar = spinner(
                format!("Provisioning '{}' ({} ↔ {})", request.params.name, east.name, west.name),
                global,
            );
            let result = ctx.manager.create_slicing(&east, &west, request.params).await;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            let record = result?;

            let names = Names::load(inventory).await?;
            let out = output::render_single(&global.output, &record, |r| detail(r, &names), |r| r.id.to_string())?;
            output::print_output(&out, global.quiet);
            if !global.quiet {
                eprintln!("✓ Slicing '{}' created", record.name);
            }
            Ok(())
        }

        SlicingsCommand::Delete { slicing } => {
            let record = util::resolve_slicing(&ctx.manager, &slicing).await?;
            if !util::confirm(
                &format!("Tear down slicing '{}'? This removes remote configuration.", record.name),
                global.yes,
                "slicings delete",
            )? {
                return Ok(());
            }

            let bar = spinner(format!("Tearing down '{}'", record.name), global);
            let result = ctx.manager.delete_slicing(&record).await;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }
            result?;

            if !global.quiet {
                eprintln!("✓ Slicing '{}' deleted", record.name);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_file_flattens_create_params() {
        let req: SlicingRequest = serde_yaml::from_str(
            r"
east_site: dc-east
west_site: dc-west
name: blue
kind: l3vpn-srv6
routing_type: be
route_target: '65000:7'
east:
  subnet_cidr: 10.1.0.0/24
west:
  subnet_cidr: 10.2.0.0/24
  allocation_pool: 10.2.0.10,10.2.0.99
",
        )
        .unwrap();

        assert_eq!(req.east_site, "dc-east");
        assert_eq!(req.params.name, "blue");
        assert_eq!(
            req.params.kind,
            KindParams::L3vpnSrv6 {
                routing_type: RoutingType::Be,
                route_target: "65000:7".into(),
            }
        );
        assert_eq!(req.params.west.allocation_pool.as_deref(), Some("10.2.0.10,10.2.0.99"));
    }

    #[test]
    fn kind_args_map_to_core_kinds() {
        assert_eq!(SlicingKind::from(KindArg::L2EvpnDci), SlicingKind::L2EvpnDci);
        assert_eq!(LifecycleState::from(StateArg::Inactive), LifecycleState::Inactive);
    }
}
