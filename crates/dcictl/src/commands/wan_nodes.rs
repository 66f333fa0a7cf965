//! WAN node command handlers.

use std::time::Duration;

use tabled::Tabled;

use dci_core::{InventoryRepository, SlicingFilter, WanNode};

use crate::cli::{GlobalOpts, WanNodesArgs, WanNodesCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct WanNodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Roles")]
    roles: String,
    #[tabled(rename = "AS")]
    as_number: String,
    #[tabled(rename = "State")]
    state: String,
}

fn roles(node: &WanNode) -> String {
    node.roles.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn row(node: &WanNode, color: bool) -> WanNodeRow {
    let endpoint = node.connection.endpoint();
    WanNodeRow {
        id: node.id.to_string(),
        name: node.name.clone(),
        vendor: node.vendor.to_string(),
        mode: node.connection.mode().to_string(),
        host: format!("{}:{}", endpoint.host, endpoint.port),
        roles: roles(node),
        as_number: node.as_number.map(|n| n.to_string()).unwrap_or_default(),
        state: output::paint_state(node.state, color),
    }
}

fn detail(node: &WanNode) -> String {
    let endpoint = node.connection.endpoint();
    let p = &node.presets;
    let mut pairs = vec![
        ("ID", node.id.to_string()),
        ("Name", node.name.clone()),
        ("State", node.state.to_string()),
        ("Vendor", node.vendor.to_string()),
        ("Mode", node.connection.mode().to_string()),
        ("Endpoint", format!("{}@{}:{}", endpoint.username, endpoint.host, endpoint.port)),
        ("Roles", roles(node)),
    ];
    if let Some(asn) = node.as_number {
        pairs.push(("AS Number", asn.to_string()));
    }
    for (key, value) in [
        ("SRv6 Locator", &p.srv6_locator),
        ("SRv6 Locator Arg", &p.srv6_locator_arg),
        ("NVE Interface", &p.vxlan_nve_interface),
        ("NVE Address", &p.vxlan_nve_address),
        ("NVE Peer", &p.vxlan_nve_peer_address),
        ("WAN BD Interface", &p.wan_vpn_bd_interface),
        ("Access BD Interface", &p.access_vpn_bd_interface),
    ] {
        if let Some(v) = value {
            pairs.push((key, v.clone()));
        }
    }
    output::detail_block(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: WanNodesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let inventory: &dyn InventoryRepository = ctx.store.as_ref();
    match args.command {
        WanNodesCommand::List { site } => {
            let mut nodes = inventory.wan_nodes().await?;
            if let Some(site) = site {
                let site = util::resolve_site(inventory, &site).await?;
                nodes.retain(|n| site.wan_nodes.contains(&n.id));
            }
            let color = output::should_color(&global.color);
            let out = output::render_list(&global.output, &nodes, |n| row(n, color), |n| n.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        WanNodesCommand::Show { node } => {
            let node = util::resolve_wan_node(inventory, &node).await?;
            let out = output::render_single(&global.output, &node, detail, |n| n.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        WanNodesCommand::Ping { node, timeout } => {
            let node = util::resolve_wan_node(inventory, &node).await?;
            tokio::time::timeout(Duration::from_secs(timeout), ctx.manager.ping_wan_node(node.id))
                .await
                .map_err(|_| CliError::Timeout { seconds: timeout })??;
            if !global.quiet {
                eprintln!("✓ WAN node '{}' ({}) is reachable", node.name, node.host());
            }
            Ok(())
        }

        WanNodesCommand::Remove { node } => {
            let node = util::resolve_wan_node(inventory, &node).await?;
            let users: Vec<String> = ctx
                .manager
                .list_slicings(&SlicingFilter::default())
                .await?
                .into_iter()
                .filter(|r| r.east.wan_node_id == node.id || r.west.wan_node_id == node.id)
                .map(|r| r.name)
                .collect();
            if !users.is_empty() {
                return Err(CliError::Conflict {
                    message: format!("WAN node '{}' is used by slicings: {}", node.name, users.join(", ")),
                });
            }
            if !util::confirm(&format!("Remove WAN node '{}'?", node.name), global.yes, "wan-nodes remove")? {
                return Ok(());
            }
            ctx.store.remove_wan_node(node.id).await?;
            if !global.quiet {
                eprintln!("✓ WAN node '{}' removed", node.name);
            }
            Ok(())
        }
    }
}
