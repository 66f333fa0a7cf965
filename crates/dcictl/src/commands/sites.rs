//! Site command handlers.

use std::time::Duration;

use tabled::Tabled;

use dci_core::{InventoryRepository, Site, SlicingFilter};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Controller")]
    controller: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "WAN Nodes")]
    wan_nodes: usize,
    #[tabled(rename = "State")]
    state: String,
}

fn row(site: &Site, color: bool) -> SiteRow {
    SiteRow {
        id: site.id.to_string(),
        name: site.name.clone(),
        controller: site.sdn.base_url(),
        project: site.sdn.project.clone(),
        wan_nodes: site.wan_nodes.len(),
        state: output::paint_state(site.state, color),
    }
}

fn detail(site: &Site, node_names: &[String]) -> String {
    output::detail_block(&[
        ("ID", site.id.to_string()),
        ("Name", site.name.clone()),
        ("State", site.state.to_string()),
        ("Controller", site.sdn.base_url()),
        ("Project", site.sdn.project.clone()),
        (
            "User",
            site.sdn.username.clone().unwrap_or_else(|| "(profile default)".into()),
        ),
        ("WAN Nodes", node_names.join(", ")),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: SitesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let inventory: &dyn InventoryRepository = ctx.store.as_ref();
    match args.command {
        SitesCommand::List => {
            let sites = inventory.sites().await?;
            let color = output::should_color(&global.color);
            let out = output::render_list(&global.output, &sites, |s| row(s, color), |s| s.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Show { site } => {
            let site = util::resolve_site(inventory, &site).await?;
            let mut names = Vec::with_capacity(site.wan_nodes.len());
            for id in &site.wan_nodes {
                names.push(match inventory.wan_node(*id).await {
                    Ok(node) => node.name,
                    Err(_) => format!("{id} (missing)"),
                });
            }
            let out = output::render_single(&global.output, &site, |s| detail(s, &names), |s| s.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Ping { site, timeout } => {
            let site = util::resolve_site(inventory, &site).await?;
            tokio::time::timeout(Duration::from_secs(timeout), ctx.manager.ping_site(site.id))
                .await
                .map_err(|_| CliError::Timeout { seconds: timeout })??;
            if !global.quiet {
                eprintln!("✓ SDN controller for '{}' is reachable", site.name);
            }
            Ok(())
        }

        SitesCommand::Remove { site } => {
            let site = util::resolve_site(inventory, &site).await?;
            let referencing = referencing_slicings(ctx, &site).await?;
            if !referencing.is_empty() {
                return Err(CliError::Conflict {
                    message: format!(
                        "site '{}' is used by slicings: {}",
                        site.name,
                        referencing.join(", ")
                    ),
                });
            }
            if !util::confirm(&format!("Remove site '{}'?", site.name), global.yes, "sites remove")? {
                return Ok(());
            }
            ctx.store.remove_site(site.id).await?;
            if !global.quiet {
                eprintln!("✓ Site '{}' removed", site.name);
            }
            Ok(())
        }
    }
}

async fn referencing_slicings(ctx: &Context, site: &Site) -> Result<Vec<String>, CliError> {
    let mut names = Vec::new();
    for filter in [
        SlicingFilter {
            east_site: Some(site.id),
            ..SlicingFilter::default()
        },
        SlicingFilter {
            west_site: Some(site.id),
            ..SlicingFilter::default()
        },
    ] {
        for record in ctx.manager.list_slicings(&filter).await? {
            if !names.contains(&record.name) {
                names.push(record.name);
            }
        }
    }
    Ok(names)
}
