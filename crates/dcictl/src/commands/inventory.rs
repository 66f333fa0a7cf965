//! Inventory import: sites and WAN nodes into the state file.

use std::collections::HashSet;

use serde::Deserialize;
use uuid::Uuid;

use dci_core::{InventoryRepository, Site, WanNode};

use crate::cli::{GlobalOpts, InventoryArgs, InventoryCommand};
use crate::config::Context;
use crate::error::CliError;

/// Inventory file layout. Either list may be omitted.
#[derive(Debug, Default, Deserialize)]
struct InventoryDocument {
    #[serde(default)]
    sites: Vec<Site>,
    #[serde(default)]
    wan_nodes: Vec<WanNode>,
}

/// Every node a site refers to must exist after the import.
fn check_references(doc: &InventoryDocument, known_nodes: &HashSet<Uuid>) -> Result<(), CliError> {
    let mut names = HashSet::new();
    for site in &doc.sites {
        if !names.insert(site.name.as_str()) {
            return Err(CliError::Validation {
                field: "sites".into(),
                reason: format!("site name '{}' appears twice", site.name),
            });
        }
        if let Some(missing) = site.wan_nodes.iter().find(|id| !known_nodes.contains(id)) {
            return Err(CliError::Validation {
                field: format!("sites.{}.wan_nodes", site.name),
                reason: format!("unknown WAN node {missing}"),
            });
        }
    }
    Ok(())
}

pub async fn handle(ctx: &Context, args: InventoryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        InventoryCommand::Import { file } => {
            let doc: InventoryDocument = super::util::read_document(&file)?;

            let inventory: &dyn InventoryRepository = ctx.store.as_ref();
            let mut known: HashSet<Uuid> = inventory.wan_nodes().await?.iter().map(|n| n.id).collect();
            known.extend(doc.wan_nodes.iter().map(|n| n.id));
            check_references(&doc, &known)?;

            let (mut added, mut replaced) = (0usize, 0usize);
            for node in doc.wan_nodes {
                tracing::debug!(node = %node.name, id = %node.id, "importing WAN node");
                if ctx.store.upsert_wan_node(node).await? {
                    added += 1;
                } else {
                    replaced += 1;
                }
            }
            for site in doc.sites {
                tracing::debug!(site = %site.name, id = %site.id, "importing site");
                if ctx.store.upsert_site(site).await? {
                    added += 1;
                } else {
                    replaced += 1;
                }
            }

            tracing::info!(added, replaced, state = %ctx.store.path().display(), "inventory imported");
            if !global.quiet {
                eprintln!(
                    "✓ Imported into {}: {added} added, {replaced} replaced",
                    ctx.store.path().display()
                );
            }
            Ok(())
        }
    }
}
