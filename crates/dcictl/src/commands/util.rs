//! Shared helpers for command handlers.

use std::path::Path;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use dci_core::{InventoryRepository, NetworkSlicingManager, Site, SlicingRecord, WanNode};

use crate::error::CliError;

/// Resolve a site by UUID or exact name.
pub async fn resolve_site(inventory: &dyn InventoryRepository, identifier: &str) -> Result<Site, CliError> {
    if let Ok(id) = identifier.parse::<Uuid>() {
        return Ok(inventory.site(id).await?);
    }
    inventory
        .sites()
        .await?
        .into_iter()
        .find(|s| s.name == identifier)
        .ok_or_else(|| CliError::not_found("site", identifier, "sites list"))
}

/// Resolve a WAN node by UUID or exact name.
pub async fn resolve_wan_node(
    inventory: &dyn InventoryRepository,
    identifier: &str,
) -> Result<WanNode, CliError> {
    if let Ok(id) = identifier.parse::<Uuid>() {
        return Ok(inventory.wan_node(id).await?);
    }
    inventory
        .wan_nodes()
        .await?
        .into_iter()
        .find(|n| n.name == identifier)
        .ok_or_else(|| CliError::not_found("WAN node", identifier, "wan-nodes list"))
}

/// Resolve a slicing by UUID or name.
pub async fn resolve_slicing(
    manager: &NetworkSlicingManager,
    identifier: &str,
) -> Result<SlicingRecord, CliError> {
    let record = match identifier.parse::<Uuid>() {
        Ok(id) => manager.get_slicing(id).await?,
        Err(_) => manager.find_slicing(identifier).await?,
    };
    Ok(record)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool, action: &str) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read a YAML or JSON document (YAML parses both).
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}
