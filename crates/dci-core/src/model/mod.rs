// ── Domain model ──
//
// Inventory (sites, WAN nodes) is read-only to the core; slicing records
// are the only thing the core writes back.

pub mod secret;
pub mod site;
pub mod slicing;
pub mod wan_node;

use serde::{Deserialize, Serialize};

pub use site::{SdnControllerProfile, Site};
pub use slicing::{
    LegRecord, RoutingType, SlicingDetail, SlicingFilter, SlicingKind, SlicingRecord,
    SpliceIdentifiers, VpnIdentifiers,
};
pub use wan_node::{
    CliEndpoint, ConfigureMode, ConnectionProfile, DeviceEndpoint, Vendor, WanNode,
    WanNodePresets, WanNodeRole,
};

/// Lifecycle of inventory objects and slicing records.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LifecycleState {
    #[default]
    Active,
    Inactive,
}
