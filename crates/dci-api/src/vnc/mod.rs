// Tungsten Fabric VNC REST API client.

mod client;
pub mod models;
mod virtual_networks;

pub use client::{VncAuth, VncClient};
pub use models::{ForwardingMode, VirtualNetwork, VirtualNetworkSpec};
