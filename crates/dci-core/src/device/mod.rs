// ── WAN node configuration ──
//
// `transaction` owns the NETCONF / SSH-CLI push semantics; vendor drivers
// only render templates and pick an executor; `registry` maps a node's
// (vendor, configure mode) to a driver.

pub mod driver;
pub mod mx;
pub mod netengine;
pub mod registry;
pub mod transaction;

pub use driver::{
    Action, ConfigTemplate, DeviceDriver, L2DciTemplate, L3DciTemplate, L3vpnTemplate, NodeRole,
    SpliceTemplate, UsedIdentifiers, VpnInstance,
};
pub use registry::{DriverContext, DriverFactory, DriverProvider, DriverRegistry};
pub use transaction::{
    ApplyOutcome, CliExecutor, NetconfExecutor, Operation, TransactionDescriptor,
    TransactionExecutor,
};
