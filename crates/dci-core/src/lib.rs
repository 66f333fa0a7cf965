//! Provisioning core for cross-site DCI and network slicing.
//!
//! Sits between `dci-api` (raw controller and device sessions) and the
//! `dcictl` binary:
//!
//! - **[`NetworkSlicingManager`]**: create/delete/list slicings. Resolves
//!   inventory, allocates identifiers against live device usage and runs the
//!   per-kind task graph.
//!
//! - **[`saga`]**: sequential [`Orchestrator`] with reverse-order
//!   compensation, plus the non-compensating teardown runner.
//!
//! - **[`device`]**: NETCONF and SSH-CLI transaction executors, vendor
//!   drivers (Huawei NetEngine, Juniper MX) and the `(vendor, mode)`
//!   dispatch table.
//!
//! - **[`allocator`]**: bounded VLAN / VNI / bridge-domain allocation and
//!   RD/RT generation.
//!
//! - **[`repository`]** / **[`store`]**: persistence seams and the bundled
//!   in-memory and JSON-file repositories.

pub mod allocator;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod repository;
pub mod retry;
pub mod saga;
pub mod sdn;
pub mod slicing;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use allocator::{IdRange, IdentifierAllocator};
pub use config::{
    AllocationConfig, CoreConfig, DeviceConfig, NamingConfig, SdnConfig, TlsVerification,
};
pub use error::CoreError;
pub use repository::{InventoryRepository, RecordLock, SlicingRepository, SlicingUpdate};
pub use saga::{CompletedFlow, Orchestrator, ProvisioningStore, Task, TaskOutputs};
pub use sdn::{SdnClient, SdnProvider};
pub use slicing::{Backends, CreateSlicingParams, KindParams, LegParams, NetworkSlicingManager};
pub use store::{FileStore, MemoryStore};

pub use model::{
    CliEndpoint, ConfigureMode, ConnectionProfile, DeviceEndpoint, LegRecord, LifecycleState,
    RoutingType, SdnControllerProfile, Site, SlicingDetail, SlicingFilter, SlicingKind,
    SlicingRecord, Vendor, WanNode, WanNodePresets, WanNodeRole,
};
