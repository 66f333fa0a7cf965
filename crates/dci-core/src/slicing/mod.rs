// ── Network slicing ──
//
// `params` validates requests, `naming` derives remote object names,
// `tasks` holds the saga steps and `manager` drives whole flows.

pub mod manager;
pub mod naming;
pub mod params;
pub mod tasks;

pub use manager::{Backends, NetworkSlicingManager};
pub use naming::SlicingNames;
pub use params::{CreateSlicingParams, KindParams, LegParams, MAX_VPN_INSTANCE_NAME};
pub use tasks::{FlowParticipants, LegPlan, RetryPolicy, Side, SlicingPlan};
