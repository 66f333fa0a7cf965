// dci-api: Async clients for the remote systems a DCI controller drives.
//
// Three surfaces live here, all transport-only (no provisioning policy):
//
// - `vnc`     Tungsten Fabric VNC REST API (virtual networks, IPAM)
// - `netconf` NETCONF session abstraction, RPC rendering, EOM-framed TCP session
// - `sshcli`  interactive CLI session abstraction and a line-oriented TCP session

pub mod error;
pub mod netconf;
pub mod sshcli;
pub mod transport;
pub mod vnc;

pub use error::Error;
pub use netconf::{
    Datastore, DefaultOperation, EditConfig, ErrorOption, NetconfConnector, NetconfSession,
    NetconfTarget, RpcReply, TestOption,
};
pub use sshcli::{CliConnector, CliDialect, CliSession, CliTarget};
pub use transport::{TlsMode, TransportConfig};
pub use vnc::{VncAuth, VncClient};
