// ── Driver dispatch ──
//
// Drivers are picked by (vendor, configure mode). A factory gets the node
// and the shared connectors and returns a driver bound to that node; no
// sessions or credentials outlive the call that uses them.

use std::collections::HashMap;
use std::sync::Arc;

use dci_api::netconf::TcpNetconfConnector;
use dci_api::sshcli::TcpCliConnector;
use dci_api::{CliConnector, CliDialect, CliTarget, NetconfConnector, NetconfTarget};
use tracing::debug;

use crate::config::DeviceConfig;
use crate::device::driver::DeviceDriver;
use crate::device::mx::MxDriver;
use crate::device::netengine::NetEngineDriver;
use crate::device::transaction::{CliExecutor, NetconfExecutor};
use crate::error::CoreError;
use crate::model::{ConfigureMode, ConnectionProfile, Vendor, WanNode};

/// Hands out a driver for a WAN node.
pub trait DriverProvider: Send + Sync {
    fn driver_for(&self, node: &WanNode) -> Result<Arc<dyn DeviceDriver>, CoreError>;
}

/// Everything a factory may need besides the node itself.
#[derive(Clone)]
pub struct DriverContext {
    pub netconf: Arc<dyn NetconfConnector>,
    pub cli: Arc<dyn CliConnector>,
    pub cli_error_marker: String,
}

impl DriverContext {
    pub fn netconf_executor(&self, node: &WanNode) -> NetconfExecutor {
        let e = node.connection.endpoint();
        NetconfExecutor::new(
            Arc::clone(&self.netconf),
            NetconfTarget {
                host: e.host.clone(),
                port: e.port,
                username: e.username.clone(),
                password: e.password.clone(),
            },
        )
    }

    pub fn cli_executor(&self, node: &WanNode, dialect: CliDialect, extra_markers: &[&str]) -> CliExecutor {
        let (endpoint, enable_secret) = match &node.connection {
            ConnectionProfile::SshCli(c) => (&c.endpoint, c.enable_secret.clone()),
            ConnectionProfile::Netconf(e) => (e, None),
        };
        let mut markers = vec![self.cli_error_marker.clone()];
        markers.extend(extra_markers.iter().map(|m| (*m).to_owned()));
        CliExecutor::new(
            Arc::clone(&self.cli),
            CliTarget {
                host: endpoint.host.clone(),
                port: endpoint.port,
                username: endpoint.username.clone(),
                password: endpoint.password.clone(),
                enable_secret,
                dialect,
            },
            markers,
        )
    }
}

pub type DriverFactory = fn(&WanNode, &DriverContext) -> Arc<dyn DeviceDriver>;

fn netengine_netconf(node: &WanNode, ctx: &DriverContext) -> Arc<dyn DeviceDriver> {
    Arc::new(NetEngineDriver::netconf(node.clone(), ctx.netconf_executor(node)))
}

fn netengine_cli(node: &WanNode, ctx: &DriverContext) -> Arc<dyn DeviceDriver> {
    let executor = ctx.cli_executor(node, CliDialect::huawei_vrp(), &[]);
    Arc::new(NetEngineDriver::cli(node.clone(), executor))
}

fn mx_cli(node: &WanNode, ctx: &DriverContext) -> Arc<dyn DeviceDriver> {
    let executor = ctx.cli_executor(node, CliDialect::junos(), &["error:"]);
    Arc::new(MxDriver::new(node.clone(), executor))
}

pub struct DriverRegistry {
    factories: HashMap<(Vendor, ConfigureMode), DriverFactory>,
    context: DriverContext,
}

impl DriverRegistry {
    /// Built-in drivers over the given connectors.
    pub fn new(context: DriverContext) -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
            context,
        };
        registry.register(Vendor::Huawei, ConfigureMode::Netconf, netengine_netconf);
        registry.register(Vendor::Huawei, ConfigureMode::SshCli, netengine_cli);
        registry.register(Vendor::Juniper, ConfigureMode::SshCli, mx_cli);
        registry
    }

    /// Built-in drivers over the framed TCP transports in `dci-api`.
    pub fn tcp(device: &DeviceConfig) -> Self {
        let transport = device.transport();
        Self::new(DriverContext {
            netconf: Arc::new(TcpNetconfConnector::new(&transport)),
            cli: Arc::new(TcpCliConnector::new(&transport)),
            cli_error_marker: device.cli_error_marker.clone(),
        })
    }

    pub fn register(&mut self, vendor: Vendor, mode: ConfigureMode, factory: DriverFactory) {
        self.factories.insert((vendor, mode), factory);
    }

    pub fn supports(&self, vendor: Vendor, mode: ConfigureMode) -> bool {
        self.factories.contains_key(&(vendor, mode))
    }
}

impl DriverProvider for DriverRegistry {
    fn driver_for(&self, node: &WanNode) -> Result<Arc<dyn DeviceDriver>, CoreError> {
        let mode = node.connection.mode();
        let factory = self.factories.get(&(node.vendor, mode)).ok_or_else(|| {
            CoreError::UnsupportedCapability {
                device: node.name.clone(),
                capability: format!("{} over {mode}", node.vendor),
            }
        })?;
        debug!(node = %node.name, vendor = %node.vendor, %mode, "driver selected");
        Ok(factory(node, &self.context))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use secrecy::SecretString;
    use uuid::Uuid;

    use super::*;
    use crate::model::{CliEndpoint, DeviceEndpoint, LifecycleState, WanNodePresets};

    fn node(vendor: Vendor, connection: ConnectionProfile) -> WanNode {
        WanNode {
            id: Uuid::new_v4(),
            name: "n1".into(),
            vendor,
            connection,
            presets: WanNodePresets::default(),
            roles: BTreeSet::new(),
            as_number: None,
            state: LifecycleState::Active,
        }
    }

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint {
            host: "192.0.2.9".into(),
            port: 22,
            username: "u".into(),
            password: SecretString::from("p"),
        }
    }

    #[test]
    fn dispatch_by_vendor_and_mode() {
        let registry = DriverRegistry::tcp(&DeviceConfig::default());

        let mx = node(
            Vendor::Juniper,
            ConnectionProfile::SshCli(CliEndpoint {
                endpoint: endpoint(),
                enable_secret: None,
            }),
        );
        assert_eq!(registry.driver_for(&mx).unwrap().vendor(), Vendor::Juniper);

        let ne = node(Vendor::Huawei, ConnectionProfile::Netconf(endpoint()));
        let driver = registry.driver_for(&ne).unwrap();
        assert_eq!(driver.vendor(), Vendor::Huawei);
        assert_eq!(driver.node().name, "n1");

        let unsupported = node(Vendor::Juniper, ConnectionProfile::Netconf(endpoint()));
        assert!(matches!(
            registry.driver_for(&unsupported),
            Err(CoreError::UnsupportedCapability { .. })
        ));
    }
}
