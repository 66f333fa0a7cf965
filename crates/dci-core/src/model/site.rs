// ── Site domain type ──

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LifecycleState;

/// A data center: one SDN controller project plus its WAN edge nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub sdn: SdnControllerProfile,
    /// WAN nodes in preference order; the first one is used unless a
    /// request names another.
    #[serde(default)]
    pub wan_nodes: Vec<Uuid>,
    #[serde(default)]
    pub state: LifecycleState,
}

/// How to reach the site's Tungsten Fabric API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdnControllerProfile {
    pub host: String,
    #[serde(default = "default_vnc_port")]
    pub port: u16,
    /// OpenStack project (TF project) every DCI object lives in.
    pub project: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, serialize_with = "super::secret::option::serialize")]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub tls: bool,
}

fn default_vnc_port() -> u16 {
    8082
}

impl SdnControllerProfile {
    /// API server root, e.g. `http://10.0.0.5:8082`.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}
