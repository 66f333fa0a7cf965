// ── SDN controller façade ──
//
// Tasks only need four things from a site's controller; everything else
// about the VNC API stays in dci-api.

use std::sync::Arc;

use async_trait::async_trait;
use dci_api::vnc::{VirtualNetworkSpec, VncAuth, VncClient};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::SdnConfig;
use crate::error::CoreError;
use crate::model::Site;

#[async_trait]
pub trait SdnClient: Send + Sync {
    /// Create a virtual network; returns the controller-assigned UUID.
    async fn create_virtual_network(&self, spec: &VirtualNetworkSpec) -> Result<Uuid, CoreError>;

    async fn virtual_network_vni(&self, id: Uuid) -> Result<u32, CoreError>;

    /// Delete by name. `Ok(false)` when the network was already gone.
    async fn delete_virtual_network(&self, name: &str) -> Result<bool, CoreError>;

    /// Cheap authenticated round-trip.
    async fn ping(&self) -> Result<(), CoreError>;
}

/// Builds a client for a site's controller profile.
pub trait SdnProvider: Send + Sync {
    fn client_for(&self, site: &Site) -> Result<Arc<dyn SdnClient>, CoreError>;
}

pub struct VncSdnClient {
    inner: VncClient,
}

impl VncSdnClient {
    pub fn new(inner: VncClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SdnClient for VncSdnClient {
    async fn create_virtual_network(&self, spec: &VirtualNetworkSpec) -> Result<Uuid, CoreError> {
        Ok(self.inner.create_virtual_network(spec).await?)
    }

    async fn virtual_network_vni(&self, id: Uuid) -> Result<u32, CoreError> {
        Ok(self.inner.virtual_network_vni(id).await?)
    }

    async fn delete_virtual_network(&self, name: &str) -> Result<bool, CoreError> {
        Ok(self.inner.delete_virtual_network(name).await?)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        let id = self.inner.project_uuid().await?;
        debug!(project = self.inner.project(), %id, "controller reachable");
        Ok(())
    }
}

/// One fresh [`VncClient`] per site, built from the site's profile.
pub struct VncSdnProvider {
    config: SdnConfig,
}

impl VncSdnProvider {
    pub fn new(config: SdnConfig) -> Self {
        Self { config }
    }
}

impl SdnProvider for VncSdnProvider {
    fn client_for(&self, site: &Site) -> Result<Arc<dyn SdnClient>, CoreError> {
        let profile = &site.sdn;
        let base_url = Url::parse(&profile.base_url()).map_err(|e| CoreError::Validation {
            message: format!("site '{}' has an invalid controller address: {e}", site.name),
        })?;
        let auth = match (&profile.username, &profile.password) {
            (Some(username), Some(password)) => VncAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => VncAuth::None,
        };
        let client = VncClient::new(base_url, &profile.project, auth, &self.config.transport())?;
        Ok(Arc::new(VncSdnClient::new(client)))
    }
}
