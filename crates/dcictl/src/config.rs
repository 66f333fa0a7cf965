//! CLI configuration: a thin layer over `dci_config` that applies the
//! global flags (`--config`, `--profile`, `--state-file`) and wires the
//! slicing manager to the state file and live backends.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::debug;

use dci_core::{
    Backends, CoreConfig, CoreError, FileStore, InventoryRepository, NetworkSlicingManager,
    SdnClient, SdnProvider, Site, SlicingRepository,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use dci_config::{Config, Defaults, Profile, config_path, save_config_to};

/// The config file selected by `--config`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(dci_config::load_config_from(&config_file(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Everything a command needs once the profile is resolved.
pub struct Context {
    pub profile: String,
    pub store: Arc<FileStore>,
    pub manager: NetworkSlicingManager,
}

impl Context {
    pub async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = load(global)?;
        let name = active_profile_name(global, &cfg);
        let profile = cfg.profile(&name).map_err(|e| match e {
            dci_config::ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: available_profiles(&cfg),
            },
            other => other.into(),
        })?;

        let core = dci_config::profile_to_core_config(&profile)?;
        let fallback = dci_config::resolve_sdn_credentials(&profile, &name)?;
        let state = global
            .state_file
            .clone()
            .unwrap_or_else(|| dci_config::state_path(&profile, &name));
        debug!(profile = %name, state = %state.display(), "opening state");

        let store = Arc::new(FileStore::open(state).await?);
        let manager = build_manager(Arc::clone(&store), core, fallback);
        Ok(Self {
            profile: name,
            store,
            manager,
        })
    }
}

fn build_manager(
    store: Arc<FileStore>,
    core: CoreConfig,
    fallback: Option<(String, SecretString)>,
) -> NetworkSlicingManager {
    let live = Backends::live(&core);
    let backends = Backends {
        sdn: Arc::new(ProfileCredentials {
            inner: live.sdn,
            fallback,
        }),
        drivers: live.drivers,
    };
    let slicings: Arc<dyn SlicingRepository> = store.clone();
    let inventory: Arc<dyn InventoryRepository> = store;
    NetworkSlicingManager::new(slicings, inventory, backends, core)
}

/// Fills in the profile's SDN credentials for sites that carry none.
struct ProfileCredentials {
    inner: Arc<dyn SdnProvider>,
    fallback: Option<(String, SecretString)>,
}

impl SdnProvider for ProfileCredentials {
    fn client_for(&self, site: &Site) -> Result<Arc<dyn SdnClient>, CoreError> {
        match &self.fallback {
            Some((user, password)) if site.sdn.username.is_none() => {
                let mut site = site.clone();
                site.sdn.username = Some(user.clone());
                site.sdn.password = Some(password.clone());
                self.inner.client_for(&site)
            }
            _ => self.inner.client_for(site),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use secrecy::ExposeSecret;
    use uuid::Uuid;

    use dci_core::{LifecycleState, SdnControllerProfile};

    use super::*;

    /// Records the credentials each client was built with.
    #[derive(Default)]
    struct Capture {
        seen: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    impl SdnProvider for Capture {
        fn client_for(&self, site: &Site) -> Result<Arc<dyn SdnClient>, CoreError> {
            self.seen.lock().unwrap().push((
                site.sdn.username.clone(),
                site.sdn.password.as_ref().map(|p| p.expose_secret().to_owned()),
            ));
            Err(CoreError::Internal("capture only".into()))
        }
    }

    fn site(username: Option<&str>) -> Site {
        Site {
            id: Uuid::new_v4(),
            name: "east".into(),
            sdn: SdnControllerProfile {
                host: "192.0.2.1".into(),
                port: 8082,
                project: "admin".into(),
                username: username.map(str::to_owned),
                password: username.map(|_| SecretString::from("site-pw")),
                tls: false,
            },
            wan_nodes: Vec::new(),
            state: LifecycleState::Active,
        }
    }

    #[test]
    fn fallback_only_applies_to_sites_without_credentials() {
        let capture = Arc::new(Capture::default());
        let provider = ProfileCredentials {
            inner: capture.clone(),
            fallback: Some(("ops".into(), SecretString::from("profile-pw"))),
        };

        let _ = provider.client_for(&site(None));
        let _ = provider.client_for(&site(Some("tenant")));

        let seen = capture.seen.lock().unwrap();
        assert_eq!(seen[0], (Some("ops".into()), Some("profile-pw".into())));
        assert_eq!(seen[1], (Some("tenant".into()), Some("site-pw".into())));
    }
}
