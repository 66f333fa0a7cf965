//! Configuration for dcictl.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `dci_core::CoreConfig`. One profile describes one
//! deployment: where the state file lives, how to reach SDN controllers and
//! WAN nodes, and which identifier ranges and name prefixes to use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dci_core::{
    AllocationConfig, CoreConfig, DeviceConfig, IdRange, NamingConfig, SdnConfig, TlsVerification,
};

const KEYRING_SERVICE: &str = "dcictl";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named deployment profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// `name`, else the configured default, else `"default"`.
    pub fn profile_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.or(self.default_profile.as_deref()).unwrap_or("default")
    }

    /// The named profile. A missing `"default"` profile resolves to an
    /// empty one so the tool works without a config file.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(p) => Ok(p.clone()),
            None if name == "default" => Ok(Profile::default()),
            None => Err(ConfigError::UnknownProfile { name: name.into() }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named deployment profile. Unset fields take the core defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// JSON state file (inventory + slicing records).
    pub state_file: Option<PathBuf>,

    /// Fallback SDN controller user for sites without their own.
    pub sdn_username: Option<String>,

    /// SDN controller password (plaintext; prefer keyring or env var).
    pub sdn_password: Option<String>,

    /// Environment variable holding the SDN controller password.
    pub sdn_password_env: Option<String>,

    /// Path to a custom CA certificate for HTTPS controllers.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification for controllers.
    pub insecure: Option<bool>,

    /// Controller request timeout, seconds.
    pub sdn_timeout: Option<u64>,

    /// Controller connect timeout, seconds.
    pub sdn_connect_timeout: Option<u64>,

    /// Device connect timeout, seconds.
    pub device_connect_timeout: Option<u64>,

    /// Per-RPC / per-command device timeout, seconds.
    pub device_operation_timeout: Option<u64>,

    /// Substring marking a rejected CLI push.
    pub cli_error_marker: Option<String>,

    /// Attempts per idempotent teardown step.
    pub teardown_retries: Option<u32>,

    /// Pause between teardown attempts, seconds.
    pub retry_backoff: Option<u64>,

    #[serde(default)]
    pub allocation: AllocationProfile,

    #[serde(default)]
    pub naming: NamingProfile,
}

/// Identifier range and numbering overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AllocationProfile {
    pub splicing_vlan: Option<IdRange>,
    pub bridge_domain: Option<IdRange>,
    pub dci_vlan: Option<IdRange>,
    pub dci_vni: Option<IdRange>,
    pub rd_admin: Option<u32>,
    pub rt_admin: Option<u32>,
    pub rd_rt_value: Option<IdRange>,
    pub vn_route_target: Option<IdRange>,
    pub node_rd_value: Option<IdRange>,
    pub opcode: Option<IdRange>,
}

/// Remote object name prefixes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NamingProfile {
    pub vn_prefix: Option<String>,
    pub wan_vpn_prefix: Option<String>,
    pub access_vpn_prefix: Option<String>,
    pub l2_dci_vn_prefix: Option<String>,
    pub l3_dci_vn_prefix: Option<String>,
    pub l3vpn_srv6_vn_prefix: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "dcictl", "dcictl")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dcictl");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// State file for `profile`: its `state_file`, else `<data dir>/<profile>.json`.
pub fn state_path(profile: &Profile, profile_name: &str) -> PathBuf {
    if let Some(path) = &profile.state_file {
        return path.clone();
    }
    let file = format!("{profile_name}.json");
    project_dirs().map_or_else(
        || dirs_fallback().join("state").join(&file),
        |dirs| dirs.data_dir().join(&file),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path`, then `DCI_*` variables (`__` separates levels,
/// e.g. `DCI_PROFILES__LAB__TEARDOWN_RETRIES=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DCI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring account for a profile secret, e.g. `lab/sdn-password`.
pub fn keyring_account(profile_name: &str, secret: &str) -> String {
    format!("{profile_name}/{secret}")
}

fn keyring_lookup(account: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, account)
        .ok()?
        .get_password()
        .ok()
}

/// Store a profile secret in the system keyring.
pub fn store_secret(profile_name: &str, secret: &str, value: &str) -> Result<(), ConfigError> {
    let account = keyring_account(profile_name, secret);
    keyring::Entry::new(KEYRING_SERVICE, &account)
        .and_then(|entry| entry.set_password(value))
        .map_err(|e| invalid("keyring", e.to_string()))
}

/// env var named by the profile → keyring → plaintext.
fn resolve_secret(
    env_name: Option<&str>,
    keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Option<SecretString> {
    if let Some(val) = env_name.and_then(|name| std::env::var(name).ok()) {
        return Some(SecretString::from(val));
    }
    if let Some(val) = keyring() {
        return Some(SecretString::from(val));
    }
    plaintext.map(|p| SecretString::from(p.to_owned()))
}

/// Fallback SDN controller credentials. `None` when the profile names no
/// user; an error when it names one without any password source.
pub fn resolve_sdn_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<(String, SecretString)>, ConfigError> {
    let Some(username) = profile.sdn_username.clone() else {
        return Ok(None);
    };
    let account = keyring_account(profile_name, "sdn-password");
    let password = resolve_secret(
        profile.sdn_password_env.as_deref(),
        || keyring_lookup(&account),
        profile.sdn_password.as_deref(),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })?;
    Ok(Some((username, password)))
}

// ── Translation ─────────────────────────────────────────────────────

fn check_range(field: &str, range: IdRange, max: u32) -> Result<IdRange, ConfigError> {
    if range.is_empty() {
        return Err(invalid(field, format!("empty range {range}")));
    }
    if range.end > max {
        return Err(invalid(field, format!("{range} exceeds {max}")));
    }
    Ok(range)
}

fn allocation(p: &AllocationProfile) -> Result<AllocationConfig, ConfigError> {
    // 0 and 4095 are reserved VLAN ids
    const VLAN_MAX: u32 = 4094;
    const VNI_MAX: u32 = (1 << 24) - 1;
    const BRIDGE_DOMAIN_MAX: u32 = (1 << 24) - 1;
    // assigned numbers in RDs and RTs, and SRv6 opcodes
    const NUMBER_MAX: u32 = 65_535;

    let d = AllocationConfig::default();
    let pick = |field: &str, v: Option<IdRange>, dflt: IdRange, max: u32| {
        check_range(field, v.unwrap_or(dflt), max)
    };
    Ok(AllocationConfig {
        splicing_vlan: pick("allocation.splicing_vlan", p.splicing_vlan, d.splicing_vlan, VLAN_MAX)?,
        bridge_domain: pick("allocation.bridge_domain", p.bridge_domain, d.bridge_domain, BRIDGE_DOMAIN_MAX)?,
        dci_vlan: pick("allocation.dci_vlan", p.dci_vlan, d.dci_vlan, VLAN_MAX)?,
        dci_vni: pick("allocation.dci_vni", p.dci_vni, d.dci_vni, VNI_MAX)?,
        rd_admin: p.rd_admin.unwrap_or(d.rd_admin),
        rt_admin: p.rt_admin.unwrap_or(d.rt_admin),
        rd_rt_value: pick("allocation.rd_rt_value", p.rd_rt_value, d.rd_rt_value, NUMBER_MAX)?,
        vn_route_target: pick("allocation.vn_route_target", p.vn_route_target, d.vn_route_target, NUMBER_MAX)?,
        node_rd_value: pick("allocation.node_rd_value", p.node_rd_value, d.node_rd_value, NUMBER_MAX)?,
        opcode: pick("allocation.opcode", p.opcode, d.opcode, NUMBER_MAX)?,
    })
}

fn naming(p: &NamingProfile) -> NamingConfig {
    let d = NamingConfig::default();
    NamingConfig {
        vn_prefix: p.vn_prefix.clone().unwrap_or(d.vn_prefix),
        wan_vpn_prefix: p.wan_vpn_prefix.clone().unwrap_or(d.wan_vpn_prefix),
        access_vpn_prefix: p.access_vpn_prefix.clone().unwrap_or(d.access_vpn_prefix),
        l2_dci_vn_prefix: p.l2_dci_vn_prefix.clone().unwrap_or(d.l2_dci_vn_prefix),
        l3_dci_vn_prefix: p.l3_dci_vn_prefix.clone().unwrap_or(d.l3_dci_vn_prefix),
        l3vpn_srv6_vn_prefix: p.l3vpn_srv6_vn_prefix.clone().unwrap_or(d.l3vpn_srv6_vn_prefix),
    }
}

fn secs(v: Option<u64>, dflt: Duration) -> Duration {
    v.map_or(dflt, Duration::from_secs)
}

/// Build a `CoreConfig` from a profile.
pub fn profile_to_core_config(profile: &Profile) -> Result<CoreConfig, ConfigError> {
    let defaults = CoreConfig::default();

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let cli_error_marker = profile
        .cli_error_marker
        .clone()
        .unwrap_or(defaults.device.cli_error_marker);
    if cli_error_marker.trim().is_empty() {
        return Err(invalid("cli_error_marker", "must not be empty"));
    }

    let teardown_retries = profile.teardown_retries.unwrap_or(defaults.teardown_retries);
    if teardown_retries == 0 {
        return Err(invalid("teardown_retries", "must be at least 1"));
    }

    Ok(CoreConfig {
        allocation: allocation(&profile.allocation)?,
        naming: naming(&profile.naming),
        device: DeviceConfig {
            connect_timeout: secs(profile.device_connect_timeout, defaults.device.connect_timeout),
            operation_timeout: secs(profile.device_operation_timeout, defaults.device.operation_timeout),
            cli_error_marker,
        },
        sdn: SdnConfig {
            tls,
            timeout: secs(profile.sdn_timeout, defaults.sdn.timeout),
            connect_timeout: secs(profile.sdn_connect_timeout, defaults.sdn.connect_timeout),
        },
        teardown_retries,
        retry_backoff: secs(profile.retry_backoff, defaults.retry_backoff),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn secret_chain_prefers_keyring_over_plaintext() {
        let s = resolve_secret(None, || Some("from-keyring".into()), Some("plain")).unwrap();
        assert_eq!(s.expose_secret(), "from-keyring");

        let s = resolve_secret(None, || None, Some("plain")).unwrap();
        assert_eq!(s.expose_secret(), "plain");

        assert!(resolve_secret(Some("DCI_TEST_UNSET_VARIABLE"), || None, None).is_none());
    }

    #[test]
    fn empty_profile_gives_core_defaults() {
        let cfg = profile_to_core_config(&Profile::default()).unwrap();
        assert_eq!(cfg, CoreConfig::default());
    }

    #[test]
    fn range_limits_are_checked() {
        let mut p = Profile::default();
        p.allocation.dci_vlan = Some(IdRange::new(4000, 5000));
        assert!(matches!(
            profile_to_core_config(&p),
            Err(ConfigError::Validation { ref field, .. }) if field == "allocation.dci_vlan"
        ));

        p.allocation.dci_vlan = Some(IdRange::new(20, 10));
        assert!(profile_to_core_config(&p).is_err());
    }

    #[test]
    fn every_range_is_bounded() {
        let full = Some(IdRange::new(0, u32::MAX));
        let mut p = Profile::default();
        p.allocation.bridge_domain = full;
        assert!(matches!(
            profile_to_core_config(&p),
            Err(ConfigError::Validation { ref field, .. }) if field == "allocation.bridge_domain"
        ));

        let mut p = Profile::default();
        p.allocation.opcode = full;
        assert!(matches!(
            profile_to_core_config(&p),
            Err(ConfigError::Validation { ref field, .. }) if field == "allocation.opcode"
        ));
    }

    #[test]
    fn splicing_vlan_excludes_4095() {
        let mut p = Profile::default();
        p.allocation.splicing_vlan = Some(IdRange::new(3, 4095));
        assert!(matches!(
            profile_to_core_config(&p),
            Err(ConfigError::Validation { ref field, .. }) if field == "allocation.splicing_vlan"
        ));
    }

    #[test]
    fn zero_retries_rejected() {
        let p = Profile {
            teardown_retries: Some(0),
            ..Profile::default()
        };
        assert!(profile_to_core_config(&p).is_err());
    }

    #[test]
    fn missing_default_profile_is_empty() {
        let cfg = Config::default();
        assert!(cfg.profile("default").is_ok());
        assert!(matches!(cfg.profile("lab"), Err(ConfigError::UnknownProfile { .. })));
        assert_eq!(cfg.profile_name(Some("lab")), "lab");
        assert_eq!(cfg.profile_name(None), "default");
    }
}
