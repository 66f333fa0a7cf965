#![allow(clippy::unwrap_used)]
// Loading, layering, and translation of profiles.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use dci_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_core_config, resolve_sdn_credentials,
    save_config_to, state_path,
};
use dci_core::{IdRange, TlsVerification};

const LAB: &str = r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
state_file = "/var/lib/dcictl/lab.json"
sdn_username = "admin"
sdn_password_env = "LAB_TF_PASSWORD"
insecure = true
teardown_retries = 5
cli_error_marker = "Error:"

[profiles.lab.allocation]
dci_vlan = { start = 1200, end = 1300 }
rd_admin = 64512

[profiles.lab.naming]
vn_prefix = "lab-vn-"
"#;

#[test]
fn test_file_then_env_layering() {
    Jail::expect_with(|jail| {
        jail.create_file("dci.toml", LAB)?;
        jail.set_env("DCI_PROFILES__LAB__TEARDOWN_RETRIES", "7");

        let cfg = load_config_from(Path::new("dci.toml")).map_err(|e| e.to_string())?;
        assert_eq!(cfg.default_profile.as_deref(), Some("lab"));
        assert_eq!(cfg.defaults.output, "json");
        // untouched defaults survive
        assert_eq!(cfg.defaults.color, "auto");

        let lab = cfg.profile(cfg.profile_name(None)).map_err(|e| e.to_string())?;
        assert_eq!(lab.teardown_retries, Some(7));

        let core = profile_to_core_config(&lab).map_err(|e| e.to_string())?;
        assert_eq!(core.teardown_retries, 7);
        assert_eq!(core.allocation.dci_vlan, IdRange::new(1200, 1300));
        assert_eq!(core.allocation.rd_admin, 64512);
        assert_eq!(core.allocation.rt_admin, 54321);
        assert_eq!(core.naming.vn_prefix, "lab-vn-");
        assert_eq!(core.naming.wan_vpn_prefix, "ns-wan-l2vpn-");
        assert_eq!(core.device.cli_error_marker, "Error:");
        assert_eq!(core.sdn.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(core.retry_backoff, Duration::from_secs(2));

        assert_eq!(
            state_path(&lab, "lab"),
            Path::new("/var/lib/dcictl/lab.json")
        );
        Ok(())
    });
}

#[test]
fn test_missing_file_uses_defaults() {
    Jail::expect_with(|_| {
        let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        Ok(())
    });
}

#[test]
fn test_sdn_password_from_env() {
    Jail::expect_with(|jail| {
        jail.set_env("LAB_TF_PASSWORD", "from-env");
        let profile = Profile {
            sdn_username: Some("admin".into()),
            sdn_password_env: Some("LAB_TF_PASSWORD".into()),
            sdn_password: Some("plaintext".into()),
            ..Profile::default()
        };

        let (user, password) = resolve_sdn_credentials(&profile, "lab")
            .map_err(|e| e.to_string())?
            .unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn test_no_sdn_user_means_no_credentials() {
    let creds = resolve_sdn_credentials(&Profile::default(), "default").unwrap();
    assert!(creds.is_none());
}

#[test]
fn test_save_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "lab".into(),
        Profile {
            teardown_retries: Some(4),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let back = load_config_from(&path).unwrap();
    assert_eq!(back.profiles["lab"].teardown_retries, Some(4));
}

#[test]
fn test_unknown_profile() {
    let cfg = Config::default();
    assert!(matches!(
        cfg.profile("prod"),
        Err(ConfigError::UnknownProfile { ref name }) if name == "prod"
    ));
}
