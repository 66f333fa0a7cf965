//! Config subcommand handlers.

use std::fmt::Write as _;
use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn opt_line<T: std::fmt::Display>(out: &mut String, key: &str, value: Option<T>) {
    if let Some(v) = value {
        let _ = writeln!(out, "{key} = {v}");
    }
}

/// Format config for display, masking the plaintext password.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        opt_line(&mut out, "state_file", p.state_file.as_ref().map(|s| format!("\"{}\"", s.display())));
        opt_line(&mut out, "sdn_username", p.sdn_username.as_ref().map(|u| format!("\"{u}\"")));
        if p.sdn_password.is_some() {
            let _ = writeln!(out, "sdn_password = \"****\"");
        }
        opt_line(&mut out, "sdn_password_env", p.sdn_password_env.as_ref().map(|e| format!("\"{e}\"")));
        opt_line(&mut out, "ca_cert", p.ca_cert.as_ref().map(|c| format!("\"{}\"", c.display())));
        opt_line(&mut out, "insecure", p.insecure);
        opt_line(&mut out, "sdn_timeout", p.sdn_timeout);
        opt_line(&mut out, "sdn_connect_timeout", p.sdn_connect_timeout);
        opt_line(&mut out, "device_connect_timeout", p.device_connect_timeout);
        opt_line(&mut out, "device_operation_timeout", p.device_operation_timeout);
        opt_line(&mut out, "cli_error_marker", p.cli_error_marker.as_ref().map(|m| format!("\"{m}\"")));
        opt_line(&mut out, "teardown_retries", p.teardown_retries);
        opt_line(&mut out, "retry_backoff", p.retry_backoff);
    }

    out
}

/// Copy of the config with the plaintext password masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: config::Defaults {
            output: cfg.defaults.output.clone(),
            color: cfg.defaults.color.clone(),
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let mut p = p.clone();
                if p.sdn_password.is_some() {
                    p.sdn_password = Some("****".into());
                }
                (name.clone(), p)
            })
            .collect(),
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "state_file" => profile.state_file = Some(PathBuf::from(value)),
        "sdn_username" => profile.sdn_username = Some(value),
        "sdn_password_env" => profile.sdn_password_env = Some(value),
        "ca_cert" => profile.ca_cert = Some(PathBuf::from(value)),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "sdn_timeout" => profile.sdn_timeout = Some(parse_value(key, &value, "a number of seconds")?),
        "sdn_connect_timeout" => {
            profile.sdn_connect_timeout = Some(parse_value(key, &value, "a number of seconds")?);
        }
        "device_connect_timeout" => {
            profile.device_connect_timeout = Some(parse_value(key, &value, "a number of seconds")?);
        }
        "device_operation_timeout" => {
            profile.device_operation_timeout = Some(parse_value(key, &value, "a number of seconds")?);
        }
        "cli_error_marker" => profile.cli_error_marker = Some(value),
        "teardown_retries" => {
            profile.teardown_retries = Some(parse_value(key, &value, "a positive number")?);
        }
        "retry_backoff" => profile.retry_backoff = Some(parse_value(key, &value, "a number of seconds")?),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: state_file, sdn_username, \
                     sdn_password_env, ca_cert, insecure, sdn_timeout, sdn_connect_timeout, \
                     device_connect_timeout, device_operation_timeout, cli_error_marker, \
                     teardown_retries, retry_backoff"
                ),
            });
        }
    }
    // Reject values the core would refuse later.
    dci_config::profile_to_core_config(profile)?;
    Ok(())
}

fn prompt_password(profile_name: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(format!("SDN controller password for '{profile_name}': "))
        .map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "sdn_password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(secret)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            eprintln!("dcictl configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let mut cfg = config::load(global)?;

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let mut profile = Profile::default();

            let state_file: String = Input::new()
                .with_prompt("State file (empty for the default location)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            if !state_file.is_empty() {
                profile.state_file = Some(PathBuf::from(state_file));
            }

            let username: String = Input::new()
                .with_prompt("Default SDN controller user (empty to use per-site credentials)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            if !username.is_empty() {
                profile.sdn_username = Some(username);
                let choices = &[
                    "Store in system keyring (recommended)",
                    "Read from an environment variable",
                    "Save to config file (plaintext)",
                ];
                let selection = Select::new()
                    .with_prompt("Where should the password come from?")
                    .items(choices)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;
                match selection {
                    0 => {
                        let secret = prompt_password(&profile_name)?;
                        dci_config::store_secret(&profile_name, "sdn-password", &secret)?;
                        eprintln!("   ✓ Password stored in system keyring");
                    }
                    1 => {
                        let var: String = Input::new()
                            .with_prompt("Environment variable")
                            .default("DCI_SDN_PASSWORD".into())
                            .interact_text()
                            .map_err(prompt_err)?;
                        profile.sdn_password_env = Some(var);
                    }
                    _ => profile.sdn_password = Some(prompt_password(&profile_name)?),
                }
            }

            let insecure = Confirm::new()
                .with_prompt("Accept self-signed certificates on HTTPS controllers?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;
            if insecure {
                profile.insecure = Some(true);
            }

            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            config::save_config_to(&cfg, &path)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: dcictl inventory import <FILE>");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load(global)?);
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                path.display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;

            config::save_config_to(&cfg, &path)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: dcictl config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config_to(&cfg, &path)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load(global)?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let prof = cfg.profile(&profile_name).map_err(|_| CliError::ProfileNotFound {
                name: profile_name.clone(),
                available: config::available_profiles(&cfg),
            })?;
            if prof.sdn_username.is_none() {
                eprintln!(
                    "note: profile '{profile_name}' has no sdn_username; the password is only \
                     used once one is set"
                );
            }

            let secret = prompt_password(&profile_name)?;
            dci_config::store_secret(&profile_name, "sdn-password", &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
