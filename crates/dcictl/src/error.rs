//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with actionable
//! help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use dci_config::ConfigError;
use dci_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Remote systems ───────────────────────────────────────────────

    #[error("Could not reach {target}: {reason}")]
    #[diagnostic(
        code(dcictl::connection_failed),
        help(
            "Check that the SDN controller or WAN node is reachable from this host.\n\
             Try: dcictl sites ping <SITE> or dcictl wan-nodes ping <NODE>"
        )
    )]
    ConnectionFailed { target: String, reason: String },

    #[error("Configuration rejected by {device}")]
    #[diagnostic(
        code(dcictl::apply_rejected),
        help("Device output:\n{output}")
    )]
    ApplyRejected { device: String, output: String },

    #[error("{device} does not support {capability}")]
    #[diagnostic(code(dcictl::unsupported))]
    Unsupported { device: String, capability: String },

    // ── Flow outcomes ────────────────────────────────────────────────

    #[error("Provisioning failed at '{failed_task}': {cause}")]
    #[diagnostic(
        code(dcictl::provisioning_failed),
        help("{hint}")
    )]
    ProvisioningFailed {
        failed_task: String,
        cause: String,
        hint: String,
        transient: bool,
    },

    #[error("Teardown of '{slicing}' stopped at '{failed_task}': {cause}")]
    #[diagnostic(
        code(dcictl::teardown_incomplete),
        help(
            "The slicing is kept as INACTIVE. Fix the cause and re-run:\n\
             dcictl slicings delete {slicing}"
        )
    )]
    TeardownIncomplete {
        slicing: String,
        failed_task: String,
        cause: String,
        transient: bool,
    },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(dcictl::not_found),
        help("Run: dcictl {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(dcictl::conflict))]
    Conflict { message: String },

    #[error("No free {pool} left in {range}")]
    #[diagnostic(
        code(dcictl::pool_exhausted),
        help("Widen the range in the profile's [allocation] table or delete unused slicings.")
    )]
    PoolExhausted { pool: String, range: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dcictl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(dcictl::no_credentials),
        help(
            "Store the SDN controller password with: dcictl config set-password --profile {profile}\n\
             Or point sdn_password_env at an environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dcictl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dcictl config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(dcictl::config))]
    Config(Box<figment::Error>),

    #[error("State file error: {message}")]
    #[diagnostic(
        code(dcictl::state),
        help("Check the state_file setting of the active profile or pass --state-file.")
    )]
    State { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dcictl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Gave up after {seconds}s")]
    #[diagnostic(
        code(dcictl::timeout),
        help("Increase --timeout or check the device's management reachability.")
    )]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    #[diagnostic(code(dcictl::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(dcictl::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(dcictl::yaml), help("Check the file contents and try again."))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::ProvisioningFailed { transient, .. } | Self::TeardownIncomplete { transient, .. } => {
                if *transient {
                    exit_code::CONNECTION
                } else {
                    exit_code::GENERAL
                }
            }
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::PoolExhausted { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::Unsupported { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub(crate) fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

fn list_command_for(resource: &str) -> &'static str {
    match resource {
        "site" => "sites list",
        "WAN node" | "wan node" => "wan-nodes list",
        _ => "slicings list",
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => CliError::ConnectionFailed {
                target: "remote system".into(),
                reason: message,
            },

            CoreError::UnsupportedCapability { device, capability } => {
                CliError::Unsupported { device, capability }
            }

            CoreError::TransactionPolicyViolation { message } => CliError::Internal { message },

            CoreError::ApplyRejected { device, output } => CliError::ApplyRejected { device, output },

            CoreError::ResourceNotFound {
                resource,
                identifier,
            } => CliError::NotFound {
                list_command: list_command_for(&resource).into(),
                resource_type: resource,
                identifier,
            },

            CoreError::AllocationExhausted { pool, range } => CliError::PoolExhausted { pool, range },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::Validation { message } => CliError::Validation {
                field: "request".into(),
                reason: message,
            },

            CoreError::PartialProvisioningFailure {
                failed_task,
                cause,
                unreverted,
            } => {
                let hint = if unreverted.is_empty() {
                    "All completed steps were rolled back; nothing was left behind.".to_owned()
                } else {
                    format!(
                        "These steps could not be rolled back and need manual cleanup: {}",
                        unreverted.join(", ")
                    )
                };
                CliError::ProvisioningFailed {
                    failed_task,
                    transient: cause.is_transient(),
                    cause: cause.to_string(),
                    hint,
                }
            }

            CoreError::TeardownIncomplete {
                slicing,
                failed_task,
                cause,
            } => CliError::TeardownIncomplete {
                slicing,
                failed_task,
                transient: cause.is_transient(),
                cause: cause.to_string(),
            },

            CoreError::Repository { message } => CliError::State { message },

            CoreError::Config { message } => CliError::Validation {
                field: "profile".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "run `dcictl config profiles`".into(),
            },
            ConfigError::Serialization(e) => CliError::Internal {
                message: format!("failed to serialize config: {e}"),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let e: CliError = CoreError::ResourceNotFound {
            resource: "slicing".into(),
            identifier: "blue".into(),
        }
        .into();
        assert_eq!(e.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(e, CliError::NotFound { ref list_command, .. } if list_command == "slicings list"));

        let e: CliError = CoreError::Conflict {
            message: "slicing 'blue' already exists".into(),
        }
        .into();
        assert_eq!(e.exit_code(), exit_code::CONFLICT);

        let e: CliError = CoreError::Validation {
            message: "bad cidr".into(),
        }
        .into();
        assert_eq!(e.exit_code(), exit_code::USAGE);

        assert_eq!(CliError::Timeout { seconds: 5 }.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn flow_failures_carry_cleanup_hint() {
        let e: CliError = CoreError::PartialProvisioningFailure {
            failed_task: "configure-west-wan-node".into(),
            cause: Box::new(CoreError::Transport {
                message: "connection reset".into(),
            }),
            unreverted: vec!["create-east-vn".into()],
        }
        .into();
        assert_eq!(e.exit_code(), exit_code::CONNECTION);
        match e {
            CliError::ProvisioningFailed { hint, .. } => assert!(hint.contains("create-east-vn")),
            other => panic!("expected ProvisioningFailed, got {other:?}"),
        }

        let e: CliError = CoreError::TeardownIncomplete {
            slicing: "blue".into(),
            failed_task: "delete-west-vn".into(),
            cause: Box::new(CoreError::Conflict {
                message: "still referenced".into(),
            }),
        }
        .into();
        assert_eq!(e.exit_code(), exit_code::GENERAL);
    }
}
