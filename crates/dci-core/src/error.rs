// ── Core error types ──
//
// Domain errors from dci-core. Callers never see HTTP statuses or framing
// failures directly: the `From<dci_api::Error>` impl folds transport-layer
// errors into the provisioning vocabulary.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote systems ───────────────────────────────────────────────
    /// Connect failure, timeout, dropped session, malformed frame.
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("{device} does not support {capability}")]
    UnsupportedCapability { device: String, capability: String },

    #[error("Transaction policy violation: {message}")]
    TransactionPolicyViolation { message: String },

    /// Device NAK'd a load/validate/commit, or CLI output carried the error marker.
    #[error("Configuration rejected by {device}: {output}")]
    ApplyRejected { device: String, output: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{resource} not found: {identifier}")]
    ResourceNotFound {
        resource: String,
        identifier: String,
    },

    #[error("No free {pool} in {range}")]
    AllocationExhausted { pool: String, range: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Flow outcomes ────────────────────────────────────────────────
    /// A create flow failed; completed steps were compensated. `unreverted`
    /// names the steps whose compensation itself failed.
    #[error(
        "Provisioning failed at '{failed_task}': {cause}{}",
        if unreverted.is_empty() { String::new() } else { format!(" (left unreverted: {})", unreverted.join(", ")) }
    )]
    PartialProvisioningFailure {
        failed_task: String,
        cause: Box<CoreError>,
        unreverted: Vec<String>,
    },

    /// A delete flow stopped part-way; the record is kept INACTIVE.
    #[error("Teardown of '{slicing}' stopped at '{failed_task}': {cause}")]
    TeardownIncomplete {
        slicing: String,
        failed_task: String,
        cause: Box<CoreError>,
    },

    // ── Infrastructure ───────────────────────────────────────────────
    #[error("Repository error: {message}")]
    Repository { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Innermost cause, looking through flow-outcome wrappers.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::PartialProvisioningFailure { cause, .. } | Self::TeardownIncomplete { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }

    /// Failures that may succeed on a plain retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.root_cause(), Self::Transport { .. })
    }

    /// HTTP status class an API layer would report for this error.
    pub fn status_class(&self) -> u16 {
        match self {
            Self::ResourceNotFound { .. } => 404,
            Self::Validation { .. } | Self::TransactionPolicyViolation { .. } => 400,
            Self::Conflict { .. } | Self::AllocationExhausted { .. } => 409,
            Self::UnsupportedCapability { .. } => 501,
            Self::ApplyRejected { .. } => 502,
            Self::Transport { .. } => 503,
            Self::PartialProvisioningFailure { cause, .. } | Self::TeardownIncomplete { cause, .. } => {
                match cause.status_class() {
                    s @ (502 | 503) => s,
                    _ => 500,
                }
            }
            Self::Repository { .. } | Self::Config { .. } | Self::Internal(_) => 500,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dci_api::Error> for CoreError {
    fn from(err: dci_api::Error) -> Self {
        use dci_api::Error as Api;
        match err {
            Api::NotFound {
                resource,
                identifier,
            } => CoreError::ResourceNotFound {
                resource: resource.into(),
                identifier,
            },
            Api::RefsExist {
                resource,
                identifier,
                message,
            } => CoreError::Conflict {
                message: format!("{resource} '{identifier}' still referenced: {message}"),
            },
            Api::RpcError { message, tag } => CoreError::ApplyRejected {
                device: "device".into(),
                output: match tag {
                    Some(tag) => format!("{tag}: {message}"),
                    None => message,
                },
            },
            Api::Vnc { message, status } if (400..500).contains(&status) => {
                CoreError::Validation {
                    message: format!("SDN controller rejected request (HTTP {status}): {message}"),
                }
            }
            Api::InvalidInput { message } => CoreError::Validation { message },
            Api::Deserialization { message, .. } => {
                CoreError::Internal(format!("unexpected SDN controller response: {message}"))
            }
            other => CoreError::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization: {err}"))
    }
}
