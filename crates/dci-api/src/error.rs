use thiserror::Error;

/// Top-level error type for the `dci-api` crate.
///
/// Covers every failure mode across the remote surfaces: HTTP transport to
/// the SDN controller, NETCONF sessions, and interactive CLI sessions.
/// `dci-core` maps these into provisioning-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected by the controller or device.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Connect or operation deadline exceeded.
    #[error("Operation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// TCP connect to a device failed.
    #[error("Cannot connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Socket-level I/O failure on an established session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── SDN controller API ──────────────────────────────────────────
    /// Non-success response from the VNC API server.
    #[error("VNC API error (HTTP {status}): {message}")]
    Vnc { message: String, status: u16 },

    /// The addressed object does not exist on the controller.
    #[error("{resource} not found: {identifier}")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },

    /// Delete refused because other objects still reference the target.
    #[error("{resource} '{identifier}' is still referenced: {message}")]
    RefsExist {
        resource: &'static str,
        identifier: String,
        message: String,
    },

    // ── NETCONF ─────────────────────────────────────────────────────
    /// `<rpc-error>` in a reply.
    #[error("NETCONF rpc-error{}: {message}", tag.as_deref().map(|t| format!(" ({t})")).unwrap_or_default())]
    RpcError {
        message: String,
        tag: Option<String>,
    },

    /// Malformed frame or unexpected message on the wire.
    #[error("Framing error: {0}")]
    Framing(String),

    /// Peer closed the session mid-exchange.
    #[error("Session closed by peer")]
    SessionClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// Caller-supplied value cannot be expressed on the wire.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::Connect { .. } | Self::SessionClosed => true,
            Self::Vnc { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } | Self::Vnc { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for failures reaching or talking to the remote end,
    /// as opposed to the remote end rejecting a request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Timeout { .. }
                | Self::Tls(_)
                | Self::Connect { .. }
                | Self::Io(_)
                | Self::Framing(_)
                | Self::SessionClosed
                | Self::Authentication { .. }
        )
    }
}
