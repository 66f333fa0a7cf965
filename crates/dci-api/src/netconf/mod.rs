// NETCONF session abstraction
//
// `NetconfSession` is the seam between the transaction state machine in
// `dci-core` and whatever carries RPCs to the device. `tcp` provides an
// EOM-framed implementation over a plain TCP stream; SSH subsystem
// negotiation is left to a connector supplied by the embedding application.

mod codec;
pub mod rpc;
mod tcp;

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

pub use codec::EomCodec;
pub use tcp::{TcpNetconfConnector, TcpNetconfSession};

// ── Capabilities ────────────────────────────────────────────────────

pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
pub const CAP_CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const CAP_VALIDATE: &str = "urn:ietf:params:netconf:capability:validate:1.1";
pub const CAP_ROLLBACK_ON_ERROR: &str = "urn:ietf:params:netconf:capability:rollback-on-error:1.0";

/// Whether `capabilities` advertises the short-form capability `short`
/// (e.g. `":candidate"`), regardless of version suffix or query string.
pub fn has_capability(capabilities: &[String], short: &str) -> bool {
    let name = short.trim_start_matches(':');
    let needle = format!("capability:{name}:");
    capabilities.iter().any(|c| c.contains(&needle))
}

// ── Enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datastore {
    Running,
    Candidate,
    Startup,
}

impl Datastore {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Candidate => "candidate",
            Self::Startup => "startup",
        }
    }
}

impl fmt::Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOperation {
    Merge,
    Replace,
    None,
}

impl DefaultOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOption {
    TestThenSet,
    Set,
    TestOnly,
}

impl TestOption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TestThenSet => "test-then-set",
            Self::Set => "set",
            Self::TestOnly => "test-only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOption {
    StopOnError,
    ContinueOnError,
    RollbackOnError,
}

impl ErrorOption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopOnError => "stop-on-error",
            Self::ContinueOnError => "continue-on-error",
            Self::RollbackOnError => "rollback-on-error",
        }
    }
}

/// Parameters of one `<edit-config>` RPC.
#[derive(Debug, Clone)]
pub struct EditConfig {
    pub target: Datastore,
    /// Inner XML placed under `<config>`.
    pub config: String,
    pub default_operation: Option<DefaultOperation>,
    pub test_option: Option<TestOption>,
    pub error_option: Option<ErrorOption>,
}

// ── Replies ─────────────────────────────────────────────────────────

/// Raw `<rpc-reply>` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    pub xml: String,
}

impl RpcReply {
    pub fn new(xml: impl Into<String>) -> Self {
        Self { xml: xml.into() }
    }

    /// Canonical `<ok/>` reply, handy for session fakes.
    pub fn ok() -> Self {
        Self::new(format!(r#"<rpc-reply xmlns="{BASE_1_0}"><ok/></rpc-reply>"#))
    }

    pub fn is_ok(&self) -> bool {
        rpc::element_text(&self.xml, "ok").is_some() || self.xml.contains("<ok/>")
    }

    /// Inner XML of the `<data>` element, if any.
    pub fn data(&self) -> Option<&str> {
        rpc::element_text(&self.xml, "data")
    }

    /// The reply's `<rpc-error>` as a typed error, if it carries one.
    pub fn rpc_error(&self) -> Option<Error> {
        let err = rpc::element_text(&self.xml, "rpc-error")?;
        let message = rpc::element_text(err, "error-message")
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("unspecified rpc-error")
            .to_owned();
        let tag = rpc::element_text(err, "error-tag").map(|t| t.trim().to_owned());
        Some(Error::RpcError { message, tag })
    }

    /// `Ok(self)` unless the reply carries an `<rpc-error>`.
    pub fn into_result(self) -> Result<Self, Error> {
        match self.rpc_error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

// ── Session seam ────────────────────────────────────────────────────

/// An established NETCONF session.
///
/// Replies carrying `<rpc-error>` come back as [`Error::RpcError`]; every
/// other error is a transport failure.
#[async_trait]
pub trait NetconfSession: Send {
    fn session_id(&self) -> Option<u32>;
    /// Capabilities the server advertised in its hello.
    fn capabilities(&self) -> &[String];

    async fn lock(&mut self, target: Datastore) -> Result<RpcReply, Error>;
    async fn unlock(&mut self, target: Datastore) -> Result<RpcReply, Error>;
    async fn discard_changes(&mut self) -> Result<RpcReply, Error>;
    async fn edit_config(&mut self, edit: &EditConfig) -> Result<RpcReply, Error>;
    async fn validate(&mut self, source: Datastore) -> Result<RpcReply, Error>;
    async fn commit(&mut self) -> Result<RpcReply, Error>;
    async fn get(&mut self, filter: Option<&str>) -> Result<RpcReply, Error>;
    async fn get_config(&mut self, source: Datastore, filter: Option<&str>)
    -> Result<RpcReply, Error>;
    /// Send an arbitrary RPC body (the element inside `<rpc>`).
    async fn dispatch(&mut self, body: &str) -> Result<RpcReply, Error>;
    /// `<close-session>` and tear down the transport.
    async fn close(&mut self) -> Result<(), Error>;
}

/// Where and as whom to open a NETCONF session.
#[derive(Debug, Clone)]
pub struct NetconfTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Opens sessions. One session per executor call; nothing is pooled.
#[async_trait]
pub trait NetconfConnector: Send + Sync {
    async fn connect(&self, target: &NetconfTarget) -> Result<Box<dyn NetconfSession>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_matching_ignores_version_and_query() {
        let caps = vec![
            BASE_1_0.to_owned(),
            "urn:ietf:params:netconf:capability:candidate:1.0".to_owned(),
            "urn:ietf:params:netconf:capability:validate:1.0?x=y".to_owned(),
        ];
        assert!(has_capability(&caps, ":candidate"));
        assert!(has_capability(&caps, ":validate"));
        assert!(!has_capability(&caps, ":rollback-on-error"));
    }

    #[test]
    fn reply_with_rpc_error_is_typed() {
        let reply = RpcReply::new(
            r#"<rpc-reply message-id="3" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <rpc-error>
                   <error-type>application</error-type>
                   <error-tag>invalid-value</error-tag>
                   <error-message xml:lang="en">bridge-domain 12 already bound</error-message>
                 </rpc-error>
               </rpc-reply>"#,
        );
        assert!(!reply.is_ok());
        match reply.into_result() {
            Err(Error::RpcError { message, tag }) => {
                assert_eq!(message, "bridge-domain 12 already bound");
                assert_eq!(tag.as_deref(), Some("invalid-value"));
            }
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[test]
    fn ok_reply() {
        assert!(RpcReply::ok().is_ok());
        assert!(RpcReply::ok().into_result().is_ok());
    }
}
