// ── Device configuration transactions ──
//
// One executor call = one session. The NETCONF executor drives the
// candidate-datastore state machine:
//
//   connect ─ lock ─ discard ─ edit ─ validate ─ commit ─ unlock ─ close
//
// Any failure after the lock discards the candidate and unlocks before the
// error propagates; the session is closed on every path. The CLI executor
// pushes a command list and rejects output carrying an error marker.

use std::sync::Arc;

use async_trait::async_trait;
use dci_api::netconf::{CAP_CANDIDATE, CAP_ROLLBACK_ON_ERROR, CAP_VALIDATE, has_capability};
use dci_api::{
    CliConnector, CliSession, CliTarget, Datastore, DefaultOperation, EditConfig, ErrorOption,
    NetconfConnector, NetconfSession, NetconfTarget, RpcReply, TestOption,
};
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// What a [`TransactionDescriptor`] asks the device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    GetConfig,
    EditConfig,
    /// Arbitrary RPC body, sent as-is.
    Raw,
}

/// One NETCONF call, built per request.
#[derive(Debug, Clone)]
pub struct TransactionDescriptor {
    pub operation: Operation,
    pub target: Datastore,
    /// Config XML for edits, subtree filter for reads, RPC body for raw calls.
    pub payload: String,
    pub default_operation: Option<DefaultOperation>,
    pub test_option: Option<TestOption>,
    pub error_option: Option<ErrorOption>,
    pub lock: bool,
}

impl TransactionDescriptor {
    /// Candidate-datastore edit with the only option set the executor accepts.
    pub fn edit(config: impl Into<String>) -> Self {
        Self {
            operation: Operation::EditConfig,
            target: Datastore::Candidate,
            payload: config.into(),
            default_operation: Some(DefaultOperation::Merge),
            test_option: Some(TestOption::TestThenSet),
            error_option: Some(ErrorOption::RollbackOnError),
            lock: true,
        }
    }

    pub fn get(filter: impl Into<String>) -> Self {
        Self::read(Operation::Get, Datastore::Running, filter.into())
    }

    pub fn get_config(source: Datastore, filter: impl Into<String>) -> Self {
        Self::read(Operation::GetConfig, source, filter.into())
    }

    pub fn raw(body: impl Into<String>) -> Self {
        Self::read(Operation::Raw, Datastore::Running, body.into())
    }

    fn read(operation: Operation, target: Datastore, payload: String) -> Self {
        Self {
            operation,
            target,
            payload,
            default_operation: None,
            test_option: None,
            error_option: None,
            lock: false,
        }
    }

    /// Edits must target the candidate datastore under lock with merge,
    /// test-then-set and rollback-on-error. Reads are not checked.
    pub fn check_policy(&self) -> Result<(), CoreError> {
        if self.operation != Operation::EditConfig {
            return Ok(());
        }

        let violation = if self.target != Datastore::Candidate {
            Some(format!("edit targets '{}', expected 'candidate'", self.target))
        } else if self.default_operation != Some(DefaultOperation::Merge) {
            Some("default-operation must be 'merge'".to_owned())
        } else if self.test_option != Some(TestOption::TestThenSet) {
            Some("test-option must be 'test-then-set'".to_owned())
        } else if self.error_option != Some(ErrorOption::RollbackOnError) {
            Some("error-option must be 'rollback-on-error'".to_owned())
        } else if !self.lock {
            Some("edits must hold the datastore lock".to_owned())
        } else {
            None
        };

        match violation {
            Some(message) => Err(CoreError::TransactionPolicyViolation { message }),
            None => Ok(()),
        }
    }

    fn edit_config(&self) -> EditConfig {
        EditConfig {
            target: self.target,
            config: self.payload.clone(),
            default_operation: self.default_operation,
            test_option: self.test_option,
            error_option: self.error_option,
        }
    }

    fn filter(&self) -> Option<&str> {
        Some(self.payload.as_str()).filter(|p| !p.trim().is_empty())
    }
}

/// What the device said back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub device: String,
    /// `<data>` contents for NETCONF reads, the raw reply otherwise; the
    /// concatenated session output for CLI pushes.
    pub output: String,
}

/// Applies one change to one device.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    type Change: Send + Sync + ?Sized;

    async fn apply(&self, change: &Self::Change) -> Result<ApplyOutcome, CoreError>;
}

// ── NETCONF ─────────────────────────────────────────────────────────

pub struct NetconfExecutor {
    connector: Arc<dyn NetconfConnector>,
    target: NetconfTarget,
}

impl NetconfExecutor {
    pub fn new(connector: Arc<dyn NetconfConnector>, target: NetconfTarget) -> Self {
        Self { connector, target }
    }

    fn device(&self) -> &str {
        &self.target.host
    }

    /// Attribute rpc-errors to this device; everything else folds as usual.
    fn map_err(&self, err: dci_api::Error) -> CoreError {
        match err {
            dci_api::Error::RpcError { message, tag } => CoreError::ApplyRejected {
                device: self.device().to_owned(),
                output: match tag {
                    Some(tag) => format!("{tag}: {message}"),
                    None => message,
                },
            },
            other => other.into(),
        }
    }

    fn outcome(&self, reply: &RpcReply) -> ApplyOutcome {
        ApplyOutcome {
            device: self.device().to_owned(),
            output: reply.data().unwrap_or(&reply.xml).to_owned(),
        }
    }

    /// Edit-config and commit must be answered with `<ok/>`.
    fn acknowledged(&self, reply: RpcReply) -> Result<RpcReply, CoreError> {
        if reply.is_ok() {
            Ok(reply)
        } else {
            Err(CoreError::ApplyRejected {
                device: self.device().to_owned(),
                output: reply.xml,
            })
        }
    }

    async fn run(
        &self,
        session: &mut dyn NetconfSession,
        change: &TransactionDescriptor,
    ) -> Result<ApplyOutcome, CoreError> {
        let reply = match change.operation {
            Operation::Get => session.get(change.filter()).await,
            Operation::GetConfig => session.get_config(change.target, change.filter()).await,
            Operation::Raw => session.dispatch(&change.payload).await,
            Operation::EditConfig => return self.edit(session, change).await,
        }
        .map_err(|e| self.map_err(e))?;
        Ok(self.outcome(&reply))
    }

    fn require_capabilities(&self, session: &dyn NetconfSession) -> Result<(), CoreError> {
        let caps = session.capabilities();
        for (short, full) in [
            (":candidate", CAP_CANDIDATE),
            (":validate", CAP_VALIDATE),
            (":rollback-on-error", CAP_ROLLBACK_ON_ERROR),
        ] {
            if !has_capability(caps, short) {
                return Err(CoreError::UnsupportedCapability {
                    device: self.device().to_owned(),
                    capability: full.to_owned(),
                });
            }
        }
        Ok(())
    }

    async fn edit(
        &self,
        session: &mut dyn NetconfSession,
        change: &TransactionDescriptor,
    ) -> Result<ApplyOutcome, CoreError> {
        self.require_capabilities(session)?;

        session
            .lock(change.target)
            .await
            .map_err(|e| self.map_err(e))?;
        debug!(device = self.device(), "candidate locked");

        match self.load_and_commit(session, change).await {
            Ok(outcome) => {
                if let Err(e) = session.unlock(change.target).await {
                    warn!(device = self.device(), error = %e, "unlock after commit failed");
                }
                info!(device = self.device(), "configuration committed");
                Ok(outcome)
            }
            Err(err) => {
                warn!(device = self.device(), error = %err, "edit failed, discarding candidate");
                if let Err(e) = session.discard_changes().await {
                    warn!(device = self.device(), error = %e, "discard-changes failed");
                }
                if let Err(e) = session.unlock(change.target).await {
                    warn!(device = self.device(), error = %e, "unlock failed");
                }
                Err(err)
            }
        }
    }

    async fn load_and_commit(
        &self,
        session: &mut dyn NetconfSession,
        change: &TransactionDescriptor,
    ) -> Result<ApplyOutcome, CoreError> {
        session.discard_changes().await.map_err(|e| self.map_err(e))?;
        let reply = session
            .edit_config(&change.edit_config())
            .await
            .map_err(|e| self.map_err(e))?;
        let reply = self.acknowledged(reply)?;
        session
            .validate(change.target)
            .await
            .map_err(|e| self.map_err(e))?;
        let committed = session.commit().await.map_err(|e| self.map_err(e))?;
        self.acknowledged(committed)?;
        Ok(self.outcome(&reply))
    }
}

#[async_trait]
impl TransactionExecutor for NetconfExecutor {
    type Change = TransactionDescriptor;

    async fn apply(&self, change: &TransactionDescriptor) -> Result<ApplyOutcome, CoreError> {
        change.check_policy()?;

        let mut session = self
            .connector
            .connect(&self.target)
            .await
            .map_err(|e| self.map_err(e))?;

        let result = self.run(session.as_mut(), change).await;

        if let Err(e) = session.close().await {
            warn!(device = self.device(), error = %e, "close-session failed");
        }
        result
    }
}

// ── SSH-CLI ─────────────────────────────────────────────────────────

pub struct CliExecutor {
    connector: Arc<dyn CliConnector>,
    target: CliTarget,
    error_markers: Vec<String>,
}

impl CliExecutor {
    pub fn new(
        connector: Arc<dyn CliConnector>,
        target: CliTarget,
        error_markers: Vec<String>,
    ) -> Self {
        Self {
            connector,
            target,
            error_markers,
        }
    }

    fn device(&self) -> &str {
        &self.target.host
    }

    /// Lines of `output` carrying any error marker.
    fn rejected_lines(&self, output: &str) -> Option<String> {
        let hits: Vec<&str> = output
            .lines()
            .filter(|line| self.error_markers.iter().any(|m| line.contains(m.as_str())))
            .map(str::trim)
            .collect();
        if hits.is_empty() {
            None
        } else {
            Some(hits.join("\n"))
        }
    }

    /// Run operational commands and return their concatenated output.
    /// Marker hits are rejected the same way as configuration pushes.
    pub async fn query(&self, commands: &[&str]) -> Result<String, CoreError> {
        let mut session = self.connector.connect(&self.target).await?;
        let result = run_queries(session.as_mut(), commands).await;
        self.close(session.as_mut()).await;
        let output = result?;
        self.check(output)
    }

    fn check(&self, output: String) -> Result<String, CoreError> {
        match self.rejected_lines(&output) {
            Some(lines) => Err(CoreError::ApplyRejected {
                device: self.device().to_owned(),
                output: lines,
            }),
            None => Ok(output),
        }
    }

    async fn close(&self, session: &mut dyn CliSession) {
        if let Err(e) = session.close().await {
            warn!(device = self.device(), error = %e, "closing CLI session failed");
        }
    }
}

async fn run_queries(session: &mut dyn CliSession, commands: &[&str]) -> Result<String, CoreError> {
    let mut output = String::new();
    for command in commands {
        output.push_str(&session.send_command(command).await?);
        output.push('\n');
    }
    Ok(output)
}

async fn push_and_save(session: &mut dyn CliSession, commands: &[String]) -> Result<String, CoreError> {
    let mut output = session.send_config_set(commands).await?;
    output.push_str(&session.save_config().await?);
    Ok(output)
}

#[async_trait]
impl TransactionExecutor for CliExecutor {
    type Change = [String];

    async fn apply(&self, commands: &[String]) -> Result<ApplyOutcome, CoreError> {
        debug!(device = self.device(), commands = commands.len(), "pushing CLI config set");

        let mut session = self.connector.connect(&self.target).await?;
        let result = push_and_save(session.as_mut(), commands).await;
        self.close(session.as_mut()).await;

        let output = self.check(result?)?;
        info!(device = self.device(), "CLI config set applied");
        Ok(ApplyOutcome {
            device: self.device().to_owned(),
            output,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn edit_defaults_satisfy_policy() {
        assert!(TransactionDescriptor::edit("<x/>").check_policy().is_ok());
    }

    #[test]
    fn each_policy_field_is_enforced() {
        let mut d = TransactionDescriptor::edit("<x/>");
        d.target = Datastore::Running;
        assert!(matches!(d.check_policy(), Err(CoreError::TransactionPolicyViolation { .. })));

        let mut d = TransactionDescriptor::edit("<x/>");
        d.default_operation = Some(DefaultOperation::Replace);
        assert!(d.check_policy().is_err());

        let mut d = TransactionDescriptor::edit("<x/>");
        d.test_option = None;
        assert!(d.check_policy().is_err());

        let mut d = TransactionDescriptor::edit("<x/>");
        d.error_option = Some(ErrorOption::ContinueOnError);
        assert!(d.check_policy().is_err());

        let mut d = TransactionDescriptor::edit("<x/>");
        d.lock = false;
        assert!(d.check_policy().is_err());
    }

    #[test]
    fn reads_bypass_policy() {
        assert!(TransactionDescriptor::get_config(Datastore::Running, "").check_policy().is_ok());
        assert!(TransactionDescriptor::raw("<get-x/>").check_policy().is_ok());
        assert_eq!(TransactionDescriptor::get("  ").filter(), None);
    }
}
