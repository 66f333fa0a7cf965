// ── Saga orchestration ──
//
// A flow is an ordered list of tasks run one after another against a
// shared `ProvisioningStore`. When a task fails, every task that completed
// before it is reverted in reverse completion order and the original error
// is returned wrapped in `PartialProvisioningFailure`. Nothing about an
// in-flight flow is persisted.

mod store;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;

pub use store::{ProvisioningStore, TaskOutputs};

/// One compensable step of a flow.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Output keys this task may publish. Anything else it returns is
    /// dropped before the next task runs.
    fn provides(&self) -> &[&'static str] {
        &[]
    }

    async fn execute(&self, store: &ProvisioningStore) -> Result<TaskOutputs, CoreError>;

    /// Undo this task's own effect. `outputs` is what `execute` returned
    /// when it completed.
    async fn revert(
        &self,
        store: &ProvisioningStore,
        outputs: Option<&TaskOutputs>,
    ) -> Result<(), CoreError>;
}

/// Why a teardown flow stopped.
#[derive(Debug)]
pub struct TeardownFailure {
    pub failed_task: String,
    /// Tasks that finished before the failure, in order.
    pub completed: Vec<String>,
    pub cause: CoreError,
}

/// Sequential flow runner.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    flow: String,
}

impl Orchestrator {
    pub fn new(flow: impl Into<String>) -> Self {
        Self { flow: flow.into() }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    /// Run `tasks` in order. On failure, revert what completed and return
    /// [`CoreError::PartialProvisioningFailure`].
    pub async fn run(
        &self,
        tasks: Vec<Box<dyn Task>>,
        mut store: ProvisioningStore,
    ) -> Result<CompletedFlow, CoreError> {
        let mut completed: Vec<TaskOutputs> = Vec::with_capacity(tasks.len());

        for task in &tasks {
            debug!(flow = %self.flow, task = task.name(), "executing");
            match task.execute(&store).await {
                Ok(outputs) => {
                    merge_declared(&self.flow, task.as_ref(), &mut store, outputs.clone());
                    completed.push(outputs);
                }
                Err(cause) => {
                    warn!(
                        flow = %self.flow,
                        task = task.name(),
                        error = %cause,
                        completed = completed.len(),
                        "task failed, compensating"
                    );
                    let unreverted = compensate(&self.flow, &tasks, &completed, &store).await;
                    return Err(CoreError::PartialProvisioningFailure {
                        failed_task: task.name().to_owned(),
                        cause: Box::new(cause),
                        unreverted,
                    });
                }
            }
        }

        info!(flow = %self.flow, tasks = tasks.len(), "flow completed");
        Ok(CompletedFlow {
            flow: self.flow.clone(),
            tasks,
            completed,
            store,
        })
    }

    /// Run `tasks` in order without compensation, stopping at the first
    /// failure.
    pub async fn teardown(
        &self,
        tasks: Vec<Box<dyn Task>>,
        mut store: ProvisioningStore,
    ) -> Result<ProvisioningStore, TeardownFailure> {
        let mut completed = Vec::with_capacity(tasks.len());

        for task in &tasks {
            debug!(flow = %self.flow, task = task.name(), "executing");
            match task.execute(&store).await {
                Ok(outputs) => {
                    merge_declared(&self.flow, task.as_ref(), &mut store, outputs);
                    completed.push(task.name().to_owned());
                }
                Err(cause) => {
                    warn!(flow = %self.flow, task = task.name(), error = %cause, "teardown stopped");
                    return Err(TeardownFailure {
                        failed_task: task.name().to_owned(),
                        completed,
                        cause,
                    });
                }
            }
        }

        info!(flow = %self.flow, tasks = tasks.len(), "teardown completed");
        Ok(store)
    }
}

/// A flow whose every task succeeded. Still holds what is needed to undo it.
pub struct CompletedFlow {
    flow: String,
    tasks: Vec<Box<dyn Task>>,
    completed: Vec<TaskOutputs>,
    store: ProvisioningStore,
}

impl std::fmt::Debug for CompletedFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletedFlow")
            .field("flow", &self.flow)
            .field("tasks", &self.tasks.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CompletedFlow {
    pub fn store(&self) -> &ProvisioningStore {
        &self.store
    }

    pub fn into_store(self) -> ProvisioningStore {
        self.store
    }

    /// Revert every task in reverse order. Returns the names of tasks whose
    /// revert failed.
    pub async fn rollback(self) -> Vec<String> {
        warn!(flow = %self.flow, "rolling back completed flow");
        compensate(&self.flow, &self.tasks, &self.completed, &self.store).await
    }
}

fn merge_declared(flow: &str, task: &dyn Task, store: &mut ProvisioningStore, outputs: TaskOutputs) {
    let declared = task.provides();
    let mut accepted = outputs.into_inner();
    accepted.retain(|key, _| {
        let ok = declared.contains(&key.as_str());
        if !ok {
            warn!(flow, task = task.name(), key = %key, "dropping undeclared task output");
        }
        ok
    });
    store.merge(accepted);
}

/// Revert `completed.len()` leading tasks in reverse. Errors are logged and
/// swallowed; the names of failed reverts are returned.
async fn compensate(
    flow: &str,
    tasks: &[Box<dyn Task>],
    completed: &[TaskOutputs],
    store: &ProvisioningStore,
) -> Vec<String> {
    let mut unreverted = Vec::new();
    for (task, outputs) in tasks.iter().zip(completed).rev() {
        debug!(flow, task = task.name(), "reverting");
        if let Err(e) = task.revert(store, Some(outputs)).await {
            error!(flow, task = task.name(), error = %e, "revert failed");
            unreverted.push(task.name().to_owned());
        }
    }
    unreverted
}
