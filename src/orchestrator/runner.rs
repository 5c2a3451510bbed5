use super::events::{EventBus, TaskEvent, TaskStatus};
use super::state::RunRegistry;
use crate::artifact::ArtifactStore;
use crate::backend::GenerationBackend;
use crate::catalog::{Catalog, Unit, UnitId};
use crate::errors::{BackendError, OrchestratorError};
use crate::narration::Narrator;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Suppress narration for this run.
    pub silent: bool,
}

/// Scheduling policy for runs and batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunPolicy {
    /// Stop `run_all` at the first failed unit instead of moving on.
    pub halt_on_error: bool,
    /// Upper bound on one backend call. `None` waits indefinitely.
    pub task_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The unit is already in flight.
    AlreadyRunning,
    /// A build-all batch holds the flag.
    BatchInProgress,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::AlreadyRunning => write!(f, "unit is already running"),
            RejectReason::BatchInProgress => write!(f, "a build-all batch is in progress"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The artifact was stored.
    Completed,
    /// The backend (or persisting its output) failed; nothing was stored.
    Failed,
    /// The run never started; no state changed.
    Rejected(RejectReason),
}

/// Summary of one `run_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// Units that already had an artifact or were in flight elsewhere.
    pub skipped: Vec<String>,
    /// Set when `halt_on_error` stopped the batch early.
    pub halted: bool,
}

impl BatchReport {
    pub fn invoked(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Drives units through the backend and into the artifact store.
///
/// Per unit: `Idle -> Running -> {Completed, Failed} -> Idle`. There is no
/// persistent failed state; a failed unit simply has no artifact and runs
/// again on the next explicit request.
pub struct TaskOrchestrator {
    catalog: Arc<Catalog>,
    store: Arc<ArtifactStore>,
    backend: Arc<dyn GenerationBackend>,
    narrator: Option<Arc<Narrator>>,
    events: EventBus,
    registry: RunRegistry,
    idea: RwLock<String>,
    policy: RunPolicy,
}

impl TaskOrchestrator {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<ArtifactStore>,
        backend: Arc<dyn GenerationBackend>,
        idea: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            store,
            backend,
            narrator: None,
            events: EventBus::default(),
            registry: RunRegistry::default(),
            idea: RwLock::new(idea.into()),
            policy: RunPolicy::default(),
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn idea(&self) -> String {
        self.idea
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_idea(&self, idea: impl Into<String>) {
        *self.idea.write().unwrap_or_else(PoisonError::into_inner) = idea.into();
    }

    pub fn is_running(&self, id: UnitId) -> bool {
        self.registry.is_running(&id.key())
    }

    pub fn running_keys(&self) -> Vec<String> {
        self.registry.running_keys()
    }

    pub fn is_batch_active(&self) -> bool {
        self.registry.is_batch_active()
    }

    /// Run one unit. Rejected without any state change while the unit is
    /// already running or a batch is in progress.
    ///
    /// Backend failures are not errors here: they are logged, published as
    /// an `error` event and leave the artifact absent. Only an id outside the
    /// catalog is an `Err`.
    pub async fn run_unit(
        &self,
        id: UnitId,
        options: RunOptions,
    ) -> Result<RunOutcome, OrchestratorError> {
        if self.registry.is_batch_active() {
            tracing::info!(unit = %id, "rejecting manual run during build-all");
            return Ok(RunOutcome::Rejected(RejectReason::BatchInProgress));
        }
        self.execute(id, options).await
    }

    /// Run every unit without an artifact, strictly one after another in
    /// catalog order. Units that already have an artifact are skipped.
    pub async fn run_all(&self) -> Result<BatchReport, OrchestratorError> {
        let Some(_batch) = self.registry.try_start_batch() else {
            return Err(OrchestratorError::BatchInProgress);
        };

        let mut report = BatchReport::default();
        for unit in self.catalog.units() {
            let key = unit.key();
            if self.store.contains(&key) {
                report.skipped.push(key);
                continue;
            }

            match self.execute(unit.id, RunOptions::default()).await? {
                RunOutcome::Completed => report.completed.push(key),
                RunOutcome::Failed => {
                    report.failed.push(key);
                    if self.policy.halt_on_error {
                        tracing::warn!(unit = %unit.id, "halting build-all after failed unit");
                        report.halted = true;
                        break;
                    }
                }
                RunOutcome::Rejected(reason) => {
                    tracing::debug!(unit = %unit.id, %reason, "skipping unit in build-all");
                    report.skipped.push(key);
                }
            }
        }

        tracing::info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "build-all finished"
        );
        Ok(report)
    }

    async fn execute(&self, id: UnitId, options: RunOptions) -> Result<RunOutcome, OrchestratorError> {
        let unit = self
            .catalog
            .unit(id)
            .ok_or_else(|| OrchestratorError::UnknownUnit { key: id.key() })?;
        let key = unit.key();

        let Some(guard) = self.registry.try_start(&key) else {
            tracing::debug!(unit = %id, "unit already running");
            return Ok(RunOutcome::Rejected(RejectReason::AlreadyRunning));
        };
        self.emit(&unit, TaskStatus::Running);

        if !options.silent
            && let Some(narrator) = &self.narrator
        {
            narrator.spawn(unit.task);
        }

        let idea = self.idea();
        let stored = match self.generate(&idea, &unit).await {
            Ok(raw) => self.store.set(&key, raw).map_err(OrchestratorError::from),
            Err(e) => Err(OrchestratorError::from(e)),
        };

        drop(guard);
        match stored {
            Ok(()) => {
                tracing::info!(unit = %id, phase = unit.phase.day, "unit completed");
                self.emit(&unit, TaskStatus::Completed);
                Ok(RunOutcome::Completed)
            }
            Err(error) => {
                tracing::warn!(unit = %id, phase = unit.phase.day, %error, "unit failed");
                self.emit(&unit, TaskStatus::Error);
                Ok(RunOutcome::Failed)
            }
        }
    }

    async fn generate(&self, idea: &str, unit: &Unit<'_>) -> Result<String, BackendError> {
        let label = unit.phase.label();
        let call = self.backend.generate(idea, unit.task, &label);
        match self.policy.task_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(BackendError::Timeout {
                    secs: limit.as_secs(),
                })),
            None => call.await,
        }
    }

    fn emit(&self, unit: &Unit<'_>, status: TaskStatus) {
        self.events.publish(TaskEvent {
            task: unit.task.to_string(),
            phase: unit.phase.day,
            status,
            key: unit.key(),
            at: Utc::now(),
        });
    }
}
